//! Error types for coi-dblp

use thiserror::Error;

/// Streaming indexer errors
#[derive(Debug, Error)]
pub enum IndexError {
    /// Malformed XML at the given byte offset
    #[error("XML error at byte {position}: {message}")]
    Xml { position: u64, message: String },

    /// Named entity missing from both the HTML5 table and the override table
    #[error("Unknown entity '&{entity};' at byte {position}")]
    UnknownEntity { entity: String, position: u64 },

    /// Record text is not valid UTF-8
    #[error("Invalid UTF-8 at byte {0}")]
    Utf8(u64),

    /// I/O error while reading the corpus
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Snapshot persistence errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Serialization error on {path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    /// No completed build in the data folder
    #[error("No snapshot built in {0}")]
    NotBuilt(String),

    #[error("Snapshot lock error: {0}")]
    Lock(String),

    #[error("Corpus indexing failed: {0}")]
    Index(#[from] IndexError),
}

/// dblp web service errors
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("API error {0}: {1}")]
    Api(u16, String),

    #[error("Parse error: {0}")]
    Parse(String),
}

/// Roster (CSV) errors
#[derive(Debug, Error)]
pub enum RosterError {
    /// Required columns absent from the header row
    #[error("{path}: missing required column(s): {columns}")]
    MissingColumns { path: String, columns: String },

    #[error("CSV error in {path}: {source}")]
    Csv {
        path: String,
        #[source]
        source: csv::Error,
    },

    #[error("IO error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}
