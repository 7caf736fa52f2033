//! External dblp services consumed during identity resolution
//!
//! The resolver only sees these traits, so tests substitute canned
//! responses and the binary plugs in [`DblpClient`].

pub mod dblp;
pub mod person_xml;

pub use dblp::DblpClient;

use crate::error::ClientError;
use crate::model::{CanonicalId, Candidate};
use async_trait::async_trait;

/// Person record as published on the dblp profile page
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AuthorRecord {
    pub name: String,
    pub affiliations: Vec<String>,
}

/// Free-text author search, ranked best first
#[async_trait]
pub trait AuthorSearch: Send + Sync {
    async fn search_authors(&self, name: &str) -> Result<Vec<Candidate>, ClientError>;
}

/// Candidate list behind a disambiguation aggregator page
#[async_trait]
pub trait DisambiguationLoader: Send + Sync {
    async fn load_disambiguation(&self, id: &CanonicalId) -> Result<Vec<Candidate>, ClientError>;
}

/// Name and affiliations for a known person id
#[async_trait]
pub trait AuthorRecordLoader: Send + Sync {
    async fn load_author(&self, id: &CanonicalId) -> Result<AuthorRecord, ClientError>;
}
