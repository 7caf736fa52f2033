//! coi-dblp library interface
//!
//! Streaming dblp indexer, identity resolver and conflict matcher. The
//! binary wires these to the CLI; integration tests use them directly.

pub mod annotate;
pub mod clients;
pub mod error;
pub mod indexer;
pub mod matcher;
pub mod model;
pub mod resolver;
pub mod roster;
pub mod snapshot;

pub use crate::indexer::{CorpusIndexer, IndexerConfig};
pub use crate::model::{
    CanonicalId, Candidate, CommitteeEntry, ConflictRecord, Justification, RosterNumber,
    SubmissionAuthorEntry,
};
pub use crate::resolver::{IdentityResolver, Resolution, ResolveRequest};
pub use crate::snapshot::{CorpusSnapshot, SnapshotStore};
