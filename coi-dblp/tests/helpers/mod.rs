//! Test Helper Utilities
//!
//! Shared fixtures for coi-dblp integration tests

#![allow(dead_code)]

pub mod corpus;
pub mod fakes;

pub use corpus::{build_snapshot, write_corpus_gz, CORPUS};
pub use fakes::{candidate, FakeDblp};
