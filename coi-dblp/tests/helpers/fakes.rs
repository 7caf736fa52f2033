//! Canned dblp services

use async_trait::async_trait;
use coi_dblp::clients::{AuthorRecord, AuthorRecordLoader, AuthorSearch, DisambiguationLoader};
use coi_dblp::error::ClientError;
use coi_dblp::{CanonicalId, Candidate};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

pub fn candidate(id: &str, name: &str, affiliations: &[&str]) -> Candidate {
    Candidate {
        id: CanonicalId::new(id),
        display_name: name.to_string(),
        affiliations: affiliations.iter().map(|a| a.to_string()).collect(),
    }
}

/// In-memory stand-in for all three dblp services
///
/// Names or ids without a canned answer return an empty result; entries in
/// `failing` return a network error.
#[derive(Default)]
pub struct FakeDblp {
    pub search: HashMap<String, Vec<Candidate>>,
    pub disambiguation: HashMap<CanonicalId, Vec<Candidate>>,
    pub records: HashMap<CanonicalId, AuthorRecord>,
    pub failing: Vec<String>,
    pub search_calls: AtomicUsize,
    pub disambiguation_calls: AtomicUsize,
    pub record_calls: AtomicUsize,
}

impl FakeDblp {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_search(mut self, name: &str, candidates: Vec<Candidate>) -> Self {
        self.search.insert(name.to_string(), candidates);
        self
    }

    pub fn with_disambiguation(mut self, id: &str, candidates: Vec<Candidate>) -> Self {
        self.disambiguation.insert(CanonicalId::new(id), candidates);
        self
    }

    pub fn with_record(mut self, id: &str, name: &str, affiliations: &[&str]) -> Self {
        self.records.insert(
            CanonicalId::new(id),
            AuthorRecord {
                name: name.to_string(),
                affiliations: affiliations.iter().map(|a| a.to_string()).collect(),
            },
        );
        self
    }

    pub fn failing(mut self, key: &str) -> Self {
        self.failing.push(key.to_string());
        self
    }

    fn check(&self, key: &str) -> Result<(), ClientError> {
        if self.failing.iter().any(|k| k == key) {
            return Err(ClientError::Network(format!("connection reset ({key})")));
        }
        Ok(())
    }

    pub fn searches(&self) -> usize {
        self.search_calls.load(Ordering::SeqCst)
    }

    pub fn disambiguations(&self) -> usize {
        self.disambiguation_calls.load(Ordering::SeqCst)
    }

    pub fn record_loads(&self) -> usize {
        self.record_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AuthorSearch for FakeDblp {
    async fn search_authors(&self, name: &str) -> Result<Vec<Candidate>, ClientError> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        self.check(name)?;
        Ok(self.search.get(name).cloned().unwrap_or_default())
    }
}

#[async_trait]
impl DisambiguationLoader for FakeDblp {
    async fn load_disambiguation(&self, id: &CanonicalId) -> Result<Vec<Candidate>, ClientError> {
        self.disambiguation_calls.fetch_add(1, Ordering::SeqCst);
        self.check(id.as_str())?;
        Ok(self.disambiguation.get(id).cloned().unwrap_or_default())
    }
}

#[async_trait]
impl AuthorRecordLoader for FakeDblp {
    async fn load_author(&self, id: &CanonicalId) -> Result<AuthorRecord, ClientError> {
        self.record_calls.fetch_add(1, Ordering::SeqCst);
        self.check(id.as_str())?;
        self.records
            .get(id)
            .cloned()
            .ok_or_else(|| ClientError::NotFound(id.to_string()))
    }
}
