//! Streaming corpus indexer
//!
//! Turns the dblp XML dump into the author→publications,
//! publication→authors and ambiguous-name→aggregator maps in one
//! forward-only pass. Memory use is bounded by the current record plus the
//! maps being built; no document tree is ever materialised.

pub mod entities;
pub mod reader;

pub use reader::{RawRecord, RecordReader};

use crate::error::IndexError;
use crate::model::{CanonicalId, Publication};
use coi_common::config::YearPolicy;
use flate2::read::GzDecoder;
use indexmap::IndexMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::{debug, info, warn};

/// Record kinds that carry authorship
pub const RECORD_KINDS: [&str; 9] = [
    "article",
    "inproceedings",
    "proceedings",
    "book",
    "incollection",
    "phdthesis",
    "mastersthesis",
    "www",
    "data",
];

/// Records between progress log lines
const PROGRESS_INTERVAL: u64 = 1_000_000;

/// Ordered adjacency list keyed by author name or publication key
pub type AdjacencyMap = IndexMap<String, Vec<String>>;

/// Indexer settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexerConfig {
    /// Drop records older than this year; `None` keeps all years
    pub min_year: Option<i32>,
    /// Handling of non-numeric `<year>` values
    pub year_policy: YearPolicy,
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            min_year: Some(2015),
            year_policy: YearPolicy::Include,
        }
    }
}

/// Outcome of the year filter for one record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Admitted,
    BeforeCutoff,
    InvalidYear,
}

/// Counters collected during one indexing run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexStats {
    pub records_seen: u64,
    pub records_indexed: u64,
    pub disambiguation_records: u64,
    pub skipped_before_cutoff: u64,
    pub skipped_invalid_year: u64,
    pub skipped_without_key: u64,
    pub duplicate_keys: u64,
}

/// Maps produced by one indexing run
#[derive(Debug, Clone, Default)]
pub struct IndexedCorpus {
    pub author_pubs: AdjacencyMap,
    pub pub_authors: AdjacencyMap,
    pub disambiguation: IndexMap<String, CanonicalId>,
    pub stats: IndexStats,
}

impl IndexedCorpus {
    /// Add one admitted record to the maps
    fn insert(&mut self, publication: Publication) {
        if publication.disambiguation {
            self.stats.disambiguation_records += 1;
            let Some(id) = CanonicalId::from_homepage_key(&publication.key) else {
                warn!(key = %publication.key, "Disambiguation record without homepage key");
                return;
            };
            for name in publication.authors {
                self.disambiguation.entry(name).or_insert_with(|| id.clone());
            }
            return;
        }

        if self.pub_authors.contains_key(&publication.key) {
            self.stats.duplicate_keys += 1;
            warn!(key = %publication.key, "Duplicate record key, keeping first occurrence");
            return;
        }

        for name in &publication.authors {
            let pubs = self.author_pubs.entry(name.clone()).or_default();
            if pubs.last() != Some(&publication.key) {
                pubs.push(publication.key.clone());
            }
        }
        self.pub_authors.insert(publication.key, publication.authors);
        self.stats.records_indexed += 1;
    }
}

/// Single-pass corpus indexer
#[derive(Debug, Clone, Default)]
pub struct CorpusIndexer {
    config: IndexerConfig,
}

impl CorpusIndexer {
    pub fn new(config: IndexerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &IndexerConfig {
        &self.config
    }

    /// Apply the year filter to one record
    ///
    /// A missing year never excludes a record.
    pub fn admit(&self, record: &RawRecord) -> Admission {
        let Some(raw) = record.raw_year.as_deref() else {
            return Admission::Admitted;
        };

        match raw.parse::<i32>() {
            Ok(year) => match self.config.min_year {
                Some(cutoff) if year < cutoff => Admission::BeforeCutoff,
                _ => Admission::Admitted,
            },
            Err(_) => match self.config.year_policy {
                YearPolicy::Include => Admission::Admitted,
                YearPolicy::Skip => Admission::InvalidYear,
            },
        }
    }

    /// Index an uncompressed XML stream
    pub fn index<R: BufRead>(&self, source: R) -> Result<IndexedCorpus, IndexError> {
        let mut records = RecordReader::new(source);
        let mut corpus = IndexedCorpus::default();

        while let Some(record) = records.next_record()? {
            corpus.stats.records_seen += 1;
            if corpus.stats.records_seen % PROGRESS_INTERVAL == 0 {
                debug!(
                    records = corpus.stats.records_seen,
                    authors = corpus.author_pubs.len(),
                    offset = records.position(),
                    "Indexing progress"
                );
            }

            if record.publication.key.is_empty() {
                corpus.stats.skipped_without_key += 1;
                warn!(
                    kind = %record.kind,
                    offset = records.position(),
                    "Record without key, skipping"
                );
                continue;
            }

            match self.admit(&record) {
                Admission::Admitted => {
                    if record.publication.year.is_none() && record.raw_year.is_some() {
                        warn!(
                            key = %record.publication.key,
                            year = ?record.raw_year,
                            "Non-numeric year, indexing record without a year"
                        );
                    }
                    corpus.insert(record.publication);
                }
                Admission::BeforeCutoff => corpus.stats.skipped_before_cutoff += 1,
                Admission::InvalidYear => {
                    corpus.stats.skipped_invalid_year += 1;
                    warn!(
                        key = %record.publication.key,
                        year = ?record.raw_year,
                        "Non-numeric year, skipping record"
                    );
                }
            }
        }

        info!(
            records = corpus.stats.records_seen,
            indexed = corpus.stats.records_indexed,
            authors = corpus.author_pubs.len(),
            ambiguous_names = corpus.disambiguation.len(),
            before_cutoff = corpus.stats.skipped_before_cutoff,
            invalid_year = corpus.stats.skipped_invalid_year,
            "Corpus indexed"
        );

        Ok(corpus)
    }

    /// Index a gzip-compressed dump (`dblp.xml.gz`)
    pub fn index_gz_file(&self, path: &Path) -> Result<IndexedCorpus, IndexError> {
        info!(path = %path.display(), min_year = ?self.config.min_year, "Indexing corpus");
        let file = File::open(path)?;
        self.index(BufReader::with_capacity(1 << 20, GzDecoder::new(file)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CORPUS: &str = r#"<?xml version="1.0" encoding="ISO-8859-1"?>
<!DOCTYPE dblp SYSTEM "dblp.dtd">
<dblp>
<www key="homepages/a/1"><author>Alice Smith</author><title>Home Page</title></www>
<inproceedings key="conf/sigir/p1"><author>Alice Smith</author><author>Bob Jones</author><year>2020</year></inproceedings>
<article key="journals/x/old"><author>Alice Smith</author><year>2014</year></article>
<article key="journals/x/edge"><author>Bob Jones</author><year>2015</year></article>
<www key="homepages/00/9" publtype="disambiguation"><author>J. Lee</author><title>Home Page</title></www>
<book key="books/x/weird"><author>Carol White</author><year>unknown</year></book>
</dblp>"#;

    fn index(config: IndexerConfig) -> IndexedCorpus {
        CorpusIndexer::new(config).index(CORPUS.as_bytes()).unwrap()
    }

    #[test]
    fn test_year_boundary() {
        let corpus = index(IndexerConfig::default());
        assert!(corpus.pub_authors.contains_key("journals/x/edge"));
        assert!(!corpus.pub_authors.contains_key("journals/x/old"));
        assert!(corpus.pub_authors.contains_key("homepages/a/1"));
        assert_eq!(corpus.stats.skipped_before_cutoff, 1);
    }

    #[test]
    fn test_no_cutoff_keeps_everything() {
        let corpus = index(IndexerConfig {
            min_year: None,
            ..Default::default()
        });
        assert!(corpus.pub_authors.contains_key("journals/x/old"));
    }

    #[test]
    fn test_disambiguation_records_stay_out_of_main_maps() {
        let corpus = index(IndexerConfig::default());
        assert_eq!(
            corpus.disambiguation.get("J. Lee"),
            Some(&CanonicalId::new("00/9"))
        );
        assert!(!corpus.pub_authors.contains_key("homepages/00/9"));
        assert!(!corpus.author_pubs.contains_key("J. Lee"));
        assert_eq!(corpus.stats.disambiguation_records, 1);
    }

    #[test]
    fn test_author_publications_keep_document_order() {
        let corpus = index(IndexerConfig::default());
        assert_eq!(
            corpus.author_pubs["Alice Smith"],
            vec!["homepages/a/1", "conf/sigir/p1"]
        );
        assert_eq!(
            corpus.pub_authors["conf/sigir/p1"],
            vec!["Alice Smith", "Bob Jones"]
        );
    }

    #[test]
    fn test_invalid_year_policy() {
        let included = index(IndexerConfig::default());
        assert!(included.pub_authors.contains_key("books/x/weird"));

        let skipped = index(IndexerConfig {
            year_policy: YearPolicy::Skip,
            ..Default::default()
        });
        assert!(!skipped.pub_authors.contains_key("books/x/weird"));
        assert_eq!(skipped.stats.skipped_invalid_year, 1);
    }

    #[test]
    fn test_maps_are_mutually_consistent() {
        let corpus = index(IndexerConfig {
            min_year: None,
            ..Default::default()
        });
        for (key, authors) in &corpus.pub_authors {
            for author in authors {
                assert!(corpus.author_pubs[author].contains(key));
            }
        }
        for (author, pubs) in &corpus.author_pubs {
            for key in pubs {
                assert!(corpus.pub_authors[key].contains(author));
            }
        }
    }

    #[test]
    fn test_record_without_key_is_counted_and_skipped() {
        let corpus = CorpusIndexer::default()
            .index("<dblp><article><author>Anon</author></article></dblp>".as_bytes())
            .unwrap();
        assert_eq!(corpus.stats.records_seen, 1);
        assert_eq!(corpus.stats.skipped_without_key, 1);
        assert!(corpus.pub_authors.is_empty());
        assert!(corpus.author_pubs.is_empty());
    }
}
