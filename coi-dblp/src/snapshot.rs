//! Immutable corpus snapshot and its on-disk store
//!
//! The snapshot is built once by the indexer and then only read. Each map is
//! persisted as gzip-compressed JSON; key order in the files is the corpus
//! document order, so reloading reproduces the same iteration order.
//!
//! Files are namespaced by year cutoff (`author2pubs.y2015.json.gz`,
//! `author2pubs.all.json.gz`) so different cutoffs never share artifacts.
//! A `manifest.<cutoff>.json` written after the maps marks a complete build.

use crate::error::StoreError;
use crate::indexer::{AdjacencyMap, CorpusIndexer, IndexedCorpus};
use crate::model::CanonicalId;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use fs2::FileExt;
use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufReader, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info};

const AUTHOR_PUBS: &str = "author2pubs";
const PUB_AUTHORS: &str = "pub2authors";
const DISAMBIGUATION: &str = "disambiguation2id";
const AUTHOR_IDS: &str = "author2id";
const MANIFEST: &str = "manifest";

/// Read-only view over the indexed corpus
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CorpusSnapshot {
    author_pubs: AdjacencyMap,
    pub_authors: AdjacencyMap,
    disambiguation: IndexMap<String, CanonicalId>,
    author_ids: IndexMap<String, CanonicalId>,
}

impl CorpusSnapshot {
    /// Build a snapshot from raw maps, deriving the name→id map
    pub fn new(
        author_pubs: AdjacencyMap,
        pub_authors: AdjacencyMap,
        disambiguation: IndexMap<String, CanonicalId>,
    ) -> Self {
        let author_ids = derive_author_ids(&author_pubs);
        Self::with_author_ids(author_pubs, pub_authors, disambiguation, author_ids)
    }

    /// Build a snapshot with an explicit name→id map
    pub fn with_author_ids(
        author_pubs: AdjacencyMap,
        pub_authors: AdjacencyMap,
        disambiguation: IndexMap<String, CanonicalId>,
        author_ids: IndexMap<String, CanonicalId>,
    ) -> Self {
        Self {
            author_pubs,
            pub_authors,
            disambiguation,
            author_ids,
        }
    }

    pub fn from_index(corpus: IndexedCorpus) -> Self {
        Self::new(corpus.author_pubs, corpus.pub_authors, corpus.disambiguation)
    }

    pub fn author_pubs(&self) -> &AdjacencyMap {
        &self.author_pubs
    }

    pub fn pub_authors(&self) -> &AdjacencyMap {
        &self.pub_authors
    }

    pub fn disambiguation(&self) -> &IndexMap<String, CanonicalId> {
        &self.disambiguation
    }

    pub fn author_ids(&self) -> &IndexMap<String, CanonicalId> {
        &self.author_ids
    }

    /// Publications of a display name, in document order
    pub fn publications_of(&self, name: &str) -> &[String] {
        self.author_pubs.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Authors of a publication, in byline order
    pub fn authors_of(&self, key: &str) -> &[String] {
        self.pub_authors.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Canonical id from the name's own homepage record
    pub fn homepage_id(&self, name: &str) -> Option<&CanonicalId> {
        self.author_ids.get(name)
    }

    /// Aggregator id when the name is flagged as ambiguous
    pub fn disambiguation_id(&self, name: &str) -> Option<&CanonicalId> {
        self.disambiguation.get(name)
    }
}

/// Map each name to the id of its first homepage key in document order
pub fn derive_author_ids(author_pubs: &AdjacencyMap) -> IndexMap<String, CanonicalId> {
    author_pubs
        .iter()
        .filter_map(|(name, pubs)| {
            pubs.iter()
                .find_map(|key| CanonicalId::from_homepage_key(key))
                .map(|id| (name.clone(), id))
        })
        .collect()
}

/// Completion record written after every map of a build
///
/// Its presence is what marks a namespace as built; a build interrupted
/// between map renames leaves no manifest behind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotManifest {
    /// Number of completed builds in this namespace
    pub generation: u64,
    pub authors: usize,
    pub publications: usize,
    pub ambiguous_names: usize,
}

/// Snapshot files for one year cutoff inside a data folder
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    folder: PathBuf,
    namespace: String,
}

impl SnapshotStore {
    pub fn new(folder: impl Into<PathBuf>, min_year: Option<i32>) -> Self {
        let namespace = match min_year {
            Some(year) => format!("y{}", year),
            None => "all".to_string(),
        };
        Self {
            folder: folder.into(),
            namespace,
        }
    }

    pub fn folder(&self) -> &Path {
        &self.folder
    }

    fn path(&self, map: &str) -> PathBuf {
        self.folder.join(format!("{}.{}.json.gz", map, self.namespace))
    }

    fn manifest_path(&self) -> PathBuf {
        self.folder.join(format!("{}.{}.json", MANIFEST, self.namespace))
    }

    fn lock_path(&self) -> PathBuf {
        self.folder.join(format!("snapshot.{}.lock", self.namespace))
    }

    /// True when a build completed: the manifest and the three indexer
    /// outputs are present
    pub fn is_built(&self) -> bool {
        self.manifest_path().exists()
            && [AUTHOR_PUBS, PUB_AUTHORS, DISAMBIGUATION]
                .iter()
                .all(|map| self.path(map).exists())
    }

    /// Manifest of the last completed build, if any
    pub fn manifest(&self) -> Result<Option<SnapshotManifest>, StoreError> {
        let path = self.manifest_path();
        let content = match std::fs::read(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(io_error(&path, e)),
        };
        serde_json::from_slice(&content)
            .map(Some)
            .map_err(|source| StoreError::Json {
                path: path.display().to_string(),
                source,
            })
    }

    /// Take the exclusive single-initializer lock for this namespace
    pub fn lock(&self) -> Result<SnapshotLock, StoreError> {
        std::fs::create_dir_all(&self.folder).map_err(|e| io_error(&self.folder, e))?;
        let path = self.lock_path();
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(&path)
            .map_err(|e| io_error(&path, e))?;

        let start = Instant::now();
        file.lock_exclusive()
            .map_err(|e| StoreError::Lock(format!("{}: {}", path.display(), e)))?;
        debug!(
            lock = %path.display(),
            wait_ms = start.elapsed().as_millis() as u64,
            "Snapshot lock acquired"
        );

        Ok(SnapshotLock { file })
    }

    /// Persist every map, replacing earlier files
    ///
    /// The manifest is removed first and written last. Caller holds the lock.
    fn write_locked(&self, snapshot: &CorpusSnapshot) -> Result<SnapshotManifest, StoreError> {
        let previous = self.manifest().ok().flatten().map_or(0, |m| m.generation);

        let manifest_path = self.manifest_path();
        match std::fs::remove_file(&manifest_path) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(io_error(&manifest_path, e)),
        }

        write_map(&self.path(AUTHOR_PUBS), &snapshot.author_pubs)?;
        write_map(&self.path(PUB_AUTHORS), &snapshot.pub_authors)?;
        write_map(&self.path(DISAMBIGUATION), &snapshot.disambiguation)?;
        write_map(&self.path(AUTHOR_IDS), &snapshot.author_ids)?;

        let manifest = SnapshotManifest {
            generation: previous + 1,
            authors: snapshot.author_pubs.len(),
            publications: snapshot.pub_authors.len(),
            ambiguous_names: snapshot.disambiguation.len(),
        };
        let tmp = manifest_path.with_extension("json.tmp");
        let content = serde_json::to_vec_pretty(&manifest).map_err(|source| StoreError::Json {
            path: tmp.display().to_string(),
            source,
        })?;
        std::fs::write(&tmp, content).map_err(|e| io_error(&tmp, e))?;
        std::fs::rename(&tmp, &manifest_path).map_err(|e| io_error(&manifest_path, e))?;

        info!(
            folder = %self.folder.display(),
            namespace = %self.namespace,
            generation = manifest.generation,
            "Snapshot written"
        );
        Ok(manifest)
    }

    /// Persist `snapshot` under the namespace lock
    pub fn write(&self, snapshot: &CorpusSnapshot) -> Result<SnapshotManifest, StoreError> {
        let _lock = self.lock()?;
        self.write_locked(snapshot)
    }

    /// Load a previously built snapshot
    ///
    /// Waits for the namespace lock, so a build or rebuild in progress is
    /// never read half-written. The name→id map is a derived artifact: when
    /// its file is missing it is rebuilt from author→publications and
    /// persisted under the same lock.
    pub fn load(&self) -> Result<CorpusSnapshot, StoreError> {
        let _lock = self.lock()?;
        self.load_locked()
    }

    fn load_locked(&self) -> Result<CorpusSnapshot, StoreError> {
        if !self.is_built() {
            return Err(StoreError::NotBuilt(self.folder.display().to_string()));
        }

        let author_pubs: AdjacencyMap = read_map(&self.path(AUTHOR_PUBS))?;
        let pub_authors: AdjacencyMap = read_map(&self.path(PUB_AUTHORS))?;
        let disambiguation: IndexMap<String, CanonicalId> = read_map(&self.path(DISAMBIGUATION))?;

        let ids_path = self.path(AUTHOR_IDS);
        let author_ids = if ids_path.exists() {
            read_map(&ids_path)?
        } else {
            info!("Deriving name→id map");
            let ids = derive_author_ids(&author_pubs);
            write_map(&ids_path, &ids)?;
            ids
        };

        info!(
            authors = author_pubs.len(),
            publications = pub_authors.len(),
            ambiguous_names = disambiguation.len(),
            resolved_names = author_ids.len(),
            "Snapshot loaded"
        );

        Ok(CorpusSnapshot::with_author_ids(
            author_pubs,
            pub_authors,
            disambiguation,
            author_ids,
        ))
    }

    /// Load the snapshot, indexing `corpus` first if it has not been built
    ///
    /// Holds the namespace lock for the whole check-build-load sequence, so
    /// concurrent first runs build once. `force` rebuilds unconditionally.
    pub fn load_or_build(
        &self,
        corpus: &Path,
        indexer: &CorpusIndexer,
        force: bool,
    ) -> Result<CorpusSnapshot, StoreError> {
        let _lock = self.lock()?;

        if self.is_built() && !force {
            return self.load_locked();
        }

        let snapshot = CorpusSnapshot::from_index(indexer.index_gz_file(corpus)?);
        self.write_locked(&snapshot)?;
        Ok(snapshot)
    }
}

/// Exclusive lock on a snapshot namespace; released on drop
pub struct SnapshotLock {
    file: File,
}

impl Drop for SnapshotLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}

fn io_error(path: &Path, source: std::io::Error) -> StoreError {
    StoreError::Io {
        path: path.display().to_string(),
        source,
    }
}

/// Write gzip JSON to a temp file, then rename over the target
fn write_map<T: Serialize>(path: &Path, value: &T) -> Result<(), StoreError> {
    let tmp = path.with_extension("gz.tmp");
    let file = File::create(&tmp).map_err(|e| io_error(&tmp, e))?;

    let mut encoder = GzEncoder::new(BufWriter::new(file), Compression::default());
    serde_json::to_writer(&mut encoder, value).map_err(|source| StoreError::Json {
        path: tmp.display().to_string(),
        source,
    })?;
    let mut writer = encoder.finish().map_err(|e| io_error(&tmp, e))?;
    writer.flush().map_err(|e| io_error(&tmp, e))?;
    drop(writer);

    std::fs::rename(&tmp, path).map_err(|e| io_error(path, e))?;
    debug!(path = %path.display(), "Map written");
    Ok(())
}

fn read_map<T: DeserializeOwned>(path: &Path) -> Result<T, StoreError> {
    let file = File::open(path).map_err(|e| io_error(path, e))?;
    let reader = BufReader::new(GzDecoder::new(file));
    serde_json::from_reader(reader).map_err(|source| StoreError::Json {
        path: path.display().to_string(),
        source,
    })
}
