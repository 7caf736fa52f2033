//! Small dblp-shaped corpus used across tests

use coi_dblp::{CorpusIndexer, CorpusSnapshot, IndexerConfig};
use flate2::write::GzEncoder;
use flate2::Compression;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Alice and Bob share a SIGIR paper; Carol works alone; "J. Lee" is a
/// disambiguation page; the 2014 article falls before the default cutoff.
pub const CORPUS: &str = r#"<?xml version="1.0" encoding="ISO-8859-1"?>
<!DOCTYPE dblp SYSTEM "dblp.dtd">
<dblp>
<www key="homepages/a/1"><author>Alice Smith</author><title>Home Page</title></www>
<www key="homepages/b/2"><author>Bob Jones</author><title>Home Page</title></www>
<www key="homepages/c/3"><author>Carol White</author><title>Home Page</title></www>
<www key="homepages/123/456" publtype="disambiguation"><author>J. Lee</author><title>Home Page</title></www>
<inproceedings key="conf/sigir/SmithJ20"><author>Alice Smith</author><author>Bob Jones</author><title>Shared &amp; Ranked</title><year>2020</year><booktitle>SIGIR</booktitle></inproceedings>
<inproceedings key="conf/ecir/Jones15"><author>Bob Jones</author><title>Boundary</title><year>2015</year></inproceedings>
<article key="journals/ir/WhiteS14"><author>Carol White</author><author>Alice Smith</author><title>Old</title><year>2014</year></article>
<article key="journals/ir/White21"><author>Carol White</author><title>J&uuml;rgen's Index</title><year>2021</year></article>
<proceedings key="conf/sigir/2022"><editor>Someone</editor><title>Proceedings</title></proceedings>
</dblp>"#;

pub fn build_snapshot(config: IndexerConfig) -> CorpusSnapshot {
    let corpus = CorpusIndexer::new(config)
        .index(CORPUS.as_bytes())
        .expect("fixture corpus indexes");
    CorpusSnapshot::from_index(corpus)
}

/// Write [`CORPUS`] gzip-compressed into `dir`
pub fn write_corpus_gz(dir: &Path) -> PathBuf {
    let path = dir.join("dblp.xml.gz");
    let file = std::fs::File::create(&path).expect("create corpus file");
    let mut encoder = GzEncoder::new(file, Compression::default());
    encoder
        .write_all(CORPUS.as_bytes())
        .expect("write corpus");
    encoder.finish().expect("finish gzip");
    path
}
