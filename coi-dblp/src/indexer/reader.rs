//! Pull-based record reader over the dblp XML stream
//!
//! Only the record currently being assembled is held in memory. Fields the
//! indexer does not need (titles, pages, ee, ...) are skipped without being
//! decoded, and records of unknown kinds are skipped wholesale.

use super::entities::decode_text;
use super::RECORD_KINDS;
use crate::error::IndexError;
use crate::model::Publication;
use quick_xml::events::{BytesStart, Event};
use quick_xml::name::QName;
use quick_xml::Reader;
use std::io::BufRead;

/// Nesting depth of bibliographic records (`<dblp>` is depth 1)
const RECORD_DEPTH: usize = 2;

/// One record as it appears in the corpus, before any filtering
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRecord {
    /// Element name (`article`, `www`, ...)
    pub kind: String,
    /// Parsed record; `year` is `None` when absent or not numeric
    pub publication: Publication,
    /// Trimmed `<year>` text, if the element was present
    pub raw_year: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Author,
    Year,
}

#[derive(Debug, Default)]
struct RecordBuilder {
    kind: String,
    key: Option<String>,
    disambiguation: bool,
    authors: Vec<String>,
    raw_year: Option<String>,
}

impl RecordBuilder {
    fn finish(self) -> RawRecord {
        let year = self
            .raw_year
            .as_deref()
            .and_then(|y| y.parse::<i32>().ok());

        RawRecord {
            kind: self.kind,
            publication: Publication {
                key: self.key.unwrap_or_default(),
                authors: self.authors,
                year,
                disambiguation: self.disambiguation,
            },
            raw_year: self.raw_year,
        }
    }
}

/// Forward-only reader yielding one record at a time
pub struct RecordReader<R: BufRead> {
    reader: Reader<R>,
    buf: Vec<u8>,
    skip_buf: Vec<u8>,
    depth: usize,
}

impl<R: BufRead> RecordReader<R> {
    pub fn new(source: R) -> Self {
        let mut reader = Reader::from_reader(source);
        reader.config_mut().trim_text(true);

        Self {
            reader,
            buf: Vec::with_capacity(8 * 1024),
            skip_buf: Vec::new(),
            depth: 0,
        }
    }

    /// Byte offset of the reader in the decompressed stream
    pub fn position(&self) -> u64 {
        self.reader.buffer_position() as u64
    }

    /// Read the next bibliographic record, `None` at end of stream
    pub fn next_record(&mut self) -> Result<Option<RawRecord>, IndexError> {
        let mut current: Option<RecordBuilder> = None;
        let mut field: Option<Field> = None;
        let mut text = String::new();

        loop {
            self.buf.clear();
            let position = self.reader.buffer_position() as u64;
            let event = match self.reader.read_event_into(&mut self.buf) {
                Ok(event) => event,
                Err(e) => {
                    return Err(IndexError::Xml {
                        position,
                        message: e.to_string(),
                    })
                }
            };

            match event {
                Event::Start(e) => {
                    self.depth += 1;

                    if self.depth == RECORD_DEPTH {
                        if is_record_kind(e.name()) {
                            current = Some(start_record(&e, position)?);
                        } else {
                            let name = e.name().as_ref().to_vec();
                            skip_element(&mut self.reader, &mut self.skip_buf, &name, position)?;
                            self.depth -= 1;
                        }
                    } else if self.depth == RECORD_DEPTH + 1 && current.is_some() {
                        match e.name().as_ref() {
                            b"author" => field = Some(Field::Author),
                            b"year" => field = Some(Field::Year),
                            other => {
                                let name = other.to_vec();
                                skip_element(
                                    &mut self.reader,
                                    &mut self.skip_buf,
                                    &name,
                                    position,
                                )?;
                                self.depth -= 1;
                                continue;
                            }
                        }
                        text.clear();
                    }
                }
                Event::Empty(e) => {
                    if self.depth + 1 == RECORD_DEPTH && is_record_kind(e.name()) {
                        return Ok(Some(start_record(&e, position)?.finish()));
                    }
                }
                Event::Text(t) => {
                    if field.is_some() {
                        text.push_str(&decode_text(&t, position)?);
                    }
                }
                Event::CData(t) => {
                    if field.is_some() {
                        let raw = std::str::from_utf8(&t).map_err(|_| IndexError::Utf8(position))?;
                        text.push_str(raw);
                    }
                }
                Event::End(_) => {
                    if self.depth == RECORD_DEPTH + 1 {
                        if let (Some(f), Some(record)) = (field.take(), current.as_mut()) {
                            let value = text.trim().to_string();
                            match f {
                                Field::Author if !value.is_empty() => record.authors.push(value),
                                Field::Author => {}
                                Field::Year => record.raw_year = Some(value),
                            }
                        }
                    }

                    self.depth = self.depth.saturating_sub(1);

                    if self.depth + 1 == RECORD_DEPTH {
                        if let Some(record) = current.take() {
                            return Ok(Some(record.finish()));
                        }
                    }
                }
                Event::Eof => return Ok(None),
                _ => {}
            }
        }
    }
}

impl<R: BufRead> Iterator for RecordReader<R> {
    type Item = Result<RawRecord, IndexError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_record().transpose()
    }
}

/// Skip an element whose start tag was just consumed
fn skip_element<R: BufRead>(
    reader: &mut Reader<R>,
    skip_buf: &mut Vec<u8>,
    name: &[u8],
    position: u64,
) -> Result<(), IndexError> {
    skip_buf.clear();
    reader
        .read_to_end_into(QName(name), skip_buf)
        .map_err(|e| IndexError::Xml {
            position,
            message: e.to_string(),
        })?;
    Ok(())
}

fn is_record_kind(name: QName<'_>) -> bool {
    RECORD_KINDS.iter().any(|kind| kind.as_bytes() == name.as_ref())
}

fn start_record(e: &BytesStart<'_>, position: u64) -> Result<RecordBuilder, IndexError> {
    let mut record = RecordBuilder {
        kind: String::from_utf8_lossy(e.name().as_ref()).into_owned(),
        ..Default::default()
    };

    for attr in e.attributes() {
        let attr = attr.map_err(|err| IndexError::Xml {
            position,
            message: err.to_string(),
        })?;
        match attr.key.as_ref() {
            b"key" => record.key = Some(decode_text(&attr.value, position)?.into_owned()),
            b"publtype" => {
                record.disambiguation = decode_text(&attr.value, position)? == "disambiguation";
            }
            _ => {}
        }
    }

    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read_all(xml: &str) -> Vec<RawRecord> {
        RecordReader::new(xml.as_bytes())
            .collect::<Result<Vec<_>, _>>()
            .unwrap()
    }

    #[test]
    fn test_reads_authors_in_document_order() {
        let records = read_all(
            r#"<?xml version="1.0"?>
<dblp>
<article key="journals/x/A20" mdate="2020-01-01">
<author>Alice Smith</author>
<author orcid="0000-0000">Bob Jones</author>
<title>On <i>things</i></title>
<year>2020</year>
</article>
</dblp>"#,
        );

        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.kind, "article");
        assert_eq!(record.publication.key, "journals/x/A20");
        assert_eq!(record.publication.authors, vec!["Alice Smith", "Bob Jones"]);
        assert_eq!(record.publication.year, Some(2020));
        assert_eq!(record.raw_year.as_deref(), Some("2020"));
        assert!(!record.publication.disambiguation);
    }

    #[test]
    fn test_decodes_entities_in_author_names() {
        let records = read_all(
            r#"<dblp><www key="homepages/1/2"><author>J&uuml;rgen M&umml;ller</author></www></dblp>"#,
        );
        assert_eq!(records[0].publication.authors, vec!["J\u{fc}rgen M\u{fc}ller"]);
    }

    #[test]
    fn test_disambiguation_flag_and_missing_year() {
        let records = read_all(
            r#"<dblp><www key="homepages/00/1" publtype="disambiguation"><author>J. Lee</author><title>Home Page</title></www></dblp>"#,
        );
        let record = &records[0];
        assert!(record.publication.disambiguation);
        assert_eq!(record.raw_year, None);
        assert_eq!(record.publication.year, None);
    }

    #[test]
    fn test_non_numeric_year_is_kept_raw() {
        let records = read_all(
            r#"<dblp><book key="books/x/1"><author>A</author><year>n.d.</year></book></dblp>"#,
        );
        assert_eq!(records[0].raw_year.as_deref(), Some("n.d."));
        assert_eq!(records[0].publication.year, None);
    }

    #[test]
    fn test_unknown_kinds_are_skipped() {
        let records = read_all(
            r#"<dblp><person key="p/1"><author>Nobody</author></person><data key="d/1"><author>Somebody</author></data></dblp>"#,
        );
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].publication.key, "d/1");
    }

    #[test]
    fn test_empty_record_element() {
        let records = read_all(r#"<dblp><proceedings key="conf/x/2020"/></dblp>"#);
        assert_eq!(records.len(), 1);
        assert!(records[0].publication.authors.is_empty());
    }

    #[test]
    fn test_unknown_entity_aborts() {
        let xml = r#"<dblp><article key="a"><author>&bogus;</author></article></dblp>"#;
        let result: Result<Vec<_>, _> = RecordReader::new(xml.as_bytes()).collect();
        assert!(matches!(result, Err(IndexError::UnknownEntity { .. })));
    }
}
