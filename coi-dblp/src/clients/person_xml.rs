//! Parser for dblp person pages (`/pid/<id>.xml`)
//!
//! A person page is rooted at `<dblpperson name="...">`. Its own
//! `<person>` element carries affiliation notes. Disambiguation pages also
//! list the homonymous profiles under `<homonyms><homonym><person>`.

use crate::error::ClientError;
use crate::indexer::entities::decode_text;
use crate::model::{CanonicalId, Candidate};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

/// Parsed person page
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PersonPage {
    /// `name` attribute of `<dblpperson>`
    pub name: String,
    /// Affiliation notes of the page's own person record
    pub affiliations: Vec<String>,
    /// Profiles listed as homonyms (disambiguation pages only)
    pub homonyms: Vec<Candidate>,
}

#[derive(Debug, Default)]
struct PersonBuilder {
    key: Option<String>,
    pid: Option<String>,
    name: Option<String>,
    affiliations: Vec<String>,
}

impl PersonBuilder {
    fn into_candidate(self) -> Option<Candidate> {
        let id = self
            .pid
            .map(CanonicalId::new)
            .or_else(|| self.key.as_deref().and_then(CanonicalId::from_homepage_key))?;

        Some(Candidate {
            id,
            display_name: self.name.unwrap_or_default(),
            affiliations: self.affiliations,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Capture {
    Author,
    Affiliation,
}

fn parse_error(reader: &Reader<&[u8]>, message: impl std::fmt::Display) -> ClientError {
    ClientError::Parse(format!("byte {}: {}", reader.buffer_position(), message))
}

fn attribute(
    reader: &Reader<&[u8]>,
    element: &BytesStart<'_>,
    name: &[u8],
) -> Result<Option<String>, ClientError> {
    for attr in element.attributes() {
        let attr = attr.map_err(|e| parse_error(reader, e))?;
        if attr.key.as_ref() == name {
            let value = decode_text(&attr.value, reader.buffer_position() as u64)
                .map_err(|e| parse_error(reader, e))?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}

/// Parse a dblp person page
pub fn parse_person_page(xml: &str) -> Result<PersonPage, ClientError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut page = PersonPage::default();
    let mut in_homonym = false;
    let mut person: Option<PersonBuilder> = None;
    let mut person_depth = 0usize;
    let mut depth = 0usize;
    let mut capture: Option<Capture> = None;
    let mut text = String::new();

    loop {
        let event = reader.read_event().map_err(|e| parse_error(&reader, e))?;
        match event {
            Event::Start(e) => {
                depth += 1;
                match e.name().as_ref() {
                    b"dblpperson" => {
                        page.name = attribute(&reader, &e, b"name")?.unwrap_or_default();
                    }
                    b"homonym" => in_homonym = true,
                    b"person" if person.is_none() => {
                        person = Some(PersonBuilder {
                            key: attribute(&reader, &e, b"key")?,
                            ..Default::default()
                        });
                        person_depth = depth;
                    }
                    b"author" if person.is_some() && depth == person_depth + 1 => {
                        if let Some(p) = person.as_mut() {
                            if p.pid.is_none() {
                                p.pid = attribute(&reader, &e, b"pid")?;
                            }
                        }
                        capture = Some(Capture::Author);
                        text.clear();
                    }
                    b"note" if person.is_some() && depth == person_depth + 1 => {
                        let kind = attribute(&reader, &e, b"type")?;
                        if kind.as_deref() == Some("affiliation") {
                            capture = Some(Capture::Affiliation);
                            text.clear();
                        }
                    }
                    _ => {}
                }
            }
            Event::Text(t) => {
                if capture.is_some() {
                    let decoded = decode_text(&t, reader.buffer_position() as u64)
                        .map_err(|e| parse_error(&reader, e))?;
                    text.push_str(&decoded);
                }
            }
            Event::End(e) => {
                match e.name().as_ref() {
                    b"author" | b"note" => {
                        if let (Some(c), Some(p)) = (capture.take(), person.as_mut()) {
                            let value = text.trim().to_string();
                            match c {
                                Capture::Author if p.name.is_none() => p.name = Some(value),
                                Capture::Author => {}
                                Capture::Affiliation if !value.is_empty() => {
                                    p.affiliations.push(value)
                                }
                                Capture::Affiliation => {}
                            }
                        }
                    }
                    b"person" if person.is_some() && depth == person_depth => {
                        if let Some(p) = person.take() {
                            if in_homonym {
                                if let Some(candidate) = p.into_candidate() {
                                    page.homonyms.push(candidate);
                                }
                            } else if page.affiliations.is_empty() {
                                page.affiliations = p.affiliations;
                            }
                        }
                    }
                    b"homonym" => in_homonym = false,
                    _ => {}
                }
                depth = depth.saturating_sub(1);
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(page)
}

#[cfg(test)]
mod tests {
    use super::*;

    const DISAMBIGUATION_PAGE: &str = r#"<?xml version="1.0" encoding="US-ASCII"?>
<dblpperson name="J. Lee" pid="00/9" n="3">
<person key="homepages/00/9" mdate="2020-01-01" publtype="disambiguation">
<author pid="00/9">J. Lee</author>
</person>
<r><article key="journals/x/1"><author pid="00/9-1">J. Lee 0001</author><title>T</title></article></r>
<homonyms n="2">
<homonym><person key="homepages/00/9-1" mdate="2021-01-01">
<author pid="00/9-1">J. Lee 0001</author>
<note type="affiliation">Acme Univ, Springfield</note>
</person></homonym>
<homonym><person key="homepages/00/9-2" mdate="2021-01-01">
<author pid="00/9-2">J. Lee 0002</author>
<note type="affiliation">Globex Institute</note>
<note type="award">Best Paper</note>
</person></homonym>
</homonyms>
</dblpperson>"#;

    #[test]
    fn test_parses_homonyms() {
        let page = parse_person_page(DISAMBIGUATION_PAGE).unwrap();
        assert_eq!(page.name, "J. Lee");
        assert_eq!(page.homonyms.len(), 2);

        assert_eq!(page.homonyms[0].id, CanonicalId::new("00/9-1"));
        assert_eq!(page.homonyms[0].display_name, "J. Lee 0001");
        assert_eq!(page.homonyms[0].affiliations, vec!["Acme Univ, Springfield"]);

        assert_eq!(page.homonyms[1].id, CanonicalId::new("00/9-2"));
        assert_eq!(page.homonyms[1].affiliations, vec!["Globex Institute"]);
    }

    #[test]
    fn test_parses_own_affiliations() {
        let page = parse_person_page(
            r#"<dblpperson name="Alice Smith" pid="a/1" n="1">
<person key="homepages/a/1" mdate="2022-01-01">
<author pid="a/1">Alice Smith</author>
<note type="affiliation">University of Somewhere</note>
<note type="affiliation" label="former">Old Lab</note>
</person>
</dblpperson>"#,
        )
        .unwrap();

        assert_eq!(page.name, "Alice Smith");
        assert_eq!(page.affiliations, vec!["University of Somewhere", "Old Lab"]);
        assert!(page.homonyms.is_empty());
    }

    #[test]
    fn test_homonym_without_pid_uses_key() {
        let page = parse_person_page(
            r#"<dblpperson name="X"><homonyms><homonym><person key="homepages/1/2"><author>X 0001</author></person></homonym></homonyms></dblpperson>"#,
        )
        .unwrap();
        assert_eq!(page.homonyms[0].id, CanonicalId::new("1/2"));
    }
}
