//! Named character entity resolution for the dblp corpus
//!
//! dblp declares its entities in an external DTD, so the parser never sees
//! their definitions. The full HTML5 table covers every legitimate name;
//! the override table redirects misspelled aliases that occur in the data.

use crate::error::IndexError;
use quick_xml::escape::{resolve_html5_entity, resolve_predefined_entity, unescape_with};
use std::borrow::Cow;

/// Misspelled entity names found in the corpus and their intended target
const ENTITY_OVERRIDES: &[(&str, &str)] = &[("umml", "uuml")];

/// Resolve one entity name (without `&` and `;`) to its replacement text
pub fn resolve_entity(name: &str) -> Option<&'static str> {
    let target = ENTITY_OVERRIDES
        .iter()
        .find(|(alias, _)| *alias == name)
        .map(|(_, target)| *target)
        .unwrap_or(name);

    resolve_predefined_entity(target).or_else(|| resolve_html5_entity(target))
}

/// Decode raw text, expanding character references and named entities
///
/// `position` is the reader offset, used only for error reporting.
pub fn decode_text(raw: &[u8], position: u64) -> Result<Cow<'_, str>, IndexError> {
    let raw = std::str::from_utf8(raw).map_err(|_| IndexError::Utf8(position))?;

    let mut unknown: Option<String> = None;
    unescape_with(raw, |name| {
        let resolved = resolve_entity(name);
        if resolved.is_none() {
            unknown = Some(name.to_string());
        }
        resolved
    })
    .map_err(|e| match unknown.take() {
        Some(entity) => IndexError::UnknownEntity { entity, position },
        None => IndexError::Xml {
            position,
            message: e.to_string(),
        },
    })
}
