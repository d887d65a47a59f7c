//! # Record ingestion
//!
//! Turns one heterogeneous source record into a `Contact`:
//!
//! ```text
//! RawRecord ─► preprocess() ─► CleanRecord ─► RowNormalizer::normalize() ─► NormalizedRow
//! ```
//!
//! Source-specific connectors (CSV, spreadsheets, APIs, scrapers) live
//! outside this crate; they hand over `RawRecord`s.

pub mod aliases;
pub mod infer;
pub mod preprocess;
pub mod normalize;

use serde_json::Value as JsonValue;

use crate::model::Source;
use crate::{Error, Result};

pub use preprocess::{preprocess, preprocess_json, CleanRecord, SourceHint};
pub use normalize::{NormalizedRow, RowError, RowNormalizer};

// ============================================================================
// RawRecord
// ============================================================================

/// One raw record: headers and values in their original encounter order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRecord {
    pub fields: Vec<(String, JsonValue)>,
}

impl RawRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, header: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        self.fields.push((header.into(), value.into()));
        self
    }

    /// Parse a JSON object, keeping key order.
    pub fn from_json(json: &str) -> Result<Self> {
        match serde_json::from_str::<JsonValue>(json)? {
            JsonValue::Object(map) => Ok(map.into_iter().collect()),
            other => Err(Error::InvalidEntity {
                entity: "record".into(),
                message: format!("expected a JSON object, got {}", json_type_name(&other)),
            }),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &JsonValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl<K: Into<String>> FromIterator<(K, JsonValue)> for RawRecord {
    fn from_iter<I: IntoIterator<Item = (K, JsonValue)>>(iter: I) -> Self {
        Self { fields: iter.into_iter().map(|(k, v)| (k.into(), v)).collect() }
    }
}

fn json_type_name(v: &JsonValue) -> &'static str {
    match v {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "boolean",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}

/// Display string for a raw value. Null is empty; containers are compact JSON.
pub fn display_value(v: &JsonValue) -> String {
    match v {
        JsonValue::Null => String::new(),
        JsonValue::String(s) => s.clone(),
        JsonValue::Bool(b) => b.to_string(),
        JsonValue::Number(n) => n.to_string(),
        JsonValue::Array(_) | JsonValue::Object(_) => v.to_string(),
    }
}

// ============================================================================
// Provenance
// ============================================================================

/// Where a batch of records came from, as told by the importer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Provenance {
    pub kind: String,
    pub filename: Option<String>,
    pub source_name: Option<String>,
}

impl Provenance {
    pub fn new(kind: impl Into<String>) -> Self {
        Self { kind: kind.into(), filename: None, source_name: None }
    }

    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    pub fn with_source_name(mut self, name: impl Into<String>) -> Self {
        self.source_name = Some(name.into());
        self
    }

    pub fn hint(&self) -> SourceHint {
        SourceHint { source_type: self.kind.clone(), source_filename: self.filename.clone() }
    }

    /// The `source` object attached to contacts, stamped now.
    pub fn to_source(&self) -> Source {
        let mut source = Source::new(self.kind.clone());
        source.filename = self.filename.clone();
        source.name = self.source_name.clone();
        source
    }
}

// ============================================================================
// Text helpers shared by the preprocessor and normalizer
// ============================================================================

/// Normalize exotic spaces and curly quotes, collapse runs of horizontal
/// whitespace, trim every line, and drop blank lines.
pub fn clean_text(s: &str) -> String {
    let mapped: String = s
        .chars()
        .filter_map(|c| match c {
            '\u{00A0}' | '\u{202F}' | '\u{2000}'..='\u{200A}' | '\u{3000}' | '\t' => Some(' '),
            '\u{200B}' | '\u{200C}' | '\u{200D}' | '\u{2060}' | '\u{FEFF}' => None,
            '\u{2018}' | '\u{2019}' | '\u{201A}' | '\u{201B}' | '\u{2032}' => Some('\''),
            '\u{201C}' | '\u{201D}' | '\u{201E}' | '\u{201F}' | '\u{2033}' => Some('"'),
            '\r' => Some('\n'),
            c => Some(c),
        })
        .collect();

    mapped
        .lines()
        .map(collapse_whitespace)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Trim and collapse internal whitespace to single spaces.
pub fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Upper-case the first letter of every space-separated word, lower-case the rest.
pub fn title_case(s: &str) -> String {
    s.split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
