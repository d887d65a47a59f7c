//! Contact — one normalized person/firm record.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Direction;

/// Where a record came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Source {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    /// Display name of the upstream source, when the importer knows one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub imported_at: DateTime<Utc>,
}

impl Source {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            filename: None,
            name: None,
            imported_at: Utc::now(),
        }
    }

    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }
}

/// A structured personal-connection entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionEntry {
    pub name: String,
    #[serde(default)]
    pub direction: Direction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mutual_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strength: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl ConnectionEntry {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            direction: Direction::Both,
            mutual_count: None,
            strength: None,
            notes: None,
        }
    }
}

/// Personal connections arrive either as prose or as a structured list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PersonalConnections {
    Text(String),
    List(Vec<ConnectionEntry>),
}

/// A person/firm record produced by the preprocessor + normalizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    pub name: Option<String>,
    pub firm: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub firm_slug: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub linkedin_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub twitter_handle: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub personal_connections: Option<PersonalConnections>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assets_under_management: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub school: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub degree: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interests: Option<String>,
    /// JSON-encoded array of employment entries.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_history: Option<String>,
    /// JSON-encoded array of education entries.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub education_history: Option<String>,
    pub source: Source,
    #[serde(default)]
    pub confidence: BTreeMap<String, f64>,
    /// `"name"` or `"firm"` when that field was filled from the other.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backfilled: Option<String>,
}

impl Contact {
    pub fn new(source: Source) -> Self {
        Self {
            name: None,
            firm: None,
            firm_slug: None,
            email: None,
            role: None,
            linkedin_url: None,
            twitter_handle: None,
            location: None,
            website: None,
            notes: None,
            personal_connections: None,
            assets_under_management: None,
            school: None,
            degree: None,
            interests: None,
            job_history: None,
            education_history: None,
            source,
            confidence: BTreeMap::new(),
            backfilled: None,
        }
    }

    /// Append a line to the free-text notes. Notes are never overwritten.
    pub fn append_note(&mut self, line: impl AsRef<str>) {
        let line = line.as_ref().trim();
        if line.is_empty() {
            return;
        }
        match &mut self.notes {
            Some(notes) => {
                notes.push('\n');
                notes.push_str(line);
            }
            None => self.notes = Some(line.to_string()),
        }
    }

    /// True when the record describes a firm rather than a person: the
    /// name was back-filled from the firm, or, with no back-fill marker,
    /// both fields carry the same value.
    pub fn is_firm_record(&self) -> bool {
        match self.backfilled.as_deref() {
            Some(field) => field == "name",
            None => match (&self.name, &self.firm) {
                (Some(n), Some(f)) => n.eq_ignore_ascii_case(f),
                _ => false,
            },
        }
    }

    /// The firm, unless it is only a stand-in copied from the name.
    pub fn employer(&self) -> Option<&str> {
        if self.backfilled.as_deref() == Some("firm") {
            return None;
        }
        self.firm.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_note_is_append_only() {
        let mut c = Contact::new(Source::new("csv"));
        c.append_note("first");
        c.append_note("   ");
        c.append_note("second");
        assert_eq!(c.notes.as_deref(), Some("first\nsecond"));
    }

    #[test]
    fn test_personal_connections_untagged() {
        let text: PersonalConnections = serde_json::from_str("\"Met with Jane Doe\"").unwrap();
        assert!(matches!(text, PersonalConnections::Text(_)));

        let list: PersonalConnections =
            serde_json::from_str(r#"[{"name": "Jane Doe", "mutualCount": 4}]"#).unwrap();
        match list {
            PersonalConnections::List(entries) => {
                assert_eq!(entries[0].mutual_count, Some(4));
                assert_eq!(entries[0].direction, Direction::Both);
            }
            other => panic!("expected list, got {other:?}"),
        }
    }

    #[test]
    fn test_backfilled_firm_is_a_person_record() {
        let mut c = Contact::new(Source::new("csv"));
        c.name = Some("Jane Doe".into());
        c.firm = Some("Jane Doe".into());
        assert!(c.is_firm_record());
        assert_eq!(c.employer(), Some("Jane Doe"));

        c.backfilled = Some("firm".into());
        assert!(!c.is_firm_record());
        assert_eq!(c.employer(), None);

        c.backfilled = Some("name".into());
        assert!(c.is_firm_record());
    }

    #[test]
    fn test_source_serializes_type_key() {
        let json = serde_json::to_value(Source::new("csv").with_filename("lps.csv")).unwrap();
        assert_eq!(json["type"], "csv");
        assert_eq!(json["filename"], "lps.csv");
        assert!(json.get("importedAt").is_some());
    }
}
