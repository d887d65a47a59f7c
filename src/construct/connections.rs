//! Personal-connection extraction.
//!
//! Free text is split into fragments; each fragment naming someone via a
//! `with <Name>` phrase yields one connection, with mutual count, last-seen
//! date and direction picked up from the same fragment.

use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;

use crate::model::{ConnectionEntry, Direction, PersonalConnections};

static WITH_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b[Ww]ith\s+([A-Z][A-Za-z'.-]*(?:\s+[A-Z][A-Za-z'.-]*){0,3})").expect("static regex")
});
static MUTUAL_COUNT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(\d+)\s+mutual").expect("static regex"));
static LAST_SEEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)last\s+(?:seen|met|spoke|contacted|contact)\s*(?:on|:)?\s*(\d{4}-\d{2}-\d{2}|\d{1,2}/\d{1,2}/\d{4})")
        .expect("static regex")
});
static INCOMING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(introduced me|reached out to me|referred me|inbound)\b").expect("static regex")
});
static OUTGOING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(i introduced|i reached out|i referred|outbound)\b").expect("static regex")
});

/// One connection ready to become a `KNOWS` edge.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedConnection {
    pub name: String,
    pub direction: Direction,
    pub mutual_count: Option<u32>,
    pub last_seen: Option<NaiveDate>,
    pub strength: Option<f64>,
    pub notes: Option<String>,
}

impl From<&ConnectionEntry> for ParsedConnection {
    fn from(entry: &ConnectionEntry) -> Self {
        Self {
            name: entry.name.trim().to_string(),
            direction: entry.direction,
            mutual_count: entry.mutual_count,
            last_seen: None,
            strength: entry.strength,
            notes: entry.notes.clone(),
        }
    }
}

/// `KNOWS` strength when the source gives none: 0.5, plus 0.04 per mutual
/// connection up to ten.
pub fn knows_strength(mutual_count: Option<u32>) -> f64 {
    0.5 + f64::from(mutual_count.unwrap_or(0).min(10)) * 0.04
}

pub fn parse_connections(connections: &PersonalConnections) -> Vec<ParsedConnection> {
    match connections {
        PersonalConnections::List(entries) => entries
            .iter()
            .filter(|e| !e.name.trim().is_empty())
            .map(ParsedConnection::from)
            .collect(),
        PersonalConnections::Text(text) => parse_text(text),
    }
}

fn parse_text(text: &str) -> Vec<ParsedConnection> {
    text.split(['\n', ';'])
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .flat_map(|fragment| {
            let mutual_count = MUTUAL_COUNT.captures(fragment).and_then(|c| c[1].parse().ok());
            let last_seen = LAST_SEEN.captures(fragment).and_then(|c| parse_date(&c[1]));
            let direction = if INCOMING.is_match(fragment) {
                Direction::Incoming
            } else if OUTGOING.is_match(fragment) {
                Direction::Outgoing
            } else {
                Direction::Both
            };
            WITH_NAME
                .captures_iter(fragment)
                .map(|c| c[1].trim_end_matches('.').to_string())
                .map(move |name| ParsedConnection {
                    name,
                    direction,
                    mutual_count,
                    last_seen,
                    strength: None,
                    notes: Some(fragment.to_string()),
                })
                .collect::<Vec<_>>()
        })
        .collect()
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(s, "%m/%d/%Y"))
        .ok()
}
