//! Record preprocessor: one raw record → canonical lower-case keys.
//!
//! Rules, in order: clean text, alias headers, accumulate notes-like
//! columns, keep the first location, reassemble split AUM columns, promote
//! URL-looking values, tidy location and firm, back-fill name/firm, attach
//! the provenance hint, drop empties.

use std::sync::LazyLock;

use regex::Regex;
use tracing::warn;

use super::aliases::{canonical_key, is_notes_like};
use super::{clean_text, display_value, title_case, RawRecord};

const CURRENCY_SYMBOLS: &[char] = &['$', '€', '£', '¥'];

static BARE_DOMAIN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^[a-z0-9-]+\.(com|io|co|net|org|vc|fund|capital|ai|us|uk)(/\S*)?$")
        .expect("static regex")
});

/// Names the field ("name" or "firm") the preprocessor filled from the other.
pub const BACKFILL_KEY: &str = "source_backfill";

/// Provenance hint attached as `source_type` / `source_filename`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceHint {
    pub source_type: String,
    pub source_filename: Option<String>,
}

// ============================================================================
// CleanRecord
// ============================================================================

/// Preprocessor output: canonical keys → cleaned values, in first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanRecord {
    entries: Vec<(String, String)>,
}

impl CleanRecord {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.iter().any(|(k, _)| k == key)
    }

    /// Insert or replace in place (keeps the key's original position).
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, v)) => *v = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        let pos = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(pos).1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Back to a raw record, e.g. to run the preprocessor again.
    pub fn to_raw(&self) -> RawRecord {
        self.iter().map(|(k, v)| (k, serde_json::Value::from(v))).collect()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for CleanRecord {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut record = CleanRecord::default();
        for (k, v) in iter {
            record.insert(k, v);
        }
        record
    }
}

// ============================================================================
// preprocess
// ============================================================================

/// Clean one raw record. Never fails; a record with nothing usable comes
/// back empty.
pub fn preprocess(record: &RawRecord, hint: Option<&SourceHint>) -> CleanRecord {
    let mut out = CleanRecord::default();
    let mut notes: Vec<String> = Vec::new();
    let mut aum_parts: Vec<String> = Vec::new();
    let mut raw_keys: Vec<String> = Vec::with_capacity(record.fields.len());
    let mut location_taken = false;

    for (header, value) in record.iter() {
        let header = clean_text(header).to_lowercase();
        let value = clean_text(&display_value(value));

        if header.contains("aum") {
            aum_parts.push(value);
            continue;
        }

        let key = canonical_key(&header).map(str::to_string).unwrap_or(header);
        raw_keys.push(key.clone());

        if is_notes_like(&key) {
            if !value.is_empty() {
                notes.push(value);
            }
            continue;
        }
        if key == "location" {
            // first non-empty location wins
            if location_taken || value.is_empty() {
                continue;
            }
            location_taken = true;
        }
        if value.is_empty() && out.contains_key(&key) {
            continue;
        }
        out.insert(key, value);
    }

    if let Some(aum) = join_aum(&aum_parts) {
        out.insert("aum", aum);
    }
    if !notes.is_empty() {
        out.insert("notes", notes.join("\n"));
    }

    promote_urls(&mut out);

    if let Some(location) = out.get("location") {
        let head = location.split(',').next().unwrap_or_default().trim();
        let tidy = title_case(head);
        out.insert("location", tidy);
    }

    if let Some(firm) = out.get("firm") {
        if looks_like_url(firm) {
            let tidy = strip_url_firm(firm);
            out.insert("firm", tidy);
        }
    }

    backfill(&mut out, &raw_keys);

    if let Some(hint) = hint {
        out.insert("source_type", hint.source_type.clone());
        if let Some(filename) = &hint.source_filename {
            out.insert("source_filename", filename.clone());
        }
    }

    out.entries.retain(|(_, v)| !v.is_empty());
    out
}

/// Preprocess a JSON object. Malformed input yields an empty record.
pub fn preprocess_json(json: &str, hint: Option<&SourceHint>) -> CleanRecord {
    match RawRecord::from_json(json) {
        Ok(record) => preprocess(&record, hint),
        Err(err) => {
            warn!(error = %err, "unparseable record; skipping");
            CleanRecord::default()
        }
    }
}

/// Concatenate split monetary columns: digits and points only, in input
/// order, prefixed with the first currency symbol any part carried.
fn join_aum(parts: &[String]) -> Option<String> {
    let symbol = parts
        .iter()
        .find_map(|p| p.chars().find(|c| CURRENCY_SYMBOLS.contains(c)));
    let digits: String = parts
        .iter()
        .flat_map(|p| p.chars())
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    if digits.is_empty() {
        return None;
    }
    Some(match symbol {
        Some(s) => format!("{s}{digits}"),
        None => digits,
    })
}

/// Move LinkedIn URLs to `linkedin` and other URLs to `website`.
///
/// Notes and JSON blobs are left alone: they legitimately embed URLs.
fn promote_urls(out: &mut CleanRecord) {
    let mut moves: Vec<(String, &'static str)> = Vec::new();
    for (key, value) in out.iter() {
        if is_notes_like(key) || key == "linkedin" || value.starts_with('[') || value.starts_with('{') {
            continue;
        }
        let lower = value.to_lowercase();
        if lower.contains("linkedin.com") {
            moves.push((key.to_string(), "linkedin"));
        } else if lower.contains("http") && key != "website" {
            moves.push((key.to_string(), "website"));
        }
    }
    for (from, to) in moves {
        if let Some(value) = out.remove(&from) {
            if out.get(to).is_none_or(str::is_empty) {
                out.insert(to, value);
            }
        }
    }
}

fn looks_like_url(s: &str) -> bool {
    let lower = s.to_lowercase();
    lower.contains("://") || lower.starts_with("www.") || s.contains('<') || s.contains('>')
        || BARE_DOMAIN.is_match(s)
}

/// `<https://www.acme.com>` → `acme`.
fn strip_url_firm(s: &str) -> String {
    let s = s.replace(['<', '>'], "");
    let s = s.trim();
    let s = s.split_once("://").map_or(s, |(_, rest)| rest);
    let s = s.strip_prefix("www.").or_else(|| s.strip_prefix("WWW.")).unwrap_or(s);
    s.split('.').next().unwrap_or_default().trim().to_string()
}

/// Fill a missing name from firm (or firm from name), but only when the
/// missing key never appeared among the raw headers at all. The filled
/// field is recorded under `BACKFILL_KEY`.
fn backfill(out: &mut CleanRecord, raw_keys: &[String]) {
    let present = |out: &CleanRecord, key: &str| out.get(key).is_some_and(|v| !v.is_empty());
    let in_raw = |key: &str| raw_keys.iter().any(|k| k == key);

    let (missing, from) = if !present(out, "name") && !in_raw("name") {
        ("name", "firm")
    } else if !present(out, "firm") && !in_raw("firm") {
        ("firm", "name")
    } else {
        return;
    };
    if let Some(value) = out.get(from).filter(|v| !v.is_empty()).map(str::to_string) {
        out.insert(missing, value);
        out.insert(BACKFILL_KEY, missing);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use serde_json::json;

    fn record(pairs: &[(&str, serde_json::Value)]) -> RawRecord {
        pairs.iter().map(|(k, v)| (*k, v.clone())).collect()
    }

    #[test]
    fn test_aliases_headers() {
        let out = preprocess(
            &record(&[
                ("Full Name", json!("John Smith")),
                ("Company Name", json!("Acme Capital")),
                ("Email Address", json!("john@acme.com")),
                ("Job Title", json!("Managing Director")),
            ]),
            None,
        );
        assert_eq!(out.get("name"), Some("John Smith"));
        assert_eq!(out.get("firm"), Some("Acme Capital"));
        assert_eq!(out.get("email"), Some("john@acme.com"));
        assert_eq!(out.get("role"), Some("Managing Director"));
    }

    #[test]
    fn test_notes_accumulate_in_order() {
        let out = preprocess(
            &record(&[
                ("Notes", json!("First note")),
                ("Description", json!("Second note")),
                ("Summary", json!("Third note")),
            ]),
            None,
        );
        assert_eq!(out.get("notes"), Some("First note\nSecond note\nThird note"));
        assert!(!out.contains_key("description"));
    }

    #[test]
    fn test_location_first_wins_and_is_trimmed() {
        let out = preprocess(
            &record(&[
                ("Location", json!("New York City, NY, United States")),
                ("HQ", json!("Boston, MA")),
            ]),
            None,
        );
        assert_eq!(out.get("location"), Some("New York City"));
    }

    #[test]
    fn test_location_title_cased() {
        let out = preprocess(&record(&[("Office Location", json!("san francisco, ca"))]), None);
        assert_eq!(out.get("location"), Some("San Francisco"));
    }

    #[test]
    fn test_split_aum_reassembled() {
        let out = preprocess(
            &record(&[("AUM", json!("$500")), ("AUM2", json!("000")), ("AUM3", json!("000.00"))]),
            None,
        );
        assert_eq!(out.get("aum"), Some("$500000000.00"));
    }

    #[test]
    fn test_numeric_values_serialized() {
        let out = preprocess(&record(&[("Fund AUM", json!(1250000)), ("Employees", json!(42))]), None);
        assert_eq!(out.get("aum"), Some("1250000"));
        assert_eq!(out.get("employees"), Some("42"));
    }

    #[test]
    fn test_url_promotion() {
        let out = preprocess(
            &record(&[
                ("Name", json!("Ada")),
                ("Profile", json!("https://www.linkedin.com/in/ada")),
                ("Homepage Link", json!("http://ada.dev")),
                ("Notes", json!("see http://example.com")),
            ]),
            None,
        );
        assert_eq!(out.get("linkedin"), Some("https://www.linkedin.com/in/ada"));
        assert_eq!(out.get("website"), Some("http://ada.dev"));
        assert!(!out.contains_key("profile"));
        assert!(!out.contains_key("homepage link"));
        assert_eq!(out.get("notes"), Some("see http://example.com"));
    }

    #[test]
    fn test_firm_url_truncated() {
        let out = preprocess(&record(&[("Company", json!("<https://www.acme.com>"))]), None);
        assert_eq!(out.get("firm"), Some("acme"));

        let out = preprocess(&record(&[("Company", json!("acme.vc"))]), None);
        assert_eq!(out.get("firm"), Some("acme"));
    }

    #[test]
    fn test_backfill_name_from_firm() {
        let out = preprocess(&record(&[("Fund", json!("Blackstone"))]), None);
        assert_eq!(out.get("name"), Some("Blackstone"));
        assert_eq!(out.get("firm"), Some("Blackstone"));

        assert_eq!(out.get(BACKFILL_KEY), Some("name"));

        let out = preprocess(&record(&[("Contact Name", json!("Jane Doe"))]), None);
        assert_eq!(out.get("firm"), Some("Jane Doe"));
        assert_eq!(out.get(BACKFILL_KEY), Some("firm"));
    }

    #[test]
    fn test_no_backfill_when_header_present_but_empty() {
        let out = preprocess(&record(&[("Name", json!("  ")), ("Firm", json!("Acme"))]), None);
        assert_eq!(out.get("name"), None);
        assert_eq!(out.get("firm"), Some("Acme"));
        assert!(!out.contains_key(BACKFILL_KEY));
    }

    #[test]
    fn test_hint_and_empty_drop() {
        let hint = SourceHint { source_type: "csv".into(), source_filename: Some("lps.csv".into()) };
        let out = preprocess(&record(&[("Name", json!("Ada")), ("Fax", json!(null))]), Some(&hint));
        assert_eq!(out.get("source_type"), Some("csv"));
        assert_eq!(out.get("source_filename"), Some("lps.csv"));
        assert!(!out.contains_key("fax"));
        assert!(!out.contains_key("source"));
    }

    #[test]
    fn test_malformed_json_is_empty() {
        assert!(preprocess_json("not json", None).is_empty());
        assert_eq!(preprocess_json(r#"{"Org": "Acme"}"#, None).get("firm"), Some("Acme"));
    }

    const HEADERS: &[&str] = &[
        "Full Name", "Company", "Email", "Title", "HQ", "Notes", "Description", "Website", "Sector",
    ];

    proptest! {
        #[test]
        fn prop_preprocess_is_idempotent(
            fields in prop::collection::vec(
                (prop::sample::select(HEADERS), "[A-Za-z]{1,8}( [A-Za-z]{1,8}){0,2}"),
                1..8,
            )
        ) {
            let raw: RawRecord = fields.iter().map(|(h, v)| (*h, json!(v))).collect();
            let once = preprocess(&raw, None);
            let twice = preprocess(&once.to_raw(), None);
            prop_assert_eq!(once, twice);
        }

        #[test]
        fn prop_aum_concatenation_preserves_order(
            parts in prop::collection::vec("[0-9]{1,3}(\\.[0-9]{2})?", 1..5),
            dollar in any::<bool>(),
        ) {
            let raw: RawRecord = parts
                .iter()
                .enumerate()
                .map(|(i, p)| {
                    let value = if i == 0 && dollar { format!("${p}") } else { p.clone() };
                    (format!("AUM{i}"), json!(value))
                })
                .collect();
            let out = preprocess(&raw, None);
            let expected = format!("{}{}", if dollar { "$" } else { "" }, parts.concat());
            prop_assert_eq!(out.get("aum"), Some(expected.as_str()));
        }
    }
}
