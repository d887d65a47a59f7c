//! Row normalizer: preprocessed keys → a `Contact` with per-field confidence.
//!
//! Every decision is appended to an ordered log. Rows missing required
//! fields still produce a `Contact`; the log carries an `ERROR:` entry and
//! `NormalizedRow::into_contact` turns that into a typed `RowError`.

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;
use url::Url;

use crate::config::EngineConfig;
use crate::model::{slugify, ConnectionEntry, Contact, PersonalConnections};
use crate::resolve::EntityResolver;
use super::aliases::{match_field, Field};
use super::infer::infer_field;
use super::preprocess::BACKFILL_KEY;
use super::{collapse_whitespace, title_case, CleanRecord, Provenance};

/// Confidence for values whose header matched a canonical field.
pub const HEADER_MATCH_CONFIDENCE: f64 = 0.9;
/// Confidence for values whose field was inferred from their shape.
pub const INFERRED_CONFIDENCE: f64 = 0.6;
/// Confidence for name/firm copied from the other field.
pub const BACKFILL_CONFIDENCE: f64 = 0.5;

const HONORIFICS: &[&str] = &["mr", "mrs", "ms", "miss", "mx", "dr", "prof", "sir"];
const NAME_SUFFIXES: &[&str] = &["jr", "sr", "ii", "iii", "iv", "phd", "md", "cfa", "cpa", "esq", "mba", "jd"];
const LEGAL_SUFFIXES: &[&str] = &["llc", "inc", "ltd", "lp", "llp"];

static EMAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}$").expect("static regex"));
static TWITTER_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_]{1,15}$").expect("static regex"));
static NEW_YORK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(new york city|nyc)\b").expect("static regex"));

// ============================================================================
// Output types
// ============================================================================

/// A row that failed validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RowError {
    #[error("missing required field(s): {}", .0.join(", "))]
    MissingRequired(Vec<&'static str>),
}

/// Normalizer output: the contact plus the ordered decision log.
#[derive(Debug, Clone)]
pub struct NormalizedRow {
    pub contact: Contact,
    pub log: Vec<String>,
}

impl NormalizedRow {
    pub fn confidence(&self) -> &std::collections::BTreeMap<String, f64> {
        &self.contact.confidence
    }

    pub fn missing_required(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.contact.name.is_none() {
            missing.push("name");
        }
        if self.contact.firm.is_none() {
            missing.push("firm");
        }
        missing
    }

    pub fn is_valid(&self) -> bool {
        self.missing_required().is_empty()
    }

    pub fn errors(&self) -> impl Iterator<Item = &str> {
        self.log.iter().filter(|l| l.starts_with("ERROR:")).map(String::as_str)
    }

    /// The contact, or why the caller should discard it.
    pub fn into_contact(self) -> Result<Contact, RowError> {
        let missing = self.missing_required();
        if missing.is_empty() {
            Ok(self.contact)
        } else {
            Err(RowError::MissingRequired(missing))
        }
    }
}

// ============================================================================
// RowNormalizer
// ============================================================================

pub struct RowNormalizer<'r> {
    header_threshold: f64,
    debug: bool,
    resolver: Option<&'r EntityResolver>,
}

impl RowNormalizer<'static> {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            header_threshold: config.header_similarity,
            debug: config.debug,
            resolver: None,
        }
    }
}

impl<'r> RowNormalizer<'r> {
    /// Pass name and firm through `resolver` after field normalization.
    pub fn with_resolver<'a>(self, resolver: &'a EntityResolver) -> RowNormalizer<'a> {
        RowNormalizer {
            header_threshold: self.header_threshold,
            debug: self.debug,
            resolver: Some(resolver),
        }
    }

    pub fn normalize(&self, record: &CleanRecord, provenance: &Provenance) -> NormalizedRow {
        let mut row = NormalizedRow { contact: Contact::new(provenance.to_source()), log: Vec::new() };

        let mirrored = match (record.get("name"), record.get("firm")) {
            (Some(n), Some(f)) => n.trim().eq_ignore_ascii_case(f.trim()),
            _ => false,
        };

        // 1. header matching
        let mut mapped: Vec<(Option<Field>, &str, &str)> = Vec::with_capacity(record.len());
        for (key, value) in record.iter() {
            if key.starts_with("source_") {
                continue;
            }
            match match_field(key, self.header_threshold) {
                Some((field, sim)) => {
                    self.decide(&mut row, format!("header '{key}' -> {} (similarity {sim:.2})", field.key()));
                    mapped.push((Some(field), key, value));
                }
                None => mapped.push((None, key, value)),
            }
        }

        // 2. per-field normalization, or inference for unmatched keys
        for (field, key, value) in mapped {
            match field {
                Some(field) => self.apply(&mut row, field, value, HEADER_MATCH_CONFIDENCE),
                None => match infer_field(value) {
                    Some(rule) => {
                        self.decide(&mut row, format!("inferred {} from '{key}' ({})", rule.field.key(), rule.name));
                        self.apply(&mut row, rule.field, value, INFERRED_CONFIDENCE);
                    }
                    None => {
                        row.contact.append_note(format!("{key}: {value}"));
                        self.decide(&mut row, format!("kept '{key}' as a note"));
                    }
                },
            }
        }

        self.resolve_names(&mut row);

        // 3. fallback: one of name/firm stands in for the other
        let contact = &mut row.contact;
        let filled = match record.get(BACKFILL_KEY) {
            Some("firm") if contact.name.is_some() => Some("firm"),
            Some("name") if contact.firm.is_some() => Some("name"),
            _ if contact.name.is_none() && contact.firm.is_some() => Some("name"),
            _ if contact.firm.is_none() && contact.name.is_some() => Some("firm"),
            _ => None,
        };
        match filled {
            Some("firm") => contact.firm = contact.name.clone(),
            Some(_) => contact.name = contact.firm.clone(),
            None if mirrored && contact.firm.is_some() => contact.name = contact.firm.clone(),
            None => {}
        }
        if let Some(field) = filled {
            contact.confidence.insert(field.into(), BACKFILL_CONFIDENCE);
            contact.backfilled = Some(field.into());
            let rule = if field == "firm" { "firm := name" } else { "name := firm" };
            self.decide(&mut row, format!("fallback {rule}"));
        }

        // 4. required fields
        let missing = row.missing_required();
        if !missing.is_empty() {
            self.decide(&mut row, format!("ERROR: missing required field(s): {}", missing.join(", ")));
        }

        // 5. slug
        row.contact.firm_slug = row.contact.firm.as_deref().map(slugify).filter(|s| !s.is_empty());
        row
    }

    fn decide(&self, row: &mut NormalizedRow, decision: String) {
        if self.debug {
            debug!(decision = %decision, "normalizer");
        }
        row.log.push(decision);
    }

    fn apply(&self, row: &mut NormalizedRow, field: Field, value: &str, confidence: f64) {
        let value = value.trim();
        if value.is_empty() {
            return;
        }
        let contact = &mut row.contact;
        let accepted = match field {
            Field::Name => {
                contact.name = Some(normalize_person_name(value)).filter(|s| !s.is_empty());
                contact.name.is_some()
            }
            Field::Firm => {
                contact.firm = Some(normalize_firm_name(value)).filter(|s| !s.is_empty());
                contact.firm.is_some()
            }
            Field::Email => match normalize_email(value) {
                Some(email) => {
                    contact.email = Some(email);
                    true
                }
                None => {
                    contact.append_note(format!("Possible email: {value}"));
                    false
                }
            },
            Field::Linkedin => match normalize_url(value).filter(|u| u.contains("linkedin.com")) {
                Some(url) => {
                    contact.linkedin_url = Some(url);
                    true
                }
                None => {
                    contact.append_note(format!("Possible LinkedIn: {value}"));
                    false
                }
            },
            Field::Website => match normalize_url(value) {
                Some(url) => {
                    contact.website = Some(url);
                    true
                }
                None => {
                    contact.append_note(format!("Possible website: {value}"));
                    false
                }
            },
            Field::Twitter => match normalize_twitter(value) {
                Some(handle) => {
                    contact.twitter_handle = Some(handle);
                    true
                }
                None => {
                    contact.append_note(format!("Possible Twitter: {value}"));
                    false
                }
            },
            Field::Location => {
                contact.location = Some(normalize_location(value));
                true
            }
            Field::Notes => {
                contact.append_note(value);
                true
            }
            Field::PersonalConnections => {
                contact.personal_connections = Some(parse_connections(value));
                true
            }
            Field::Aum => {
                contact.assets_under_management = Some(value.to_string());
                true
            }
            Field::Role => {
                contact.role = Some(value.to_string());
                true
            }
            Field::School => {
                contact.school = Some(value.to_string());
                true
            }
            Field::Degree => {
                contact.degree = Some(value.to_string());
                true
            }
            Field::Interests => {
                contact.interests = Some(value.to_string());
                true
            }
            Field::JobHistory => {
                contact.job_history = Some(value.to_string());
                true
            }
            Field::Education => {
                contact.education_history = Some(value.to_string());
                true
            }
        };

        if accepted {
            contact.confidence.insert(field.key().to_string(), confidence);
        } else {
            self.decide(row, format!("demoted {} to notes", field.key()));
        }
    }

    fn resolve_names(&self, row: &mut NormalizedRow) {
        let Some(resolver) = self.resolver else { return };
        for field in [Field::Name, Field::Firm] {
            let slot = match field {
                Field::Name => &mut row.contact.name,
                _ => &mut row.contact.firm,
            };
            let Some(current) = slot.clone() else { continue };
            let resolution = resolver.resolve(&current);
            if resolution.resolved_name != current {
                *slot = Some(resolution.resolved_name.clone());
                self.decide(row, format!("resolved {} '{current}' -> '{}'", field.key(), resolution.resolved_name));
            }
        }
    }
}

// ============================================================================
// Field normalizers
// ============================================================================

/// Strip honorifics, generational/professional suffixes and middle
/// initials, then title-case.
pub fn normalize_person_name(raw: &str) -> String {
    let cleaned = collapse_whitespace(&raw.replace(',', " "));
    let mut tokens: Vec<&str> = cleaned.split(' ').filter(|t| !t.is_empty()).collect();
    let bare = |t: &str| t.trim_matches('.').to_lowercase();

    while tokens.len() > 1 && HONORIFICS.contains(&bare(tokens[0]).as_str()) {
        tokens.remove(0);
    }
    while tokens.len() > 1 && tokens.last().is_some_and(|t| NAME_SUFFIXES.contains(&bare(t).as_str())) {
        tokens.pop();
    }
    if tokens.len() > 2 {
        let last = tokens.len() - 1;
        let mut i = 1;
        while i < last.min(tokens.len() - 1) {
            if bare(tokens[i]).chars().count() == 1 {
                tokens.remove(i);
            } else {
                i += 1;
            }
        }
    }
    title_case(&tokens.join(" "))
}

/// Title-case, keep acronyms, upper-case legal suffixes.
pub fn normalize_firm_name(raw: &str) -> String {
    collapse_whitespace(raw)
        .split(' ')
        .map(|token| {
            let trailing_comma = token.ends_with(',');
            let core = token.trim_end_matches(',');
            let bare = core.trim_end_matches('.').to_lowercase();
            let word = if LEGAL_SUFFIXES.contains(&bare.as_str()) {
                bare.to_uppercase()
            } else if core.chars().count() >= 2 && core.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '&') {
                core.to_string()
            } else {
                title_case(core)
            };
            if trailing_comma { format!("{word},") } else { word }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn normalize_email(raw: &str) -> Option<String> {
    let email = raw.trim().trim_start_matches("mailto:").to_lowercase();
    EMAIL.is_match(&email).then_some(email)
}

/// Absolute `https://` URL without a trailing slash, or `None` when the
/// value does not survive parsing.
pub fn normalize_url(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() || raw.contains(char::is_whitespace) {
        return None;
    }
    let with_scheme = match raw.split_once("://") {
        Some((scheme, rest)) if scheme.eq_ignore_ascii_case("http") || scheme.eq_ignore_ascii_case("https") => {
            format!("https://{rest}")
        }
        Some(_) => return None,
        None => format!("https://{raw}"),
    };
    let url = Url::parse(&with_scheme).ok()?;
    let host = url.host_str()?;
    if !host.contains('.') {
        return None;
    }
    Some(url.as_str().trim_end_matches('/').to_string())
}

/// `@handle` from a handle or a twitter.com / x.com profile URL.
pub fn normalize_twitter(raw: &str) -> Option<String> {
    let raw = raw.trim();
    let from_url = twitter_url_handle(raw);
    let handle = from_url.as_deref().unwrap_or(raw).trim_start_matches('@');
    TWITTER_NAME.is_match(handle).then(|| format!("@{handle}"))
}

/// Last path segment of a URL whose host is twitter.com or x.com.
fn twitter_url_handle(raw: &str) -> Option<String> {
    if !raw.contains('/') {
        return None;
    }
    let with_scheme = if raw.contains("://") { raw.to_string() } else { format!("https://{raw}") };
    let url = Url::parse(&with_scheme).ok()?;
    let host = url.host_str()?;
    let host = host.strip_prefix("www.").or_else(|| host.strip_prefix("mobile.")).unwrap_or(host);
    if host != "twitter.com" && host != "x.com" {
        return None;
    }
    url.path_segments()?.filter(|s| !s.is_empty()).next_back().map(str::to_string)
}

/// Lower-cased, with New York City spellings collapsed to `new york`.
pub fn normalize_location(raw: &str) -> String {
    let lower = collapse_whitespace(raw).to_lowercase();
    NEW_YORK.replace_all(&lower, "new york").into_owned()
}

fn parse_connections(raw: &str) -> PersonalConnections {
    if raw.starts_with('[') {
        if let Ok(entries) = serde_json::from_str::<Vec<ConnectionEntry>>(raw) {
            return PersonalConnections::List(entries);
        }
    }
    PersonalConnections::Text(raw.to_string())
}
