//! Field inference from the shape of a value.
//!
//! An ordered rule table, evaluated top to bottom, first match wins. New
//! shapes are new rows, not new branches.

use std::sync::LazyLock;

use regex::Regex;

use super::aliases::Field;

macro_rules! static_regex {
    ($name:ident, $pattern:expr) => {
        static $name: LazyLock<Regex> =
            LazyLock::new(|| Regex::new($pattern).expect("static regex"));
    };
}

static_regex!(URL, r"(?i)^(https?://|www\.)\S+$");
static_regex!(LINKEDIN_URL, r"(?i)linkedin\.com/");
static_regex!(TWITTER_URL, r"(?i)^(https?://)?(www\.)?(twitter|x)\.com/[A-Za-z0-9_]{1,15}/?$");
static_regex!(TWITTER_HANDLE, r"^@[A-Za-z0-9_]{1,15}$");
static_regex!(EMAIL, r"^[^\s@]+@[^\s@]+\.[^\s@]+$");
static_regex!(CITY_STATE, r"^[A-Z][A-Za-z .'-]+,\s*[A-Z]{2}$");
static_regex!(CURRENCY, r"(?i)^([$€£¥]\s?[\d,.]+\s?(k|m|mm|b|bn|million|billion)?|[\d,.]+\s?(k|m|mm|b|bn|million|billion)\b.*)$");
static_regex!(CONNECTION, r"(?i)\b(knows|met|introduced|intro|connected|worked with|friend|mutual|classmate|colleague)\b");

/// Cities frequently seen in LP/GP records.
const KNOWN_CITIES: &[&str] = &[
    "new york", "nyc", "san francisco", "boston", "chicago", "los angeles", "london", "menlo park",
    "palo alto", "greenwich", "dallas", "houston", "austin", "miami", "seattle", "toronto",
    "hong kong", "singapore", "tokyo", "paris", "zurich", "geneva", "dubai", "washington",
];

/// Free text at least this long is treated as notes.
const NOTES_MIN_LEN: usize = 80;

/// One inference rule: a predicate over the value and the field it implies.
pub struct InferenceRule {
    pub name: &'static str,
    pub field: Field,
    pub matches: fn(&str) -> bool,
}

fn is_linkedin(v: &str) -> bool {
    URL.is_match(v) && LINKEDIN_URL.is_match(v)
}

fn is_twitter(v: &str) -> bool {
    TWITTER_URL.is_match(v) || TWITTER_HANDLE.is_match(v)
}

fn is_website(v: &str) -> bool {
    URL.is_match(v)
}

fn is_email(v: &str) -> bool {
    EMAIL.is_match(v)
}

fn is_location(v: &str) -> bool {
    let lower = v.trim().to_lowercase();
    KNOWN_CITIES.contains(&lower.as_str()) || CITY_STATE.is_match(v.trim())
}

fn is_currency(v: &str) -> bool {
    CURRENCY.is_match(v.trim())
}

fn is_connection(v: &str) -> bool {
    CONNECTION.is_match(v)
}

fn is_long_text(v: &str) -> bool {
    v.chars().count() >= NOTES_MIN_LEN && v.contains(' ')
}

/// The rule table, in priority order.
pub static INFERENCE_RULES: &[InferenceRule] = &[
    InferenceRule { name: "linkedin-url", field: Field::Linkedin, matches: is_linkedin },
    InferenceRule { name: "twitter", field: Field::Twitter, matches: is_twitter },
    InferenceRule { name: "url", field: Field::Website, matches: is_website },
    InferenceRule { name: "email", field: Field::Email, matches: is_email },
    InferenceRule { name: "location", field: Field::Location, matches: is_location },
    InferenceRule { name: "currency", field: Field::Aum, matches: is_currency },
    InferenceRule { name: "connection", field: Field::PersonalConnections, matches: is_connection },
    InferenceRule { name: "long-text", field: Field::Notes, matches: is_long_text },
];

/// First rule whose predicate accepts `value`.
pub fn infer_field(value: &str) -> Option<&'static InferenceRule> {
    INFERENCE_RULES.iter().find(|rule| (rule.matches)(value))
}
