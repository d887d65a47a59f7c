//! # Entity resolver
//!
//! Canonicalizes free-text person and firm names into a stable display
//! name, backed by a bounded cache keyed on a hash of the normalized form.
//! The resolver is an explicit service: construct one, share it by
//! reference. The cache sits behind a `parking_lot::Mutex` so the resolver
//! is `Send + Sync`.

mod cache;

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, LazyLock};

use parking_lot::Mutex;
use regex::Regex;
use serde::Serialize;
use tracing::debug;

use crate::config::EngineConfig;
use crate::ingest::collapse_whitespace;

pub use cache::{cache_key, CacheKey, ResolutionCache};

/// Suffixes stripped from the end of a name before keying and comparison.
const FIRM_SUFFIXES: &[&str] = &[
    "llc", "inc", "incorporated", "ltd", "limited", "lp", "llp", "corp", "corporation", "co",
    "capital", "partners", "ventures", "fund", "funds", "management", "advisors", "advisers",
    "group", "holdings", "investments", "associates",
];

/// Inputs whose normalized form is shorter than this are returned as-is.
const MIN_RESOLVABLE_LEN: usize = 3;
/// Spellings remembered per cache entry.
const MAX_VARIANTS: usize = 16;

static ACRONYM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9]{2,6}$").expect("static regex"));
static INITIAL_LASTNAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z]\.\s*[A-Z][A-Za-z'-]+$").expect("static regex"));
static FIRST_MIDDLE_LAST: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z][A-Za-z'-]+\s+[A-Z]\.\s+[A-Z][A-Za-z'-]+$").expect("static regex"));

// ============================================================================
// Resolution
// ============================================================================

/// Which pattern rule classified a name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NamePattern {
    Acronym,
    InitialLastname,
    FirstMiddleLast,
    Plain,
}

impl NamePattern {
    pub fn confidence(self) -> f64 {
        match self {
            NamePattern::Acronym => 0.9,
            NamePattern::InitialLastname => 0.8,
            NamePattern::FirstMiddleLast => 0.95,
            NamePattern::Plain => 1.0,
        }
    }

    /// First matching rule, in priority order.
    pub fn classify(name: &str) -> Self {
        if ACRONYM.is_match(name) {
            let upper = name.chars().filter(char::is_ascii_uppercase).count();
            if upper >= 2 || name.chars().any(|c| c.is_ascii_digit()) {
                return NamePattern::Acronym;
            }
        }
        if INITIAL_LASTNAME.is_match(name) {
            NamePattern::InitialLastname
        } else if FIRST_MIDDLE_LAST.is_match(name) {
            NamePattern::FirstMiddleLast
        } else {
            NamePattern::Plain
        }
    }
}

/// A cached resolution.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Resolution {
    pub resolved_name: String,
    pub confidence: f64,
    /// Every distinct input seen for this key, first one first.
    pub variants: Vec<String>,
    pub pattern: NamePattern,
    /// True when an `AliasSource` supplied `resolved_name`.
    pub aliased: bool,
}

impl Resolution {
    pub(crate) fn plain(name: &str) -> Self {
        Self {
            resolved_name: name.to_string(),
            confidence: 1.0,
            variants: vec![name.to_string()],
            pattern: NamePattern::Plain,
            aliased: false,
        }
    }
}

// ============================================================================
// AliasSource
// ============================================================================

/// External alias lookup consulted after pattern classification.
///
/// Implementations receive the normalized key and the cleaned input and
/// return the canonical display name, if they know one.
pub trait AliasSource: Send + Sync {
    fn lookup(&self, normalized: &str, input: &str) -> Option<String>;
}

/// Map-backed alias table. Keys are normalized on insert.
#[derive(Debug, Clone, Default)]
pub struct StaticAliases {
    aliases: BTreeMap<String, String>,
}

impl StaticAliases {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_alias(mut self, alias: &str, canonical: impl Into<String>) -> Self {
        self.insert(alias, canonical);
        self
    }

    pub fn insert(&mut self, alias: &str, canonical: impl Into<String>) {
        self.aliases.insert(normalize_key(alias), canonical.into());
    }

    pub fn len(&self) -> usize {
        self.aliases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.aliases.is_empty()
    }
}

impl AliasSource for StaticAliases {
    fn lookup(&self, normalized: &str, _input: &str) -> Option<String> {
        self.aliases.get(normalized).cloned()
    }
}

// ============================================================================
// EntityResolver
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub len: usize,
    pub capacity: usize,
}

pub struct EntityResolver {
    cache: Mutex<ResolutionCache>,
    aliases: Option<Arc<dyn AliasSource>>,
    min_similarity: f64,
    debug: bool,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl std::fmt::Debug for EntityResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityResolver")
            .field("min_similarity", &self.min_similarity)
            .field("aliases", &self.aliases.is_some())
            .field("stats", &self.cache_stats())
            .finish()
    }
}

impl EntityResolver {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            cache: Mutex::new(ResolutionCache::new(config.cache_capacity)),
            aliases: None,
            min_similarity: config.min_similarity,
            debug: config.debug,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn with_alias_source(mut self, source: Arc<dyn AliasSource>) -> Self {
        self.aliases = Some(source);
        self
    }

    pub fn min_similarity(&self) -> f64 {
        self.min_similarity
    }

    /// Resolve a free-text name. Deterministic; repeated inputs hit the cache.
    pub fn resolve(&self, name: &str) -> Resolution {
        let input = collapse_whitespace(name);
        let normalized = normalize_key(&input);
        if normalized.chars().count() < MIN_RESOLVABLE_LEN {
            return Resolution::plain(&input);
        }

        let key = cache_key(&normalized);
        let mut cache = self.cache.lock();
        if let Some(entry) = cache.get_mut(&key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            if entry.variants.len() < MAX_VARIANTS && !entry.variants.contains(&input) {
                entry.variants.push(input);
            }
            return entry.clone();
        }
        self.misses.fetch_add(1, Ordering::Relaxed);

        let pattern = NamePattern::classify(&input);
        let alias = self.aliases.as_ref().and_then(|source| source.lookup(&normalized, &input));
        let resolution = Resolution {
            resolved_name: alias.clone().unwrap_or_else(|| input.clone()),
            confidence: pattern.confidence(),
            variants: vec![input.clone()],
            pattern,
            aliased: alias.is_some(),
        };
        if self.debug {
            debug!(
                input = %input,
                resolved = %resolution.resolved_name,
                pattern = ?pattern,
                confidence = resolution.confidence,
                "resolved entity name"
            );
        }
        if let Some(evicted) = cache.insert(key, resolution.clone()) {
            if self.debug {
                debug!(evicted = %evicted.resolved_name, "resolution cache full, evicted oldest");
            }
        }
        resolution
    }

    pub fn resolve_name(&self, name: &str) -> String {
        self.resolve(name).resolved_name
    }

    /// Symmetric similarity in [0, 1] over normalized forms.
    pub fn similarity(&self, a: &str, b: &str) -> f64 {
        name_similarity(a, b)
    }

    pub fn is_match(&self, a: &str, b: &str) -> bool {
        name_similarity(a, b) >= self.min_similarity
    }

    pub fn cache_stats(&self) -> CacheStats {
        let cache = self.cache.lock();
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            len: cache.len(),
            capacity: cache.capacity(),
        }
    }

    pub fn clear_cache(&self) {
        self.cache.lock().clear();
    }
}

// ============================================================================
// Normalization and similarity
// ============================================================================

/// Lower-case, drop punctuation, collapse whitespace, then strip trailing
/// firm-type suffixes. Falls back to the unstripped form when stripping
/// would leave nothing.
pub fn normalize_key(name: &str) -> String {
    let lowered: String = name
        .to_lowercase()
        .chars()
        .filter_map(|c| match c {
            c if c.is_alphanumeric() || c.is_whitespace() => Some(c),
            '-' | '/' | '_' => Some(' '),
            _ => None,
        })
        .collect();
    let collapsed = collapse_whitespace(&lowered);

    let mut words: Vec<&str> = collapsed.split(' ').filter(|w| !w.is_empty()).collect();
    while words.len() > 1 && words.last().is_some_and(|w| FIRM_SUFFIXES.contains(w)) {
        words.pop();
    }
    if words.is_empty() { collapsed } else { words.join(" ") }
}

/// Sørensen-Dice over bigrams of the normalized forms.
pub fn name_similarity(a: &str, b: &str) -> f64 {
    let (a, b) = (normalize_key(a), normalize_key(b));
    if a == b {
        return if a.is_empty() { 0.0 } else { 1.0 };
    }
    strsim::sorensen_dice(&a, &b)
}
