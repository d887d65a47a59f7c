//! Engine configuration.
//!
//! This crate has no CLI; hosts build an `EngineConfig` in code or parse it
//! from JSON. Missing keys take their defaults.

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Weights of the four path-level scoring factors.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ScoringWeights {
    pub path_length: f64,
    pub connection_type: f64,
    pub connection_strength: f64,
    pub mutual_ties: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            path_length: 0.4,
            connection_type: 0.3,
            connection_strength: 0.2,
            mutual_ties: 0.1,
        }
    }
}

impl ScoringWeights {
    pub fn total(&self) -> f64 {
        self.path_length + self.connection_type + self.connection_strength + self.mutual_ties
    }
}

/// Configuration consumed by the resolver, constructor, and path finder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    /// Entity-match threshold for name similarity.
    pub min_similarity: f64,
    /// Header-match threshold used by the row normalizer.
    pub header_similarity: f64,
    /// Upper bound on hops for path search.
    pub max_hops: usize,
    /// Upper bound on paths returned per query.
    pub path_limit: usize,
    pub weights: ScoringWeights,
    /// Resolution cache capacity (entries).
    pub cache_capacity: usize,
    /// Verbose per-decision logging.
    pub debug: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            min_similarity: 0.85,
            header_similarity: 0.8,
            max_hops: 4,
            path_limit: 10,
            weights: ScoringWeights::default(),
            cache_capacity: 1000,
            debug: false,
        }
    }
}

/// Lowest threshold accepted for loose header matching.
pub const MIN_HEADER_SIMILARITY: f64 = 0.45;

impl EngineConfig {
    /// Parse from JSON and validate.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: EngineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.min_similarity) {
            return Err(Error::Config(format!(
                "minSimilarity must be within [0, 1], got {}",
                self.min_similarity
            )));
        }
        if !(MIN_HEADER_SIMILARITY..=1.0).contains(&self.header_similarity) {
            return Err(Error::Config(format!(
                "headerSimilarity must be within [{MIN_HEADER_SIMILARITY}, 1], got {}",
                self.header_similarity
            )));
        }
        if self.max_hops == 0 {
            return Err(Error::Config("maxHops must be at least 1".into()));
        }
        if self.path_limit == 0 {
            return Err(Error::Config("pathLimit must be at least 1".into()));
        }
        if self.cache_capacity == 0 {
            return Err(Error::Config("cacheCapacity must be at least 1".into()));
        }
        let w = &self.weights;
        if [w.path_length, w.connection_type, w.connection_strength, w.mutual_ties]
            .iter()
            .any(|v| !v.is_finite() || *v < 0.0)
        {
            return Err(Error::Config("scoring weights must be finite and non-negative".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.min_similarity, 0.85);
        assert_eq!(config.max_hops, 4);
        assert_eq!(config.cache_capacity, 1000);
        assert!((config.weights.total() - 1.0).abs() < 1e-9);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_takes_defaults() {
        let config = EngineConfig::from_json_str(r#"{"maxHops": 3, "weights": {"mutualTies": 0.2}}"#).unwrap();
        assert_eq!(config.max_hops, 3);
        assert_eq!(config.weights.mutual_ties, 0.2);
        assert_eq!(config.weights.path_length, 0.4);
        assert_eq!(config.min_similarity, 0.85);
    }

    #[test]
    fn test_rejects_out_of_range() {
        assert!(matches!(
            EngineConfig::from_json_str(r#"{"minSimilarity": 1.5}"#),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            EngineConfig::from_json_str(r#"{"headerSimilarity": 0.3}"#),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            EngineConfig::from_json_str(r#"{"maxHops": 0}"#),
            Err(Error::Config(_))
        ));
        assert!(EngineConfig::from_json_str(r#"{"headerSimilarity": 0.45}"#).is_ok());
    }
}
