//! Path scoring.
//!
//! Two scorers share one philosophy: shorter, stronger, more direct
//! relationships score higher, and mutual connections are a bonus.
//!
//! - `PathScorer` combines four path-level factors as a weighted sum.
//! - `SegmentScorer` scores each hop from its relationship type, node and
//!   source confidence, and recency, then averages over the path.

use chrono::{Datelike, NaiveDate, Utc};
use serde::Serialize;

use crate::config::{EngineConfig, ScoringWeights};
use crate::model::{GraphNode, GraphRelationship, Label, Path, RelType};

/// Bonus to a hop's strength when it runs through a mutual connection.
const MUTUAL_STRENGTH_BOOST: f64 = 0.3;
/// Bonus to connection-type and mutual-ties when a mutual is involved.
const MUTUAL_BONUS: f64 = 0.2;
/// Nodes sharing the target's firm needed for a full mutual-ties score.
const TIES_FOR_FULL_SCORE: f64 = 3.0;

// ============================================================================
// Path-level scorer
// ============================================================================

/// The four path-level factors and their weighted sum.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PathFactors {
    pub path_length: f64,
    pub connection_type: f64,
    pub connection_strength: f64,
    pub mutual_ties: f64,
    pub total: f64,
    /// Names of the nodes counted as ties.
    #[serde(skip)]
    pub tie_names: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PathScorer {
    weights: ScoringWeights,
    max_hops: usize,
}

impl PathScorer {
    pub fn new(weights: ScoringWeights, max_hops: usize) -> Self {
        Self { weights, max_hops: max_hops.max(1) }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.weights, config.max_hops)
    }

    pub fn score(&self, path: &Path) -> f64 {
        self.factors(path).total
    }

    pub fn factors(&self, path: &Path) -> PathFactors {
        if path.is_empty() {
            return PathFactors::default();
        }
        let hops = path.len();
        let any_mutual_hop = path.relationships.iter().any(|r| r.rel_type.is_mutual());

        let path_length = (1.0 - hops as f64 / self.max_hops as f64).max(0.0);

        let connection_type = {
            let base = if hops == 1 { 1.0 } else { 0.5 };
            let bonus = if any_mutual_hop { MUTUAL_BONUS } else { 0.0 };
            (base + bonus).min(1.0)
        };

        let connection_strength = path
            .relationships
            .iter()
            .map(|r| {
                let strength = r.properties.strength.or(r.properties.weight).unwrap_or(0.0);
                let boost = if r.rel_type.is_mutual() { MUTUAL_STRENGTH_BOOST } else { 0.0 };
                (strength + boost).min(1.0)
            })
            .sum::<f64>()
            / hops as f64;

        let tie_names = ties(path);
        let any_mutual_node = path.nodes.iter().any(|n| n.properties.is_mutual_connection());
        let mutual_ties = {
            let base = (tie_names.len() as f64 / TIES_FOR_FULL_SCORE).min(1.0);
            let bonus = if any_mutual_node { MUTUAL_BONUS } else { 0.0 };
            (base + bonus).min(1.0)
        };

        let w = &self.weights;
        let total = w.path_length * path_length
            + w.connection_type * connection_type
            + w.connection_strength * connection_strength
            + w.mutual_ties * mutual_ties;

        PathFactors { path_length, connection_type, connection_strength, mutual_ties, total, tie_names }
    }
}

/// Firm a node belongs to: its `firm` property, or its own name for firms.
fn firm_of(node: &GraphNode) -> Option<&str> {
    node.properties
        .firm
        .as_deref()
        .or_else(|| node.has_label(Label::Firm).then(|| node.name()))
}

/// Nodes other than the target that share its firm or are mutual connections.
fn ties(path: &Path) -> Vec<String> {
    let Some((target, rest)) = path.nodes.split_last() else {
        return Vec::new();
    };
    let target_firm = firm_of(target);
    rest.iter()
        .filter(|n| {
            n.properties.is_mutual_connection()
                || target_firm.is_some_and(|tf| firm_of(n).is_some_and(|f| f.eq_ignore_ascii_case(tf)))
        })
        .map(|n| n.name().to_string())
        .collect()
}

// ============================================================================
// Segment-level scorer
// ============================================================================

/// Per-hop diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SegmentScore {
    pub rel_type: String,
    pub base: f64,
    pub node_confidence: f64,
    pub source_confidence: f64,
    pub recency: f64,
    pub score: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentScorer {
    today: NaiveDate,
}

impl Default for SegmentScorer {
    fn default() -> Self {
        Self::at(Utc::now().date_naive())
    }
}

impl SegmentScorer {
    /// Scorer that judges recency relative to `today`.
    pub fn at(today: NaiveDate) -> Self {
        Self { today }
    }

    pub fn base_weight(rel_type: &RelType) -> f64 {
        match rel_type {
            RelType::WorkedAt => 1.0,
            RelType::Founded => 0.95,
            RelType::BoardMember => 0.9,
            RelType::Knows => 0.85,
            RelType::InvestedIn => 0.8,
            RelType::AttendedSchool => 0.7,
            RelType::ConnectedViaMutual | RelType::Other(_) => 0.5,
        }
    }

    /// Score one hop: `node` is the node `rel` leads into.
    pub fn score_segment(&self, node: &GraphNode, rel: &GraphRelationship) -> SegmentScore {
        let base = Self::base_weight(&rel.rel_type);
        let node_confidence = node.properties.confidence.unwrap_or(1.0);
        let source_confidence = rel.properties.confidence.unwrap_or(1.0);
        let recency = self.recency(rel);
        SegmentScore {
            rel_type: rel.rel_type.as_str().to_string(),
            base,
            node_confidence,
            source_confidence,
            recency,
            score: base * node_confidence * source_confidence * recency,
        }
    }

    pub fn explain(&self, path: &Path) -> Vec<SegmentScore> {
        path.segments().map(|(node, rel)| self.score_segment(node, rel)).collect()
    }

    /// Mean segment score; 0 for an empty path.
    pub fn score(&self, path: &Path) -> f64 {
        let segments = self.explain(path);
        if segments.is_empty() {
            return 0.0;
        }
        segments.iter().map(|s| s.score).sum::<f64>() / segments.len() as f64
    }

    fn recency(&self, rel: &GraphRelationship) -> f64 {
        if rel.properties.is_current == Some(true) {
            return 1.2;
        }
        let ended = rel.properties.end.as_deref().and_then(parse_period_end);
        match ended {
            Some(end) if end <= self.today && self.today.year() - end.year() <= 2 => 1.1,
            _ => 1.0,
        }
    }
}

/// `YYYY-MM-DD`, `YYYY-MM` (first of month) or `YYYY` (last day of year).
fn parse_period_end(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .or_else(|| NaiveDate::parse_from_str(&format!("{s}-01"), "%Y-%m-%d").ok())
        .or_else(|| s.parse::<i32>().ok().and_then(|y| NaiveDate::from_ymd_opt(y, 12, 31)))
}
