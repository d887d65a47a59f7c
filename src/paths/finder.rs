//! Path finder: seed → target paths from the store, scored and normalized.

use serde::Serialize;
use tracing::{debug, info};

use crate::config::EngineConfig;
use crate::model::{GraphNode, Label, NodeId, Path, PathElement};
use crate::resolve::EntityResolver;
use crate::storage::GraphStore;
use crate::Result;

use super::scorer::PathScorer;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PathMetadata {
    pub path_length: usize,
    pub connection_types: Vec<String>,
    pub mutual_ties: Vec<String>,
}

/// One ranked introduction path.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoredPath {
    /// `[Node, Edge, Node, ..., Node]`, seed first.
    pub path: Vec<PathElement>,
    pub score: f64,
    pub normalized_score: f64,
    pub metadata: PathMetadata,
}

pub struct PathFinder<'a, S: GraphStore> {
    store: &'a S,
    scorer: PathScorer,
    max_hops: usize,
    limit: usize,
    min_similarity: f64,
    debug: bool,
}

impl<'a, S: GraphStore> PathFinder<'a, S> {
    pub fn new(store: &'a S, config: &EngineConfig) -> Self {
        Self {
            store,
            scorer: PathScorer::from_config(config),
            max_hops: config.max_hops,
            limit: config.path_limit,
            min_similarity: config.min_similarity,
            debug: config.debug,
        }
    }

    pub fn with_scorer(mut self, scorer: PathScorer) -> Self {
        self.scorer = scorer;
        self
    }

    /// Top paths from any seed to `target`, in store order.
    ///
    /// Shortest paths first; when there are none, any path within the hop
    /// bound. A missing target is `Error::NotFound`.
    pub async fn find_paths(&self, target: &NodeId) -> Result<Vec<ScoredPath>> {
        let mut paths = self.store.find_shortest_paths(target, self.max_hops, self.limit).await?;
        if paths.is_empty() {
            if self.debug {
                debug!(target = %target, "no shortest paths, falling back to all paths");
            }
            paths = self.store.find_all_paths(target, self.max_hops, self.limit).await?;
        }
        let scored = self.score_paths(paths);
        info!(target = %target, paths = scored.len(), "paths found");
        Ok(scored)
    }

    /// Score and normalize, preserving input order.
    pub fn score_paths(&self, paths: Vec<Path>) -> Vec<ScoredPath> {
        let mut scored: Vec<ScoredPath> = paths
            .into_iter()
            .map(|path| {
                let factors = self.scorer.factors(&path);
                let metadata = PathMetadata {
                    path_length: path.len(),
                    connection_types: path.relationships.iter().map(|r| r.rel_type.as_str().to_string()).collect(),
                    mutual_ties: factors.tie_names,
                };
                ScoredPath { path: path.into(), score: factors.total, normalized_score: 0.0, metadata }
            })
            .collect();
        normalize_scores(&mut scored);
        scored
    }

    /// Find the node a free-text target name refers to.
    ///
    /// Exact `name` match on persons then firms, then the same for the
    /// resolved name, then the most similar person or firm at or above the
    /// similarity threshold.
    pub async fn resolve_target(&self, name: &str, resolver: &EntityResolver) -> Result<Option<GraphNode>> {
        let name = name.trim();
        let resolved = resolver.resolve_name(name);
        for candidate in [name, resolved.as_str()] {
            for label in [Label::Person, Label::Firm] {
                if let Some(node) = self.store.find_node_by_property(label, "name", candidate).await? {
                    return Ok(Some(node));
                }
            }
        }

        let mut best: Option<(f64, GraphNode)> = None;
        for label in [Label::Person, Label::Firm] {
            for node in self.store.nodes_by_label(label).await? {
                let sim = resolver.similarity(name, node.name());
                if sim >= self.min_similarity && best.as_ref().is_none_or(|(b, _)| sim > *b) {
                    best = Some((sim, node));
                }
            }
        }
        if self.debug {
            if let Some((sim, node)) = &best {
                debug!(query = name, node = %node.id, similarity = sim, "fuzzy target match");
            }
        }
        Ok(best.map(|(_, node)| node))
    }
}

/// Rescale scores to [0, 1] by the batch min and max. All-equal batches
/// normalize to 1.
pub fn normalize_scores(paths: &mut [ScoredPath]) {
    let (min, max) = paths
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), p| (lo.min(p.score), hi.max(p.score)));
    let range = max - min;
    for p in paths.iter_mut() {
        p.normalized_score = if range > f64::EPSILON { (p.score - min) / range } else { 1.0 };
    }
}

/// Sort by normalized score, best first. Ties keep their order.
pub fn rank(paths: &mut [ScoredPath]) {
    paths.sort_by(|a, b| b.normalized_score.total_cmp(&a.normalized_score));
}
