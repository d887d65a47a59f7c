//! End-to-end tests for path finding and scoring.
//!
//! Builds a small introduction graph through the public pipeline, marks a
//! seed, and checks the scored paths the finder returns.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use intro_graph::paths::{rank, SegmentScorer};
use intro_graph::{
    EngineConfig, GraphNode, GraphRelationship, GraphStore, IntroGraph, Label, MemoryStore,
    MutualConnection, MutualSource, NodeId, Path, PathElement, PathFinder, Properties, Provenance,
    RawRecord, RelType, Result,
};
use pretty_assertions::assert_eq;
use serde_json::json;

// ============================================================================
// Helpers
// ============================================================================

/// Sam (seed) knows Mia, who worked with Tess; Max is a mutual of Sam and Tess.
async fn setup_network() -> IntroGraph<MemoryStore> {
    let graph = IntroGraph::open_memory();
    let rows = [
        RawRecord::new()
            .with("Name", json!("Sam Seed"))
            .with("Company", json!("Acme Capital"))
            .with("Personal Connections", json!("Co-invested with Mia Mid, 6 mutual")),
        RawRecord::new()
            .with("Name", json!("Mia Mid"))
            .with("Company", json!("Blue Ridge"))
            .with("Personal Connections", json!("Worked with Tess Target")),
        RawRecord::new()
            .with("Name", json!("Tess Target"))
            .with("Company", json!("Zenith Partners"))
            .with("LinkedIn", json!("linkedin.com/in/tess")),
    ];
    let report = graph.ingest(&rows, &Provenance::new("csv")).await.unwrap();
    assert_eq!(report.rows_imported, 3);

    graph.mark_seed("Sam Seed").await.unwrap();
    let mutual = MutualConnection::new("Max Mutual", MutualSource::Api)
        .with_seed("Sam Seed")
        .with_target("https://linkedin.com/in/tess");
    graph.ingest_mutual_connections(&[mutual]).await.unwrap();
    graph
}

fn node_names(path: &[PathElement]) -> Vec<String> {
    path.iter()
        .filter_map(|e| match e {
            PathElement::Node(n) => Some(n.name().to_string()),
            PathElement::Edge(_) => None,
        })
        .collect()
}

/// A store whose shortest-path primitive never finds anything.
struct NoShortestPaths {
    inner: MemoryStore,
    all_paths_calls: AtomicUsize,
}

#[async_trait]
impl GraphStore for NoShortestPaths {
    async fn create_or_update_node(&self, labels: &[Label], properties: Properties) -> Result<GraphNode> {
        self.inner.create_or_update_node(labels, properties).await
    }

    async fn create_or_update_relationship(
        &self,
        from: &NodeId,
        to: &NodeId,
        rel_type: RelType,
        properties: Properties,
    ) -> Result<GraphRelationship> {
        self.inner.create_or_update_relationship(from, to, rel_type, properties).await
    }

    async fn find_node_by_property(&self, label: Label, property: &str, value: &str) -> Result<Option<GraphNode>> {
        self.inner.find_node_by_property(label, property, value).await
    }

    async fn get_node(&self, id: &NodeId) -> Result<Option<GraphNode>> {
        self.inner.get_node(id).await
    }

    async fn nodes_by_label(&self, label: Label) -> Result<Vec<GraphNode>> {
        self.inner.nodes_by_label(label).await
    }

    async fn find_shortest_paths(&self, _target: &NodeId, _max_hops: usize, _limit: usize) -> Result<Vec<Path>> {
        Ok(Vec::new())
    }

    async fn find_all_paths(&self, target: &NodeId, max_hops: usize, limit: usize) -> Result<Vec<Path>> {
        self.all_paths_calls.fetch_add(1, Ordering::Relaxed);
        self.inner.find_all_paths(target, max_hops, limit).await
    }

    async fn node_count(&self) -> Result<u64> {
        self.inner.node_count().await
    }

    async fn relationship_count(&self) -> Result<u64> {
        self.inner.relationship_count().await
    }
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn test_paths_to_target_keep_store_order() {
    let graph = setup_network().await;
    let paths = graph.find_paths_to("Tess Target").await.unwrap();

    assert_eq!(paths.len(), 2);
    assert_eq!(node_names(&paths[0].path), ["Sam Seed", "Mia Mid", "Tess Target"]);
    assert_eq!(node_names(&paths[1].path), ["Sam Seed", "Max Mutual", "Tess Target"]);
    assert_eq!(paths[0].metadata.connection_types, ["KNOWS", "KNOWS"]);
    assert_eq!(paths[1].metadata.connection_types, ["CONNECTED_VIA_MUTUAL", "CONNECTED_VIA_MUTUAL"]);
    assert_eq!(paths[1].metadata.mutual_ties, ["Max Mutual"]);
}

#[tokio::test]
async fn test_mutual_path_ranks_first() {
    let graph = setup_network().await;
    let mut paths = graph.find_paths_to("Tess Target").await.unwrap();

    assert!(paths[1].score > paths[0].score);
    assert_eq!(paths[0].normalized_score, 0.0);
    assert_eq!(paths[1].normalized_score, 1.0);

    rank(&mut paths);
    assert_eq!(node_names(&paths[0].path)[1], "Max Mutual");
}

#[tokio::test]
async fn test_scored_path_json_shape() {
    let graph = setup_network().await;
    let paths = graph.find_paths_to("Tess Target").await.unwrap();
    let json = serde_json::to_value(&paths[0]).unwrap();

    assert_eq!(json["path"].as_array().map(Vec::len), Some(5));
    assert_eq!(json["path"][0]["kind"], "node");
    assert_eq!(json["path"][1]["kind"], "edge");
    assert_eq!(json["path"][1]["type"], "KNOWS");
    assert!(json["score"].is_f64());
    assert!(json["normalizedScore"].is_f64());
    assert_eq!(json["metadata"]["pathLength"], 2);
}

#[tokio::test]
async fn test_falls_back_to_all_paths() {
    let store = NoShortestPaths { inner: MemoryStore::new(), all_paths_calls: AtomicUsize::new(0) };
    let seed = Properties { name: Some("Sam Seed".into()), is_seed: Some(true), ..Properties::default() };
    let target = Properties { name: Some("Tess Target".into()), ..Properties::default() };
    let sam = store.create_or_update_node(&[Label::Person], seed).await.unwrap().id;
    let tess = store.create_or_update_node(&[Label::Person], target).await.unwrap().id;
    store.create_or_update_relationship(&sam, &tess, RelType::Knows, Properties::default()).await.unwrap();

    let finder = PathFinder::new(&store, &EngineConfig::default());
    let paths = finder.find_paths(&tess).await.unwrap();

    assert_eq!(store.all_paths_calls.load(Ordering::Relaxed), 1);
    assert_eq!(paths.len(), 1);
    assert_eq!(paths[0].normalized_score, 1.0);
}

#[tokio::test]
async fn test_hop_bound_limits_reach() {
    let config = EngineConfig { max_hops: 1, ..EngineConfig::default() };
    let store = MemoryStore::new();
    let graph = IntroGraph::with_store(store, config).unwrap();
    let rows = [
        RawRecord::new()
            .with("Name", json!("Sam Seed"))
            .with("Company", json!("Acme Capital"))
            .with("Personal Connections", json!("Dinner with Mia Mid")),
        RawRecord::new()
            .with("Name", json!("Mia Mid"))
            .with("Company", json!("Blue Ridge"))
            .with("Personal Connections", json!("Worked with Tess Target")),
    ];
    graph.ingest(&rows, &Provenance::new("csv")).await.unwrap();
    graph.mark_seed("Sam Seed").await.unwrap();

    assert!(graph.find_paths_to("Tess Target").await.unwrap().is_empty());
    assert_eq!(graph.find_paths_to("Mia Mid").await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_unknown_target_is_not_found() {
    let graph = setup_network().await;
    let err = graph.find_paths_to("Nobody Anywhere").await.unwrap_err();
    assert!(matches!(err, intro_graph::Error::NotFound(_)));
}

#[tokio::test]
async fn test_segment_scorer_agrees_on_direct_employment() {
    let graph = setup_network().await;
    let firm = NodeId::for_name(Label::Firm, "Acme Capital");
    let paths = graph.store().find_shortest_paths(&firm, 4, 10).await.unwrap();
    assert_eq!(paths.len(), 1);

    let segments = SegmentScorer::default().explain(&paths[0]);
    assert_eq!(segments.len(), 1);
    assert_eq!(segments[0].rel_type, "WORKED_AT");
    // current employment earns the recency multiplier
    assert_eq!(segments[0].recency, 1.2);
}
