//! In-memory graph store.
//!
//! This is the reference implementation of `GraphStore`.
//! It uses simple HashMaps protected by RwLock.
//!
//! ## Limitations
//!
//! - **No transactions**: each merge is applied immediately and on its own.
//! - **No property indexes**: `find_node_by_property()` scans the label index.
//! - **Path search is a bounded BFS**: fine for test graphs and small embedded
//!   graphs, not for production-sized networks.
//!
//! Fault injection (`set_unavailable`, `reject_entity`) lets tests drive the
//! error taxonomy the constructor and path finder must honor.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use hashbrown::{HashMap, HashSet};
use parking_lot::RwLock;

use crate::model::*;
use crate::{Error, Result};
use super::GraphStore;

// ============================================================================
// MemoryStore
// ============================================================================

/// In-memory introduction graph.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<MemoryInner>,
}

#[derive(Default)]
struct MemoryInner {
    nodes: RwLock<HashMap<NodeId, GraphNode>>,
    relationships: RwLock<HashMap<RelId, GraphRelationship>>,
    /// node_id → relationship ids touching it, in insertion order
    adjacency: RwLock<HashMap<NodeId, Vec<RelId>>>,
    /// label → node ids, in insertion order
    label_index: RwLock<HashMap<Label, Vec<NodeId>>>,
    unavailable: AtomicBool,
    /// lower-cased names the store refuses to merge
    rejected: RwLock<HashSet<String>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SearchMode {
    /// Per seed, only the paths of minimal length.
    Shortest,
    /// Every simple path within the hop bound.
    All,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail with `Error::StoreUnavailable`.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.inner.unavailable.store(unavailable, Ordering::Relaxed);
    }

    /// Refuse to merge nodes with this name (`Error::StoreRejected`).
    pub fn reject_entity(&self, name: &str) {
        self.inner.rejected.write().insert(name.to_lowercase());
    }

    /// All relationships, sorted by id.
    pub fn relationships(&self) -> Vec<GraphRelationship> {
        let mut rels: Vec<_> = self.inner.relationships.read().values().cloned().collect();
        rels.sort_by(|a, b| a.id.cmp(&b.id));
        rels
    }

    fn check_available(&self) -> Result<()> {
        if self.inner.unavailable.load(Ordering::Relaxed) {
            return Err(Error::StoreUnavailable("memory store marked unavailable".into()));
        }
        Ok(())
    }

    fn search(
        &self,
        target: &NodeId,
        max_hops: usize,
        limit: usize,
        mode: SearchMode,
    ) -> Result<Vec<Path>> {
        let nodes = self.inner.nodes.read();
        let rels = self.inner.relationships.read();
        let adj = self.inner.adjacency.read();

        let start = nodes
            .get(target)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("Node {target}")))?;

        let mut results = Vec::new();
        let mut seed_depth: HashMap<NodeId, usize> = HashMap::new();

        // BFS outward from the target; paths are reversed on the way out so
        // they read seed → target.
        let mut queue: Vec<Path> = vec![Path::single(start)];

        for depth in 1..=max_hops {
            let mut next_queue = Vec::new();

            for path in &queue {
                let Some(tip) = path.end() else { continue };
                let rel_ids = adj.get(&tip.id).map(Vec::as_slice).unwrap_or_default();

                for rid in rel_ids {
                    let Some(rel) = rels.get(rid) else { continue };
                    let Some(next_id) = rel.other_node(&tip.id) else { continue };

                    // Avoid cycles
                    if path.nodes.iter().any(|n| &n.id == next_id) {
                        continue;
                    }
                    let Some(next_node) = nodes.get(next_id) else { continue };

                    let mut new_path = path.clone();
                    new_path.append(rel.clone(), next_node.clone());

                    if next_node.properties.is_seed() {
                        let keep = match mode {
                            SearchMode::All => true,
                            SearchMode::Shortest => {
                                *seed_depth.entry(next_id.clone()).or_insert(depth) == depth
                            }
                        };
                        if keep {
                            results.push(new_path.clone().reversed());
                        }
                    }
                    if depth < max_hops {
                        next_queue.push(new_path);
                    }
                }
            }

            queue = next_queue;
            if queue.is_empty() || results.len() >= limit {
                break;
            }
        }

        results.truncate(limit);
        Ok(results)
    }
}

// ============================================================================
// GraphStore impl
// ============================================================================

#[async_trait]
impl GraphStore for MemoryStore {
    async fn create_or_update_node(
        &self,
        labels: &[Label],
        properties: Properties,
    ) -> Result<GraphNode> {
        self.check_available()?;

        let name = properties.name.clone().unwrap_or_default();
        let Some(&primary) = labels.first() else {
            return Err(Error::InvalidEntity { entity: name, message: "node has no label".into() });
        };
        if self.inner.rejected.read().contains(&name.to_lowercase()) {
            return Err(Error::StoreRejected { entity: name, message: "rejected by store".into() });
        }

        let mut incoming = GraphNode::named(primary, name.clone()).with_properties(properties);
        if slugify(&name).is_empty() {
            return Err(Error::InvalidEntity { entity: name, message: "node name has no usable characters".into() });
        }
        for label in &labels[1..] {
            if !incoming.has_label(*label) {
                incoming.labels.push(*label);
            }
        }

        let id = incoming.id.clone();
        let merged = {
            let mut nodes = self.inner.nodes.write();
            match nodes.get_mut(&id) {
                Some(existing) => {
                    existing.merge(incoming);
                    existing.clone()
                }
                None => {
                    nodes.insert(id.clone(), incoming.clone());
                    self.inner.adjacency.write().entry(id.clone()).or_default();
                    incoming
                }
            }
        };

        // Update label index
        {
            let mut idx = self.inner.label_index.write();
            for label in &merged.labels {
                let ids = idx.entry(*label).or_default();
                if !ids.contains(&id) {
                    ids.push(id.clone());
                }
            }
        }

        Ok(merged)
    }

    async fn create_or_update_relationship(
        &self,
        from: &NodeId,
        to: &NodeId,
        rel_type: RelType,
        properties: Properties,
    ) -> Result<GraphRelationship> {
        self.check_available()?;

        // Verify both nodes exist
        {
            let nodes = self.inner.nodes.read();
            if !nodes.contains_key(from) {
                return Err(Error::NotFound(format!("Source node {from}")));
            }
            if !nodes.contains_key(to) {
                return Err(Error::NotFound(format!("Target node {to}")));
            }
        }

        let incoming = GraphRelationship::new(from.clone(), to.clone(), rel_type)
            .with_properties(properties);
        let id = incoming.id.clone();

        let mut rels = self.inner.relationships.write();
        if let Some(existing) = rels.get_mut(&id) {
            existing.merge(incoming);
            return Ok(existing.clone());
        }
        rels.insert(id.clone(), incoming.clone());
        drop(rels);

        // Update adjacency for both endpoints
        let mut adj = self.inner.adjacency.write();
        adj.entry(from.clone()).or_default().push(id.clone());
        if from != to {
            adj.entry(to.clone()).or_default().push(id);
        }

        Ok(incoming)
    }

    async fn find_node_by_property(
        &self,
        label: Label,
        property: &str,
        value: &str,
    ) -> Result<Option<GraphNode>> {
        self.check_available()?;
        let idx = self.inner.label_index.read();
        let nodes = self.inner.nodes.read();

        // Brute force scan over the label index
        Ok(idx
            .get(&label)
            .into_iter()
            .flatten()
            .filter_map(|id| nodes.get(id))
            .find(|n| n.properties.get(property).as_deref() == Some(value))
            .cloned())
    }

    async fn get_node(&self, id: &NodeId) -> Result<Option<GraphNode>> {
        self.check_available()?;
        Ok(self.inner.nodes.read().get(id).cloned())
    }

    async fn nodes_by_label(&self, label: Label) -> Result<Vec<GraphNode>> {
        self.check_available()?;
        let idx = self.inner.label_index.read();
        let nodes = self.inner.nodes.read();
        Ok(idx
            .get(&label)
            .into_iter()
            .flatten()
            .filter_map(|id| nodes.get(id).cloned())
            .collect())
    }

    async fn find_shortest_paths(
        &self,
        target: &NodeId,
        max_hops: usize,
        limit: usize,
    ) -> Result<Vec<Path>> {
        self.check_available()?;
        self.search(target, max_hops, limit, SearchMode::Shortest)
    }

    async fn find_all_paths(
        &self,
        target: &NodeId,
        max_hops: usize,
        limit: usize,
    ) -> Result<Vec<Path>> {
        self.check_available()?;
        self.search(target, max_hops, limit, SearchMode::All)
    }

    async fn node_count(&self) -> Result<u64> {
        self.check_available()?;
        Ok(self.inner.nodes.read().len() as u64)
    }

    async fn relationship_count(&self) -> Result<u64> {
        self.check_available()?;
        Ok(self.inner.relationships.read().len() as u64)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn person(name: &str) -> Properties {
        Properties { name: Some(name.into()), ..Properties::default() }
    }

    fn seed(name: &str) -> Properties {
        Properties { is_seed: Some(true), ..person(name) }
    }

    #[tokio::test]
    async fn test_merge_node_is_idempotent() {
        let db = MemoryStore::new();
        let a = db.create_or_update_node(&[Label::Person], person("Ada Lovelace")).await.unwrap();
        let b = db
            .create_or_update_node(
                &[Label::Person],
                Properties { role: Some("Partner".into()), ..person("Ada Lovelace") },
            )
            .await
            .unwrap();

        assert_eq!(a.id, b.id);
        assert_eq!(b.properties.role.as_deref(), Some("Partner"));
        assert_eq!(db.node_count().await.unwrap(), 1);
        assert_eq!(db.nodes_by_label(Label::Person).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_nameless_node_is_invalid() {
        let db = MemoryStore::new();
        let err = db.create_or_update_node(&[Label::Firm], Properties::default()).await.unwrap_err();
        assert!(matches!(err, Error::InvalidEntity { .. }));
        assert!(err.is_recoverable());
    }

    #[tokio::test]
    async fn test_merge_relationship_is_idempotent() {
        let db = MemoryStore::new();
        let a = db.create_or_update_node(&[Label::Person], person("Ada")).await.unwrap();
        let f = db.create_or_update_node(&[Label::Firm], person("Acme")).await.unwrap();

        db.create_or_update_relationship(&a.id, &f.id, RelType::WorkedAt, Properties::default())
            .await
            .unwrap();
        let rel = db
            .create_or_update_relationship(
                &a.id,
                &f.id,
                RelType::WorkedAt,
                Properties { role: Some("Analyst".into()), ..Properties::default() },
            )
            .await
            .unwrap();

        assert_eq!(db.relationship_count().await.unwrap(), 1);
        assert_eq!(rel.properties.role.as_deref(), Some("Analyst"));
    }

    #[tokio::test]
    async fn test_relationship_requires_nodes() {
        let db = MemoryStore::new();
        let a = db.create_or_update_node(&[Label::Person], person("Ada")).await.unwrap();
        let missing = NodeId("person:nobody".into());
        let err = db
            .create_or_update_relationship(&a.id, &missing, RelType::Knows, Properties::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn test_find_node_by_property() {
        let db = MemoryStore::new();
        let props = Properties {
            profile_url: Some("https://www.linkedin.com/in/target".into()),
            ..person("Tara Target")
        };
        db.create_or_update_node(&[Label::Person], props).await.unwrap();

        let found = db
            .find_node_by_property(Label::Person, "profileUrl", "https://www.linkedin.com/in/target")
            .await
            .unwrap();
        assert_eq!(found.map(|n| n.name().to_string()), Some("Tara Target".into()));

        let missing = db.find_node_by_property(Label::Firm, "profileUrl", "x").await.unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_paths_start_at_seed_and_prefer_shortest() {
        let db = MemoryStore::new();
        let s = db.create_or_update_node(&[Label::Person], seed("Sam Seed")).await.unwrap();
        let m = db.create_or_update_node(&[Label::Person], person("Mia Middle")).await.unwrap();
        let t = db.create_or_update_node(&[Label::Person], person("Tara Target")).await.unwrap();

        // s - m - t and a direct s - t edge
        db.create_or_update_relationship(&s.id, &m.id, RelType::Knows, Properties::default()).await.unwrap();
        db.create_or_update_relationship(&m.id, &t.id, RelType::Knows, Properties::default()).await.unwrap();
        db.create_or_update_relationship(&t.id, &s.id, RelType::Knows, Properties::default()).await.unwrap();

        let shortest = db.find_shortest_paths(&t.id, 4, 10).await.unwrap();
        assert_eq!(shortest.len(), 1);
        assert_eq!(shortest[0].len(), 1);
        assert_eq!(shortest[0].start().map(|n| n.id.clone()), Some(s.id.clone()));
        assert_eq!(shortest[0].end().map(|n| n.id.clone()), Some(t.id.clone()));

        let all = db.find_all_paths(&t.id, 4, 10).await.unwrap();
        assert_eq!(all.len(), 2);
        assert!(all[0].len() <= all[1].len());
        assert_eq!(all[1].nodes[1].id, m.id);
    }

    #[tokio::test]
    async fn test_hop_bound_and_missing_target() {
        let db = MemoryStore::new();
        let s = db.create_or_update_node(&[Label::Person], seed("Sam")).await.unwrap();
        let a = db.create_or_update_node(&[Label::Person], person("Ann")).await.unwrap();
        let t = db.create_or_update_node(&[Label::Person], person("Tom")).await.unwrap();
        db.create_or_update_relationship(&s.id, &a.id, RelType::Knows, Properties::default()).await.unwrap();
        db.create_or_update_relationship(&a.id, &t.id, RelType::Knows, Properties::default()).await.unwrap();

        assert!(db.find_all_paths(&t.id, 1, 10).await.unwrap().is_empty());
        assert_eq!(db.find_all_paths(&t.id, 2, 10).await.unwrap().len(), 1);

        let err = db.find_all_paths(&NodeId("person:ghost".into()), 4, 10).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn test_fault_injection() {
        let db = MemoryStore::new();
        db.reject_entity("Bad Actor");
        let err = db.create_or_update_node(&[Label::Person], person("Bad Actor")).await.unwrap_err();
        assert!(matches!(err, Error::StoreRejected { .. }));

        db.set_unavailable(true);
        let err = db.node_count().await.unwrap_err();
        assert!(matches!(err, Error::StoreUnavailable(_)));
        assert!(!err.is_recoverable());
    }
}
