//! # Graph Store Trait
//!
//! The contract between this engine and whatever graph database holds the
//! introduction graph. The engine only defines data shapes, merge rules and
//! ranking; storage, retries and transactions belong to the store.
//!
//! ## Implementations
//!
//! | Store | Module | Description |
//! |-------|--------|-------------|
//! | `MemoryStore` | `memory` | In-memory reference store for embedding and tests |

pub mod memory;

use async_trait::async_trait;

use crate::model::*;
use crate::Result;

pub use memory::MemoryStore;

/// The graph-store contract.
///
/// All operations may fail. Failures come back as typed errors: a store
/// that cannot be reached returns `Error::StoreUnavailable`, a store that
/// refuses a single entity returns `Error::StoreRejected`. Lookups that
/// simply find nothing return `Ok(None)` / an empty list.
#[async_trait]
pub trait GraphStore: Send + Sync + 'static {
    // ========================================================================
    // Mutations (idempotent merges)
    // ========================================================================

    /// Create or merge a node. The id is derived from the first label and
    /// the `name` property, so repeated calls converge on one node.
    async fn create_or_update_node(
        &self,
        labels: &[Label],
        properties: Properties,
    ) -> Result<GraphNode>;

    /// Create or merge a relationship keyed by `(from, type, to)`.
    async fn create_or_update_relationship(
        &self,
        from: &NodeId,
        to: &NodeId,
        rel_type: RelType,
        properties: Properties,
    ) -> Result<GraphRelationship>;

    // ========================================================================
    // Lookups
    // ========================================================================

    /// Find a node by label + property value. `Ok(None)` when absent.
    async fn find_node_by_property(
        &self,
        label: Label,
        property: &str,
        value: &str,
    ) -> Result<Option<GraphNode>>;

    /// Get a node by id.
    async fn get_node(&self, id: &NodeId) -> Result<Option<GraphNode>>;

    /// All nodes carrying `label`, in insertion order.
    async fn nodes_by_label(&self, label: Label) -> Result<Vec<GraphNode>>;

    // ========================================================================
    // Path search
    // ========================================================================

    /// Shortest paths from any seed node to `target`, at most `max_hops`
    /// long. Paths start at the seed and end at the target, length-ascending.
    async fn find_shortest_paths(
        &self,
        target: &NodeId,
        max_hops: usize,
        limit: usize,
    ) -> Result<Vec<Path>>;

    /// All simple paths from any seed node to `target` within `max_hops`,
    /// length-ascending.
    async fn find_all_paths(
        &self,
        target: &NodeId,
        max_hops: usize,
        limit: usize,
    ) -> Result<Vec<Path>>;

    // ========================================================================
    // Introspection
    // ========================================================================

    async fn node_count(&self) -> Result<u64>;

    async fn relationship_count(&self) -> Result<u64>;
}
