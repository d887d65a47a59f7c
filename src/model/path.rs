//! Path — a sequence of alternating nodes and relationships.

use serde::{Deserialize, Serialize};

use super::{GraphNode, GraphRelationship};

/// A path as returned by a graph store: node -[rel]- node -[rel]- node ...
///
/// Relationships keep their stored direction; traversal order is the order
/// of `nodes`, which may run against an edge's `from_id -> to_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Path {
    /// Nodes along the path. Always has one more element than `relationships`.
    pub nodes: Vec<GraphNode>,
    /// Relationships connecting consecutive nodes.
    pub relationships: Vec<GraphRelationship>,
}

impl Path {
    pub fn single(node: GraphNode) -> Self {
        Self { nodes: vec![node], relationships: Vec::new() }
    }

    /// Number of hops.
    pub fn len(&self) -> usize {
        self.relationships.len()
    }

    pub fn is_empty(&self) -> bool {
        self.relationships.is_empty()
    }

    pub fn start(&self) -> Option<&GraphNode> {
        self.nodes.first()
    }

    pub fn end(&self) -> Option<&GraphNode> {
        self.nodes.last()
    }

    /// Extend path with a relationship and its far node.
    pub fn append(&mut self, rel: GraphRelationship, node: GraphNode) {
        self.relationships.push(rel);
        self.nodes.push(node);
    }

    /// The same path traversed end-to-start.
    pub fn reversed(mut self) -> Self {
        self.nodes.reverse();
        self.relationships.reverse();
        self
    }

    /// `(node, relationship-into-node)` pairs for every hop.
    pub fn segments(&self) -> impl Iterator<Item = (&GraphNode, &GraphRelationship)> {
        self.nodes.iter().skip(1).zip(self.relationships.iter())
    }
}

/// One element of the canonical alternating path shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum PathElement {
    Node(GraphNode),
    Edge(GraphRelationship),
}

impl From<Path> for Vec<PathElement> {
    fn from(path: Path) -> Self {
        let mut out = Vec::with_capacity(path.nodes.len() + path.relationships.len());
        let mut rels = path.relationships.into_iter();
        for node in path.nodes {
            out.push(PathElement::Node(node));
            if let Some(rel) = rels.next() {
                out.push(PathElement::Edge(rel));
            }
        }
        out
    }
}
