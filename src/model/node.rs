//! Node in the introduction graph.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use super::Properties;

/// Deterministic node identifier: `"<label>:<slug>"`.
///
/// The same canonical name under the same label always yields the same id,
/// which is what lets repeated construction merge instead of duplicate.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub String);

impl NodeId {
    pub fn for_name(label: Label, name: &str) -> Self {
        NodeId(format!("{}:{}", label.as_str().to_lowercase(), slugify(name)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Node labels known to this engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Label {
    Person,
    Firm,
    School,
}

impl Label {
    pub fn as_str(&self) -> &'static str {
        match self {
            Label::Person => "Person",
            Label::Firm => "Firm",
            Label::School => "School",
        }
    }
}

impl std::fmt::Display for Label {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A node in the introduction graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: NodeId,
    pub labels: SmallVec<[Label; 2]>,
    pub properties: Properties,
}

impl GraphNode {
    /// Build a node whose id is derived from `name` under `label`.
    pub fn named(label: Label, name: impl Into<String>) -> Self {
        let name = name.into();
        let mut labels = SmallVec::new();
        labels.push(label);
        Self {
            id: NodeId::for_name(label, &name),
            labels,
            properties: Properties {
                name: Some(name),
                ..Properties::default()
            },
        }
    }

    pub fn with_properties(mut self, properties: Properties) -> Self {
        let name = self.properties.name.take();
        self.properties = properties;
        if self.properties.name.is_none() {
            self.properties.name = name;
        }
        self
    }

    pub fn has_label(&self, label: Label) -> bool {
        self.labels.contains(&label)
    }

    pub fn name(&self) -> &str {
        self.properties.name.as_deref().unwrap_or(self.id.as_str())
    }

    /// Merge `other` into `self`: labels union, set properties overwrite.
    pub fn merge(&mut self, other: GraphNode) {
        for label in other.labels {
            if !self.labels.contains(&label) {
                self.labels.push(label);
            }
        }
        self.properties.merge(other.properties);
    }
}

/// URL-safe slug: lower-case ASCII alphanumerics joined by single dashes.
pub fn slugify(s: &str) -> String {
    let mut slug = String::with_capacity(s.len());
    let mut pending_dash = false;
    for c in s.chars() {
        if c.is_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.extend(c.to_lowercase());
        } else {
            pending_dash = true;
        }
    }
    slug
}
