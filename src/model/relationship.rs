//! Relationship (edge) in the introduction graph.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::{NodeId, Properties};

/// Deterministic relationship identifier derived from `(from, type, to)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RelId(pub String);

impl RelId {
    pub fn derive(from: &NodeId, rel_type: &RelType, to: &NodeId) -> Self {
        RelId(format!("{from}-[{rel_type}]->{to}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Relationship types. The first four are produced by the graph constructor;
/// the rest may already exist in a store and are understood by the scorer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum RelType {
    WorkedAt,
    AttendedSchool,
    Knows,
    ConnectedViaMutual,
    Founded,
    BoardMember,
    InvestedIn,
    Other(String),
}

impl RelType {
    pub fn as_str(&self) -> &str {
        match self {
            RelType::WorkedAt => "WORKED_AT",
            RelType::AttendedSchool => "ATTENDED_SCHOOL",
            RelType::Knows => "KNOWS",
            RelType::ConnectedViaMutual => "CONNECTED_VIA_MUTUAL",
            RelType::Founded => "FOUNDED",
            RelType::BoardMember => "BOARD_MEMBER",
            RelType::InvestedIn => "INVESTED_IN",
            RelType::Other(s) => s,
        }
    }

    pub fn is_mutual(&self) -> bool {
        matches!(self, RelType::ConnectedViaMutual)
    }
}

impl std::fmt::Display for RelType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for RelType {
    fn from(s: &str) -> Self {
        match s.trim().to_ascii_uppercase().as_str() {
            "WORKED_AT" => RelType::WorkedAt,
            "ATTENDED_SCHOOL" => RelType::AttendedSchool,
            "KNOWS" => RelType::Knows,
            "CONNECTED_VIA_MUTUAL" => RelType::ConnectedViaMutual,
            "FOUNDED" => RelType::Founded,
            "BOARD_MEMBER" => RelType::BoardMember,
            "INVESTED_IN" => RelType::InvestedIn,
            _ => RelType::Other(s.to_string()),
        }
    }
}

impl From<String> for RelType {
    fn from(s: String) -> Self {
        RelType::from(s.as_str())
    }
}

impl From<RelType> for String {
    fn from(t: RelType) -> Self {
        t.as_str().to_string()
    }
}

/// Which way an acquaintance runs, as far as the source text tells us.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// The contact reached out to / introduced the other party.
    Outgoing,
    /// The other party reached out to the contact.
    Incoming,
    #[default]
    Both,
}

impl FromStr for Direction {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_ascii_lowercase().as_str() {
            "outgoing" | "out" | "outbound" => Direction::Outgoing,
            "incoming" | "in" | "inbound" => Direction::Incoming,
            _ => Direction::Both,
        })
    }
}

/// A relationship (directed edge) in the introduction graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphRelationship {
    pub id: RelId,
    #[serde(rename = "type")]
    pub rel_type: RelType,
    pub from_id: NodeId,
    pub to_id: NodeId,
    pub properties: Properties,
}

impl GraphRelationship {
    pub fn new(from_id: NodeId, to_id: NodeId, rel_type: RelType) -> Self {
        Self {
            id: RelId::derive(&from_id, &rel_type, &to_id),
            rel_type,
            from_id,
            to_id,
            properties: Properties::default(),
        }
    }

    pub fn with_properties(mut self, properties: Properties) -> Self {
        self.properties = properties;
        self
    }

    /// The "other" end of the relationship from the given node.
    pub fn other_node(&self, from: &NodeId) -> Option<&NodeId> {
        if *from == self.from_id { Some(&self.to_id) }
        else if *from == self.to_id { Some(&self.from_id) }
        else { None }
    }

    pub fn merge(&mut self, other: GraphRelationship) {
        self.properties.merge(other.properties);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rel_id_is_deterministic() {
        let a = NodeId("person:ada".into());
        let b = NodeId("firm:acme".into());
        let r1 = GraphRelationship::new(a.clone(), b.clone(), RelType::WorkedAt);
        let r2 = GraphRelationship::new(a.clone(), b.clone(), RelType::WorkedAt);
        let r3 = GraphRelationship::new(a, b, RelType::Knows);
        assert_eq!(r1.id, r2.id);
        assert_ne!(r1.id, r3.id);
    }

    #[test]
    fn test_rel_type_round_trips_through_string() {
        assert_eq!(RelType::from("connected_via_mutual"), RelType::ConnectedViaMutual);
        assert_eq!(RelType::from("MENTORED"), RelType::Other("MENTORED".into()));
        let json = serde_json::to_string(&RelType::BoardMember).unwrap();
        assert_eq!(json, "\"BOARD_MEMBER\"");
    }

    #[test]
    fn test_other_node() {
        let rel = GraphRelationship::new(NodeId("a".into()), NodeId("b".into()), RelType::Knows);
        assert_eq!(rel.other_node(&NodeId("a".into())), Some(&NodeId("b".into())));
        assert_eq!(rel.other_node(&NodeId("c".into())), None);
    }
}
