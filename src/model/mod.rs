//! # Introduction Graph Model
//!
//! Clean DTOs shared by every stage: ingest → construct → store → paths.
//! Nodes and relationships are keyed by deterministic string ids so the
//! store owns the cyclic structure; this crate only holds finite path slices.
//!
//! This module is pure data: no I/O, no state, no async.

pub mod node;
pub mod relationship;
pub mod path;
pub mod properties;
pub mod contact;

pub use node::{GraphNode, NodeId, Label, slugify};
pub use relationship::{GraphRelationship, RelId, RelType, Direction};
pub use path::{Path, PathElement};
pub use properties::Properties;
pub use contact::{Contact, ConnectionEntry, PersonalConnections, Source};
