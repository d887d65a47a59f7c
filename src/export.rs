//! Cypher export: render a mutation batch as an idempotent MERGE script.
//!
//! ```text
//! ConstructReport.mutations → cypher_script() → MERGE statements
//!   → pipe into cypher-shell, or paste into Neo4j Browser
//! ```
//!
//! Nodes merge on `id`, relationships on `(from, type, to)`, so replaying
//! the script converges exactly like the constructor does. Nested property
//! objects are flattened: `source.type` becomes `sourceType` and each
//! `extra` entry becomes a top-level key.

use std::io::Write;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::construct::Mutation;
use crate::Result;

/// Write `mutations` as a Cypher script.
pub fn cypher_script(mutations: &[Mutation], writer: &mut dyn Write) -> Result<()> {
    let nodes = mutations.iter().filter(|m| matches!(m, Mutation::Node(_))).count();

    writeln!(writer, "// intro-graph MERGE script")?;
    writeln!(writer, "// Nodes: {nodes}")?;
    writeln!(writer, "// Relationships: {}", mutations.len() - nodes)?;
    writeln!(writer)?;

    for mutation in mutations {
        match mutation {
            Mutation::Node(node) => {
                let (primary, rest) = match node.labels.split_first() {
                    Some((p, rest)) => (p.as_str(), rest),
                    None => continue,
                };
                write!(writer, "MERGE (n:{primary} {{id: {}}})", quote(node.id.as_str()))?;
                for label in rest {
                    write!(writer, " SET n:{}", label.as_str())?;
                }
                let props = format_properties(&node.properties)?;
                if !props.is_empty() {
                    write!(writer, " SET n += {{{props}}}")?;
                }
                writeln!(writer, ";")?;
            }
            Mutation::Relationship(rel) => {
                write!(
                    writer,
                    "MATCH (a {{id: {}}}), (b {{id: {}}}) MERGE (a)-[r:{}]->(b)",
                    quote(rel.from_id.as_str()),
                    quote(rel.to_id.as_str()),
                    identifier(&rel.rel_type.to_string()),
                )?;
                let props = format_properties(&rel.properties)?;
                if !props.is_empty() {
                    write!(writer, " SET r += {{{props}}}")?;
                }
                writeln!(writer, ";")?;
            }
        }
    }
    Ok(())
}

/// Render a script into a `String`.
pub fn cypher_string(mutations: &[Mutation]) -> Result<String> {
    let mut buf = Vec::new();
    cypher_script(mutations, &mut buf)?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

/// `key: value, ...` with nested objects flattened.
fn format_properties(props: &impl Serialize) -> Result<String> {
    let Value::Object(map) = serde_json::to_value(props)? else {
        return Ok(String::new());
    };
    let mut flat = Vec::new();
    flatten(&map, "", &mut flat);
    Ok(flat
        .into_iter()
        .map(|(k, v)| format!("{}: {}", identifier(&k), format_value(&v)))
        .collect::<Vec<_>>()
        .join(", "))
}

fn flatten(map: &Map<String, Value>, prefix: &str, out: &mut Vec<(String, Value)>) {
    for (key, value) in map {
        let key = match (prefix, key.as_str()) {
            ("", k) => k.to_string(),
            ("extra", k) => k.to_string(),
            (p, k) => {
                let mut chars = k.chars();
                let head: String = chars.next().map(|c| c.to_uppercase().collect()).unwrap_or_default();
                format!("{p}{head}{}", chars.as_str())
            }
        };
        match value {
            Value::Object(inner) => flatten(inner, &key, out),
            Value::Null => {}
            other => out.push((key, other.clone())),
        }
    }
}

/// Cypher literal for a JSON scalar or list.
fn format_value(value: &Value) -> String {
    match value {
        Value::String(s) => quote(s),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        Value::Array(items) => {
            let inner: Vec<String> = items.iter().map(format_value).collect();
            format!("[{}]", inner.join(", "))
        }
        Value::Object(_) => quote(&value.to_string()),
    }
}

fn quote(s: &str) -> String {
    format!("'{}'", s.replace('\\', "\\\\").replace('\'', "\\'"))
}

/// Property key or relationship type, backticked unless it is a plain
/// identifier.
fn identifier(key: &str) -> String {
    let plain = key.chars().next().is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if plain { key.to_string() } else { format!("`{}`", key.replace('`', "``")) }
}
