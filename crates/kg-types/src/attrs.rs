//! Attribute bags for nodes and edges, with typed views over the required keys.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Open key-value bag stored on every node and edge.
pub type Attrs = serde_json::Map<String, Value>;

/// Provenance records are open bags as well.
pub type Provenance = Attrs;

pub const SOURCES_KEY: &str = "sources";
pub const RELATION_KEY: &str = "relation";
/// Older writers store the relation label under `edge`; every provenance record carries both.
pub const LEGACY_RELATION_KEY: &str = "edge";
pub const TRIPLET_ID_KEY: &str = "triplet_id";

/// Relation label rendered when two consecutive path nodes share no edge.
pub const UNKNOWN_RELATION: &str = "unknown_relation";

/// Extract the `sources` list of a bag, skipping entries that are not objects.
pub fn sources_of(attrs: &Attrs) -> Vec<Provenance> {
    attrs
        .get(SOURCES_KEY)
        .and_then(|v| v.as_array())
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item.as_object().cloned())
                .collect()
        })
        .unwrap_or_default()
}

/// Number of provenance records in a bag.
pub fn source_count(attrs: &Attrs) -> usize {
    attrs
        .get(SOURCES_KEY)
        .and_then(|v| v.as_array())
        .map(|items| items.len())
        .unwrap_or(0)
}

/// Relation label of an edge bag (`relation`, else legacy `edge`).
pub fn relation_of(attrs: &Attrs) -> Option<&str> {
    attrs
        .get(RELATION_KEY)
        .and_then(|v| v.as_str())
        .or_else(|| attrs.get(LEGACY_RELATION_KEY).and_then(|v| v.as_str()))
}

/// Typed view of a node bag: `sources` plus free-form extension fields.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeAttrs {
    pub sources: Vec<Provenance>,
    pub extra: Attrs,
}

impl NodeAttrs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_attrs(attrs: &Attrs) -> Self {
        let mut extra = attrs.clone();
        extra.remove(SOURCES_KEY);
        Self {
            sources: sources_of(attrs),
            extra,
        }
    }

    /// Bag form; `sources` is always written, even when empty.
    pub fn into_attrs(self) -> Attrs {
        let mut attrs = self.extra;
        attrs.insert(
            SOURCES_KEY.to_string(),
            Value::Array(self.sources.into_iter().map(Value::Object).collect()),
        );
        attrs
    }
}

/// Typed view of an edge bag: `relation`, `sources`, extension fields.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EdgeAttrs {
    pub relation: String,
    pub sources: Vec<Provenance>,
    pub extra: Attrs,
}

impl EdgeAttrs {
    pub fn new(relation: impl Into<String>) -> Self {
        Self {
            relation: relation.into(),
            ..Self::default()
        }
    }

    pub fn from_attrs(attrs: &Attrs) -> Self {
        let mut extra = attrs.clone();
        extra.remove(SOURCES_KEY);
        extra.remove(RELATION_KEY);
        extra.remove(LEGACY_RELATION_KEY);
        Self {
            relation: relation_of(attrs).unwrap_or_default().to_string(),
            sources: sources_of(attrs),
            extra,
        }
    }

    pub fn into_attrs(self) -> Attrs {
        let mut attrs = self.extra;
        attrs.insert(RELATION_KEY.to_string(), Value::String(self.relation));
        attrs.insert(
            SOURCES_KEY.to_string(),
            Value::Array(self.sources.into_iter().map(Value::Object).collect()),
        );
        attrs
    }
}

/// Directed `(source)-[relation]->(target)` fact as read back from the graph.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Relationship {
    pub source: String,
    pub target: String,
    pub relation: String,
}

impl Relationship {
    pub fn new(
        source: impl Into<String>,
        relation: impl Into<String>,
        target: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            relation: relation.into(),
        }
    }
}

impl fmt::Display for Relationship {
    /// Cypher-like pattern: `(a)-[:rel]->(b)`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({})-[:{}]->({})", self.source, self.relation, self.target)
    }
}
