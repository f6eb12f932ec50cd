//! Serialized graph shapes: node/edge record lists and the `{graph, config}` document.

use chrono::{DateTime, Utc};
use kg_types::{Attrs, GraphStoreError};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub id: String,
    #[serde(default)]
    pub attributes: Attrs,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeRecord {
    pub source: String,
    pub target: String,
    #[serde(default)]
    pub attributes: Attrs,
}

/// Ordered node and edge records. Loading replays them through
/// `add_node`/`add_edge` so backend normalization runs on the way in.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphSnapshot {
    #[serde(default)]
    pub nodes: Vec<NodeRecord>,
    #[serde(default)]
    pub edges: Vec<EdgeRecord>,
}

/// Graph persistence file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphDocument {
    pub graph: GraphSnapshot,
    #[serde(default)]
    pub config: Attrs,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saved_at: Option<DateTime<Utc>>,
}

impl GraphDocument {
    pub fn new(graph: GraphSnapshot, config: Attrs) -> Self {
        Self {
            graph,
            config,
            saved_at: Some(Utc::now()),
        }
    }

    /// Parse a document; anything without a top-level `graph` key is rejected.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, GraphStoreError> {
        let value: serde_json::Value = serde_json::from_slice(bytes)?;
        if value.get("graph").is_none() {
            return Err(GraphStoreError::InvalidFormat(
                "missing top-level `graph` key".to_string(),
            ));
        }
        Ok(serde_json::from_value(value)?)
    }

    pub fn to_vec_pretty(&self) -> Result<Vec<u8>, GraphStoreError> {
        Ok(serde_json::to_vec_pretty(self)?)
    }
}
