//! Triplets: extracted `(node_1, edge, node_2)` facts with provenance metadata.

use crate::{Attrs, Provenance, LEGACY_RELATION_KEY, RELATION_KEY, TRIPLET_ID_KEY};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

fn new_triplet_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// A single extracted fact. The `id` is assigned once at construction and is
/// the reference recorded in provenance; clones share it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Triplet {
    #[serde(default = "new_triplet_id")]
    pub id: String,
    pub node_1: String,
    pub edge: String,
    pub node_2: String,
    #[serde(default)]
    pub metadata: Attrs,
}

impl Triplet {
    pub fn new(node_1: impl Into<String>, edge: impl Into<String>, node_2: impl Into<String>) -> Self {
        Self {
            id: new_triplet_id(),
            node_1: node_1.into(),
            edge: edge.into(),
            node_2: node_2.into(),
            metadata: Attrs::new(),
        }
    }

    pub fn with_metadata(mut self, metadata: Attrs) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Record appended to both endpoint nodes and the edge on ingestion.
    /// Metadata keys are written last and win over the reserved ones.
    pub fn provenance(&self) -> Provenance {
        let mut record = Provenance::new();
        record.insert(RELATION_KEY.to_string(), Value::String(self.edge.clone()));
        record.insert(
            LEGACY_RELATION_KEY.to_string(),
            Value::String(self.edge.clone()),
        );
        record.insert(TRIPLET_ID_KEY.to_string(), Value::String(self.id.clone()));
        for (key, value) in &self.metadata {
            record.insert(key.clone(), value.clone());
        }
        record
    }
}

impl fmt::Display for Triplet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.node_1, self.edge, self.node_2)
    }
}
