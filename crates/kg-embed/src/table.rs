//! Precomputed node vectors.

use crate::similarity::DistanceMetric;
use kg_types::{NodeDistance, OracleError};
use std::collections::HashMap;

/// Fixed node-id -> vector map, for callers that embed ahead of time.
/// Distances default to euclidean; a node without a vector is an error.
#[derive(Debug, Clone)]
pub struct EmbeddingTable {
    vectors: HashMap<String, Vec<f32>>,
    metric: DistanceMetric,
}

impl EmbeddingTable {
    pub fn new() -> Self {
        Self::with_metric(DistanceMetric::Euclidean)
    }

    pub fn with_metric(metric: DistanceMetric) -> Self {
        Self {
            vectors: HashMap::new(),
            metric,
        }
    }

    pub fn insert(&mut self, node: impl Into<String>, vector: Vec<f32>) {
        self.vectors.insert(node.into(), vector);
    }

    pub fn get(&self, node: &str) -> Option<&[f32]> {
        self.vectors.get(node).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    fn vector(&self, node: &str) -> Result<&[f32], OracleError> {
        self.get(node)
            .ok_or_else(|| OracleError::MissingEmbedding(node.to_string()))
    }
}

impl Default for EmbeddingTable {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Into<String>> FromIterator<(K, Vec<f32>)> for EmbeddingTable {
    fn from_iter<I: IntoIterator<Item = (K, Vec<f32>)>>(iter: I) -> Self {
        let mut table = Self::new();
        for (node, vector) in iter {
            table.insert(node, vector);
        }
        table
    }
}

impl NodeDistance for EmbeddingTable {
    fn distance(&self, a: &str, b: &str) -> Result<f64, OracleError> {
        Ok(self.metric.distance(self.vector(a)?, self.vector(b)?))
    }
}
