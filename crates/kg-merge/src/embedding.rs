//! Embedding-similarity merging.
//!
//! Grouping is anchor-based: each not-yet-grouped node collects every later,
//! not-yet-grouped node within the threshold of *itself*. This is not
//! transitive: with A~B and B~C but not A~C, the result is {A, B} and C stays
//! alone. Use [`OracleMerger`](crate::OracleMerger) when closure is required.
//! Every pair is compared, so cost grows quadratically with node count.

use crate::merger::{most_provenance, MergeError, NodeMerger};
use kg_embed::{cosine_similarity, EmbeddingCache};
use kg_graph::GraphBackend;
use kg_types::Embedder;
use serde::{Deserialize, Serialize};

fn default_threshold() -> f64 {
    0.85
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingMergerConfig {
    /// Minimum cosine similarity for two nodes to be grouped.
    #[serde(default = "default_threshold")]
    pub threshold: f64,
}

impl Default for EmbeddingMergerConfig {
    fn default() -> Self {
        Self {
            threshold: default_threshold(),
        }
    }
}

pub struct EmbeddingMerger<E: Embedder> {
    cache: EmbeddingCache<E>,
    config: EmbeddingMergerConfig,
}

impl<E: Embedder> EmbeddingMerger<E> {
    pub fn new(embedder: E) -> Self {
        Self {
            cache: EmbeddingCache::new(embedder),
            config: EmbeddingMergerConfig::default(),
        }
    }

    pub fn with_config(embedder: E, config: EmbeddingMergerConfig) -> Result<Self, MergeError> {
        if !(0.0..=1.0).contains(&config.threshold) {
            return Err(MergeError::InvalidParameter(format!(
                "threshold must be within [0, 1], got {}",
                config.threshold
            )));
        }
        Ok(Self {
            cache: EmbeddingCache::new(embedder),
            config,
        })
    }

    pub fn cache(&self) -> &EmbeddingCache<E> {
        &self.cache
    }
}

impl<E: Embedder> NodeMerger for EmbeddingMerger<E> {
    fn find_merge_candidates(&self, graph: &dyn GraphBackend) -> Result<Vec<Vec<String>>, MergeError> {
        let nodes = graph.nodes()?;
        let vectors = self.cache.get_many(&nodes)?;
        let mut grouped = vec![false; nodes.len()];
        let mut groups = Vec::new();

        for i in 0..nodes.len() {
            if grouped[i] {
                continue;
            }
            let anchor = &vectors[&nodes[i]];
            let mut group = vec![nodes[i].clone()];
            for j in (i + 1)..nodes.len() {
                if grouped[j] {
                    continue;
                }
                if cosine_similarity(anchor, &vectors[&nodes[j]]) >= self.config.threshold {
                    group.push(nodes[j].clone());
                    grouped[j] = true;
                }
            }
            if group.len() > 1 {
                grouped[i] = true;
                groups.push(group);
            }
        }
        Ok(groups)
    }

    fn generate_merged_name(
        &self,
        group: &[String],
        graph: &dyn GraphBackend,
    ) -> Result<String, MergeError> {
        most_provenance(group, graph)
    }
}
