//! Case-insensitive exact-match merging.

use crate::merger::{most_provenance, MergeError, NodeMerger};
use crate::union_find::UnionFind;
use kg_graph::GraphBackend;
use std::collections::HashMap;

/// Groups nodes whose lowercase names are identical.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExactMatchMerger;

impl ExactMatchMerger {
    pub fn new() -> Self {
        Self
    }
}

impl NodeMerger for ExactMatchMerger {
    fn find_merge_candidates(&self, graph: &dyn GraphBackend) -> Result<Vec<Vec<String>>, MergeError> {
        let nodes = graph.nodes()?;
        let mut uf = UnionFind::new(nodes.len());
        let mut first_by_key: HashMap<String, usize> = HashMap::new();
        for (i, node) in nodes.iter().enumerate() {
            let first = *first_by_key.entry(node.to_lowercase()).or_insert(i);
            uf.union(first, i);
        }
        Ok(uf
            .groups()
            .into_iter()
            .map(|g| g.into_iter().map(|i| nodes[i].clone()).collect())
            .collect())
    }

    fn generate_merged_name(
        &self,
        group: &[String],
        graph: &dyn GraphBackend,
    ) -> Result<String, MergeError> {
        most_provenance(group, graph)
    }
}
