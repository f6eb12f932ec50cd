//! Merger interface and the driver that applies it to a graph.

use kg_graph::{GraphBackend, KnowledgeGraph};
use kg_types::{source_count, GraphStoreError, OracleError};
use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum MergeError {
    #[error(transparent)]
    Graph(#[from] GraphStoreError),
    #[error(transparent)]
    Oracle(#[from] OracleError),
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
}

/// Strategy that finds groups of equivalent nodes and names the merged node.
pub trait NodeMerger {
    /// Disjoint groups of at least two node ids, members in graph order.
    fn find_merge_candidates(&self, graph: &dyn GraphBackend) -> Result<Vec<Vec<String>>, MergeError>;

    fn generate_merged_name(
        &self,
        group: &[String],
        graph: &dyn GraphBackend,
    ) -> Result<String, MergeError>;
}

/// Member with the most provenance records; ties go to the earliest member.
pub fn most_provenance(group: &[String], graph: &dyn GraphBackend) -> Result<String, MergeError> {
    let mut best: Option<(&String, usize)> = None;
    for member in group {
        let count = graph
            .node_attrs(member)?
            .map(|attrs| source_count(&attrs))
            .unwrap_or(0);
        if best.map_or(true, |(_, top)| count > top) {
            best = Some((member, count));
        }
    }
    best.map(|(name, _)| name.clone())
        .ok_or_else(|| MergeError::InvalidParameter("empty merge group".to_string()))
}

/// Outcome of one merge pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MergeReport {
    pub groups: usize,
    pub nodes_removed: usize,
    pub nodes_before: usize,
    pub nodes_after: usize,
    pub edges_before: usize,
    pub edges_after: usize,
}

/// Find candidate groups with `merger` and fold each into its merged name.
pub fn merge_similar_nodes<B: GraphBackend>(
    graph: &mut KnowledgeGraph<B>,
    merger: &dyn NodeMerger,
) -> Result<MergeReport, MergeError> {
    let before = graph.stats()?;
    let groups = merger.find_merge_candidates(graph.backend())?;

    let mut nodes_removed = 0;
    for group in &groups {
        let name = merger.generate_merged_name(group, graph.backend())?;
        tracing::debug!(members = ?group, merged = %name, "merging node group");
        nodes_removed += graph.merge_nodes(group, &name)?;
    }

    let after = graph.stats()?;
    let report = MergeReport {
        groups: groups.len(),
        nodes_removed,
        nodes_before: before.node_count,
        nodes_after: after.node_count,
        edges_before: before.edge_count,
        edges_after: after.edge_count,
    };
    tracing::info!(
        groups = report.groups,
        nodes_removed = report.nodes_removed,
        edges_before = report.edges_before,
        edges_after = report.edges_after,
        "merged similar nodes"
    );
    Ok(report)
}
