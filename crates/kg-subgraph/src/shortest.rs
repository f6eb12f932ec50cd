//! Fewest-hop path search between two nodes.

use crate::error::SubgraphError;
use crate::generator::{validate_nodes, PathGenerator};
use kg_graph::GraphBackend;

/// Fewest-hop path, ignoring edge direction.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShortestPathGenerator;

impl ShortestPathGenerator {
    pub fn new() -> Self {
        Self
    }
}

impl PathGenerator for ShortestPathGenerator {
    fn generate_path(
        &mut self,
        graph: &dyn GraphBackend,
        start: &str,
        end: &str,
    ) -> Result<Vec<String>, SubgraphError> {
        validate_nodes(graph, start, end)?;
        let path = graph.shortest_path(start, end, false)?;
        tracing::debug!(start = %start, end = %end, hops = path.len() - 1, "shortest path");
        Ok(path)
    }
}
