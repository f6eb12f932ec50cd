//! Path generator interfaces.

use crate::error::SubgraphError;
use kg_graph::GraphBackend;

/// Produces an ordered node path from `start` to `end`.
///
/// Implementations validate both endpoints first and report a missing one as
/// [`SubgraphError::NodeNotFound`]. A returned path always begins at `start`
/// and ends at `end`; otherwise the call fails with [`SubgraphError::NoPath`].
pub trait PathGenerator {
    fn generate_path(
        &mut self,
        graph: &dyn GraphBackend,
        start: &str,
        end: &str,
    ) -> Result<Vec<String>, SubgraphError>;
}

/// Produces an ordered node path beginning at `start`.
pub trait SingleNodePathGenerator {
    fn generate_path(
        &mut self,
        graph: &dyn GraphBackend,
        start: &str,
    ) -> Result<Vec<String>, SubgraphError>;
}

pub fn validate_node(graph: &dyn GraphBackend, node: &str) -> Result<(), SubgraphError> {
    if !graph.has_node(node)? {
        return Err(SubgraphError::NodeNotFound(node.to_string()));
    }
    Ok(())
}

pub fn validate_nodes(graph: &dyn GraphBackend, start: &str, end: &str) -> Result<(), SubgraphError> {
    validate_node(graph, start)?;
    validate_node(graph, end)
}
