//! Backend-agnostic directed graph storage.

use crate::snapshot::{EdgeRecord, GraphSnapshot, NodeRecord};
use kg_types::{relation_of, Attrs, GraphStoreError, Relationship};
use std::collections::{HashMap, HashSet, VecDeque};

/// Directed graph keyed by string ids, one edge per ordered pair, with an
/// attribute bag on every node and edge.
///
/// Implementations store the canonical attribute shape (see
/// [`canonical_node_attrs`](crate::canonical_node_attrs) and
/// [`canonical_edge_attrs`](crate::canonical_edge_attrs)) and list nodes,
/// edges and neighbors in insertion order, so the same operation sequence
/// yields identical snapshots on every backend.
pub trait GraphBackend: Send + Sync {
    /// Create the node, or shallow-merge `attrs` into the existing bag.
    fn add_node(&mut self, id: &str, attrs: Attrs) -> Result<(), GraphStoreError>;

    fn has_node(&self, id: &str) -> Result<bool, GraphStoreError>;

    /// Create the edge (and any missing endpoint, source first), or
    /// shallow-merge `attrs` into the existing bag.
    fn add_edge(&mut self, source: &str, target: &str, attrs: Attrs)
        -> Result<(), GraphStoreError>;

    fn has_edge(&self, source: &str, target: &str) -> Result<bool, GraphStoreError>;

    fn node_attrs(&self, id: &str) -> Result<Option<Attrs>, GraphStoreError>;

    fn edge_attrs(&self, source: &str, target: &str) -> Result<Option<Attrs>, GraphStoreError>;

    /// Replace the whole bag of an existing node.
    fn set_node_attrs(&mut self, id: &str, attrs: Attrs) -> Result<(), GraphStoreError>;

    /// Replace the whole bag of an existing edge.
    fn set_edge_attrs(
        &mut self,
        source: &str,
        target: &str,
        attrs: Attrs,
    ) -> Result<(), GraphStoreError>;

    /// Remove a node and every incident edge.
    fn remove_node(&mut self, id: &str) -> Result<(), GraphStoreError>;

    fn nodes(&self) -> Result<Vec<String>, GraphStoreError>;

    fn edges(&self) -> Result<Vec<EdgeRecord>, GraphStoreError>;

    /// Unknown ids have no successors.
    fn successors(&self, id: &str) -> Result<Vec<String>, GraphStoreError>;

    /// Unknown ids have no predecessors.
    fn predecessors(&self, id: &str) -> Result<Vec<String>, GraphStoreError>;

    fn out_edges(&self, id: &str) -> Result<Vec<EdgeRecord>, GraphStoreError>;

    fn in_edges(&self, id: &str) -> Result<Vec<EdgeRecord>, GraphStoreError>;

    fn node_count(&self) -> Result<usize, GraphStoreError>;

    fn edge_count(&self) -> Result<usize, GraphStoreError>;

    /// Successors then predecessors, without duplicates.
    fn neighbors(&self, id: &str) -> Result<Vec<String>, GraphStoreError> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for n in self
            .successors(id)?
            .into_iter()
            .chain(self.predecessors(id)?)
        {
            if seen.insert(n.clone()) {
                out.push(n);
            }
        }
        Ok(out)
    }

    /// Relationships the node takes part in: outgoing edges, then incoming.
    fn neighbor_relations(&self, id: &str) -> Result<Vec<Relationship>, GraphStoreError> {
        let mut out = Vec::new();
        for edge in self.out_edges(id)?.into_iter().chain(self.in_edges(id)?) {
            let relation = relation_of(&edge.attributes).unwrap_or_default().to_string();
            out.push(Relationship::new(edge.source, relation, edge.target));
        }
        Ok(out)
    }

    /// Unweighted BFS. With `directed = false` edges are walked both ways.
    fn shortest_path(
        &self,
        source: &str,
        target: &str,
        directed: bool,
    ) -> Result<Vec<String>, GraphStoreError> {
        for id in [source, target] {
            if !self.has_node(id)? {
                return Err(GraphStoreError::NodeNotFound(id.to_string()));
            }
        }
        if source == target {
            return Ok(vec![source.to_string()]);
        }

        let mut prev: HashMap<String, String> = HashMap::new();
        let mut visited: HashSet<String> = HashSet::new();
        let mut queue: VecDeque<String> = VecDeque::new();
        visited.insert(source.to_string());
        queue.push_back(source.to_string());

        while let Some(current) = queue.pop_front() {
            let next = if directed {
                self.successors(&current)?
            } else {
                self.neighbors(&current)?
            };
            for n in next {
                if !visited.insert(n.clone()) {
                    continue;
                }
                prev.insert(n.clone(), current.clone());
                if n == target {
                    let mut path = vec![n];
                    while let Some(p) = prev.get(&path[path.len() - 1]) {
                        path.push(p.clone());
                    }
                    path.reverse();
                    return Ok(path);
                }
                queue.push_back(n);
            }
        }

        Err(GraphStoreError::NoPath {
            from: source.to_string(),
            to: target.to_string(),
        })
    }

    fn to_snapshot(&self) -> Result<GraphSnapshot, GraphStoreError> {
        let mut nodes = Vec::new();
        for id in self.nodes()? {
            let attributes = self.node_attrs(&id)?.unwrap_or_default();
            nodes.push(NodeRecord { id, attributes });
        }
        Ok(GraphSnapshot {
            nodes,
            edges: self.edges()?,
        })
    }

    /// Replay a snapshot through `add_node`/`add_edge`.
    fn load_snapshot(&mut self, snapshot: &GraphSnapshot) -> Result<(), GraphStoreError> {
        for node in &snapshot.nodes {
            self.add_node(&node.id, node.attributes.clone())?;
        }
        for edge in &snapshot.edges {
            self.add_edge(&edge.source, &edge.target, edge.attributes.clone())?;
        }
        Ok(())
    }
}
