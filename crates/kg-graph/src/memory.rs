//! In-memory graph backend.

use crate::normalize::{canonical_edge_attrs, canonical_node_attrs, edge_patch, merge_attrs};
use crate::snapshot::EdgeRecord;
use crate::store::GraphBackend;
use kg_types::{Attrs, GraphStoreError};
use std::collections::HashMap;

type EdgeKey = (String, String);
type Adjacency = HashMap<String, Vec<String>>;

#[derive(Debug, Clone)]
struct Slot {
    /// Insertion sequence; listings are ordered by it.
    seq: u64,
    attrs: Attrs,
}

/// In-memory implementation of [`GraphBackend`].
#[derive(Debug, Clone, Default)]
pub struct InMemoryGraph {
    nodes: HashMap<String, Slot>,
    edges: HashMap<EdgeKey, Slot>,
    /// source -> targets, in edge insertion order.
    out_index: Adjacency,
    /// target -> sources, in edge insertion order.
    in_index: Adjacency,
    next_seq: u64,
}

impl InMemoryGraph {
    pub fn new() -> Self {
        Self::default()
    }

    fn bump(&mut self) -> u64 {
        self.next_seq += 1;
        self.next_seq
    }

    fn key(source: &str, target: &str) -> EdgeKey {
        (source.to_string(), target.to_string())
    }

    fn add_to_index(index: &mut Adjacency, node_id: &str, other: &str) {
        let list = index.entry(node_id.to_string()).or_default();
        if !list.iter().any(|x| x == other) {
            list.push(other.to_string());
        }
    }

    fn remove_from_index(index: &mut Adjacency, node_id: &str, other: &str) {
        if let Some(list) = index.get_mut(node_id) {
            list.retain(|x| x != other);
            if list.is_empty() {
                index.remove(node_id);
            }
        }
    }

    fn edge_record(&self, source: &str, target: &str) -> Option<EdgeRecord> {
        self.edges
            .get(&Self::key(source, target))
            .map(|slot| EdgeRecord {
                source: source.to_string(),
                target: target.to_string(),
                attributes: slot.attrs.clone(),
            })
    }
}

impl GraphBackend for InMemoryGraph {
    fn add_node(&mut self, id: &str, attrs: Attrs) -> Result<(), GraphStoreError> {
        if let Some(slot) = self.nodes.get_mut(id) {
            let mut merged = std::mem::take(&mut slot.attrs);
            merge_attrs(&mut merged, attrs);
            slot.attrs = canonical_node_attrs(merged);
            return Ok(());
        }
        let seq = self.bump();
        self.nodes.insert(
            id.to_string(),
            Slot {
                seq,
                attrs: canonical_node_attrs(attrs),
            },
        );
        Ok(())
    }

    fn has_node(&self, id: &str) -> Result<bool, GraphStoreError> {
        Ok(self.nodes.contains_key(id))
    }

    fn add_edge(
        &mut self,
        source: &str,
        target: &str,
        attrs: Attrs,
    ) -> Result<(), GraphStoreError> {
        for id in [source, target] {
            if !self.nodes.contains_key(id) {
                self.add_node(id, Attrs::new())?;
            }
        }
        let key = Self::key(source, target);
        if let Some(slot) = self.edges.get_mut(&key) {
            let mut merged = std::mem::take(&mut slot.attrs);
            merge_attrs(&mut merged, edge_patch(attrs));
            slot.attrs = canonical_edge_attrs(merged);
            return Ok(());
        }
        let seq = self.bump();
        self.edges.insert(
            key,
            Slot {
                seq,
                attrs: canonical_edge_attrs(attrs),
            },
        );
        Self::add_to_index(&mut self.out_index, source, target);
        Self::add_to_index(&mut self.in_index, target, source);
        Ok(())
    }

    fn has_edge(&self, source: &str, target: &str) -> Result<bool, GraphStoreError> {
        Ok(self.edges.contains_key(&Self::key(source, target)))
    }

    fn node_attrs(&self, id: &str) -> Result<Option<Attrs>, GraphStoreError> {
        Ok(self.nodes.get(id).map(|slot| slot.attrs.clone()))
    }

    fn edge_attrs(&self, source: &str, target: &str) -> Result<Option<Attrs>, GraphStoreError> {
        Ok(self
            .edges
            .get(&Self::key(source, target))
            .map(|slot| slot.attrs.clone()))
    }

    fn set_node_attrs(&mut self, id: &str, attrs: Attrs) -> Result<(), GraphStoreError> {
        let slot = self
            .nodes
            .get_mut(id)
            .ok_or_else(|| GraphStoreError::NodeNotFound(id.to_string()))?;
        slot.attrs = canonical_node_attrs(attrs);
        Ok(())
    }

    fn set_edge_attrs(
        &mut self,
        source: &str,
        target: &str,
        attrs: Attrs,
    ) -> Result<(), GraphStoreError> {
        let slot = self
            .edges
            .get_mut(&Self::key(source, target))
            .ok_or_else(|| GraphStoreError::EdgeNotFound {
                from: source.to_string(),
                to: target.to_string(),
            })?;
        slot.attrs = canonical_edge_attrs(attrs);
        Ok(())
    }

    fn remove_node(&mut self, id: &str) -> Result<(), GraphStoreError> {
        if self.nodes.remove(id).is_none() {
            return Err(GraphStoreError::NodeNotFound(id.to_string()));
        }
        let targets = self.out_index.remove(id).unwrap_or_default();
        let sources = self.in_index.remove(id).unwrap_or_default();
        for target in targets {
            self.edges.remove(&Self::key(id, &target));
            if target != id {
                Self::remove_from_index(&mut self.in_index, &target, id);
            }
        }
        for source in sources {
            self.edges.remove(&Self::key(&source, id));
            if source != id {
                Self::remove_from_index(&mut self.out_index, &source, id);
            }
        }
        Ok(())
    }

    fn nodes(&self) -> Result<Vec<String>, GraphStoreError> {
        let mut ordered: Vec<(&String, u64)> =
            self.nodes.iter().map(|(id, slot)| (id, slot.seq)).collect();
        ordered.sort_by_key(|(_, seq)| *seq);
        Ok(ordered.into_iter().map(|(id, _)| id.clone()).collect())
    }

    fn edges(&self) -> Result<Vec<EdgeRecord>, GraphStoreError> {
        let mut ordered: Vec<(&EdgeKey, &Slot)> = self.edges.iter().collect();
        ordered.sort_by_key(|(_, slot)| slot.seq);
        Ok(ordered
            .into_iter()
            .map(|((source, target), slot)| EdgeRecord {
                source: source.clone(),
                target: target.clone(),
                attributes: slot.attrs.clone(),
            })
            .collect())
    }

    fn successors(&self, id: &str) -> Result<Vec<String>, GraphStoreError> {
        Ok(self.out_index.get(id).cloned().unwrap_or_default())
    }

    fn predecessors(&self, id: &str) -> Result<Vec<String>, GraphStoreError> {
        Ok(self.in_index.get(id).cloned().unwrap_or_default())
    }

    fn out_edges(&self, id: &str) -> Result<Vec<EdgeRecord>, GraphStoreError> {
        Ok(self
            .out_index
            .get(id)
            .map(|targets| {
                targets
                    .iter()
                    .filter_map(|t| self.edge_record(id, t))
                    .collect()
            })
            .unwrap_or_default())
    }

    fn in_edges(&self, id: &str) -> Result<Vec<EdgeRecord>, GraphStoreError> {
        Ok(self
            .in_index
            .get(id)
            .map(|sources| {
                sources
                    .iter()
                    .filter_map(|s| self.edge_record(s, id))
                    .collect()
            })
            .unwrap_or_default())
    }

    fn node_count(&self) -> Result<usize, GraphStoreError> {
        Ok(self.nodes.len())
    }

    fn edge_count(&self) -> Result<usize, GraphStoreError> {
        Ok(self.edges.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn relation(r: &str) -> Attrs {
        json!({ "relation": r }).as_object().cloned().unwrap()
    }

    /// A->B->C->D, A->E->D, B->F, G->C, H->A
    fn sample() -> InMemoryGraph {
        let mut g = InMemoryGraph::new();
        for (s, t) in [
            ("A", "B"),
            ("B", "C"),
            ("C", "D"),
            ("A", "E"),
            ("E", "D"),
            ("B", "F"),
            ("G", "C"),
            ("H", "A"),
        ] {
            g.add_edge(s, t, relation("relates_to")).unwrap();
        }
        g
    }

    #[test]
    fn shortest_path_finds_min_hops() {
        let g = sample();
        assert_eq!(g.shortest_path("A", "D", false).unwrap(), vec!["A", "E", "D"]);
        assert_eq!(g.shortest_path("A", "D", true).unwrap(), vec!["A", "E", "D"]);
        assert_eq!(g.shortest_path("D", "H", false).unwrap(), vec!["D", "E", "A", "H"]);
        assert!(matches!(
            g.shortest_path("D", "H", true),
            Err(GraphStoreError::NoPath { .. })
        ));
        assert!(matches!(
            g.shortest_path("A", "Z", false),
            Err(GraphStoreError::NodeNotFound(id)) if id == "Z"
        ));
        assert_eq!(g.shortest_path("A", "A", false).unwrap(), vec!["A"]);
    }

    #[test]
    fn listings_follow_insertion_order() {
        let g = sample();
        assert_eq!(
            g.nodes().unwrap(),
            vec!["A", "B", "C", "D", "E", "F", "G", "H"]
        );
        assert_eq!(g.successors("A").unwrap(), vec!["B", "E"]);
        assert_eq!(g.predecessors("C").unwrap(), vec!["B", "G"]);
        assert_eq!(g.neighbors("A").unwrap(), vec!["B", "E", "H"]);
    }

    #[test]
    fn add_edge_merges_instead_of_duplicating() {
        let mut g = InMemoryGraph::new();
        g.add_edge("a", "b", relation("binds")).unwrap();
        let mut patch = Attrs::new();
        patch.insert("weight".to_string(), json!(3));
        g.add_edge("a", "b", patch).unwrap();

        assert_eq!(g.edge_count().unwrap(), 1);
        let attrs = g.edge_attrs("a", "b").unwrap().unwrap();
        assert_eq!(attrs["relation"], json!("binds"));
        assert_eq!(attrs["weight"], json!(3));
    }

    #[test]
    fn remove_node_cascades_including_self_loops() {
        let mut g = sample();
        g.add_edge("B", "B", relation("self")).unwrap();
        g.remove_node("B").unwrap();

        assert!(!g.has_node("B").unwrap());
        assert!(!g.has_edge("A", "B").unwrap());
        assert!(!g.has_edge("B", "C").unwrap());
        assert_eq!(g.edge_count().unwrap(), 5);
        assert_eq!(g.successors("A").unwrap(), vec!["E"]);
        assert!(g.predecessors("C").unwrap() == vec!["G"]);
        assert!(matches!(
            g.remove_node("B"),
            Err(GraphStoreError::NodeNotFound(_))
        ));
    }

    #[test]
    fn neighbor_relations_list_outgoing_then_incoming() {
        let g = sample();
        let rels = g.neighbor_relations("A").unwrap();
        let rendered: Vec<String> = rels.iter().map(|r| r.to_string()).collect();
        assert_eq!(
            rendered,
            vec![
                "(A)-[:relates_to]->(B)",
                "(A)-[:relates_to]->(E)",
                "(H)-[:relates_to]->(A)"
            ]
        );
    }
}
