//! Textual renderings of paths: the Cypher-like pattern list and the
//! `Current path:` line shown to decision oracles.

use kg_graph::GraphBackend;
use kg_types::{relation_of, GraphStoreError, Relationship, UNKNOWN_RELATION};
use std::fmt::Write;

/// How two consecutive path nodes are joined in the graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkKind {
    /// Edge `from -> to` with this relation.
    Forward(String),
    /// Edge `to -> from` with this relation.
    Backward(String),
    Unlinked,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathLink {
    pub from: String,
    pub to: String,
    pub kind: LinkKind,
}

impl PathLink {
    /// The link as a relationship in true edge direction; unlinked pairs keep
    /// path order and get `unknown_relation`.
    pub fn to_relationship(&self) -> Relationship {
        match &self.kind {
            LinkKind::Forward(relation) => {
                Relationship::new(self.from.clone(), relation.clone(), self.to.clone())
            }
            LinkKind::Backward(relation) => {
                Relationship::new(self.to.clone(), relation.clone(), self.from.clone())
            }
            LinkKind::Unlinked => {
                Relationship::new(self.from.clone(), UNKNOWN_RELATION, self.to.clone())
            }
        }
    }
}

fn relation(graph: &dyn GraphBackend, source: &str, target: &str) -> Result<String, GraphStoreError> {
    Ok(graph
        .edge_attrs(source, target)?
        .as_ref()
        .and_then(relation_of)
        .unwrap_or_default()
        .to_string())
}

/// One link per consecutive pair; a forward edge wins over a backward one.
pub fn path_links(graph: &dyn GraphBackend, path: &[String]) -> Result<Vec<PathLink>, GraphStoreError> {
    let mut links = Vec::with_capacity(path.len().saturating_sub(1));
    for pair in path.windows(2) {
        let (from, to) = (&pair[0], &pair[1]);
        let kind = if graph.has_edge(from, to)? {
            LinkKind::Forward(relation(graph, from, to)?)
        } else if graph.has_edge(to, from)? {
            LinkKind::Backward(relation(graph, to, from)?)
        } else {
            LinkKind::Unlinked
        };
        links.push(PathLink {
            from: from.clone(),
            to: to.clone(),
            kind,
        });
    }
    Ok(links)
}

/// `Current path: A -[r]-> B <-[r]- C -- D`
pub fn describe_path(graph: &dyn GraphBackend, path: &[String]) -> Result<String, GraphStoreError> {
    let mut out = String::from("Current path:");
    if let Some(first) = path.first() {
        let _ = write!(out, " {}", first);
    }
    for link in path_links(graph, path)? {
        let _ = match &link.kind {
            LinkKind::Forward(r) => write!(out, " -[{}]-> {}", r, link.to),
            LinkKind::Backward(r) => write!(out, " <-[{}]- {}", r, link.to),
            LinkKind::Unlinked => write!(out, " -- {}", link.to),
        };
    }
    Ok(out)
}

/// `(a)-[:r]->(b),\n(b)-[:s]->(c)`
pub fn to_cypher(relationships: &[Relationship]) -> String {
    relationships
        .iter()
        .map(Relationship::to_string)
        .collect::<Vec<_>>()
        .join(",\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use kg_graph::{InMemoryGraph, KnowledgeGraph, Triplet};

    fn path(nodes: &[&str]) -> Vec<String> {
        nodes.iter().map(|n| n.to_string()).collect()
    }

    fn graph() -> KnowledgeGraph {
        let triplets = [
            Triplet::new("A", "connects_to", "B"),
            Triplet::new("C", "leads_to", "B"),
        ];
        KnowledgeGraph::from_triplets(InMemoryGraph::new(), &triplets).unwrap()
    }

    #[test]
    fn links_follow_true_direction() {
        let kg = graph();
        let links = path_links(kg.backend(), &path(&["A", "B", "C", "A"])).unwrap();
        let rels: Vec<Relationship> = links.iter().map(PathLink::to_relationship).collect();
        assert_eq!(rels[0], Relationship::new("A", "connects_to", "B"));
        assert_eq!(rels[1], Relationship::new("C", "leads_to", "B"));
        assert_eq!(rels[2], Relationship::new("C", UNKNOWN_RELATION, "A"));
    }

    #[test]
    fn current_path_line() {
        let kg = graph();
        assert_eq!(
            describe_path(kg.backend(), &path(&["A", "B", "C", "A"])).unwrap(),
            "Current path: A -[connects_to]-> B <-[leads_to]- C -- A"
        );
        assert_eq!(
            describe_path(kg.backend(), &path(&["A"])).unwrap(),
            "Current path: A"
        );
    }

    #[test]
    fn cypher_patterns_are_comma_newline_separated() {
        let rels = vec![
            Relationship::new("A", "relates_to", "E"),
            Relationship::new("E", "influences", "D"),
        ];
        assert_eq!(
            to_cypher(&rels),
            "(A)-[:relates_to]->(E),\n(E)-[:influences]->(D)"
        );
        assert_eq!(to_cypher(&[]), "");
    }
}
