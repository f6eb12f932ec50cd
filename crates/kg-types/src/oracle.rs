//! Request and response shapes exchanged with external oracles.

use crate::Relationship;
use serde::{Deserialize, Serialize};
use std::fmt::Write;

/// Direction of the edge connecting the current node to a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeDirection {
    Outgoing,
    Incoming,
}

/// One neighbor the guided walk may step to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NeighborCandidate {
    pub node: String,
    pub relation: String,
    pub direction: EdgeDirection,
}

impl NeighborCandidate {
    fn describe(&self) -> String {
        match self.direction {
            EdgeDirection::Outgoing => {
                format!("{} (outgoing edge: -{}->)", self.node, self.relation)
            }
            EdgeDirection::Incoming => {
                format!("{} (incoming edge: <-{}-)", self.node, self.relation)
            }
        }
    }
}

/// Everything a decision oracle sees at one step of a guided walk.
#[derive(Debug, Clone, PartialEq)]
pub struct WalkStep {
    pub current_node: String,
    pub path: Vec<String>,
    /// `Current path: A -[rel]-> B <-[rel]- C`
    pub path_description: String,
    pub unvisited: Vec<NeighborCandidate>,
    pub visited: Vec<NeighborCandidate>,
}

impl WalkStep {
    pub fn candidates(&self) -> impl Iterator<Item = &NeighborCandidate> {
        self.unvisited.iter().chain(self.visited.iter())
    }

    pub fn is_candidate(&self, node: &str) -> bool {
        self.candidates().any(|c| c.node == node)
    }

    /// Numbered listing of unvisited then visited neighbors.
    pub fn describe_neighbors(&self) -> String {
        let mut out = String::from("Available neighbors:\n");
        if self.unvisited.is_empty() {
            out.push_str("No unvisited neighbors available.\n");
        } else {
            out.push_str("Neighbors not yet visited:\n");
            for (i, candidate) in self.unvisited.iter().enumerate() {
                let _ = writeln!(out, "{}. {}", i + 1, candidate.describe());
            }
        }
        if !self.visited.is_empty() {
            out.push_str("\nNeighbors already visited (can be revisited):\n");
            for (i, candidate) in self.visited.iter().enumerate() {
                let _ = writeln!(out, "{}. {}", i + 1, candidate.describe());
            }
        }
        out
    }
}

/// A node and the relationships it takes part in, as shown to a merge oracle.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeContext {
    pub name: String,
    pub relationships: Vec<Relationship>,
}

/// Input for a path-quality judgement.
#[derive(Debug, Clone, PartialEq)]
pub struct PathScoreRequest {
    pub start_node: String,
    pub end_node: String,
    /// Cypher-like rendering of the subgraph.
    pub graph_str: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathScore {
    pub score: f64,
    pub justification: String,
}

/// Replaces each `{name}` in `template` with its value in one left-to-right
/// pass. Substituted text is never rescanned, and unknown placeholders are
/// kept verbatim.
pub fn fill_prompt(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let tail = &rest[open..];
        let value = tail.find('}').and_then(|close| {
            let name = &tail[1..close];
            values
                .iter()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| (*value, close))
        });
        match value {
            Some((value, close)) => {
                out.push_str(value);
                rest = &tail[close + 1..];
            }
            None => {
                out.push('{');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}
