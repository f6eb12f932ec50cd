//! Walks steered by an external decision oracle.

use crate::config::{seeded_rng, GuidedWalkConfig};
use crate::cypher::describe_path;
use crate::error::SubgraphError;
use crate::generator::{validate_node, SingleNodePathGenerator};
use kg_graph::GraphBackend;
use kg_types::{relation_of, DecisionOracle, EdgeDirection, NeighborCandidate, WalkStep};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use std::collections::HashSet;

/// Neighbors of `node` split into (unvisited, visited). Outgoing edges come
/// first; a predecessor that is also a successor is listed once, as outgoing.
pub fn neighbor_candidates(
    graph: &dyn GraphBackend,
    node: &str,
    visited: &HashSet<String>,
) -> Result<(Vec<NeighborCandidate>, Vec<NeighborCandidate>), SubgraphError> {
    let mut fresh = Vec::new();
    let mut seen = Vec::new();
    let mut push = |other: String, relation: String, direction: EdgeDirection| {
        let candidate = NeighborCandidate {
            node: other,
            relation,
            direction,
        };
        if visited.contains(&candidate.node) {
            seen.push(candidate);
        } else {
            fresh.push(candidate);
        }
    };

    for edge in graph.out_edges(node)? {
        let relation = relation_of(&edge.attributes).unwrap_or_default().to_string();
        push(edge.target, relation, EdgeDirection::Outgoing);
    }
    for edge in graph.in_edges(node)? {
        if graph.has_edge(node, &edge.source)? {
            continue;
        }
        let relation = relation_of(&edge.attributes).unwrap_or_default().to_string();
        push(edge.source, relation, EdgeDirection::Incoming);
    }
    Ok((fresh, seen))
}

/// Single-endpoint walk where each step is chosen by a [`DecisionOracle`].
///
/// The oracle's answer is accepted only if it names one of the offered
/// neighbors; otherwise a random unvisited neighbor is taken (a random
/// visited one when all have been seen). Revisits are allowed. The walk ends
/// after `max_steps`, at a node with no neighbors, or at a node whose only
/// neighbor is itself.
pub struct GuidedWalkGenerator<O: DecisionOracle> {
    oracle: O,
    config: GuidedWalkConfig,
    rng: StdRng,
}

impl<O: DecisionOracle> GuidedWalkGenerator<O> {
    pub fn new(oracle: O) -> Self {
        Self::with_config(oracle, GuidedWalkConfig::default())
    }

    pub fn with_config(oracle: O, config: GuidedWalkConfig) -> Self {
        let rng = seeded_rng(config.seed);
        Self {
            oracle,
            config,
            rng,
        }
    }

    pub fn oracle(&self) -> &O {
        &self.oracle
    }

    fn fallback(&mut self, step: &WalkStep) -> Option<String> {
        let pool = if step.unvisited.is_empty() {
            &step.visited
        } else {
            &step.unvisited
        };
        pool.choose(&mut self.rng).map(|c| c.node.clone())
    }
}

impl<O: DecisionOracle> SingleNodePathGenerator for GuidedWalkGenerator<O> {
    fn generate_path(
        &mut self,
        graph: &dyn GraphBackend,
        start: &str,
    ) -> Result<Vec<String>, SubgraphError> {
        validate_node(graph, start)?;
        let mut path = vec![start.to_string()];
        let mut visited = HashSet::from([start.to_string()]);

        for _ in 0..self.config.max_steps {
            let current = path[path.len() - 1].clone();
            let (unvisited, seen) = neighbor_candidates(graph, &current, &visited)?;
            let only_self = unvisited.len() + seen.len() == 1
                && unvisited.iter().chain(seen.iter()).all(|c| c.node == current);
            if (unvisited.is_empty() && seen.is_empty()) || only_self {
                break;
            }

            let step = WalkStep {
                current_node: current.clone(),
                path: path.clone(),
                path_description: describe_path(graph, &path)?,
                unvisited,
                visited: seen,
            };
            let next = match self.oracle.decide(&step)? {
                Some(choice) if step.is_candidate(&choice) => Some(choice),
                Some(choice) => {
                    tracing::warn!(node = %current, choice = %choice, "oracle chose a non-neighbor, falling back");
                    self.fallback(&step)
                }
                None => {
                    tracing::warn!(node = %current, "oracle answer unusable, falling back");
                    self.fallback(&step)
                }
            };
            let next = match next {
                Some(next) => next,
                None => break,
            };
            tracing::debug!(from = %current, to = %next, "guided step");
            visited.insert(next.clone());
            path.push(next);
        }
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kg_graph::{InMemoryGraph, KnowledgeGraph, Triplet};
    use kg_types::OracleError;
    use std::sync::Mutex;

    /// Answers from a queue and records every step it was shown.
    struct Scripted {
        answers: Mutex<Vec<Option<String>>>,
        seen: Mutex<Vec<WalkStep>>,
    }

    impl Scripted {
        fn new(answers: &[Option<&str>]) -> Self {
            let mut answers: Vec<Option<String>> =
                answers.iter().map(|a| a.map(str::to_string)).collect();
            answers.reverse();
            Self {
                answers: Mutex::new(answers),
                seen: Mutex::new(Vec::new()),
            }
        }

        fn steps(&self) -> Vec<WalkStep> {
            self.seen.lock().unwrap().clone()
        }
    }

    impl DecisionOracle for Scripted {
        fn decide(&self, step: &WalkStep) -> Result<Option<String>, OracleError> {
            self.seen.lock().unwrap().push(step.clone());
            Ok(self.answers.lock().unwrap().pop().flatten())
        }
    }

    fn sample() -> KnowledgeGraph {
        let triplets = [
            Triplet::new("A", "connects_to", "B"),
            Triplet::new("B", "leads_to", "C"),
            Triplet::new("C", "results_in", "D"),
            Triplet::new("A", "relates_to", "E"),
            Triplet::new("E", "influences", "D"),
            Triplet::new("B", "interacts_with", "F"),
            Triplet::new("G", "affects", "C"),
            Triplet::new("H", "leads_to", "A"),
        ];
        KnowledgeGraph::from_triplets(InMemoryGraph::new(), &triplets).unwrap()
    }

    fn config(max_steps: usize) -> GuidedWalkConfig {
        GuidedWalkConfig {
            max_steps,
            seed: Some(42),
        }
    }

    #[test]
    fn follows_valid_choices_and_revisits() {
        let kg = sample();
        let oracle = Scripted::new(&[Some("B"), Some("C"), Some("B")]);
        let mut walk = GuidedWalkGenerator::with_config(oracle, config(3));
        let path = walk.generate_path(kg.backend(), "A").unwrap();
        assert_eq!(path, vec!["A", "B", "C", "B"]);

        let steps = walk.oracle().steps();
        assert_eq!(steps.len(), 3);
        assert_eq!(steps[0].current_node, "A");
        assert_eq!(steps[0].path_description, "Current path: A");
        let first: Vec<_> = steps[0].unvisited.iter().map(|c| c.node.as_str()).collect();
        assert_eq!(first, vec!["B", "E", "H"]);
        assert_eq!(steps[0].unvisited[2].direction, EdgeDirection::Incoming);
        assert_eq!(
            steps[2].path_description,
            "Current path: A -[connects_to]-> B -[leads_to]-> C"
        );
        // B was visited by the time the walk stood on C
        assert!(steps[2].visited.iter().any(|c| c.node == "B"));
    }

    #[test]
    fn invalid_or_missing_answers_fall_back_to_random_neighbors() {
        let kg = sample();
        let oracle = Scripted::new(&[Some("Z"), None]);
        let mut walk = GuidedWalkGenerator::with_config(oracle, config(2));
        let path = walk.generate_path(kg.backend(), "A").unwrap();
        assert_eq!(path.len(), 3);
        let steps = walk.oracle().steps();
        for (i, step) in steps.iter().enumerate() {
            let chosen = &path[i + 1];
            let pool = if step.unvisited.is_empty() {
                &step.visited
            } else {
                &step.unvisited
            };
            assert!(pool.iter().any(|c| &c.node == chosen));
        }
    }

    #[test]
    fn self_loop_only_node_stops_immediately() {
        let kg = KnowledgeGraph::from_triplets(
            InMemoryGraph::new(),
            &[Triplet::new("isolated", "self_loop", "isolated")],
        )
        .unwrap();
        let oracle = Scripted::new(&[Some("isolated")]);
        let mut walk = GuidedWalkGenerator::with_config(oracle, config(3));
        assert_eq!(walk.generate_path(kg.backend(), "isolated").unwrap(), vec!["isolated"]);
        assert!(walk.oracle().steps().is_empty());
    }

    #[test]
    fn mutual_edges_are_listed_once() {
        let kg = KnowledgeGraph::from_triplets(
            InMemoryGraph::new(),
            &[Triplet::new("A", "likes", "B"), Triplet::new("B", "likes", "A")],
        )
        .unwrap();
        let (fresh, seen) = neighbor_candidates(kg.backend(), "A", &HashSet::new()).unwrap();
        assert_eq!(fresh.len(), 1);
        assert_eq!(fresh[0].direction, EdgeDirection::Outgoing);
        assert!(seen.is_empty());
    }

    #[test]
    fn oracle_errors_propagate() {
        struct Down;
        impl DecisionOracle for Down {
            fn decide(&self, _: &WalkStep) -> Result<Option<String>, OracleError> {
                Err(OracleError::EmptyResponse)
            }
        }
        let kg = sample();
        let mut walk = GuidedWalkGenerator::new(Down);
        assert!(matches!(
            walk.generate_path(kg.backend(), "A"),
            Err(SubgraphError::Oracle(OracleError::EmptyResponse))
        ));
    }
}
