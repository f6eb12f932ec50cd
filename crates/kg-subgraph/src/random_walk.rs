//! Uniform random walks over the undirected neighborhood.

use crate::config::{seeded_rng, RandomWalkConfig};
use crate::error::SubgraphError;
use crate::generator::{validate_node, validate_nodes, PathGenerator, SingleNodePathGenerator};
use kg_graph::GraphBackend;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

/// One uniformly chosen neighbor (successor or predecessor) of `node`.
fn step(
    graph: &dyn GraphBackend,
    node: &str,
    rng: &mut StdRng,
) -> Result<Option<String>, SubgraphError> {
    Ok(graph.neighbors(node)?.choose(rng).cloned())
}

/// Walks until `end` is hit or `max_steps` steps elapse. If the walk stops
/// next to `end`, the final hop is added; anything else is `NoPath`.
pub struct RandomWalkGenerator {
    config: RandomWalkConfig,
    rng: StdRng,
}

impl RandomWalkGenerator {
    pub fn new(config: RandomWalkConfig) -> Self {
        let rng = seeded_rng(config.seed);
        Self { config, rng }
    }

    pub fn config(&self) -> &RandomWalkConfig {
        &self.config
    }
}

impl Default for RandomWalkGenerator {
    fn default() -> Self {
        Self::new(RandomWalkConfig::default())
    }
}

impl PathGenerator for RandomWalkGenerator {
    fn generate_path(
        &mut self,
        graph: &dyn GraphBackend,
        start: &str,
        end: &str,
    ) -> Result<Vec<String>, SubgraphError> {
        validate_nodes(graph, start, end)?;
        if start == end {
            return Ok(vec![start.to_string()]);
        }

        let mut path = vec![start.to_string()];
        let mut current = start.to_string();
        for _ in 0..self.config.max_steps {
            let next = match step(graph, &current, &mut self.rng)? {
                Some(next) => next,
                None => break,
            };
            path.push(next.clone());
            if next == end {
                tracing::debug!(steps = path.len() - 1, "random walk reached target");
                return Ok(path);
            }
            current = next;
        }

        if graph.neighbors(&current)?.iter().any(|n| n == end) {
            path.push(end.to_string());
            return Ok(path);
        }
        tracing::debug!(
            start = %start,
            end = %end,
            max_steps = self.config.max_steps,
            "random walk did not reach target"
        );
        Err(SubgraphError::no_path(start, end))
    }
}

/// Walks `max_steps` steps from `start`, stopping early at a node with no
/// neighbors. Never fails once `start` exists.
pub struct SingleNodeRandomWalkGenerator {
    config: RandomWalkConfig,
    rng: StdRng,
}

impl SingleNodeRandomWalkGenerator {
    pub fn new(config: RandomWalkConfig) -> Self {
        let rng = seeded_rng(config.seed);
        Self { config, rng }
    }
}

impl Default for SingleNodeRandomWalkGenerator {
    fn default() -> Self {
        Self::new(RandomWalkConfig::default())
    }
}

impl SingleNodePathGenerator for SingleNodeRandomWalkGenerator {
    fn generate_path(
        &mut self,
        graph: &dyn GraphBackend,
        start: &str,
    ) -> Result<Vec<String>, SubgraphError> {
        validate_node(graph, start)?;
        let mut path = vec![start.to_string()];
        for _ in 0..self.config.max_steps {
            let current = &path[path.len() - 1];
            match step(graph, current, &mut self.rng)? {
                Some(next) => path.push(next),
                None => break,
            }
        }
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kg_graph::{InMemoryGraph, KnowledgeGraph, Triplet};

    fn graph(triplets: &[Triplet]) -> KnowledgeGraph {
        KnowledgeGraph::from_triplets(InMemoryGraph::new(), triplets).unwrap()
    }

    fn assert_connected(kg: &KnowledgeGraph, path: &[String]) {
        for pair in path.windows(2) {
            let b = kg.backend();
            assert!(
                b.has_edge(&pair[0], &pair[1]).unwrap() || b.has_edge(&pair[1], &pair[0]).unwrap(),
                "{} and {} are not adjacent",
                pair[0],
                pair[1]
            );
        }
    }

    #[test]
    fn triangle_is_always_crossed() {
        let kg = graph(&[
            Triplet::new("X", "connects_to", "Y"),
            Triplet::new("Y", "connects_to", "Z"),
            Triplet::new("Z", "connects_to", "X"),
        ]);
        for seed in 0..20 {
            let mut walk = RandomWalkGenerator::new(RandomWalkConfig {
                max_steps: 5,
                seed: Some(seed),
            });
            let path = walk.generate_path(kg.backend(), "X", "Z").unwrap();
            assert_eq!(path.first().map(String::as_str), Some("X"));
            assert_eq!(path.last().map(String::as_str), Some("Z"));
            assert_eq!(path.iter().filter(|n| *n == "Z").count(), 1);
            assert_connected(&kg, &path);
        }
    }

    #[test]
    fn zero_steps_only_accepts_a_direct_neighbor() {
        let kg = graph(&[
            Triplet::new("A", "r", "B"),
            Triplet::new("B", "r", "C"),
        ]);
        let mut walk = RandomWalkGenerator::new(RandomWalkConfig {
            max_steps: 0,
            seed: Some(1),
        });
        assert_eq!(walk.generate_path(kg.backend(), "A", "B").unwrap(), vec!["A", "B"]);
        assert!(matches!(
            walk.generate_path(kg.backend(), "A", "C"),
            Err(SubgraphError::NoPath { .. })
        ));
    }

    #[test]
    fn unreachable_target_is_no_path() {
        let kg = graph(&[
            Triplet::new("A", "r", "B"),
            Triplet::new("X", "r", "Y"),
        ]);
        let mut walk = RandomWalkGenerator::new(RandomWalkConfig {
            max_steps: 50,
            seed: Some(3),
        });
        assert!(matches!(
            walk.generate_path(kg.backend(), "A", "Y"),
            Err(SubgraphError::NoPath { .. })
        ));
    }

    #[test]
    fn same_seed_same_walk() {
        let kg = graph(&[
            Triplet::new("A", "r", "B"),
            Triplet::new("A", "r", "C"),
            Triplet::new("B", "r", "C"),
            Triplet::new("C", "r", "D"),
        ]);
        let config = RandomWalkConfig {
            max_steps: 8,
            seed: Some(42),
        };
        let a = SingleNodeRandomWalkGenerator::new(config.clone())
            .generate_path(kg.backend(), "A")
            .unwrap();
        let b = SingleNodeRandomWalkGenerator::new(config)
            .generate_path(kg.backend(), "A")
            .unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 9);
        assert_connected(&kg, &a);
    }

    #[test]
    fn single_node_walk_stops_at_isolated_node() {
        let mut kg = KnowledgeGraph::in_memory();
        kg.ensure_node("lonely").unwrap();
        let path = SingleNodeRandomWalkGenerator::default()
            .generate_path(kg.backend(), "lonely")
            .unwrap();
        assert_eq!(path, vec!["lonely"]);
        assert!(matches!(
            SingleNodeRandomWalkGenerator::default().generate_path(kg.backend(), "missing"),
            Err(SubgraphError::NodeNotFound(_))
        ));
    }
}
