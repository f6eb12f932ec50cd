//! Jittered shortest paths with random detours.

use crate::config::{seeded_rng, RandomizedPathConfig};
use crate::error::SubgraphError;
use crate::generator::{validate_nodes, PathGenerator};
use kg_graph::GraphBackend;
use kg_types::GraphStoreError;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::Rng;
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashSet};

/// Queue entry ordered so the smallest priority pops first.
struct Candidate {
    priority: f64,
    hops: usize,
    node: String,
    path: Vec<String>,
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Candidate {}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .priority
            .total_cmp(&self.priority)
            .then_with(|| other.node.cmp(&self.node))
    }
}

/// Uniform-cost search over the undirected graph where each candidate's
/// priority is its hop count plus `randomness_factor * U(0, 1)`, followed by
/// an optional detour through up to `num_random_waypoints` neighbors of the
/// initial path. With `randomness_factor = 0` the first leg is a plain
/// shortest path.
pub struct RandomizedEmbeddingPathGenerator {
    config: RandomizedPathConfig,
    rng: StdRng,
}

impl RandomizedEmbeddingPathGenerator {
    pub fn new(config: RandomizedPathConfig) -> Self {
        let config = config.clamped();
        let rng = seeded_rng(config.seed);
        Self { config, rng }
    }

    pub fn config(&self) -> &RandomizedPathConfig {
        &self.config
    }

    fn jittered_search(
        &mut self,
        graph: &dyn GraphBackend,
        start: &str,
        end: &str,
    ) -> Result<Option<Vec<String>>, SubgraphError> {
        let mut queue = BinaryHeap::new();
        let mut settled: HashSet<String> = HashSet::new();
        queue.push(Candidate {
            priority: 0.0,
            hops: 0,
            node: start.to_string(),
            path: Vec::new(),
        });

        while let Some(Candidate {
            hops, node, mut path, ..
        }) = queue.pop()
        {
            if !settled.insert(node.clone()) {
                continue;
            }
            path.push(node.clone());
            if node == end {
                return Ok(Some(path));
            }

            let mut neighbors = graph.neighbors(&node)?;
            neighbors.shuffle(&mut self.rng);
            for neighbor in neighbors {
                if settled.contains(&neighbor) {
                    continue;
                }
                let jitter: f64 = self.rng.gen();
                queue.push(Candidate {
                    priority: (hops + 1) as f64 + self.config.randomness_factor * jitter,
                    hops: hops + 1,
                    node: neighbor,
                    path: path.clone(),
                });
            }
        }
        Ok(None)
    }

    /// Undirected shortest leg, or `None` when the two nodes are disconnected.
    fn leg(
        graph: &dyn GraphBackend,
        from: &str,
        to: &str,
    ) -> Result<Option<Vec<String>>, SubgraphError> {
        match graph.shortest_path(from, to, false) {
            Ok(path) => Ok(Some(path)),
            Err(GraphStoreError::NoPath { .. }) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn add_waypoints(
        &mut self,
        graph: &dyn GraphBackend,
        path: &[String],
        end: &str,
    ) -> Result<Vec<String>, SubgraphError> {
        let on_path: HashSet<&String> = path.iter().collect();
        let mut pool: Vec<String> = Vec::new();
        for node in path {
            for neighbor in graph.neighbors(node)? {
                if !on_path.contains(&neighbor) && !pool.contains(&neighbor) {
                    pool.push(neighbor);
                }
            }
        }
        pool.shuffle(&mut self.rng);
        pool.truncate(self.config.num_random_waypoints);

        let start = &path[0];
        let mut spliced = vec![start.clone()];
        for waypoint in &pool {
            let tail = &spliced[spliced.len() - 1];
            match Self::leg(graph, tail, waypoint)? {
                Some(leg) => spliced.extend(leg.into_iter().skip(1)),
                None => tracing::warn!(waypoint = %waypoint, "waypoint unreachable, skipped"),
            }
        }

        let tail = &spliced[spliced.len() - 1];
        match Self::leg(graph, tail, end)? {
            Some(leg) => spliced.extend(leg.into_iter().skip(1)),
            None => {
                tracing::warn!(end = %end, "target unreachable from last waypoint, using direct route");
                if let Some(direct) = Self::leg(graph, start, end)? {
                    spliced = direct;
                }
            }
        }
        tracing::debug!(waypoints = ?pool, hops = spliced.len() - 1, "spliced waypoints");
        Ok(spliced)
    }
}

impl Default for RandomizedEmbeddingPathGenerator {
    fn default() -> Self {
        Self::new(RandomizedPathConfig::default())
    }
}

impl PathGenerator for RandomizedEmbeddingPathGenerator {
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

        let mut path = if self.config.randomness_factor == 0.0 {
            graph.shortest_path(start, end, false)?
        } else {
            self.jittered_search(graph, start, end)?
                .ok_or_else(|| SubgraphError::no_path(start, end))?
        };

        if self.config.num_random_waypoints > 0 {
            path = self.add_waypoints(graph, &path, end)?;
        }

        let valid = path.first().map(String::as_str) == Some(start)
            && path.last().map(String::as_str) == Some(end);
        if !valid {
            return Err(SubgraphError::no_path(start, end));
        }
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kg_graph::{InMemoryGraph, KnowledgeGraph, Triplet};

    fn sample() -> KnowledgeGraph {
        let triplets = [
            Triplet::new("A", "connects_to", "B"),
            Triplet::new("B", "leads_to", "C"),
            Triplet::new("C", "results_in", "D"),
            Triplet::new("A", "relates_to", "E"),
            Triplet::new("E", "influences", "D"),
            Triplet::new("B", "interacts_with", "F"),
            Triplet::new("F", "affects", "G"),
            Triplet::new("G", "connects_to", "D"),
            Triplet::new("E", "relates_to", "H"),
            Triplet::new("H", "leads_to", "D"),
        ];
        KnowledgeGraph::from_triplets(InMemoryGraph::new(), &triplets).unwrap()
    }

    fn config(randomness_factor: f64, num_random_waypoints: usize, seed: u64) -> RandomizedPathConfig {
        RandomizedPathConfig {
            randomness_factor,
            num_random_waypoints,
            seed: Some(seed),
        }
    }

    fn assert_walkable(kg: &KnowledgeGraph, path: &[String]) {
        for pair in path.windows(2) {
            let b = kg.backend();
            assert!(b.has_edge(&pair[0], &pair[1]).unwrap() || b.has_edge(&pair[1], &pair[0]).unwrap());
        }
    }

    #[test]
    fn zero_randomness_is_the_shortest_path() {
        let kg = sample();
        let mut gen = RandomizedEmbeddingPathGenerator::new(config(0.0, 0, 42));
        assert_eq!(gen.generate_path(kg.backend(), "A", "D").unwrap(), vec!["A", "E", "D"]);
    }

    #[test]
    fn jitter_keeps_the_path_minimal_in_hops() {
        // jitter < 1 never reorders candidates that differ by a whole hop
        let kg = sample();
        for seed in 0..20 {
            let mut gen = RandomizedEmbeddingPathGenerator::new(config(0.5, 0, seed));
            let path = gen.generate_path(kg.backend(), "A", "D").unwrap();
            assert_eq!(path.len(), 3, "seed {}: {:?}", seed, path);
            assert_walkable(&kg, &path);
        }
    }

    #[test]
    fn waypoints_keep_endpoints_and_adjacency() {
        let kg = sample();
        for seed in 0..20 {
            let mut gen = RandomizedEmbeddingPathGenerator::new(config(0.5, 2, seed));
            let path = gen.generate_path(kg.backend(), "A", "D").unwrap();
            assert_eq!(path.first().map(String::as_str), Some("A"));
            assert_eq!(path.last().map(String::as_str), Some("D"));
            assert_walkable(&kg, &path);
        }
    }

    #[test]
    fn disconnected_endpoints_fail() {
        let triplets = [Triplet::new("A", "r", "B"), Triplet::new("X", "r", "Y")];
        let kg = KnowledgeGraph::from_triplets(InMemoryGraph::new(), &triplets).unwrap();
        for rf in [0.0, 0.7] {
            let mut gen = RandomizedEmbeddingPathGenerator::new(config(rf, 3, 5));
            assert!(matches!(
                gen.generate_path(kg.backend(), "A", "Y"),
                Err(SubgraphError::NoPath { .. })
            ));
        }
    }

    #[test]
    fn missing_endpoint_is_not_found() {
        let kg = sample();
        let mut gen = RandomizedEmbeddingPathGenerator::default();
        assert!(matches!(
            gen.generate_path(kg.backend(), "A", "Z"),
            Err(SubgraphError::NodeNotFound(id)) if id == "Z"
        ));
    }
}
