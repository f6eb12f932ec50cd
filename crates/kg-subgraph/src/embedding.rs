//! Best-first search guided by node distances to the target.
//!
//! The search is an explicit stack of [`SearchFrame`]s, one per path node,
//! each holding that node's neighbors ranked by distance to the target. A
//! step either advances to one of the `top_k` best unvisited candidates,
//! backtracks off a dead end (marking it visited), or stops.

use crate::config::{seeded_rng, EmbeddingPathConfig};
use crate::error::SubgraphError;
use crate::generator::{validate_nodes, PathGenerator};
use kg_graph::GraphBackend;
use kg_types::NodeDistance;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::HashSet;

/// A node on the current path and its neighbors, closest to the target first.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchFrame {
    pub node: String,
    pub ranked: Vec<(String, f64)>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchStep {
    Advanced(String),
    /// The named dead end was popped and marked visited.
    Backtracked(String),
    Reached,
    /// Backtracking emptied the path.
    Exhausted,
    /// The path grew past the step bound.
    LimitExceeded,
}

/// State of one search from a start node towards `target`.
#[derive(Debug, Clone)]
pub struct EmbeddingSearch {
    target: String,
    frames: Vec<SearchFrame>,
    visited: HashSet<String>,
    max_len: usize,
}

impl EmbeddingSearch {
    /// Fails only if ranking the start node's neighbors fails.
    pub fn new(
        graph: &dyn GraphBackend,
        distance: &dyn NodeDistance,
        start: &str,
        target: &str,
    ) -> Result<Self, SubgraphError> {
        let mut search = Self {
            target: target.to_string(),
            frames: Vec::new(),
            visited: HashSet::from([start.to_string()]),
            max_len: 2 * graph.node_count()?,
        };
        let frame = search.frame(graph, distance, start)?;
        search.frames.push(frame);
        Ok(search)
    }

    fn frame(
        &self,
        graph: &dyn GraphBackend,
        distance: &dyn NodeDistance,
        node: &str,
    ) -> Result<SearchFrame, SubgraphError> {
        let mut ranked = Vec::new();
        for neighbor in graph.neighbors(node)? {
            if self.visited.contains(&neighbor) {
                continue;
            }
            let d = distance.distance(&neighbor, &self.target)?;
            ranked.push((neighbor, d));
        }
        ranked.sort_by(|a, b| a.1.total_cmp(&b.1));
        Ok(SearchFrame {
            node: node.to_string(),
            ranked,
        })
    }

    pub fn path(&self) -> Vec<String> {
        self.frames.iter().map(|f| f.node.clone()).collect()
    }

    pub fn frames(&self) -> &[SearchFrame] {
        &self.frames
    }

    pub fn is_visited(&self, node: &str) -> bool {
        self.visited.contains(node)
    }

    pub fn step<R: Rng + ?Sized>(
        &mut self,
        graph: &dyn GraphBackend,
        distance: &dyn NodeDistance,
        top_k: usize,
        rng: &mut R,
    ) -> Result<SearchStep, SubgraphError> {
        let top = match self.frames.last() {
            Some(top) => top,
            None => return Ok(SearchStep::Exhausted),
        };
        if top.node == self.target {
            return Ok(SearchStep::Reached);
        }

        let best: Vec<&String> = top
            .ranked
            .iter()
            .map(|(node, _)| node)
            .filter(|node| !self.visited.contains(*node))
            .take(top_k.max(1))
            .collect();

        let next = match best.choose(rng) {
            Some(next) => (*next).clone(),
            None => {
                if self.frames.len() == 1 {
                    self.frames.clear();
                    return Ok(SearchStep::Exhausted);
                }
                let dead_end = self.frames.pop().map(|f| f.node).unwrap_or_default();
                self.visited.insert(dead_end.clone());
                return Ok(SearchStep::Backtracked(dead_end));
            }
        };

        self.visited.insert(next.clone());
        let frame = self.frame(graph, distance, &next)?;
        self.frames.push(frame);
        if self.frames.len() > self.max_len {
            return Ok(SearchStep::LimitExceeded);
        }
        Ok(SearchStep::Advanced(next))
    }
}

/// Two-endpoint generator over any [`NodeDistance`], such as an
/// `EmbeddingCache` or a precomputed `EmbeddingTable`.
pub struct EmbeddingPathGenerator<D: NodeDistance> {
    distance: D,
    config: EmbeddingPathConfig,
    rng: StdRng,
}

impl<D: NodeDistance> EmbeddingPathGenerator<D> {
    pub fn new(distance: D) -> Self {
        Self::with_config(distance, EmbeddingPathConfig::default())
    }

    pub fn with_config(distance: D, config: EmbeddingPathConfig) -> Self {
        let rng = seeded_rng(config.seed);
        Self {
            distance,
            config,
            rng,
        }
    }

    pub fn distance(&self) -> &D {
        &self.distance
    }
}

impl<D: NodeDistance> PathGenerator for EmbeddingPathGenerator<D> {
    fn generate_path(
        &mut self,
        graph: &dyn GraphBackend,
        start: &str,
        end: &str,
    ) -> Result<Vec<String>, SubgraphError> {
        validate_nodes(graph, start, end)?;
        let mut search = EmbeddingSearch::new(graph, &self.distance, start, end)?;
        loop {
            match search.step(graph, &self.distance, self.config.top_k, &mut self.rng)? {
                SearchStep::Reached => {
                    let path = search.path();
                    tracing::debug!(hops = path.len() - 1, "embedding search reached target");
                    return Ok(path);
                }
                SearchStep::Advanced(_) => {}
                SearchStep::Backtracked(node) => {
                    tracing::debug!(node = %node, "embedding search backtracked");
                }
                SearchStep::Exhausted | SearchStep::LimitExceeded => {
                    return Err(SubgraphError::no_path(start, end));
                }
            }
        }
    }
}
