//! Oracle-judged merging.
//!
//! Pairs are compared in node order and joined in a union-find, so the
//! resulting groups are transitively closed: A~B and B~C place A, B and C in
//! one group even when A and C were never judged similar.

use crate::merger::{MergeError, NodeMerger};
use crate::union_find::UnionFind;
use kg_graph::GraphBackend;
use kg_types::{MergeOracle, NodeContext};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

fn default_threshold() -> f64 {
    0.5
}

fn default_max_comparisons() -> usize {
    1000
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OracleMergerConfig {
    #[serde(default = "default_threshold")]
    pub threshold: f64,
    /// Upper bound on oracle calls per pass.
    #[serde(default = "default_max_comparisons")]
    pub max_comparisons: usize,
}

impl Default for OracleMergerConfig {
    fn default() -> Self {
        Self {
            threshold: default_threshold(),
            max_comparisons: default_max_comparisons(),
        }
    }
}

pub struct OracleMerger<O: MergeOracle> {
    oracle: O,
    config: OracleMergerConfig,
}

impl<O: MergeOracle> OracleMerger<O> {
    pub fn new(oracle: O) -> Self {
        Self {
            oracle,
            config: OracleMergerConfig::default(),
        }
    }

    pub fn with_config(oracle: O, config: OracleMergerConfig) -> Result<Self, MergeError> {
        if !(0.0..=1.0).contains(&config.threshold) {
            return Err(MergeError::InvalidParameter(format!(
                "threshold must be within [0, 1], got {}",
                config.threshold
            )));
        }
        Ok(Self { oracle, config })
    }

    pub fn oracle(&self) -> &O {
        &self.oracle
    }

    pub fn config(&self) -> &OracleMergerConfig {
        &self.config
    }
}

fn context<'a>(
    cache: &'a mut HashMap<usize, NodeContext>,
    index: usize,
    name: &str,
    graph: &dyn GraphBackend,
) -> Result<&'a NodeContext, MergeError> {
    if !cache.contains_key(&index) {
        let relationships = graph.neighbor_relations(name)?;
        cache.insert(
            index,
            NodeContext {
                name: name.to_string(),
                relationships,
            },
        );
    }
    cache
        .get(&index)
        .ok_or_else(|| MergeError::InvalidParameter(format!("missing context for {}", name)))
}

impl<O: MergeOracle> NodeMerger for OracleMerger<O> {
    fn find_merge_candidates(&self, graph: &dyn GraphBackend) -> Result<Vec<Vec<String>>, MergeError> {
        let nodes = graph.nodes()?;
        let mut sets = UnionFind::new(nodes.len());
        let mut contexts = HashMap::new();
        let mut comparisons = 0;

        'pairs: for i in 0..nodes.len() {
            for j in (i + 1)..nodes.len() {
                if comparisons >= self.config.max_comparisons {
                    tracing::warn!(
                        max_comparisons = self.config.max_comparisons,
                        "comparison limit reached, remaining pairs skipped"
                    );
                    break 'pairs;
                }
                comparisons += 1;

                let a = context(&mut contexts, i, &nodes[i], graph)?.clone();
                let b = context(&mut contexts, j, &nodes[j], graph)?;
                let score = self.oracle.similarity(&a, b)?;
                tracing::trace!(a = %nodes[i], b = %nodes[j], score, "oracle similarity");
                if score >= self.config.threshold {
                    sets.union(i, j);
                }
            }
        }

        Ok(sets
            .groups()
            .into_iter()
            .map(|group| group.into_iter().map(|i| nodes[i].clone()).collect())
            .collect())
    }

    fn generate_merged_name(
        &self,
        group: &[String],
        _graph: &dyn GraphBackend,
    ) -> Result<String, MergeError> {
        let suggested = self
            .oracle
            .suggest_name(group)?
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty());
        match suggested {
            Some(name) => Ok(name),
            None => group
                .first()
                .cloned()
                .ok_or_else(|| MergeError::InvalidParameter("empty merge group".to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kg_graph::{InMemoryGraph, KnowledgeGraph, Triplet};
    use kg_types::OracleError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Judges pairs from a fixed list; unlisted pairs score zero.
    struct Scripted {
        similar: Vec<(&'static str, &'static str)>,
        name: Option<String>,
        calls: AtomicUsize,
    }

    impl Scripted {
        fn new(similar: Vec<(&'static str, &'static str)>) -> Self {
            Self {
                similar,
                name: None,
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl MergeOracle for Scripted {
        fn similarity(&self, a: &NodeContext, b: &NodeContext) -> Result<f64, OracleError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let hit = self.similar.iter().any(|(x, y)| {
                (a.name == *x && b.name == *y) || (a.name == *y && b.name == *x)
            });
            Ok(if hit { 0.9 } else { 0.1 })
        }

        fn suggest_name(&self, _group: &[String]) -> Result<Option<String>, OracleError> {
            Ok(self.name.clone())
        }
    }

    fn graph() -> KnowledgeGraph {
        let triplets = [
            Triplet::new("A", "r", "X"),
            Triplet::new("B", "r", "X"),
            Triplet::new("C", "r", "Y"),
            Triplet::new("D", "r", "Y"),
        ];
        KnowledgeGraph::from_triplets(InMemoryGraph::new(), &triplets).unwrap()
    }

    #[test]
    fn groups_are_transitively_closed() {
        let kg = graph();
        let merger = OracleMerger::new(Scripted::new(vec![("A", "B"), ("B", "C")]));
        let groups = merger.find_merge_candidates(kg.backend()).unwrap();
        assert_eq!(
            groups,
            vec![vec!["A".to_string(), "B".to_string(), "C".to_string()]]
        );
        // 6 nodes, all pairs compared
        assert_eq!(merger.oracle().calls.load(Ordering::SeqCst), 15);
    }

    #[test]
    fn comparison_limit_stops_early() {
        let kg = graph();
        // node order: A, X, B, C, Y, D; A-B is the second pair
        let merger = OracleMerger::with_config(
            Scripted::new(vec![("A", "B"), ("C", "D")]),
            OracleMergerConfig {
                threshold: 0.5,
                max_comparisons: 2,
            },
        )
        .unwrap();
        let groups = merger.find_merge_candidates(kg.backend()).unwrap();
        assert_eq!(groups, vec![vec!["A".to_string(), "B".to_string()]]);
        assert_eq!(merger.oracle().calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn oracle_sees_relationships() {
        struct Inspect;
        impl MergeOracle for Inspect {
            fn similarity(&self, a: &NodeContext, b: &NodeContext) -> Result<f64, OracleError> {
                // same outgoing relation to the same target
                let shared = a.relationships.iter().any(|ra| {
                    ra.source == a.name
                        && b.relationships.iter().any(|rb| {
                            rb.source == b.name
                                && ra.target == rb.target
                                && ra.relation == rb.relation
                        })
                });
                Ok(if shared && a.name != b.name { 1.0 } else { 0.0 })
            }
            fn suggest_name(&self, _group: &[String]) -> Result<Option<String>, OracleError> {
                Ok(None)
            }
        }

        let kg = graph();
        let groups = OracleMerger::new(Inspect)
            .find_merge_candidates(kg.backend())
            .unwrap();
        assert_eq!(
            groups,
            vec![
                vec!["A".to_string(), "B".to_string()],
                vec!["C".to_string(), "D".to_string()],
            ]
        );
    }

    #[test]
    fn merged_name_prefers_oracle_and_falls_back_to_first_member() {
        let kg = graph();
        let group = vec!["A".to_string(), "B".to_string()];

        let mut oracle = Scripted::new(vec![]);
        oracle.name = Some("  Alpha  ".to_string());
        let merger = OracleMerger::new(oracle);
        assert_eq!(merger.generate_merged_name(&group, kg.backend()).unwrap(), "Alpha");

        let mut oracle = Scripted::new(vec![]);
        oracle.name = Some("   ".to_string());
        let merger = OracleMerger::new(oracle);
        assert_eq!(merger.generate_merged_name(&group, kg.backend()).unwrap(), "A");
    }
}
