//! Strategy and extraction settings. Every struct deserializes from a partial
//! JSON object, filling the gaps with the defaults below.

use crate::error::SubgraphError;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

fn default_max_steps() -> usize {
    10
}

fn default_top_k() -> usize {
    3
}

fn default_randomness_factor() -> f64 {
    0.5
}

fn default_num_random_waypoints() -> usize {
    3
}

/// Seeded when `seed` is given, otherwise from OS entropy.
pub(crate) fn seeded_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomWalkConfig {
    #[serde(default = "default_max_steps")]
    pub max_steps: usize,
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Default for RandomWalkConfig {
    fn default() -> Self {
        Self {
            max_steps: default_max_steps(),
            seed: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingPathConfig {
    /// Number of best-ranked neighbors the next step is drawn from.
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Default for EmbeddingPathConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            seed: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomizedPathConfig {
    /// 0 is a plain shortest path, 1 is maximum jitter. Clamped to [0, 1].
    #[serde(default = "default_randomness_factor")]
    pub randomness_factor: f64,
    #[serde(default = "default_num_random_waypoints")]
    pub num_random_waypoints: usize,
    #[serde(default)]
    pub seed: Option<u64>,
}

impl RandomizedPathConfig {
    pub(crate) fn clamped(mut self) -> Self {
        self.randomness_factor = if self.randomness_factor.is_nan() {
            0.0
        } else {
            self.randomness_factor.clamp(0.0, 1.0)
        };
        self
    }
}

impl Default for RandomizedPathConfig {
    fn default() -> Self {
        Self {
            randomness_factor: default_randomness_factor(),
            num_random_waypoints: default_num_random_waypoints(),
            seed: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuidedWalkConfig {
    #[serde(default = "default_max_steps")]
    pub max_steps: usize,
    /// Seeds the random fallback used when the oracle's answer is unusable.
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Default for GuidedWalkConfig {
    fn default() -> Self {
        Self {
            max_steps: default_max_steps(),
            seed: None,
        }
    }
}

/// How a [`Subgraph`](crate::Subgraph) grows around its path.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubgraphOptions {
    /// Chance that each neighbor of a path node is included, in [0, 1].
    #[serde(default)]
    pub neighbor_probability: f64,
    /// Stop sampling neighbors once this many nodes are included. Path
    /// nodes are always kept, even past the cap.
    #[serde(default)]
    pub max_nodes: Option<usize>,
    #[serde(default)]
    pub seed: Option<u64>,
}

impl SubgraphOptions {
    pub fn with_neighbor_probability(mut self, probability: f64) -> Self {
        self.neighbor_probability = probability;
        self
    }

    pub fn with_max_nodes(mut self, max_nodes: usize) -> Self {
        self.max_nodes = Some(max_nodes);
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn validate(&self) -> Result<(), SubgraphError> {
        if !(0.0..=1.0).contains(&self.neighbor_probability) {
            return Err(SubgraphError::InvalidParameter(format!(
                "neighbor_probability must be within [0, 1], got {}",
                self.neighbor_probability
            )));
        }
        Ok(())
    }
}
