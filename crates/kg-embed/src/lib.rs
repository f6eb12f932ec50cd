//! Embedding utilities and oracle adapters.
//!
//! Vectors come from an external [`Embedder`]; text decisions come from an
//! external [`TextGenerator`](kg_types::TextGenerator). This crate only turns
//! them into distances, similarities, and parsed oracle answers.

mod cache;
mod llm;
#[cfg(feature = "test-util")]
pub mod mock;
mod similarity;
mod table;

pub use cache::{EmbeddingCache, EmbeddingCacheError};
pub use kg_types::{Embedder, EmbedderError};
pub use llm::{
    parse_next_node, parse_rating, parse_similarity_score, LlmDecisionOracle, LlmMergeOracle,
    LlmPathScorer, DEFAULT_WALK_GOAL,
};
pub use similarity::{cosine_similarity, dot_product, euclidean_distance, DistanceMetric};
pub use table::EmbeddingTable;

#[cfg(feature = "test-util")]
pub use mock::MockEmbedder;
