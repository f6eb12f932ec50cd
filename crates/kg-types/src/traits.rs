//! Collaborator traits consumed by the graph core, and the error types they share.
//!
//! All calls are synchronous; callers wrap them with their own timeout/retry policy.

use crate::{NodeContext, PathScore, PathScoreRequest, WalkStep};

/// Embedder: text -> vector(s).
pub trait Embedder: Send + Sync {
    /// Model identifier recorded alongside cached vectors.
    fn model_name(&self) -> &str;

    /// Embed a single text. Default implementation uses embed_batch.
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedderError> {
        let v = self.embed_batch(&[text.to_string()])?;
        v.into_iter().next().ok_or(EmbedderError::EmptyResponse)
    }

    /// Embed multiple texts, one vector per input in order.
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedderError>;
}

/// Estimated distance between two nodes (lower is closer).
pub trait NodeDistance: Send + Sync {
    fn distance(&self, a: &str, b: &str) -> Result<f64, OracleError>;
}

/// Pairwise equivalence scorer used by oracle-based node merging.
pub trait MergeOracle: Send + Sync {
    /// Similarity in [0, 1] that `a` and `b` name the same concept.
    fn similarity(&self, a: &NodeContext, b: &NodeContext) -> Result<f64, OracleError>;

    /// Preferred name for a merged group; `None` when the oracle has no usable answer.
    fn suggest_name(&self, group: &[String]) -> Result<Option<String>, OracleError>;
}

/// Picks the next node of a guided walk.
pub trait DecisionOracle: Send + Sync {
    /// Returns the chosen node id, or `None` if the answer could not be parsed.
    /// The walk validates the choice against the step's candidates.
    fn decide(&self, step: &WalkStep) -> Result<Option<String>, OracleError>;
}

/// Rates the quality of a subgraph path.
pub trait PathScorer: Send + Sync {
    fn score(&self, request: &PathScoreRequest) -> Result<PathScore, OracleError>;
}

/// Free-text generator (typically an LLM completion endpoint).
pub trait TextGenerator: Send + Sync {
    fn generate(&self, prompt: &str) -> Result<String, OracleError>;
}

#[derive(Debug, thiserror::Error)]
pub enum GraphStoreError {
    #[error("node not found: {0}")]
    NodeNotFound(String),
    #[error("edge not found: {from} -> {to}")]
    EdgeNotFound { from: String, to: String },
    #[error("no path between {from} and {to}")]
    NoPath { from: String, to: String },
    #[error("invalid graph document: {0}")]
    InvalidFormat(String),
    #[error("refusing to save an empty graph")]
    EmptyGraph,
    #[error("graph backend error: {0}")]
    Backend(String),
    #[error("serialization: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("storage: {0}")]
    Storage(#[from] crate::StorageError),
}

#[derive(Debug, thiserror::Error)]
pub enum EmbedderError {
    #[error("embedder error: {0}")]
    Other(String),
    #[error("empty response")]
    EmptyResponse,
}

#[derive(Debug, thiserror::Error)]
pub enum OracleError {
    #[error("oracle error: {0}")]
    Other(String),
    #[error("empty response")]
    EmptyResponse,
    #[error("no embedding for: {0}")]
    MissingEmbedding(String),
    #[error(transparent)]
    Embedder(#[from] EmbedderError),
}
