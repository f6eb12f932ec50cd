//! Path search over a knowledge graph and the bounded subgraphs built around
//! those paths.
//!
//! Two-endpoint strategies implement [`PathGenerator`], walk-from-one-node
//! strategies implement [`SingleNodePathGenerator`]. A [`Subgraph`] wraps a
//! generated path plus sampled neighbors in a restricted copy of the graph.

mod config;
mod cypher;
mod embedding;
mod error;
mod generator;
mod guided;
mod random_walk;
mod randomized;
mod shortest;
mod subgraph;

pub use config::{
    EmbeddingPathConfig, GuidedWalkConfig, RandomWalkConfig, RandomizedPathConfig,
    SubgraphOptions,
};
pub use cypher::{describe_path, path_links, to_cypher, LinkKind, PathLink};
pub use embedding::{EmbeddingPathGenerator, EmbeddingSearch, SearchFrame, SearchStep};
pub use error::SubgraphError;
pub use generator::{validate_node, validate_nodes, PathGenerator, SingleNodePathGenerator};
pub use guided::{neighbor_candidates, GuidedWalkGenerator};
pub use random_walk::{RandomWalkGenerator, SingleNodeRandomWalkGenerator};
pub use randomized::RandomizedEmbeddingPathGenerator;
pub use shortest::ShortestPathGenerator;
pub use subgraph::{Subgraph, SubgraphDocument, SUBGRAPH_ANALYSIS_PROMPT, SUBGRAPH_CATEGORY};
