//! Node-merging strategies: find groups of equivalent nodes and fold each
//! group into a single node without losing provenance.

mod embedding;
mod exact;
mod merger;
mod oracle;
mod union_find;

pub use embedding::{EmbeddingMerger, EmbeddingMergerConfig};
pub use exact::ExactMatchMerger;
pub use merger::{merge_similar_nodes, most_provenance, MergeError, MergeReport, NodeMerger};
pub use oracle::{OracleMerger, OracleMergerConfig};
pub use union_find::UnionFind;
