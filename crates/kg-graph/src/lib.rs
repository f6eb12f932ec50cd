//! Graph backends and the knowledge-graph facade built on top of them.

mod blob;
mod knowledge_graph;
mod memory;
mod normalize;
mod snapshot;
mod store;

#[cfg(feature = "sqlite")]
mod sqlite;

pub use blob::{InMemoryBlobStore, LocalBlobStore};
pub use kg_types::{
    Attrs, EdgeAttrs, GraphStoreError, NodeAttrs, Provenance, Relationship, Triplet,
};
pub use knowledge_graph::{GraphStats, KnowledgeGraph, GRAPH_CATEGORY};
pub use memory::InMemoryGraph;
pub use normalize::{canonical_edge_attrs, canonical_node_attrs, edge_patch, merge_attrs};
pub use snapshot::{EdgeRecord, GraphDocument, GraphSnapshot, NodeRecord};
pub use store::GraphBackend;

#[cfg(feature = "sqlite")]
pub use sqlite::{SqliteGraphStore, SQLITE_PATH_ENV};
