//! Knowledge graph facade over a [`GraphBackend`].
//!
//! Enforces the required attribute keys (`sources` on nodes, `relation` and
//! `sources` on edges) for everything written through it: triplet ingestion,
//! node merging, and whole-graph persistence.

use crate::memory::InMemoryGraph;
use crate::snapshot::GraphDocument;
use crate::store::GraphBackend;
use kg_types::{
    Attrs, BlobStore, EdgeAttrs, GraphStoreError, NodeAttrs, Provenance, Triplet,
    LEGACY_RELATION_KEY, RELATION_KEY, TRIPLET_ID_KEY,
};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;

/// Storage category used for graphs saved through a [`BlobStore`].
pub const GRAPH_CATEGORY: &str = "graphs";

/// Node/edge totals of a graph.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphStats {
    pub node_count: usize,
    pub edge_count: usize,
}

/// Knowledge graph assembled from triplets.
pub struct KnowledgeGraph<B: GraphBackend = InMemoryGraph> {
    backend: B,
    config: Attrs,
}

impl KnowledgeGraph<InMemoryGraph> {
    pub fn in_memory() -> Self {
        Self::new(InMemoryGraph::new())
    }

    /// Load a graph document into a fresh in-memory backend.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, GraphStoreError> {
        Self::load_into(InMemoryGraph::new(), path)
    }
}

impl<B: GraphBackend> KnowledgeGraph<B> {
    pub fn new(backend: B) -> Self {
        Self::with_config(backend, Attrs::new())
    }

    pub fn with_config(backend: B, config: Attrs) -> Self {
        Self { backend, config }
    }

    /// Build a graph by ingesting `triplets` into `backend`.
    pub fn from_triplets<'a>(
        backend: B,
        triplets: impl IntoIterator<Item = &'a Triplet>,
    ) -> Result<Self, GraphStoreError> {
        let mut graph = Self::new(backend);
        graph.add_triplets(triplets)?;
        Ok(graph)
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Raw backend access; writes through it bypass the required-key checks.
    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn into_backend(self) -> B {
        self.backend
    }

    pub fn config(&self) -> &Attrs {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut Attrs {
        &mut self.config
    }

    pub fn stats(&self) -> Result<GraphStats, GraphStoreError> {
        Ok(GraphStats {
            node_count: self.backend.node_count()?,
            edge_count: self.backend.edge_count()?,
        })
    }

    // =========================================================================
    // Ingestion
    // =========================================================================

    /// Ingest one triplet: both endpoints and the edge receive the same
    /// provenance record; the edge relation becomes the triplet's label.
    pub fn add_triplet(&mut self, triplet: &Triplet) -> Result<(), GraphStoreError> {
        let record = triplet.provenance();
        for node in [&triplet.node_1, &triplet.node_2] {
            self.ensure_node(node)?;
            self.append_node_sources(node, vec![record.clone()])?;
        }

        let mut edge = self
            .edge(&triplet.node_1, &triplet.node_2)?
            .unwrap_or_default();
        edge.relation = triplet.edge.clone();
        edge.sources.push(record);
        self.backend
            .add_edge(&triplet.node_1, &triplet.node_2, edge.into_attrs())
    }

    /// Ingest triplets in order; returns how many were added.
    pub fn add_triplets<'a>(
        &mut self,
        triplets: impl IntoIterator<Item = &'a Triplet>,
    ) -> Result<usize, GraphStoreError> {
        let mut added = 0;
        for triplet in triplets {
            self.add_triplet(triplet)?;
            added += 1;
        }
        tracing::info!(
            triplets = added,
            nodes = self.backend.node_count()?,
            edges = self.backend.edge_count()?,
            "ingested triplets"
        );
        Ok(added)
    }

    /// One triplet per edge provenance record, in edge order.
    pub fn triplets(&self) -> Result<Vec<Triplet>, GraphStoreError> {
        let mut out = Vec::new();
        for record in self.backend.edges()? {
            let edge = EdgeAttrs::from_attrs(&record.attributes);
            for source in edge.sources {
                out.push(triplet_from_provenance(
                    &record.source,
                    &record.target,
                    &edge.relation,
                    source,
                ));
            }
        }
        Ok(out)
    }

    // =========================================================================
    // Node and edge access
    // =========================================================================

    /// Create the node with an empty `sources` list if it does not exist.
    pub fn ensure_node(&mut self, id: &str) -> Result<(), GraphStoreError> {
        if !self.backend.has_node(id)? {
            tracing::debug!(node = %id, "creating node");
            self.backend.add_node(id, NodeAttrs::new().into_attrs())?;
        }
        Ok(())
    }

    pub fn node(&self, id: &str) -> Result<Option<NodeAttrs>, GraphStoreError> {
        Ok(self
            .backend
            .node_attrs(id)?
            .map(|attrs| NodeAttrs::from_attrs(&attrs)))
    }

    pub fn node_sources(&self, id: &str) -> Result<Vec<Provenance>, GraphStoreError> {
        self.node(id)?
            .map(|node| node.sources)
            .ok_or_else(|| GraphStoreError::NodeNotFound(id.to_string()))
    }

    pub fn append_node_sources(
        &mut self,
        id: &str,
        records: Vec<Provenance>,
    ) -> Result<(), GraphStoreError> {
        let mut node = self
            .node(id)?
            .ok_or_else(|| GraphStoreError::NodeNotFound(id.to_string()))?;
        node.sources.extend(records);
        self.backend.set_node_attrs(id, node.into_attrs())
    }

    pub fn edge(&self, source: &str, target: &str) -> Result<Option<EdgeAttrs>, GraphStoreError> {
        Ok(self
            .backend
            .edge_attrs(source, target)?
            .map(|attrs| EdgeAttrs::from_attrs(&attrs)))
    }

    /// Distinct relation labels, sorted.
    pub fn relation_types(&self) -> Result<BTreeSet<String>, GraphStoreError> {
        Ok(self
            .backend
            .edges()?
            .into_iter()
            .map(|e| EdgeAttrs::from_attrs(&e.attributes).relation)
            .collect())
    }

    pub fn random_node<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<Option<String>, GraphStoreError> {
        Ok(self.backend.nodes()?.choose(rng).cloned())
    }

    // =========================================================================
    // Merge
    // =========================================================================

    /// Fold `members` into `destination`: provenance is concatenated onto the
    /// destination, every edge is redirected (joining an existing edge's
    /// `sources` rather than duplicating it), then the member is removed.
    /// Returns the number of members removed.
    pub fn merge_nodes(
        &mut self,
        members: &[String],
        destination: &str,
    ) -> Result<usize, GraphStoreError> {
        self.ensure_node(destination)?;
        let mut removed = 0;
        for member in members {
            if member == destination || !self.backend.has_node(member)? {
                continue;
            }
            let sources = self.node_sources(member)?;
            self.append_node_sources(destination, sources)?;

            for edge in self.backend.out_edges(member)? {
                let target = if edge.target == *member {
                    destination
                } else {
                    edge.target.as_str()
                };
                self.fold_edge(destination, target, &edge.attributes)?;
            }
            for edge in self.backend.in_edges(member)? {
                // self-loops were redirected with the outgoing edges
                if edge.source == *member {
                    continue;
                }
                self.fold_edge(&edge.source, destination, &edge.attributes)?;
            }

            self.backend.remove_node(member)?;
            removed += 1;
            tracing::debug!(member = %member, destination = %destination, "merged node");
        }
        Ok(removed)
    }

    fn fold_edge(&mut self, source: &str, target: &str, attrs: &Attrs) -> Result<(), GraphStoreError> {
        let incoming = EdgeAttrs::from_attrs(attrs);
        let folded = match self.edge(source, target)? {
            Some(mut existing) => {
                existing.sources.extend(incoming.sources);
                existing
            }
            None => incoming,
        };
        self.backend.add_edge(source, target, folded.into_attrs())
    }

    // =========================================================================
    // Persistence
    // =========================================================================

    pub fn to_document(&self) -> Result<GraphDocument, GraphStoreError> {
        Ok(GraphDocument::new(
            self.backend.to_snapshot()?,
            self.config.clone(),
        ))
    }

    fn document_bytes(&self) -> Result<Vec<u8>, GraphStoreError> {
        if self.backend.node_count()? == 0 {
            return Err(GraphStoreError::EmptyGraph);
        }
        self.to_document()?.to_vec_pretty()
    }

    /// Write `{graph, config}` as pretty JSON, creating parent directories.
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<(), GraphStoreError> {
        let path = path.as_ref();
        let bytes = self.document_bytes()?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, bytes)?;
        tracing::info!(path = %path.display(), "saved knowledge graph");
        Ok(())
    }

    /// Replay a saved document into `backend`.
    pub fn load_into(backend: B, path: impl AsRef<Path>) -> Result<Self, GraphStoreError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)?;
        let graph = Self::from_document_bytes(backend, &bytes)?;
        tracing::info!(path = %path.display(), "loaded knowledge graph");
        Ok(graph)
    }

    fn from_document_bytes(mut backend: B, bytes: &[u8]) -> Result<Self, GraphStoreError> {
        let document = GraphDocument::from_slice(bytes)?;
        backend.load_snapshot(&document.graph)?;
        Ok(Self::with_config(backend, document.config))
    }

    pub fn save_to_store(
        &self,
        store: &dyn BlobStore,
        item_id: &str,
        name: &str,
    ) -> Result<String, GraphStoreError> {
        let bytes = self.document_bytes()?;
        Ok(store.save(item_id, name, &bytes, Some(GRAPH_CATEGORY))?)
    }

    pub fn load_from_store(
        backend: B,
        store: &dyn BlobStore,
        item_id: &str,
        name: &str,
    ) -> Result<Self, GraphStoreError> {
        let bytes = store.get(item_id, name, Some(GRAPH_CATEGORY))?;
        Self::from_document_bytes(backend, &bytes)
    }
}

fn triplet_from_provenance(
    source: &str,
    target: &str,
    relation: &str,
    mut record: Provenance,
) -> Triplet {
    let label = record
        .remove(RELATION_KEY)
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_else(|| relation.to_string());
    record.remove(LEGACY_RELATION_KEY);
    let id = record
        .remove(TRIPLET_ID_KEY)
        .and_then(|v| v.as_str().map(str::to_string));

    let triplet = Triplet::new(source, label, target).with_metadata(record);
    match id {
        Some(id) => triplet.with_id(id),
        None => triplet,
    }
}

impl<B: GraphBackend> fmt::Display for KnowledgeGraph<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let nodes = self.backend.node_count().map_err(|_| fmt::Error)?;
        let edges = self.backend.edge_count().map_err(|_| fmt::Error)?;
        let edge_types = self.relation_types().map_err(|_| fmt::Error)?.len();
        write!(
            f,
            "KnowledgeGraph(nodes={}, edge_types={}, edges={})",
            nodes, edge_types, edges
        )
    }
}

impl<B: GraphBackend> fmt::Debug for KnowledgeGraph<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}
