//! Bounded extracts of a knowledge graph built around a path.

use crate::config::{seeded_rng, SubgraphOptions};
use crate::cypher::{path_links, to_cypher, LinkKind};
use crate::error::SubgraphError;
use crate::generator::{validate_node, validate_nodes, PathGenerator, SingleNodePathGenerator};
use kg_graph::{
    Attrs, EdgeRecord, GraphBackend, GraphSnapshot, GraphStats, InMemoryGraph, KnowledgeGraph,
    Relationship,
};
use kg_types::{
    fill_prompt, relation_of, subgraph_file_name, BlobStore, PathScore, PathScoreRequest,
    PathScorer, TextGenerator, UNKNOWN_RELATION,
};
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashSet;
use std::fmt;
use std::path::Path;

/// Blob-store category for persisted subgraphs.
pub const SUBGRAPH_CATEGORY: &str = "subgraphs";

/// Default prompt for [`Subgraph::contextualize`]. Placeholders:
/// `{start_node}`, `{end_node}`, `{graph_str}`.
pub const SUBGRAPH_ANALYSIS_PROMPT: &str = r#"You are an ontologist with a background in scientific research, engineering and innovation.

Below is a list of nodes and relationships taken from a larger knowledge graph, connecting "{start_node}" and "{end_node}".

Each line has the form "(node_1)-[:relationship between node_1 and node_2]->(node_2)".

Graph:

{graph_str}

First define every term that appears in the graph. Then discuss each relationship in context. Cover every concept in the graph and do not add an introduction."#;

/// Subgraph persistence file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubgraphDocument {
    pub start_node: String,
    pub end_node: String,
    pub path_nodes: Vec<String>,
    #[serde(default)]
    pub context: Option<String>,
    #[serde(default)]
    pub path_score: Option<f64>,
    #[serde(default)]
    pub path_score_justification: Option<String>,
    /// The restricted graph, not the graph the subgraph was cut from.
    pub graph: GraphSnapshot,
    #[serde(default)]
    pub config: Attrs,
    #[serde(default)]
    pub original_graph_metadata: GraphStats,
}

/// A path plus sampled neighbors, backed by a copy of the source graph
/// restricted to exactly the included nodes.
#[derive(Debug)]
pub struct Subgraph {
    start_node: String,
    end_node: String,
    path_nodes: Vec<String>,
    graph: KnowledgeGraph<InMemoryGraph>,
    original: GraphStats,
    context: Option<String>,
    path_score: Option<f64>,
    path_score_justification: Option<String>,
}

impl Subgraph {
    // =========================================================================
    // Construction
    // =========================================================================

    pub fn from_two_nodes<B: GraphBackend>(
        graph: &KnowledgeGraph<B>,
        start: &str,
        end: &str,
        generator: &mut dyn PathGenerator,
        options: &SubgraphOptions,
    ) -> Result<Self, SubgraphError> {
        options.validate()?;
        let path = generator.generate_path(graph.backend(), start, end)?;
        Self::build(graph, start, end, path, options)
    }

    /// The walk's last node becomes `end_node`.
    pub fn from_one_node<B: GraphBackend>(
        graph: &KnowledgeGraph<B>,
        start: &str,
        generator: &mut dyn SingleNodePathGenerator,
        options: &SubgraphOptions,
    ) -> Result<Self, SubgraphError> {
        options.validate()?;
        let path = generator.generate_path(graph.backend(), start)?;
        let end = match path.last() {
            Some(end) => end.clone(),
            None => {
                return Err(SubgraphError::EmptyPath(format!(
                    "empty path generated from node '{}'",
                    start
                )))
            }
        };
        Self::build(graph, start, &end, path, options)
    }

    /// Wrap a path produced elsewhere; its first and last nodes are the endpoints.
    pub fn from_path<B: GraphBackend>(
        graph: &KnowledgeGraph<B>,
        path: Vec<String>,
        options: &SubgraphOptions,
    ) -> Result<Self, SubgraphError> {
        options.validate()?;
        let (start, end) = match (path.first(), path.last()) {
            (Some(start), Some(end)) => (start.clone(), end.clone()),
            _ => return Err(SubgraphError::EmptyPath("path is empty".to_string())),
        };
        Self::build(graph, &start, &end, path, options)
    }

    fn build<B: GraphBackend>(
        graph: &KnowledgeGraph<B>,
        start: &str,
        end: &str,
        path: Vec<String>,
        options: &SubgraphOptions,
    ) -> Result<Self, SubgraphError> {
        let source = graph.backend();
        validate_nodes(source, start, end)?;
        for node in &path {
            validate_node(source, node)?;
        }

        let included = sample_nodes(source, &path, options)?;
        let restricted = restrict(graph, &included)?;
        let original = graph.stats()?;
        tracing::info!(
            start = %start,
            end = %end,
            path_length = path.len(),
            nodes = included.len(),
            "built subgraph"
        );
        Ok(Self {
            start_node: start.to_string(),
            end_node: end.to_string(),
            path_nodes: path,
            graph: restricted,
            original,
            context: None,
            path_score: None,
            path_score_justification: None,
        })
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn start_node(&self) -> &str {
        &self.start_node
    }

    pub fn end_node(&self) -> &str {
        &self.end_node
    }

    pub fn path_nodes(&self) -> &[String] {
        &self.path_nodes
    }

    /// The restricted graph backing this subgraph.
    pub fn graph(&self) -> &KnowledgeGraph<InMemoryGraph> {
        &self.graph
    }

    /// Size of the graph this subgraph was cut from.
    pub fn original_stats(&self) -> GraphStats {
        self.original
    }

    pub fn context(&self) -> Option<&str> {
        self.context.as_deref()
    }

    pub fn path_score(&self) -> Option<f64> {
        self.path_score
    }

    pub fn path_score_justification(&self) -> Option<&str> {
        self.path_score_justification.as_deref()
    }

    pub fn nodes(&self) -> Result<Vec<String>, SubgraphError> {
        Ok(self.graph.backend().nodes()?)
    }

    pub fn has_node(&self, id: &str) -> Result<bool, SubgraphError> {
        Ok(self.graph.backend().has_node(id)?)
    }

    pub fn edges(&self) -> Result<Vec<EdgeRecord>, SubgraphError> {
        Ok(self.graph.backend().edges()?)
    }

    /// One relationship per consecutive path pair, in true edge direction.
    pub fn path_edges(&self) -> Result<Vec<Relationship>, SubgraphError> {
        Ok(path_links(self.graph.backend(), &self.path_nodes)?
            .iter()
            .map(|link| link.to_relationship())
            .collect())
    }

    /// Path edges in path order, then every other edge of the subgraph.
    pub fn to_cypher_string(&self) -> Result<String, SubgraphError> {
        let mut rendered = Vec::new();
        let mut seen: HashSet<(String, String)> = HashSet::new();
        for link in path_links(self.graph.backend(), &self.path_nodes)? {
            if link.kind == LinkKind::Unlinked {
                continue;
            }
            let rel = link.to_relationship();
            if seen.insert((rel.source.clone(), rel.target.clone())) {
                rendered.push(rel);
            }
        }
        for edge in self.edges()? {
            if seen.contains(&(edge.source.clone(), edge.target.clone())) {
                continue;
            }
            let relation = relation_of(&edge.attributes).unwrap_or(UNKNOWN_RELATION);
            rendered.push(Relationship::new(edge.source.clone(), relation, edge.target.clone()));
        }
        Ok(to_cypher(&rendered))
    }

    /// Summary object for APIs and reports.
    pub fn to_json(&self) -> Result<serde_json::Value, SubgraphError> {
        let stats = self.graph.stats()?;
        let path_edges: Vec<serde_json::Value> = self
            .path_edges()?
            .into_iter()
            .map(|r| json!({ "source": r.source, "target": r.target, "relation": r.relation }))
            .collect();
        Ok(json!({
            "start_node": self.start_node,
            "end_node": self.end_node,
            "path_nodes": self.path_nodes,
            "path_edges": path_edges,
            "graph_stats": {
                "node_count": stats.node_count,
                "edge_count": stats.edge_count,
                "path_length": self.path_nodes.len(),
            },
            "context": self.context,
            "path_score": self.path_score,
            "path_score_justification": self.path_score_justification,
            "original_graph_metadata": self.original,
        }))
    }

    // =========================================================================
    // Oracles
    // =========================================================================

    pub fn contextualize(&mut self, generator: &dyn TextGenerator) -> Result<&str, SubgraphError> {
        self.contextualize_with_prompt(generator, SUBGRAPH_ANALYSIS_PROMPT)
    }

    /// Fills `{start_node}`, `{end_node}` and `{graph_str}` in `template` and
    /// stores the reply as the context. The context can be set only once.
    pub fn contextualize_with_prompt(
        &mut self,
        generator: &dyn TextGenerator,
        template: &str,
    ) -> Result<&str, SubgraphError> {
        if self.context.is_some() {
            return Err(SubgraphError::AlreadySet("context"));
        }
        let prompt = fill_prompt(
            template,
            &[
                ("graph_str", self.to_cypher_string()?.as_str()),
                ("start_node", self.start_node.as_str()),
                ("end_node", self.end_node.as_str()),
            ],
        );
        let reply = generator.generate(&prompt)?;
        tracing::debug!(chars = reply.len(), "stored subgraph context");
        Ok(self.context.insert(reply).as_str())
    }

    /// Stores score and justification; a path can be scored only once.
    pub fn score_path(&mut self, scorer: &dyn PathScorer) -> Result<f64, SubgraphError> {
        if self.path_score.is_some() {
            return Err(SubgraphError::AlreadySet("path_score"));
        }
        let request = PathScoreRequest {
            start_node: self.start_node.clone(),
            end_node: self.end_node.clone(),
            graph_str: self.to_cypher_string()?,
        };
        let PathScore {
            score,
            justification,
        } = scorer.score(&request)?;
        self.path_score = Some(score);
        self.path_score_justification = Some(justification);
        Ok(score)
    }

    // =========================================================================
    // Persistence
    // =========================================================================

    pub fn to_document(&self) -> Result<SubgraphDocument, SubgraphError> {
        Ok(SubgraphDocument {
            start_node: self.start_node.clone(),
            end_node: self.end_node.clone(),
            path_nodes: self.path_nodes.clone(),
            context: self.context.clone(),
            path_score: self.path_score,
            path_score_justification: self.path_score_justification.clone(),
            graph: self.graph.backend().to_snapshot()?,
            config: self.graph.config().clone(),
            original_graph_metadata: self.original,
        })
    }

    pub fn from_document(document: SubgraphDocument) -> Result<Self, SubgraphError> {
        if document.path_nodes.is_empty() {
            return Err(SubgraphError::EmptyPath("stored path is empty".to_string()));
        }
        let mut backend = InMemoryGraph::new();
        backend.load_snapshot(&document.graph)?;
        validate_nodes(&backend, &document.start_node, &document.end_node)?;
        for node in &document.path_nodes {
            validate_node(&backend, node)?;
        }
        Ok(Self {
            start_node: document.start_node,
            end_node: document.end_node,
            path_nodes: document.path_nodes,
            graph: KnowledgeGraph::with_config(backend, document.config),
            original: document.original_graph_metadata,
            context: document.context,
            path_score: document.path_score,
            path_score_justification: document.path_score_justification,
        })
    }

    fn document_bytes(&self) -> Result<Vec<u8>, SubgraphError> {
        Ok(serde_json::to_vec_pretty(&self.to_document()?)?)
    }

    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<(), SubgraphError> {
        let path = path.as_ref();
        let bytes = self.document_bytes()?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, bytes)?;
        tracing::info!(path = %path.display(), "saved subgraph");
        Ok(())
    }

    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, SubgraphError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)?;
        let subgraph = Self::from_document(serde_json::from_slice(&bytes)?)?;
        tracing::info!(path = %path.display(), "loaded subgraph");
        Ok(subgraph)
    }

    /// Stores `<name>.subgraph.json` under the `subgraphs` category of `item_id`.
    pub fn save_to_store(
        &self,
        store: &dyn BlobStore,
        item_id: &str,
        name: &str,
    ) -> Result<String, SubgraphError> {
        let bytes = self.document_bytes()?;
        Ok(store.save(
            item_id,
            &subgraph_file_name(name),
            &bytes,
            Some(SUBGRAPH_CATEGORY),
        )?)
    }

    pub fn load_from_store(
        store: &dyn BlobStore,
        item_id: &str,
        name: &str,
    ) -> Result<Self, SubgraphError> {
        let bytes = store.get(item_id, &subgraph_file_name(name), Some(SUBGRAPH_CATEGORY))?;
        Self::from_document(serde_json::from_slice(&bytes)?)
    }
}

/// Path nodes first (deduplicated, in order), then neighbors of path nodes
/// drawn with `neighbor_probability` until `max_nodes` is reached.
fn sample_nodes(
    graph: &dyn GraphBackend,
    path: &[String],
    options: &SubgraphOptions,
) -> Result<Vec<String>, SubgraphError> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut included: Vec<String> = Vec::new();
    for node in path {
        if seen.insert(node.clone()) {
            included.push(node.clone());
        }
    }
    if options.neighbor_probability <= 0.0 {
        return Ok(included);
    }

    let cap = options.max_nodes.unwrap_or(usize::MAX);
    let mut rng = seeded_rng(options.seed);
    let path_nodes = included.clone();
    'path: for node in &path_nodes {
        for neighbor in graph.neighbors(node)? {
            if included.len() >= cap {
                break 'path;
            }
            if seen.contains(&neighbor) {
                continue;
            }
            if rng.gen_bool(options.neighbor_probability) {
                seen.insert(neighbor.clone());
                included.push(neighbor);
            }
        }
    }
    Ok(included)
}

/// Copy of `graph` holding only `included` nodes and the edges among them.
fn restrict<B: GraphBackend>(
    graph: &KnowledgeGraph<B>,
    included: &[String],
) -> Result<KnowledgeGraph<InMemoryGraph>, SubgraphError> {
    let source = graph.backend();
    let keep: HashSet<&str> = included.iter().map(String::as_str).collect();
    let mut backend = InMemoryGraph::new();
    for node in included {
        let attrs = source.node_attrs(node)?.unwrap_or_default();
        backend.add_node(node, attrs)?;
    }
    for node in included {
        for edge in source.out_edges(node)? {
            if keep.contains(edge.target.as_str()) {
                backend.add_edge(&edge.source, &edge.target, edge.attributes)?;
            }
        }
    }
    Ok(KnowledgeGraph::with_config(backend, graph.config().clone()))
}

impl fmt::Display for Subgraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stats = self.graph.stats().map_err(|_| fmt::Error)?;
        writeln!(
            f,
            "Subgraph(start={}, end={}, nodes={}, edges={})",
            self.start_node, self.end_node, stats.node_count, stats.edge_count
        )?;
        write!(f, "Path: {}", self.path_nodes.join(" -> "))
    }
}
