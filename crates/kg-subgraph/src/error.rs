use kg_types::{GraphStoreError, OracleError, StorageError};

#[derive(Debug, thiserror::Error)]
pub enum SubgraphError {
    #[error("node '{0}' not found in the graph")]
    NodeNotFound(String),
    #[error("no path found between '{start}' and '{end}'")]
    NoPath { start: String, end: String },
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
    #[error("{0}")]
    EmptyPath(String),
    #[error("{0} is already set")]
    AlreadySet(&'static str),
    #[error(transparent)]
    Graph(GraphStoreError),
    #[error(transparent)]
    Oracle(#[from] OracleError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl SubgraphError {
    pub fn no_path(start: &str, end: &str) -> Self {
        SubgraphError::NoPath {
            start: start.to_string(),
            end: end.to_string(),
        }
    }
}

impl From<GraphStoreError> for SubgraphError {
    fn from(err: GraphStoreError) -> Self {
        match err {
            GraphStoreError::NodeNotFound(id) => SubgraphError::NodeNotFound(id),
            GraphStoreError::NoPath { from, to } => SubgraphError::NoPath {
                start: from,
                end: to,
            },
            other => SubgraphError::Graph(other),
        }
    }
}
