//! Memoizing wrapper around an [`Embedder`], usable as a [`NodeDistance`].

use crate::similarity::DistanceMetric;
use kg_types::{Embedder, NodeDistance, OracleError};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::{PoisonError, RwLock};

#[derive(Debug, thiserror::Error)]
pub enum EmbeddingCacheError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("model name mismatch: {file} (file) vs {current} (current)")]
    ModelMismatch { file: String, current: String },
    #[error("embedding cache lock poisoned")]
    Poisoned,
}

/// On-disk cache layout.
#[derive(Debug, Serialize, Deserialize)]
struct CacheFile {
    model_name: String,
    #[serde(default)]
    distance_metric: Option<DistanceMetric>,
    embeddings: BTreeMap<String, Vec<f32>>,
}

/// Caches one vector per text; misses are embedded in a single batch.
pub struct EmbeddingCache<E: Embedder> {
    embedder: E,
    metric: DistanceMetric,
    vectors: RwLock<HashMap<String, Vec<f32>>>,
}

impl<E: Embedder> EmbeddingCache<E> {
    pub fn new(embedder: E) -> Self {
        Self::with_metric(embedder, DistanceMetric::default())
    }

    pub fn with_metric(embedder: E, metric: DistanceMetric) -> Self {
        Self {
            embedder,
            metric,
            vectors: RwLock::new(HashMap::new()),
        }
    }

    pub fn metric(&self) -> DistanceMetric {
        self.metric
    }

    pub fn embedder(&self) -> &E {
        &self.embedder
    }

    /// Cached vectors are plain data, so a poisoned lock is still read.
    pub fn len(&self) -> usize {
        self.vectors
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.vectors
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    fn poisoned() -> OracleError {
        OracleError::Other("embedding cache lock poisoned".to_string())
    }

    /// Vector for one text, embedding it on a miss.
    pub fn get(&self, text: &str) -> Result<Vec<f32>, OracleError> {
        if let Some(v) = self.vectors.read().map_err(|_| Self::poisoned())?.get(text) {
            return Ok(v.clone());
        }
        let v = self.embedder.embed(text)?;
        self.vectors
            .write()
            .map_err(|_| Self::poisoned())?
            .insert(text.to_string(), v.clone());
        Ok(v)
    }

    /// Vectors for many texts; all misses go through one `embed_batch` call.
    pub fn get_many(&self, texts: &[String]) -> Result<HashMap<String, Vec<f32>>, OracleError> {
        let missing: Vec<String> = {
            let vectors = self.vectors.read().map_err(|_| Self::poisoned())?;
            let mut seen = std::collections::HashSet::new();
            texts
                .iter()
                .filter(|t| !vectors.contains_key(*t) && seen.insert(t.as_str()))
                .cloned()
                .collect()
        };
        if !missing.is_empty() {
            let embedded = self.embedder.embed_batch(&missing)?;
            if embedded.len() != missing.len() {
                return Err(OracleError::Other(format!(
                    "embedder returned {} vectors for {} texts",
                    embedded.len(),
                    missing.len()
                )));
            }
            tracing::debug!(count = missing.len(), "embedded cache misses");
            let mut vectors = self.vectors.write().map_err(|_| Self::poisoned())?;
            for (text, v) in missing.into_iter().zip(embedded) {
                vectors.insert(text, v);
            }
        }

        let vectors = self.vectors.read().map_err(|_| Self::poisoned())?;
        texts
            .iter()
            .map(|t| {
                vectors
                    .get(t)
                    .cloned()
                    .map(|v| (t.clone(), v))
                    .ok_or_else(|| OracleError::MissingEmbedding(t.clone()))
            })
            .collect()
    }

    pub fn distance(&self, a: &str, b: &str) -> Result<f64, OracleError> {
        Ok(self.metric.distance(&self.get(a)?, &self.get(b)?))
    }

    pub fn similarity(&self, a: &str, b: &str) -> Result<f64, OracleError> {
        Ok(self.metric.similarity(&self.get(a)?, &self.get(b)?))
    }

    /// Write `{model_name, distance_metric, embeddings}` as pretty JSON.
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<(), EmbeddingCacheError> {
        let path = path.as_ref();
        let embeddings: BTreeMap<String, Vec<f32>> = self
            .vectors
            .read()
            .map_err(|_| EmbeddingCacheError::Poisoned)?
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        let file = CacheFile {
            model_name: self.embedder.model_name().to_string(),
            distance_metric: Some(self.metric),
            embeddings,
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_vec_pretty(&file)?)?;
        Ok(())
    }

    /// Replace the cache with a saved file produced by the same model.
    pub fn load_from_file(&mut self, path: impl AsRef<Path>) -> Result<usize, EmbeddingCacheError> {
        let file: CacheFile = serde_json::from_slice(&std::fs::read(path)?)?;
        if file.model_name != self.embedder.model_name() {
            return Err(EmbeddingCacheError::ModelMismatch {
                file: file.model_name,
                current: self.embedder.model_name().to_string(),
            });
        }
        if let Some(metric) = file.distance_metric {
            self.metric = metric;
        }
        let count = file.embeddings.len();
        *self
            .vectors
            .write()
            .map_err(|_| EmbeddingCacheError::Poisoned)? = file.embeddings.into_iter().collect();
        Ok(count)
    }
}

impl<E: Embedder> NodeDistance for EmbeddingCache<E> {
    fn distance(&self, a: &str, b: &str) -> Result<f64, OracleError> {
        EmbeddingCache::distance(self, a, b)
    }
}
