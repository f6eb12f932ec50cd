//! Mock embedder for tests: deterministic vectors, no network.

use kg_types::{Embedder, EmbedderError};

const DIM: usize = 128;

/// Hashes lowercase character trigrams into a fixed number of buckets, so
/// case variants embed identically and near-spellings land close together.
pub struct MockEmbedder {
    dim: usize,
}

impl MockEmbedder {
    pub fn new() -> Self {
        Self { dim: DIM }
    }

    pub fn with_dim(dim: usize) -> Self {
        Self { dim: dim.max(1) }
    }

    fn fnv1a(bytes: &[u8]) -> u64 {
        bytes.iter().fold(0xcbf29ce484222325_u64, |h, b| {
            (h ^ *b as u64).wrapping_mul(0x100000001b3)
        })
    }

    fn vectorize(&self, text: &str) -> Vec<f32> {
        let padded: Vec<char> = format!("  {} ", text.trim().to_lowercase())
            .chars()
            .collect();
        let mut v = vec![0.0_f32; self.dim];
        for window in padded.windows(3) {
            let gram: String = window.iter().collect();
            let bucket = (Self::fnv1a(gram.as_bytes()) % self.dim as u64) as usize;
            v[bucket] += 1.0;
        }
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            v.iter_mut().for_each(|x| *x /= norm);
        }
        v
    }
}

impl Default for MockEmbedder {
    fn default() -> Self {
        Self::new()
    }
}

impl Embedder for MockEmbedder {
    fn model_name(&self) -> &str {
        "mock-trigram"
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedderError> {
        Ok(texts.iter().map(|t| self.vectorize(t)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cosine_similarity;

    #[test]
    fn case_variants_embed_identically() {
        let e = MockEmbedder::new();
        let a = e.embed("Aspirin").unwrap();
        let b = e.embed("aspirin").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), DIM);
    }

    #[test]
    fn near_spellings_are_closer_than_unrelated_words() {
        let e = MockEmbedder::new();
        let base = e.embed("mitochondria").unwrap();
        let near = e.embed("mitochondrial").unwrap();
        let far = e.embed("telomerase").unwrap();
        assert!(cosine_similarity(&base, &near) > cosine_similarity(&base, &far));
    }
}
