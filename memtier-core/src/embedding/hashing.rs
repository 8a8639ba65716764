//! Feature-hashing term-frequency embeddings.
//!
//! Tokens (lowercased alphanumeric runs) and adjacent-token bigrams are
//! hashed into `dimensions` signed buckets, weighted by sublinear term
//! frequency (`1 + ln tf`) and L2-normalized. There is no corpus state, so a
//! text embeds identically alone or in a batch, in any process.

use std::collections::HashMap;

use async_trait::async_trait;

use super::EmbeddingProvider;
use crate::error::{Error, Result};
use crate::utils::hash_to_u64;

/// Provider name persisted alongside hashed vectors
pub const HASHING_PROVIDER_NAME: &str = "hashed-tf-v1";

/// Default vector length
pub const DEFAULT_HASHING_DIMENSIONS: usize = 256;

/// Deterministic, dependency-free embedding provider
#[derive(Debug, Clone)]
pub struct HashingEmbeddingProvider {
    dimensions: usize,
}

impl Default for HashingEmbeddingProvider {
    fn default() -> Self {
        Self::new(DEFAULT_HASHING_DIMENSIONS)
    }
}

impl HashingEmbeddingProvider {
    /// Create a provider producing `dimensions`-length vectors
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions }
    }

    fn tokenize(text: &str) -> Vec<String> {
        text.split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
            .map(|t| t.to_lowercase())
            .collect()
    }

    /// Synchronous core shared by `embed` and `embed_batch`
    pub fn embed_text(&self, text: &str) -> Result<Vec<f32>> {
        if self.dimensions == 0 {
            return Err(Error::embedding("hashing provider configured with 0 dimensions"));
        }

        let tokens = Self::tokenize(text);
        let mut features: HashMap<String, u32> = HashMap::new();
        for token in &tokens {
            *features.entry(token.clone()).or_default() += 1;
        }
        for pair in tokens.windows(2) {
            *features.entry(format!("{} {}", pair[0], pair[1])).or_default() += 1;
        }

        let mut vector = vec![0.0f32; self.dimensions];
        for (feature, tf) in &features {
            let h = hash_to_u64(feature);
            let bucket = (h % self.dimensions as u64) as usize;
            let sign = if (h >> 63) & 1 == 1 { -1.0 } else { 1.0 };
            vector[bucket] += sign * (1.0 + (*tf as f32).ln());
        }

        let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in &mut vector {
                *x /= norm;
            }
        }

        Ok(vector)
    }
}

#[async_trait]
impl EmbeddingProvider for HashingEmbeddingProvider {
    fn name(&self) -> &str {
        HASHING_PROVIDER_NAME
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_text(text)
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        texts.iter().map(|t| self.embed_text(t)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::cosine_similarity;

    #[tokio::test]
    async fn test_embed_dimensions_and_norm() {
        let provider = HashingEmbeddingProvider::new(64);
        let vector = provider.embed("Switched the cache to JSONL").await.unwrap();

        assert_eq!(vector.len(), 64);
        let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[tokio::test]
    async fn test_batch_matches_single() {
        let provider = HashingEmbeddingProvider::default();
        let texts = vec![
            "decision: adopt tokio".to_string(),
            "lesson: pin the toolchain".to_string(),
        ];

        let batch = provider.embed_batch(&texts).await.unwrap();
        for (text, vector) in texts.iter().zip(batch.iter()) {
            assert_eq!(&provider.embed(text).await.unwrap(), vector);
        }
    }

    #[tokio::test]
    async fn test_similar_texts_score_higher() {
        let provider = HashingEmbeddingProvider::default();
        let query = provider.embed("database migration failed").await.unwrap();
        let near = provider.embed("the database migration failed again").await.unwrap();
        let far = provider.embed("designers prefer the blue palette").await.unwrap();

        assert!(cosine_similarity(&query, &near) > cosine_similarity(&query, &far));
    }

    #[tokio::test]
    async fn test_empty_text_is_zero_vector() {
        let provider = HashingEmbeddingProvider::new(16);
        let vector = provider.embed("  ,,, ").await.unwrap();
        assert!(vector.iter().all(|x| *x == 0.0));
    }

    #[tokio::test]
    async fn test_zero_dimensions_rejected() {
        let provider = HashingEmbeddingProvider::new(0);
        assert!(provider.embed("anything").await.is_err());
    }
}
