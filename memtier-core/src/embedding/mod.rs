//! Embedding Providers
//!
//! Text → fixed-dimension vector. Providers are interchangeable behind the
//! [`EmbeddingProvider`] trait; vectors are only comparable when both the
//! provider name and the dimensionality match, which is what
//! [`ProviderInfo`] captures and the vector store checks on load.
//!
//! ```text
//! EmbeddingProvider (trait)
//! ├── HashingEmbeddingProvider  (always available, deterministic)
//! └── FastEmbedProvider         (feature: embeddings)
//! ```

mod hashing;

#[cfg(feature = "embeddings")]
mod fastembed_provider;

pub use hashing::HashingEmbeddingProvider;

#[cfg(feature = "embeddings")]
pub use fastembed_provider::FastEmbedProvider;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Narrow interface every embedding backend implements
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Stable provider name, persisted next to the vectors it produced
    fn name(&self) -> &str;

    /// Length of every vector this provider returns
    fn dimensions(&self) -> usize;

    /// Embed one text
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Embed many texts; must equal calling `embed` on each
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut vectors = Vec::with_capacity(texts.len());
        for text in texts {
            vectors.push(self.embed(text).await?);
        }
        Ok(vectors)
    }

    /// Identity used for compatibility checks
    fn info(&self) -> ProviderInfo {
        ProviderInfo::new(self.name(), self.dimensions())
    }
}

/// Provider identity (name + dimensions)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderInfo {
    pub name: String,
    pub dimensions: usize,
}

impl ProviderInfo {
    pub fn new(name: impl Into<String>, dimensions: usize) -> Self {
        Self {
            name: name.into(),
            dimensions,
        }
    }

    /// Vectors are comparable only when name AND dimensions match exactly
    pub fn compatible_with(&self, other: &ProviderInfo) -> bool {
        self.name == other.name && self.dimensions == other.dimensions
    }
}

impl std::fmt::Display for ProviderInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.name, self.dimensions)
    }
}

/// Compute cosine similarity between two vectors
///
/// Returns a value between -1.0 and 1.0; 0.0 when lengths differ or either
/// vector has zero norm.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosine_similarity_same() {
        let a = vec![1.0, 0.0, 0.0];
        let sim = cosine_similarity(&a, &a);
        assert!((sim - 1.0).abs() < 0.001);
    }

    #[test]
    fn test_cosine_similarity_orthogonal() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![0.0, 1.0, 0.0];
        assert!(cosine_similarity(&a, &b).abs() < 0.001);
    }

    #[test]
    fn test_cosine_similarity_opposite() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![-1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &b) + 1.0).abs() < 0.001);
    }

    #[test]
    fn test_cosine_similarity_degenerate() {
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[1.0, 0.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
    }

    #[test]
    fn test_provider_compatibility() {
        let a = ProviderInfo::new("hashed-tf-v1", 256);
        assert!(a.compatible_with(&ProviderInfo::new("hashed-tf-v1", 256)));
        assert!(!a.compatible_with(&ProviderInfo::new("hashed-tf-v1", 128)));
        assert!(!a.compatible_with(&ProviderInfo::new("other", 256)));
        assert_eq!(a.to_string(), "hashed-tf-v1/256");
    }
}
