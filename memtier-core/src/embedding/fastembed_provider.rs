//! Local model embeddings via `fastembed`.
//!
//! Uses the all-MiniLM-L6-v2 model (384 dimensions), loaded lazily on first
//! use. Local inference only, no API calls.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::EmbeddingProvider;
use crate::error::{Error, Result};

/// Embedding dimensions for all-MiniLM-L6-v2
pub const FASTEMBED_DIMENSIONS: usize = 384;

/// Provider name persisted alongside model vectors
pub const FASTEMBED_PROVIDER_NAME: &str = "fastembed/all-MiniLM-L6-v2";

/// Embedding provider backed by a local ONNX model
pub struct FastEmbedProvider {
    model: Arc<RwLock<Option<::fastembed::TextEmbedding>>>,
}

impl Default for FastEmbedProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl FastEmbedProvider {
    pub fn new() -> Self {
        Self {
            model: Arc::new(RwLock::new(None)),
        }
    }

    /// Initialize the embedding model (lazy loading)
    async fn ensure_model(&self) -> Result<()> {
        use ::fastembed::{EmbeddingModel, InitOptions, TextEmbedding};

        if self.model.read().await.is_some() {
            return Ok(());
        }

        let mut model_guard = self.model.write().await;
        if model_guard.is_some() {
            return Ok(());
        }

        tracing::info!("Loading embedding model: all-MiniLM-L6-v2");
        let start = std::time::Instant::now();

        let mut init_options = InitOptions::default();
        init_options.model_name = EmbeddingModel::AllMiniLML6V2;
        init_options.show_download_progress = false;

        let model = TextEmbedding::try_new(init_options)
            .map_err(|e| Error::embedding(format!("Failed to load embedding model: {}", e)))?;

        tracing::info!("Embedding model loaded in {:?}", start.elapsed());

        *model_guard = Some(model);
        Ok(())
    }

    /// Check if the model is loaded
    pub async fn is_loaded(&self) -> bool {
        self.model.read().await.is_some()
    }
}

#[async_trait]
impl EmbeddingProvider for FastEmbedProvider {
    fn name(&self) -> &str {
        FASTEMBED_PROVIDER_NAME
    }

    fn dimensions(&self) -> usize {
        FASTEMBED_DIMENSIONS
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut vectors = self.embed_batch(&[text.to_string()]).await?;
        vectors
            .pop()
            .ok_or_else(|| Error::embedding("No embedding generated"))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        self.ensure_model().await?;

        let model_guard = self.model.read().await;
        let model = model_guard
            .as_ref()
            .ok_or_else(|| Error::embedding("Embedding model not initialized"))?;

        let inputs: Vec<&str> = texts.iter().map(String::as_str).collect();
        model
            .embed(inputs, None)
            .map_err(|e| Error::embedding(format!("Failed to generate embeddings: {}", e)))
    }
}
