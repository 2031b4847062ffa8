//! Embeddings served by a language-model backend.

use async_trait::async_trait;
use doki_core::error::MemoryError;
use doki_core::knowledge::Embedder;
use doki_core::provider::{EmbeddingRequest, Provider};
use std::sync::Arc;

/// Adapts a [`Provider`] with an embedding endpoint to [`Embedder`].
///
/// Vectors of the wrong length are rejected so a misconfigured model cannot
/// mix dimensionalities inside one store.
pub struct ProviderEmbedder {
    provider: Arc<dyn Provider>,
    model: String,
    dimensions: usize,
}

impl ProviderEmbedder {
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>, dimensions: usize) -> Self {
        Self {
            provider,
            model: model.into(),
            dimensions,
        }
    }
}

#[async_trait]
impl Embedder for ProviderEmbedder {
    fn name(&self) -> &str {
        self.provider.name()
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, MemoryError> {
        let response = self
            .provider
            .embed(EmbeddingRequest {
                model: self.model.clone(),
                inputs: vec![text.to_string()],
            })
            .await
            .map_err(|e| MemoryError::EmbeddingFailed(e.to_string()))?;

        let vector = response
            .embeddings
            .into_iter()
            .next()
            .ok_or_else(|| MemoryError::EmbeddingFailed("empty embedding response".into()))?;

        if vector.len() != self.dimensions {
            return Err(MemoryError::EmbeddingFailed(format!(
                "model '{}' returned {} dimensions, expected {}",
                self.model,
                vector.len(),
                self.dimensions
            )));
        }
        Ok(vector)
    }
}
