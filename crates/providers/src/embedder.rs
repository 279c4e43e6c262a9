//! Embedder backed by a provider's embedding endpoint.

use std::sync::Arc;

use async_trait::async_trait;
use optimus_core::error::StoreError;
use optimus_core::provider::{EmbeddingRequest, Provider};
use optimus_core::store::Embedder;

pub struct ProviderEmbedder {
    provider: Arc<dyn Provider>,
    model: String,
}

impl ProviderEmbedder {
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl Embedder for ProviderEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, StoreError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let response = self
            .provider
            .embed(EmbeddingRequest {
                model: self.model.clone(),
                inputs: texts.to_vec(),
            })
            .await
            .map_err(|e| StoreError::EmbeddingFailed(e.to_string()))?;

        if response.embeddings.len() != texts.len() {
            return Err(StoreError::EmbeddingFailed(format!(
                "Expected {} embeddings, provider returned {}",
                texts.len(),
                response.embeddings.len()
            )));
        }

        Ok(response.embeddings)
    }
}
