//! OpenAI embeddings implementation.

use super::Embedder;
use crate::error::{PodqueryError, Result};
use crate::openai::create_client;
use async_openai::types::{CreateEmbeddingRequestArgs, EmbeddingInput};
use async_trait::async_trait;
use tracing::{debug, instrument};

/// OpenAI-based embedder.
pub struct OpenAIEmbedder {
    client: async_openai::Client<async_openai::config::OpenAIConfig>,
    model: String,
    dimensions: usize,
}

impl OpenAIEmbedder {
    /// Create a new OpenAI embedder with a custom model and dimensions.
    pub fn with_config(api_key: Option<&str>, model: &str, dimensions: usize) -> Result<Self> {
        Ok(Self {
            client: create_client(api_key)?,
            model: model.to_string(),
            dimensions,
        })
    }
}

#[async_trait]
impl Embedder for OpenAIEmbedder {
    #[instrument(skip(self, text), fields(model = %self.model))]
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let request = CreateEmbeddingRequestArgs::default()
            .model(&self.model)
            .input(EmbeddingInput::String(text.to_string()))
            .dimensions(self.dimensions as u32)
            .build()
            .map_err(|e| PodqueryError::Retrieval(format!("Failed to build embedding request: {}", e)))?;

        let response = self.client.embeddings().create(request).await.map_err(|e| {
            PodqueryError::Retrieval(format!("Embedding API error: {}", e))
        })?;

        let embedding = response
            .data
            .into_iter()
            .min_by_key(|e| e.index)
            .map(|e| e.embedding)
            .ok_or_else(|| PodqueryError::Retrieval("Empty embedding response".to_string()))?;

        debug!("Embedded query into {} dimensions", embedding.len());
        Ok(embedding)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedder_creation() {
        let embedder = OpenAIEmbedder::with_config(Some("sk-test"), "text-embedding-3-small", 384).unwrap();
        assert_eq!(embedder.dimensions(), 384);
        assert_eq!(embedder.model(), "text-embedding-3-small");
    }
}
