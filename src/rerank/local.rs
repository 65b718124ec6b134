//! In-process cross-encoder reranking with FastEmbed.
//!
//! The ONNX model is downloaded into the FastEmbed cache on first use and
//! scores each `(query, document)` pair jointly.

use super::{scores_in_input_order, sigmoid, Reranker};
use crate::config::{RerankerSettings, Settings};
use crate::error::{PodqueryError, Result};
use async_trait::async_trait;
use fastembed::{RerankInitOptions, RerankerModel, TextRerank};
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Cross-encoder reranker running locally.
pub struct LocalReranker {
    model: Arc<TextRerank>,
    model_name: String,
}

impl LocalReranker {
    /// Load the model named by `settings.model`, e.g. `BAAI/bge-reranker-base`.
    pub fn new(settings: &RerankerSettings) -> Result<Self> {
        let model = model_for_name(&settings.model)?;
        info!("Initializing reranker model: {}", settings.model);

        let mut options = RerankInitOptions::new(model).with_show_download_progress(true);
        if let Some(dir) = settings.cache_dir.as_deref() {
            options = options.with_cache_dir(Settings::expand_path(dir));
        }

        let model = TextRerank::try_new(options).map_err(|e| {
            PodqueryError::Rerank(format!("Failed to load reranker model {}: {}", settings.model, e))
        })?;

        Ok(Self {
            model: Arc::new(model),
            model_name: settings.model.clone(),
        })
    }
}

/// Resolve a model code to one of the rerankers FastEmbed ships.
pub fn model_for_name(name: &str) -> Result<RerankerModel> {
    TextRerank::list_supported_models()
        .into_iter()
        .find(|info| info.model_code.eq_ignore_ascii_case(name))
        .map(|info| info.model)
        .ok_or_else(|| {
            PodqueryError::Config(format!("Unsupported local reranker model: {}", name))
        })
}

#[async_trait]
impl Reranker for LocalReranker {
    #[instrument(skip(self, documents), fields(count = documents.len()))]
    async fn score(&self, query: &str, documents: &[String]) -> Result<Vec<f32>> {
        if documents.is_empty() {
            return Ok(Vec::new());
        }

        let model = Arc::clone(&self.model);
        let query = query.to_string();
        let documents = documents.to_vec();
        let count = documents.len();

        // Inference is CPU-bound.
        let results = tokio::task::spawn_blocking(move || {
            let docs: Vec<&str> = documents.iter().map(String::as_str).collect();
            model.rerank(query.as_str(), docs, false, None)
        })
        .await
        .map_err(|e| PodqueryError::Rerank(format!("Reranker task failed: {}", e)))?
        .map_err(|e| PodqueryError::Rerank(format!("Reranking failed: {}", e)))?;

        let scores = scores_in_input_order(
            results.into_iter().map(|r| (r.index, sigmoid(r.score))),
            count,
        )?;
        debug!("Scored {} documents", scores.len());
        Ok(scores)
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rerank::rerank;
    use crate::retrieval::SearchHit;

    #[test]
    fn test_model_for_name() {
        assert!(model_for_name("BAAI/bge-reranker-base").is_ok());
        assert!(model_for_name("baai/BGE-reranker-base").is_ok());
        assert!(matches!(
            model_for_name("not-a/reranker"),
            Err(PodqueryError::Config(_))
        ));
    }

    #[test]
    fn test_unknown_model_fails_before_download() {
        let settings = RerankerSettings {
            model: "cross-encoder/unknown".to_string(),
            ..RerankerSettings::default()
        };
        assert!(LocalReranker::new(&settings).is_err());
    }

    #[tokio::test]
    #[ignore] // Requires model download
    async fn test_ranks_by_meaning_without_shared_terms() {
        let reranker = LocalReranker::new(&RerankerSettings::default()).unwrap();
        let hits = vec![
            SearchHit {
                title: "off".to_string(),
                content: "We talked about podcasts and microphones.".to_string(),
                ..SearchHit::default()
            },
            SearchHit {
                title: "on".to_string(),
                content: "Self-control and willpower: doing the hard thing every morning.".to_string(),
                ..SearchHit::default()
            },
        ];

        let ranked = rerank(&reranker, &hits, "What is discipline?", 2).await.unwrap();

        assert_eq!(ranked[0].title, "on");
        assert!(ranked[0].score > ranked[1].score);
    }
}
