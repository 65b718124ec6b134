//! Cross-encoder reranker via an OpenAI-compatible `/v1/rerank` endpoint.
//!
//! Sends one batch request with every query-document pair; the service runs
//! the cross-encoder and returns a raw relevance logit per document.

use super::{scores_in_input_order, Reranker};
use crate::config::RerankerSettings;
use crate::error::{PodqueryError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument};

/// Reranker backed by a hosted cross-encoder model.
pub struct CrossEncoderReranker {
    http: reqwest::Client,
    url: String,
    model: String,
}

impl CrossEncoderReranker {
    /// Create a reranker from settings; `base_url` is required.
    pub fn new(settings: &RerankerSettings) -> Result<Self> {
        let base_url = settings.base_url.as_deref().ok_or_else(|| {
            PodqueryError::Config("reranker.base_url not configured".to_string())
        })?;

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|e| PodqueryError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http,
            url: format!("{}/v1/rerank", base_url.trim_end_matches('/')),
            model: settings.model.clone(),
        })
    }
}

#[async_trait]
impl Reranker for CrossEncoderReranker {
    #[instrument(skip(self, documents), fields(count = documents.len()))]
    async fn score(&self, query: &str, documents: &[String]) -> Result<Vec<f32>> {
        if documents.is_empty() {
            return Ok(Vec::new());
        }

        let req_body = RerankRequest {
            model: &self.model,
            query,
            documents,
            top_n: documents.len(),
        };

        let resp = self
            .http
            .post(&self.url)
            .json(&req_body)
            .send()
            .await
            .map_err(|e| PodqueryError::Rerank(format!("Failed to reach reranker endpoint: {}", e)))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(PodqueryError::Rerank(format!("Reranker returned {}: {}", status, body)));
        }

        let body: RerankResponse = resp
            .json()
            .await
            .map_err(|e| PodqueryError::Rerank(format!("Failed to parse reranker response: {}", e)))?;

        let scores = scores_by_position(body.results, documents.len())?;
        debug!("Scored {} documents", scores.len());
        Ok(scores)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// Map `{index, relevance_score}` results back onto document positions.
fn scores_by_position(results: Vec<RerankResultRaw>, count: usize) -> Result<Vec<f32>> {
    scores_in_input_order(
        results.into_iter().map(|r| (r.index, sigmoid(r.relevance_score))),
        count,
    )
}

/// Sigmoid normalization: maps raw logits to 0-1 range.
pub fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

#[derive(Serialize)]
struct RerankRequest<'a> {
    model: &'a str,
    query: &'a str,
    documents: &'a [String],
    top_n: usize,
}

#[derive(Deserialize)]
struct RerankResponse {
    results: Vec<RerankResultRaw>,
}

#[derive(Deserialize)]
struct RerankResultRaw {
    index: usize,
    relevance_score: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(index: usize, relevance_score: f32) -> RerankResultRaw {
        RerankResultRaw { index, relevance_score }
    }

    #[test]
    fn test_sigmoid_zero() {
        assert!((sigmoid(0.0) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_sigmoid_symmetry() {
        let x = 2.5f32;
        assert!((sigmoid(x) + sigmoid(-x) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_scores_follow_document_positions() {
        // The service returns results sorted by relevance, not by index.
        let scores = scores_by_position(vec![raw(2, 4.0), raw(0, 0.0), raw(1, -4.0)], 3).unwrap();
        assert!((scores[0] - 0.5).abs() < 1e-6);
        assert!(scores[2] > scores[0]);
        assert!(scores[1] < scores[0]);
    }

    #[test]
    fn test_missing_or_out_of_range_results_are_errors() {
        assert!(matches!(
            scores_by_position(vec![raw(0, 1.0)], 2),
            Err(PodqueryError::Rerank(_))
        ));
        assert!(matches!(
            scores_by_position(vec![raw(5, 1.0)], 2),
            Err(PodqueryError::Rerank(_))
        ));
    }

    #[test]
    fn test_new_requires_base_url() {
        let settings = RerankerSettings::default();
        assert!(CrossEncoderReranker::new(&settings).is_err());

        let settings = RerankerSettings {
            base_url: Some("http://localhost:8787/".to_string()),
            ..RerankerSettings::default()
        };
        let reranker = CrossEncoderReranker::new(&settings).unwrap();
        assert_eq!(reranker.url, "http://localhost:8787/v1/rerank");
        assert_eq!(reranker.model_name(), "BAAI/bge-reranker-base");
    }
}
