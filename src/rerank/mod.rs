//! Second-pass relevance scoring of retrieved hits.
//!
//! Backends only score `(query, document)` pairs; [`rerank`] applies the
//! ordering rule so every backend returns the same shape of result.

mod cross_encoder;
mod lexical;
mod local;

pub use cross_encoder::{sigmoid, CrossEncoderReranker};
pub use lexical::{bm25_scores, LexicalReranker};
pub use local::{model_for_name, LocalReranker};

use crate::error::{PodqueryError, Result};
use crate::retrieval::SearchHit;
use async_trait::async_trait;
use tracing::{debug, instrument};

/// Trait for query-conditioned relevance scorers.
#[async_trait]
pub trait Reranker: Send + Sync {
    /// Score every document against the query, returning one score per document in input order.
    async fn score(&self, query: &str, documents: &[String]) -> Result<Vec<f32>>;

    /// Model identifier, for logs.
    fn model_name(&self) -> &str;
}

/// Rerank `hits` for `query` and keep the best `top_k`.
///
/// The result holds `min(top_k, hits.len())` re-scored copies sorted by
/// descending score; equal scores keep their retrieval order. `hits` is not modified.
#[instrument(skip(reranker, hits), fields(model = %reranker.model_name(), candidates = hits.len()))]
pub async fn rerank(
    reranker: &dyn Reranker,
    hits: &[SearchHit],
    query: &str,
    top_k: usize,
) -> Result<Vec<SearchHit>> {
    if hits.is_empty() || top_k == 0 {
        return Ok(Vec::new());
    }

    let documents: Vec<String> = hits.iter().map(|h| h.content.clone()).collect();
    let scores = reranker.score(query, &documents).await?;
    let ranked = order_by_scores(hits, &scores, top_k)?;

    debug!("Kept {} of {} hits after reranking", ranked.len(), hits.len());
    Ok(ranked)
}

/// Order hits by descending score with a stable tie-break and keep `top_k`.
pub fn order_by_scores(hits: &[SearchHit], scores: &[f32], top_k: usize) -> Result<Vec<SearchHit>> {
    if scores.len() != hits.len() {
        return Err(PodqueryError::Rerank(format!(
            "Expected {} scores, got {}",
            hits.len(),
            scores.len()
        )));
    }
    if scores.iter().any(|s| s.is_nan()) {
        return Err(PodqueryError::Rerank("Reranker returned a NaN score".to_string()));
    }

    let mut order: Vec<usize> = (0..hits.len()).collect();
    // sort_by is stable, so ties keep retrieval order.
    order.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]));

    Ok(order
        .into_iter()
        .take(top_k)
        .map(|i| hits[i].with_score(scores[i]))
        .collect())
}

/// Place `(index, score)` pairs back at their document positions.
///
/// Every position in `0..count` must receive exactly one score.
pub(crate) fn scores_in_input_order<I>(results: I, count: usize) -> Result<Vec<f32>>
where
    I: IntoIterator<Item = (usize, f32)>,
{
    let mut scores: Vec<Option<f32>> = vec![None; count];
    for (index, score) in results {
        let slot = scores.get_mut(index).ok_or_else(|| {
            PodqueryError::Rerank(format!("Result index {} out of range for {} documents", index, count))
        })?;
        *slot = Some(score);
    }

    scores
        .into_iter()
        .enumerate()
        .map(|(i, s)| {
            s.ok_or_else(|| PodqueryError::Rerank(format!("No score returned for document {}", i)))
        })
        .collect()
}

const STOPWORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "but", "by", "do", "does", "for", "from", "how",
    "i", "in", "is", "it", "of", "on", "or", "so", "that", "the", "this", "to", "was", "what",
    "when", "where", "which", "who", "why", "with", "you",
];

/// Lowercased word terms of `text`, stopwords removed.
pub(crate) fn terms(text: &str) -> Vec<String> {
    text.split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .filter(|t| !STOPWORDS.contains(&t.as_str()))
        .collect()
}
