//! In-memory retrieval backend.
//!
//! Useful for testing, offline demos and small corpora exported from the vector database.

use super::{cosine_similarity, GuestFilter, Retriever, SearchHit};
use crate::embedding::Embedder;
use crate::error::{PodqueryError, Result};
use crate::rerank::bm25_scores;
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, RwLock};
use tracing::{debug, info};

/// A stored hit with an optional precomputed embedding.
#[derive(Debug, Clone, Deserialize)]
struct StoredHit {
    #[serde(flatten)]
    hit: SearchHit,
    #[serde(default)]
    embedding: Option<Vec<f32>>,
}

/// In-memory hybrid retriever.
pub struct MemoryRetriever {
    collections: RwLock<HashMap<String, Vec<StoredHit>>>,
    embedder: Option<Arc<dyn Embedder>>,
    alpha: f32,
    limit: usize,
}

impl MemoryRetriever {
    /// Create an empty retriever.
    pub fn new(alpha: f32, limit: usize) -> Self {
        Self {
            collections: RwLock::new(HashMap::new()),
            embedder: None,
            alpha,
            limit,
        }
    }

    /// Load a JSON array of hits into `collection`.
    ///
    /// Entries may carry an `embedding` array used by the vector half of the search.
    pub fn from_json_file(path: &Path, collection: &str, alpha: f32, limit: usize) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            PodqueryError::Config(format!("Failed to read hits from {}: {}", path.display(), e))
        })?;
        let stored: Vec<StoredHit> = serde_json::from_str(&content)?;
        info!("Loaded {} hits into collection {}", stored.len(), collection);

        let retriever = Self::new(alpha, limit);
        retriever
            .collections
            .write()
            .map_err(|_| PodqueryError::Retrieval("Collection lock poisoned".to_string()))?
            .insert(collection.to_string(), stored);
        Ok(retriever)
    }

    /// Embed queries for the vector half of the search.
    pub fn with_embedder(mut self, embedder: Arc<dyn Embedder>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    /// Add hits to a collection, creating it if needed.
    pub fn insert(&self, collection: &str, hits: Vec<SearchHit>) -> Result<()> {
        let mut collections = self
            .collections
            .write()
            .map_err(|_| PodqueryError::Retrieval("Collection lock poisoned".to_string()))?;
        collections
            .entry(collection.to_string())
            .or_default()
            .extend(hits.into_iter().map(|hit| StoredHit { hit, embedding: None }));
        Ok(())
    }

    /// Number of hits stored in a collection.
    pub fn len(&self, collection: &str) -> usize {
        self.collections
            .read()
            .map(|c| c.get(collection).map_or(0, Vec::len))
            .unwrap_or(0)
    }

    pub fn is_empty(&self, collection: &str) -> bool {
        self.len(collection) == 0
    }
}

/// BM25 keyword scores over title and content, scaled so the best hit scores 1.
fn keyword_scores(query: &str, stored: &[StoredHit]) -> Result<Vec<f32>> {
    let documents: Vec<String> = stored
        .iter()
        .map(|s| format!("{}\n{}", s.hit.title, s.hit.content))
        .collect();
    let scores = bm25_scores(query, &documents)
        .map_err(|e| PodqueryError::Retrieval(e.to_string()))?;

    let max = scores.iter().copied().fold(0.0f32, f32::max);
    if max > 0.0 {
        Ok(scores.into_iter().map(|s| s / max).collect())
    } else {
        Ok(scores)
    }
}

#[async_trait]
impl Retriever for MemoryRetriever {
    async fn hybrid_search(
        &self,
        query: &str,
        collection: &str,
        filter: &GuestFilter,
    ) -> Result<Vec<SearchHit>> {
        if let Some(guest) = filter.guest() {
            info!("Guest filter '{}' is not applied to retrieval", guest);
        }

        let query_embedding = match &self.embedder {
            Some(embedder) => Some(embedder.embed(query).await?),
            None => None,
        };

        let collections = self
            .collections
            .read()
            .map_err(|_| PodqueryError::Retrieval("Collection lock poisoned".to_string()))?;
        let stored = collections
            .get(collection)
            .ok_or_else(|| PodqueryError::Retrieval(format!("Collection not found: {}", collection)))?;

        let keywords = keyword_scores(query, stored)?;

        let mut results: Vec<SearchHit> = stored
            .iter()
            .zip(keywords)
            .filter_map(|(s, keyword)| {
                let score = match (&query_embedding, &s.embedding) {
                    (Some(q), Some(d)) => {
                        self.alpha * cosine_similarity(q, d) + (1.0 - self.alpha) * keyword
                    }
                    _ if keyword > 0.0 => keyword,
                    _ => return None,
                };
                Some(s.hit.with_score(score))
            })
            .collect();

        results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        results.truncate(self.limit);

        debug!("Memory search matched {} hits", results.len());
        Ok(results)
    }
}
