//! Retrieval of transcript chunks from the vector database.
//!
//! Provides a trait-based interface over hybrid (vector + keyword) search backends.

mod memory;
mod weaviate;

pub use memory::MemoryRetriever;
pub use weaviate::WeaviateClient;

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A retrieved transcript segment with its episode metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    /// Transcript text of this chunk.
    pub content: String,
    /// Episode title.
    pub title: String,
    /// Guest appearing in the episode.
    pub guest: String,
    /// Link to the episode.
    pub episode_url: String,
    /// Episode thumbnail.
    pub thumbnail_url: String,
    /// Episode duration in seconds.
    pub length: u64,
    /// Relevance score (higher is better).
    #[serde(default)]
    pub score: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub episode_num: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

impl SearchHit {
    /// A copy of this hit carrying a new relevance score.
    pub fn with_score(&self, score: f32) -> Self {
        Self {
            score,
            ..self.clone()
        }
    }
}

/// Optional guest restriction chosen in the UI.
///
/// Retrieval backends accept it but do not apply it yet; the presentation
/// layer tells the user their selection was ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GuestFilter {
    guest: Option<String>,
}

impl GuestFilter {
    /// No restriction.
    pub fn none() -> Self {
        Self::default()
    }

    /// Build a filter from an optional selection; blank names mean no filter.
    pub fn new(guest: Option<String>) -> Self {
        Self {
            guest: guest
                .map(|g| g.trim().to_string())
                .filter(|g| !g.is_empty()),
        }
    }

    pub fn guest(&self) -> Option<&str> {
        self.guest.as_deref()
    }

    pub fn is_active(&self) -> bool {
        self.guest.is_some()
    }
}

/// Trait for hybrid search backends.
#[async_trait]
pub trait Retriever: Send + Sync {
    /// Search `collection` for chunks relevant to `query`.
    ///
    /// Service failures are errors, never an empty result.
    async fn hybrid_search(
        &self,
        query: &str,
        collection: &str,
        filter: &GuestFilter,
    ) -> Result<Vec<SearchHit>>;
}

/// Compute cosine similarity between two vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
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
    fn test_cosine_similarity() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &b) - 1.0).abs() < 0.001);

        let c = vec![0.0, 1.0, 0.0];
        assert!((cosine_similarity(&a, &c)).abs() < 0.001);

        let d = vec![-1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &d) + 1.0).abs() < 0.001);
    }

    #[test]
    fn test_guest_filter_blank_is_inactive() {
        assert!(!GuestFilter::new(Some("   ".to_string())).is_active());
        assert!(!GuestFilter::none().is_active());

        let filter = GuestFilter::new(Some(" Jocko Willink ".to_string()));
        assert_eq!(filter.guest(), Some("Jocko Willink"));
    }

    #[test]
    fn test_with_score_keeps_metadata() {
        let hit = SearchHit {
            title: "Episode".to_string(),
            length: 42,
            score: 0.1,
            ..SearchHit::default()
        };
        let rescored = hit.with_score(0.9);
        assert_eq!(rescored.score, 0.9);
        assert_eq!(rescored.title, "Episode");
        assert_eq!(rescored.length, 42);
        assert_eq!(hit.score, 0.1);
    }

    #[test]
    fn test_hit_deserializes_without_optional_fields() {
        let hit: SearchHit = serde_json::from_str(
            r#"{"content":"c","title":"t","guest":"g","episode_url":"https://e","thumbnail_url":"https://t","length":61}"#,
        )
        .unwrap();
        assert_eq!(hit.length, 61);
        assert_eq!(hit.score, 0.0);
        assert!(hit.doc_id.is_none());
    }
}
