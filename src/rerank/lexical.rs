//! Offline BM25 reranker.
//!
//! Indexes the candidate set in a throwaway in-RAM tantivy index and scores
//! every candidate with tantivy's BM25. Deterministic and needs no model.

use super::{terms, Reranker};
use crate::error::{PodqueryError, Result};
use async_trait::async_trait;
use std::collections::BTreeSet;
use tantivy::collector::TopDocs;
use tantivy::query::{BooleanQuery, Occur, Query, TermQuery};
use tantivy::schema::{IndexRecordOption, Schema, Value, STORED, TEXT};
use tantivy::{doc, Index, IndexWriter, TantivyDocument, TantivyError, Term};

/// Writer arena for one indexing thread; the candidate sets are small.
const WRITER_MEMORY_BYTES: usize = 20_000_000;

/// BM25 score of each document for `query`, in input order.
///
/// Documents sharing no term with the query score exactly `0.0`.
pub fn bm25_scores(query: &str, documents: &[String]) -> Result<Vec<f32>> {
    let mut scores = vec![0.0; documents.len()];
    let query_terms: BTreeSet<String> = terms(query).into_iter().collect();
    if documents.is_empty() || query_terms.is_empty() {
        return Ok(scores);
    }

    let mut schema_builder = Schema::builder();
    let position_field = schema_builder.add_u64_field("position", STORED);
    let text_field = schema_builder.add_text_field("text", TEXT);
    let index = Index::create_in_ram(schema_builder.build());

    let mut writer: IndexWriter = index
        .writer_with_num_threads(1, WRITER_MEMORY_BYTES)
        .map_err(index_error)?;
    for (position, text) in documents.iter().enumerate() {
        writer
            .add_document(doc!(
                position_field => position as u64,
                text_field => text.as_str(),
            ))
            .map_err(index_error)?;
    }
    writer.commit().map_err(index_error)?;

    let searcher = index.reader().map_err(index_error)?.searcher();
    let clauses: Vec<(Occur, Box<dyn Query>)> = query_terms
        .iter()
        .map(|t| {
            let term = Term::from_field_text(text_field, t);
            let query: Box<dyn Query> = Box::new(TermQuery::new(term, IndexRecordOption::WithFreqs));
            (Occur::Should, query)
        })
        .collect();
    let query = BooleanQuery::new(clauses);

    let top_docs = searcher
        .search(&query, &TopDocs::with_limit(documents.len()))
        .map_err(index_error)?;
    for (score, address) in top_docs {
        let stored: TantivyDocument = searcher.doc(address).map_err(index_error)?;
        let position = stored
            .get_first(position_field)
            .and_then(|v| v.as_u64())
            .ok_or_else(|| PodqueryError::Rerank("Indexed candidate has no position".to_string()))?;
        if let Some(slot) = scores.get_mut(position as usize) {
            *slot = score;
        }
    }

    Ok(scores)
}

fn index_error(e: TantivyError) -> PodqueryError {
    PodqueryError::Rerank(format!("Keyword index failed: {}", e))
}

/// BM25 scorer over the candidate set.
#[derive(Debug, Default, Clone)]
pub struct LexicalReranker;

impl LexicalReranker {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Reranker for LexicalReranker {
    async fn score(&self, query: &str, documents: &[String]) -> Result<Vec<f32>> {
        bm25_scores(query, documents)
    }

    fn model_name(&self) -> &str {
        "bm25"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rerank::rerank;
    use crate::retrieval::SearchHit;

    fn docs(texts: &[&str]) -> Vec<String> {
        texts.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_relevant_document_scores_highest() {
        let scores = bm25_scores(
            "what is discipline",
            &docs(&[
                "We talked about sleep and recovery.",
                "Discipline is doing the work when you don't feel like it. Discipline equals freedom.",
                "Motivation fades, discipline stays.",
            ]),
        )
        .unwrap();

        assert_eq!(scores.len(), 3);
        assert_eq!(scores[0], 0.0);
        assert!(scores[1] > 0.0 && scores[2] > 0.0);
    }

    #[test]
    fn test_scores_are_deterministic() {
        let documents = docs(&["focus and habits", "habits of focus", "nothing relevant"]);
        let first = bm25_scores("focus habits", &documents).unwrap();
        let second = bm25_scores("focus habits", &documents).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_empty_query_scores_zero() {
        let scores = bm25_scores("", &docs(&["a document"])).unwrap();
        assert_eq!(scores, vec![0.0]);
    }

    #[tokio::test]
    async fn test_unmatched_candidates_score_positive_zero_and_keep_order() {
        let hits: Vec<SearchHit> = ["We talked about podcasts and microphones.", "Early mornings and cold showers."]
            .iter()
            .enumerate()
            .map(|(i, content)| SearchHit {
                title: format!("hit-{}", i),
                content: content.to_string(),
                ..SearchHit::default()
            })
            .collect();

        let ranked = rerank(&LexicalReranker::new(), &hits, "What is discipline?", 2)
            .await
            .unwrap();

        let titles: Vec<&str> = ranked.iter().map(|h| h.title.as_str()).collect();
        assert_eq!(titles, vec!["hit-0", "hit-1"]);
        assert!(ranked.iter().all(|h| h.score == 0.0 && h.score.is_sign_positive()));
    }
}
