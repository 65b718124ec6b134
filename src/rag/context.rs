//! Token-budgeted context selection.

use super::prompt::PromptTemplate;
use crate::retrieval::SearchHit;
use crate::tokenizer::TokenCounter;
use serde::Serialize;
use tracing::{debug, info};

/// Outcome of fitting ranked hits into the prompt budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextStatus {
    /// At least one hit fits.
    Selected,
    /// Search returned nothing to select from.
    NoResults,
    /// Hits exist but even the best one alone exceeds the budget.
    Overflow,
}

impl ContextStatus {
    /// Classify a selection made from `ranked`.
    pub fn classify(ranked: &[SearchHit], selected: &[SearchHit]) -> Self {
        if ranked.is_empty() {
            ContextStatus::NoResults
        } else if selected.is_empty() {
            ContextStatus::Overflow
        } else {
            ContextStatus::Selected
        }
    }
}

/// Select the longest prefix of `ranked_hits` whose rendered prompt fits `token_threshold`.
///
/// Hits are added in rank order; the first hit that pushes the prompt over
/// budget stops selection and is left out, along with everything after it.
/// Hits are never truncated. When the first hit alone is too large the
/// selection is empty.
pub fn select_context(
    query: &str,
    ranked_hits: &[SearchHit],
    template: &PromptTemplate,
    tokenizer: &dyn TokenCounter,
    token_threshold: usize,
) -> Vec<SearchHit> {
    let mut selected: Vec<SearchHit> = Vec::with_capacity(ranked_hits.len());

    for hit in ranked_hits {
        selected.push(hit.clone());
        let tokens = tokenizer.count_tokens(&template.render(query, &selected));

        if tokens > token_threshold {
            selected.pop();
            info!(
                "Prompt would reach {} tokens (limit {}); keeping {} of {} hits",
                tokens,
                token_threshold,
                selected.len(),
                ranked_hits.len()
            );
            return selected;
        }
        debug!("Context with {} hits renders to {} tokens", selected.len(), tokens);
    }

    info!("All {} hits fit within {} tokens", selected.len(), token_threshold);
    selected
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenizer::WordCounter;

    fn template() -> PromptTemplate {
        PromptTemplate::new("Q: {{question}}\n{{context}}", "{{content}}", "\n")
    }

    fn hit(words: usize, tag: &str) -> SearchHit {
        SearchHit {
            content: vec![tag; words].join(" "),
            title: tag.to_string(),
            ..SearchHit::default()
        }
    }

    #[test]
    fn test_all_hits_fit() {
        let hits = vec![hit(3, "a"), hit(3, "b"), hit(3, "c")];
        let selected = select_context("q", &hits, &template(), &WordCounter, 100);
        assert_eq!(selected, hits);
    }

    #[test]
    fn test_stops_at_first_overflow() {
        // Prompt = "Q:" "q" + contents. Base cost 2 words.
        let hits = vec![hit(3, "a"), hit(3, "b"), hit(10, "c"), hit(1, "d")];
        let selected = select_context("q", &hits, &template(), &WordCounter, 9);

        let titles: Vec<_> = selected.iter().map(|h| h.title.as_str()).collect();
        // "d" would fit on its own but comes after the overflowing "c".
        assert_eq!(titles, vec!["a", "b"]);
    }

    #[test]
    fn test_exact_budget_is_accepted() {
        let hits = vec![hit(3, "a")];
        assert_eq!(select_context("q", &hits, &template(), &WordCounter, 5).len(), 1);
        assert!(select_context("q", &hits, &template(), &WordCounter, 4).is_empty());
    }

    #[test]
    fn test_first_hit_too_large_gives_empty_selection() {
        let hits = vec![hit(50, "a"), hit(1, "b")];
        let selected = select_context("q", &hits, &template(), &WordCounter, 20);
        assert!(selected.is_empty());
        assert_eq!(ContextStatus::classify(&hits, &selected), ContextStatus::Overflow);
    }

    #[test]
    fn test_selection_is_always_a_prefix_within_budget() {
        let hits: Vec<_> = (0..8).map(|i| hit((i * 7) % 5 + 1, &format!("h{}", i))).collect();
        let t = template();

        for threshold in 0..40 {
            let selected = select_context("what now", &hits, &t, &WordCounter, threshold);
            assert_eq!(&hits[..selected.len()], selected.as_slice());
            if !selected.is_empty() {
                assert!(WordCounter.count_tokens(&t.render("what now", &selected)) <= threshold);
            }
        }
    }

    #[test]
    fn test_classify() {
        assert_eq!(ContextStatus::classify(&[], &[]), ContextStatus::NoResults);
        let hits = vec![hit(1, "a")];
        assert_eq!(ContextStatus::classify(&hits, &hits), ContextStatus::Selected);
    }
}
