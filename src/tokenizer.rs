//! Token counting for prompt budgets.

use crate::error::{PodqueryError, Result};
use std::sync::Arc;
use tiktoken_rs::CoreBPE;
use tracing::debug;

/// Counts tokens the way the target language model does.
///
/// Implementations are deterministic and keep no state between calls.
pub trait TokenCounter: Send + Sync {
    fn count_tokens(&self, text: &str) -> usize;
}

/// BPE token counter bound to a model's encoding at construction.
pub struct TiktokenCounter {
    bpe: CoreBPE,
    model: String,
}

impl TiktokenCounter {
    /// Bind the encoding used by `model` (e.g. `gpt-3.5-turbo-0613`).
    pub fn for_model(model: &str) -> Result<Self> {
        let bpe = tiktoken_rs::get_bpe_from_model(model)
            .map_err(|e| PodqueryError::Tokenizer(format!("No encoding for model {}: {}", model, e)))?;
        debug!("Loaded tokenizer for {}", model);
        Ok(Self {
            bpe,
            model: model.to_string(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

impl TokenCounter for TiktokenCounter {
    fn count_tokens(&self, text: &str) -> usize {
        self.bpe.encode_with_special_tokens(text).len()
    }
}

/// Whitespace word count; a rough stand-in when no model encoding is wanted.
#[derive(Debug, Default, Clone)]
pub struct WordCounter;

impl TokenCounter for WordCounter {
    fn count_tokens(&self, text: &str) -> usize {
        text.split_whitespace().count()
    }
}

/// Build the counter named by `context.tokenizer_model`; `words` selects [`WordCounter`].
pub fn counter_for_model(model: &str) -> Result<Arc<dyn TokenCounter>> {
    match model {
        "words" => Ok(Arc::new(WordCounter)),
        _ => Ok(Arc::new(TiktokenCounter::for_model(model)?)),
    }
}
