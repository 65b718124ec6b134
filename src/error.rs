//! Error types for podquery.

use thiserror::Error;

/// Library-level error type for podquery operations.
#[derive(Error, Debug)]
pub enum PodqueryError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Search unavailable: {0}")]
    Retrieval(String),

    #[error("Reranking failed: {0}")]
    Rerank(String),

    #[error("No search result fits within the {threshold}-token prompt budget")]
    ContextOverflow { threshold: usize },

    #[error("Answer generation failed: {0}")]
    Generation(String),

    #[error("Tokenizer error: {0}")]
    Tokenizer(String),

    #[error("Dataset error: {0}")]
    Dataset(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Render error: {0}")]
    Render(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),
}

/// Coarse classification used by the presentation layer to pick a failure indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Retrieval or reranking failed; nothing downstream is trustworthy.
    SearchUnavailable,
    /// Search worked but no hit fits the prompt budget.
    NoContext,
    /// Search worked, only the language model call failed.
    Generation,
    /// The request itself was unusable, e.g. a blank question.
    InvalidInput,
    /// Anything else (configuration, IO, bad input).
    Other,
}

impl PodqueryError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PodqueryError::Retrieval(_) | PodqueryError::Rerank(_) => ErrorKind::SearchUnavailable,
            PodqueryError::ContextOverflow { .. } => ErrorKind::NoContext,
            PodqueryError::Generation(_) => ErrorKind::Generation,
            PodqueryError::InvalidInput(_) => ErrorKind::InvalidInput,
            _ => ErrorKind::Other,
        }
    }
}

/// Result type alias for podquery operations.
pub type Result<T> = std::result::Result<T, PodqueryError>;
