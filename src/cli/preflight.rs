//! Pre-flight checks before running the pipeline.
//!
//! Validates that required credentials are configured before starting
//! operations that would otherwise fail midway.

use crate::config::{
    GenerationProvider, RerankerProvider, RetrievalProvider, Settings, OPENAI_API_KEY_VAR,
    WEAVIATE_API_KEY_VAR, WEAVIATE_ENDPOINT_VAR,
};
use crate::error::{PodqueryError, Result};
use crate::rerank::model_for_name;

/// Requirements for different operations.
#[derive(Debug, Clone, Copy)]
pub enum Operation {
    /// Asking questions needs search plus the answer model.
    Ask,
    /// Search needs the vector database (and rerank service, if configured).
    Search,
}

/// Run pre-flight checks for the given operation against loaded settings.
///
/// Returns Ok(()) if all checks pass, or an error describing what's missing.
pub fn check(operation: Operation, settings: &Settings) -> Result<()> {
    check_search(settings)?;
    if let Operation::Ask = operation {
        if settings.generation.provider == GenerationProvider::OpenAI {
            require(settings.generation.api_key.as_deref(), OPENAI_API_KEY_VAR, "sk-...")?;
        }
    }
    Ok(())
}

fn check_search(settings: &Settings) -> Result<()> {
    match settings.retrieval.provider {
        RetrievalProvider::Weaviate => {
            require(
                settings.retrieval.endpoint.as_deref(),
                WEAVIATE_ENDPOINT_VAR,
                "https://<cluster>.weaviate.network",
            )?;
            require(settings.retrieval.api_key.as_deref(), WEAVIATE_API_KEY_VAR, "...")?;
        }
        RetrievalProvider::Memory => {
            let path = settings.memory_path().ok_or_else(|| {
                PodqueryError::Config("retrieval.memory_path is not set".to_string())
            })?;
            if !path.exists() {
                return Err(PodqueryError::Config(format!(
                    "Memory collection file not found: {}",
                    path.display()
                )));
            }
        }
    }

    match settings.reranker.provider {
        RerankerProvider::Local => {
            model_for_name(&settings.reranker.model)?;
        }
        RerankerProvider::CrossEncoder if settings.reranker.base_url.is_none() => {
            return Err(PodqueryError::Config(
                "reranker.base_url is not set for the cross-encoder reranker".to_string(),
            ));
        }
        RerankerProvider::CrossEncoder | RerankerProvider::Lexical => {}
    }
    Ok(())
}

fn require(value: Option<&str>, var: &str, example: &str) -> Result<()> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(()),
        _ => Err(PodqueryError::Config(format!(
            "{} not set. Set it with: export {}='{}'",
            var, var, example
        ))),
    }
}
