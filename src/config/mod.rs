//! Configuration module for podquery.
//!
//! Handles loading and managing application settings and prompt templates.

mod prompts;
mod settings;

pub use prompts::{Prompts, QaPrompts};
pub use settings::{
    ContextSettings, EmbeddingSettings, GeneralSettings, GenerationProvider, GenerationSettings,
    PromptSettings, RerankerProvider, RerankerSettings, RetrievalProvider, RetrievalSettings,
    ServerSettings, Settings, OPENAI_API_KEY_VAR, WEAVIATE_API_KEY_VAR, WEAVIATE_ENDPOINT_VAR,
};
