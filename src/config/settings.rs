//! Configuration settings for podquery.

use crate::error::{PodqueryError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Environment variable holding the vector database API key.
pub const WEAVIATE_API_KEY_VAR: &str = "WEAVIATE_API_KEY";
/// Environment variable holding the vector database endpoint URL.
pub const WEAVIATE_ENDPOINT_VAR: &str = "WEAVIATE_ENDPOINT";
/// Environment variable holding the language model API key.
pub const OPENAI_API_KEY_VAR: &str = "OPENAI_API_KEY";

/// Root configuration structure.
///
/// Built once at startup and then only read.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub retrieval: RetrievalSettings,
    pub embedding: EmbeddingSettings,
    pub reranker: RerankerSettings,
    pub context: ContextSettings,
    pub generation: GenerationSettings,
    pub server: ServerSettings,
    pub prompts: PromptSettings,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Episode dataset (JSON array) used to build the guest list.
    pub data_path: String,
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            data_path: "./data/impact_theory_data.json".to_string(),
            log_level: "warn".to_string(),
        }
    }
}

/// Which retrieval backend to query.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum RetrievalProvider {
    /// Weaviate hybrid search over GraphQL (default).
    #[default]
    Weaviate,
    /// In-process collection loaded from a JSON file of hits.
    Memory,
}

impl std::str::FromStr for RetrievalProvider {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "weaviate" => Ok(RetrievalProvider::Weaviate),
            "memory" => Ok(RetrievalProvider::Memory),
            _ => Err(format!("Unknown retrieval provider: {}", s)),
        }
    }
}

impl std::fmt::Display for RetrievalProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RetrievalProvider::Weaviate => write!(f, "weaviate"),
            RetrievalProvider::Memory => write!(f, "memory"),
        }
    }
}

/// Vector database settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalSettings {
    pub provider: RetrievalProvider,
    /// Weaviate endpoint URL (overridden by `WEAVIATE_ENDPOINT`).
    pub endpoint: Option<String>,
    /// Weaviate API key (overridden by `WEAVIATE_API_KEY`, never written back to disk).
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    /// Collection (Weaviate class) holding the transcript chunks.
    pub collection: String,
    /// Hybrid weighting: 1.0 is pure vector search, 0.0 pure keyword search.
    pub alpha: f32,
    /// Number of candidates fetched before reranking.
    pub limit: usize,
    /// Properties the keyword half of the hybrid query searches.
    pub query_properties: Vec<String>,
    /// Properties returned with every hit.
    pub return_properties: Vec<String>,
    /// JSON file of hits for the memory provider.
    pub memory_path: Option<String>,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            provider: RetrievalProvider::Weaviate,
            endpoint: None,
            api_key: None,
            collection: "Impact_theory_minilmL6_256".to_string(),
            alpha: 0.5,
            limit: 10,
            query_properties: vec!["content".to_string()],
            return_properties: [
                "doc_id",
                "title",
                "video_id",
                "episode_num",
                "length",
                "thumbnail_url",
                "episode_url",
                "guest",
                "summary",
                "content",
            ]
            .iter()
            .map(|p| p.to_string())
            .collect(),
            memory_path: None,
            timeout_secs: 30,
        }
    }
}

/// Query embedding settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    /// Embedding provider: `weaviate` lets the vector database vectorize the
    /// query server-side, `openai` embeds it client-side.
    pub provider: String,
    /// Embedding model the collection was indexed with.
    pub model: String,
    /// Embedding dimensions.
    pub dimensions: u32,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            provider: "weaviate".to_string(),
            model: "sentence-transformers/all-MiniLM-L6-v2".to_string(),
            dimensions: 384,
        }
    }
}

/// Which reranking backend to use.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub enum RerankerProvider {
    /// Cross-encoder model run in-process with FastEmbed.
    #[default]
    Local,
    /// Cross-encoder behind an OpenAI-compatible `/v1/rerank` endpoint.
    CrossEncoder,
    /// BM25 keyword scoring over the candidates, no model needed.
    Lexical,
}

impl std::str::FromStr for RerankerProvider {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "local" | "fastembed" => Ok(RerankerProvider::Local),
            "cross-encoder" | "crossencoder" => Ok(RerankerProvider::CrossEncoder),
            "lexical" | "bm25" => Ok(RerankerProvider::Lexical),
            _ => Err(format!("Unknown reranker provider: {}", s)),
        }
    }
}

impl std::fmt::Display for RerankerProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RerankerProvider::Local => write!(f, "local"),
            RerankerProvider::CrossEncoder => write!(f, "cross-encoder"),
            RerankerProvider::Lexical => write!(f, "lexical"),
        }
    }
}

/// Reranker settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RerankerSettings {
    pub provider: RerankerProvider,
    /// Cross-encoder model identifier.
    pub model: String,
    /// Base URL of the rerank service (cross-encoder provider only).
    pub base_url: Option<String>,
    /// Model cache directory for the local provider (FastEmbed default when unset).
    pub cache_dir: Option<String>,
    /// Number of hits kept after reranking.
    pub top_k: usize,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for RerankerSettings {
    fn default() -> Self {
        Self {
            provider: RerankerProvider::Local,
            model: "BAAI/bge-reranker-base".to_string(),
            base_url: None,
            cache_dir: None,
            top_k: 3,
            timeout_secs: 30,
        }
    }
}

/// Prompt budget settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextSettings {
    /// Model whose encoding counts prompt tokens (`words` for a whitespace approximation).
    pub tokenizer_model: String,
    /// Maximum token count of the rendered prompt.
    pub token_threshold: usize,
}

impl Default for ContextSettings {
    fn default() -> Self {
        Self {
            tokenizer_model: "gpt-3.5-turbo-0613".to_string(),
            token_threshold: 4000,
        }
    }
}

/// Which answer generator to use.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum GenerationProvider {
    /// OpenAI chat completions (default).
    #[default]
    OpenAI,
    /// A canned answer; search results still render.
    Fixed,
}

impl std::str::FromStr for GenerationProvider {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "openai" => Ok(GenerationProvider::OpenAI),
            "fixed" | "none" => Ok(GenerationProvider::Fixed),
            _ => Err(format!("Unknown generation provider: {}", s)),
        }
    }
}

impl std::fmt::Display for GenerationProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GenerationProvider::OpenAI => write!(f, "openai"),
            GenerationProvider::Fixed => write!(f, "fixed"),
        }
    }
}

/// Answer generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationSettings {
    pub provider: GenerationProvider,
    /// Chat model.
    pub model: String,
    /// OpenAI API key (overridden by `OPENAI_API_KEY`, never written back to disk).
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub temperature: f32,
    pub max_tokens: u32,
    /// Stream the answer chunk by chunk.
    pub stream: bool,
    /// Shown in place of the answer when generation fails.
    pub fallback_message: String,
    /// Answer returned by the fixed provider.
    pub fixed_answer: String,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            provider: GenerationProvider::OpenAI,
            model: "gpt-3.5-turbo-0613".to_string(),
            api_key: None,
            temperature: 0.0,
            max_tokens: 500,
            stream: true,
            fallback_message: "Sorry, I couldn't generate an answer right now.".to_string(),
            fixed_answer: "Answer generation is disabled; showing search results only."
                .to_string(),
        }
    }
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8501,
        }
    }
}

/// Prompt customization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct PromptSettings {
    /// Directory for custom prompts (overrides defaults).
    pub custom_dir: Option<String>,
    /// Custom variables available in all prompts as {{variable_name}}.
    pub variables: std::collections::HashMap<String, String>,
}

impl Settings {
    /// Load settings from the default configuration file.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    pub fn load_from(path: Option<&PathBuf>) -> Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let settings: Settings = toml::from_str(&content)?;
            Ok(settings)
        } else {
            Ok(Settings::default())
        }
    }

    /// Override credentials and endpoint from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_vars(|name| std::env::var(name).ok());
    }

    /// Override credentials and endpoint from an arbitrary variable lookup.
    pub fn apply_vars<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(key) = non_empty(WEAVIATE_API_KEY_VAR) {
            self.retrieval.api_key = Some(key);
        }
        if let Some(endpoint) = non_empty(WEAVIATE_ENDPOINT_VAR) {
            self.retrieval.endpoint = Some(endpoint);
        }
        if let Some(key) = non_empty(OPENAI_API_KEY_VAR) {
            self.generation.api_key = Some(key);
        }
    }

    /// Reject values no pipeline run could work with.
    pub fn validate(&self) -> Result<()> {
        if self.reranker.top_k == 0 {
            return Err(PodqueryError::Config("reranker.top_k must be at least 1".to_string()));
        }
        if self.retrieval.limit == 0 {
            return Err(PodqueryError::Config("retrieval.limit must be at least 1".to_string()));
        }
        if self.context.token_threshold == 0 {
            return Err(PodqueryError::Config(
                "context.token_threshold must be at least 1".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.retrieval.alpha) {
            return Err(PodqueryError::Config(format!(
                "retrieval.alpha must be within [0, 1], got {}",
                self.retrieval.alpha
            )));
        }
        if !(0.0..=2.0).contains(&self.generation.temperature) {
            return Err(PodqueryError::Config(format!(
                "generation.temperature must be within [0, 2], got {}",
                self.generation.temperature
            )));
        }
        if self.retrieval.provider == RetrievalProvider::Memory && self.retrieval.memory_path.is_none() {
            return Err(PodqueryError::Config(
                "retrieval.memory_path is required for the memory provider".to_string(),
            ));
        }
        if self.reranker.provider == RerankerProvider::CrossEncoder && self.reranker.base_url.is_none() {
            return Err(PodqueryError::Config(
                "reranker.base_url is required for the cross-encoder provider".to_string(),
            ));
        }
        Ok(())
    }

    /// Save settings to a specific path.
    pub fn save_to(&self, path: &PathBuf) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| PodqueryError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("podquery")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }

    /// Get the expanded episode dataset path.
    pub fn data_path(&self) -> PathBuf {
        Self::expand_path(&self.general.data_path)
    }

    /// Get the expanded memory retrieval path, if configured.
    pub fn memory_path(&self) -> Option<PathBuf> {
        self.retrieval.memory_path.as_deref().map(Self::expand_path)
    }
}
