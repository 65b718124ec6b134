//! Pipeline orchestrator for podquery.
//!
//! Runs one question through retrieval, reranking, context selection, prompt
//! rendering and answer generation, strictly in that order.

use crate::config::{
    GenerationProvider, Prompts, RerankerProvider, RetrievalProvider, Settings,
};
use crate::embedding::{Embedder, OpenAIEmbedder};
use crate::error::{PodqueryError, Result};
use crate::present::{render_cards, AnswerSlot, AskReport};
use crate::rag::{
    select_context, Answer, AnswerGenerator, CompletionRequest, ContextStatus, FixedGenerator,
    OpenAIGenerator, PromptTemplate,
};
use crate::rerank::{rerank, CrossEncoderReranker, LexicalReranker, LocalReranker, Reranker};
use crate::retrieval::{GuestFilter, MemoryRetriever, Retriever, SearchHit, WeaviateClient};
use crate::tokenizer::{counter_for_model, TokenCounter};
use std::sync::Arc;
use tracing::{info, instrument, warn, Span};
use uuid::Uuid;

/// Result of the search half of a run: everything before generation.
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    pub request_id: Uuid,
    pub query: String,
    /// Reranked hits, best first.
    pub ranked: Vec<SearchHit>,
    /// The prefix of `ranked` that fits the prompt budget.
    pub context: Vec<SearchHit>,
    pub status: ContextStatus,
    /// Rendered user prompt; present only when some context was selected.
    pub prompt: Option<String>,
}

/// The main orchestrator for the podquery pipeline.
pub struct Orchestrator {
    settings: Settings,
    prompts: Prompts,
    template: PromptTemplate,
    system_message: String,
    retriever: Arc<dyn Retriever>,
    reranker: Arc<dyn Reranker>,
    tokenizer: Arc<dyn TokenCounter>,
    generator: Arc<dyn AnswerGenerator>,
}

impl Orchestrator {
    /// Create an orchestrator with the components named in `settings`.
    pub fn new(settings: Settings) -> Result<Self> {
        let prompts = Prompts::load(
            settings.prompts.custom_dir.as_deref(),
            Some(&settings.prompts.variables),
        )?;

        let embedder: Option<Arc<dyn Embedder>> = match settings.embedding.provider.as_str() {
            "openai" => {
                info!("Embedding queries client-side with {}", settings.embedding.model);
                Some(Arc::new(OpenAIEmbedder::with_config(
                    settings.generation.api_key.as_deref(),
                    &settings.embedding.model,
                    settings.embedding.dimensions as usize,
                )?))
            }
            "weaviate" | "none" => None,
            other => {
                return Err(PodqueryError::Config(format!(
                    "Unknown embedding provider: {}",
                    other
                )))
            }
        };

        let retriever: Arc<dyn Retriever> = match settings.retrieval.provider {
            RetrievalProvider::Weaviate => {
                let mut client = WeaviateClient::new(&settings.retrieval)?
                    .with_openai_key(settings.generation.api_key.clone());
                if let Some(embedder) = &embedder {
                    client = client.with_embedder(embedder.clone());
                }
                Arc::new(client)
            }
            RetrievalProvider::Memory => {
                let path = settings.memory_path().ok_or_else(|| {
                    PodqueryError::Config("retrieval.memory_path not configured".to_string())
                })?;
                let mut memory = MemoryRetriever::from_json_file(
                    &path,
                    &settings.retrieval.collection,
                    settings.retrieval.alpha,
                    settings.retrieval.limit,
                )?;
                if let Some(embedder) = &embedder {
                    memory = memory.with_embedder(embedder.clone());
                }
                Arc::new(memory)
            }
        };
        info!("Using {} retrieval", settings.retrieval.provider);

        let reranker: Arc<dyn Reranker> = match settings.reranker.provider {
            RerankerProvider::Local => Arc::new(LocalReranker::new(&settings.reranker)?),
            RerankerProvider::CrossEncoder => Arc::new(CrossEncoderReranker::new(&settings.reranker)?),
            RerankerProvider::Lexical => Arc::new(LexicalReranker::new()),
        };
        info!("Using {} reranker ({})", settings.reranker.provider, reranker.model_name());

        let tokenizer = counter_for_model(&settings.context.tokenizer_model)?;

        let generator: Arc<dyn AnswerGenerator> = match settings.generation.provider {
            GenerationProvider::OpenAI => Arc::new(OpenAIGenerator::new(
                settings.generation.api_key.as_deref(),
                &settings.generation.model,
            )?),
            GenerationProvider::Fixed => {
                Arc::new(FixedGenerator::new(settings.generation.fixed_answer.clone()))
            }
        };
        info!("Using {} answer generation", settings.generation.provider);

        Ok(Self::with_components(
            settings, prompts, retriever, reranker, tokenizer, generator,
        ))
    }

    /// Create an orchestrator with custom components.
    pub fn with_components(
        settings: Settings,
        prompts: Prompts,
        retriever: Arc<dyn Retriever>,
        reranker: Arc<dyn Reranker>,
        tokenizer: Arc<dyn TokenCounter>,
        generator: Arc<dyn AnswerGenerator>,
    ) -> Self {
        let template = prompts.qa_template();
        let system_message = prompts.qa_system();

        Self {
            settings,
            prompts,
            template,
            system_message,
            retriever,
            reranker,
            tokenizer,
            generator,
        }
    }

    /// Get the settings.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Get the loaded prompts.
    pub fn prompts(&self) -> &Prompts {
        &self.prompts
    }

    /// Retrieve, rerank and fit context for `query`.
    ///
    /// Retrieval and reranking failures are returned as errors; an empty
    /// or overflowing selection is reported through [`SearchOutcome::status`].
    #[instrument(skip(self, filter), fields(request_id = tracing::field::Empty))]
    pub async fn search(&self, query: &str, filter: &GuestFilter) -> Result<SearchOutcome> {
        let query = query.trim();
        if query.is_empty() {
            return Err(PodqueryError::InvalidInput("Question must not be empty".to_string()));
        }

        let request_id = Uuid::new_v4();
        Span::current().record("request_id", tracing::field::display(request_id));

        if let Some(guest) = filter.guest() {
            info!("Guest filter {:?} selected but not applied", guest);
        }

        let hits = self
            .retriever
            .hybrid_search(query, &self.settings.retrieval.collection, filter)
            .await?;
        info!("Retrieved {} hits", hits.len());

        let ranked = rerank(
            self.reranker.as_ref(),
            &hits,
            query,
            self.settings.reranker.top_k,
        )
        .await?;

        let context = select_context(
            query,
            &ranked,
            &self.template,
            self.tokenizer.as_ref(),
            self.settings.context.token_threshold,
        );
        let status = ContextStatus::classify(&ranked, &context);
        let prompt = match status {
            ContextStatus::Selected => Some(self.template.render(query, &context)),
            ContextStatus::NoResults | ContextStatus::Overflow => None,
        };

        Ok(SearchOutcome {
            request_id,
            query: query.to_string(),
            ranked,
            context,
            status,
            prompt,
        })
    }

    /// Build the generation request for a search outcome.
    pub fn completion_request(&self, outcome: &SearchOutcome, stream: bool) -> Result<CompletionRequest> {
        let prompt = outcome.prompt.clone().ok_or(PodqueryError::ContextOverflow {
            threshold: self.settings.context.token_threshold,
        })?;

        Ok(CompletionRequest {
            prompt,
            system_message: self.system_message.clone(),
            temperature: self.settings.generation.temperature,
            max_tokens: self.settings.generation.max_tokens,
            stream,
        })
    }

    /// Generate an answer for a search outcome that has context.
    #[instrument(skip(self, outcome), fields(request_id = %outcome.request_id))]
    pub async fn generate(&self, outcome: &SearchOutcome, stream: bool) -> Result<Answer> {
        let request = self.completion_request(outcome, stream)?;
        self.generator.complete(&request).await
    }

    /// Produce the answer region for `outcome`, forwarding chunks to `on_chunk` as they arrive.
    ///
    /// Never fails: generation errors become the fallback message and an
    /// outcome without context skips generation.
    #[instrument(skip(self, outcome, on_chunk), fields(request_id = %outcome.request_id))]
    pub async fn answer_with<F>(&self, outcome: &SearchOutcome, stream: bool, on_chunk: F) -> AnswerSlot
    where
        F: FnMut(&str) + Send,
    {
        match outcome.status {
            ContextStatus::NoResults => return AnswerSlot::NoResults,
            ContextStatus::Overflow => {
                warn!(
                    "No hit fits within {} tokens; skipping generation",
                    self.settings.context.token_threshold
                );
                return AnswerSlot::NoContext;
            }
            ContextStatus::Selected => {}
        }

        let answer = match self.generate(outcome, stream).await {
            Ok(answer) => answer.for_each_chunk(on_chunk).await,
            Err(e) => Err(e),
        };

        match answer {
            Ok(text) => AnswerSlot::Answered(text.trim().to_string()),
            Err(e) => {
                warn!("Answer generation failed: {}", e);
                AnswerSlot::Fallback(self.settings.generation.fallback_message.clone())
            }
        }
    }

    /// Run the whole pipeline, streaming answer chunks to `on_chunk`.
    pub async fn ask_with<F>(
        &self,
        query: &str,
        filter: &GuestFilter,
        stream: bool,
        on_chunk: F,
    ) -> AskReport
    where
        F: FnMut(&str) + Send,
    {
        match self.search(query, filter).await {
            Ok(outcome) => {
                let answer = self.answer_with(&outcome, stream, on_chunk).await;
                AskReport::new(&outcome.query, filter, answer, render_cards(&outcome.ranked))
            }
            Err(e) => {
                warn!("Search failed: {}", e);
                AskReport::search_failed(query, filter, &e)
            }
        }
    }

    /// Run the whole pipeline and collect the answer.
    pub async fn ask(&self, query: &str, filter: &GuestFilter) -> AskReport {
        self.ask_with(query, filter, self.settings.generation.stream, |_| {})
            .await
    }
}
