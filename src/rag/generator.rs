//! Answer generation with a chat-completion model.

use crate::error::{PodqueryError, Result};
use crate::openai::create_client;
use async_openai::types::{
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequest,
    CreateChatCompletionRequestArgs,
};
use async_trait::async_trait;
use futures::stream::{self, Stream, StreamExt};
use std::pin::Pin;
use tracing::{debug, info, instrument};

/// Incremental answer chunks in arrival order.
pub type AnswerStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

/// A generated answer: either the full text or a stream of chunks.
pub enum Answer {
    Complete(String),
    Stream(AnswerStream),
}

impl Answer {
    /// Concatenate the answer in arrival order.
    pub async fn collect(self) -> Result<String> {
        self.for_each_chunk(|_| {}).await
    }

    /// Call `on_chunk` for every chunk as it arrives and return the joined text.
    ///
    /// A complete answer is delivered as a single chunk.
    pub async fn for_each_chunk<F>(self, mut on_chunk: F) -> Result<String>
    where
        F: FnMut(&str),
    {
        match self {
            Answer::Complete(text) => {
                on_chunk(&text);
                Ok(text)
            }
            Answer::Stream(mut chunks) => {
                let mut text = String::new();
                while let Some(chunk) = chunks.next().await {
                    let chunk = chunk?;
                    on_chunk(&chunk);
                    text.push_str(&chunk);
                }
                Ok(text)
            }
        }
    }
}

impl std::fmt::Debug for Answer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Answer::Complete(text) => f.debug_tuple("Complete").field(text).finish(),
            Answer::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

/// Everything the generator needs for one call.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub prompt: String,
    pub system_message: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub stream: bool,
}

/// Trait for answer generators.
#[async_trait]
pub trait AnswerGenerator: Send + Sync {
    /// Generate an answer; `request.stream` selects the [`Answer`] variant.
    async fn complete(&self, request: &CompletionRequest) -> Result<Answer>;
}

/// OpenAI chat-completion generator.
pub struct OpenAIGenerator {
    client: async_openai::Client<async_openai::config::OpenAIConfig>,
    model: String,
}

impl OpenAIGenerator {
    pub fn new(api_key: Option<&str>, model: &str) -> Result<Self> {
        Ok(Self {
            client: create_client(api_key)?,
            model: model.to_string(),
        })
    }

    fn build_request(&self, request: &CompletionRequest) -> Result<CreateChatCompletionRequest> {
        let messages: Vec<ChatCompletionRequestMessage> = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(request.system_message.clone())
                .build()
                .map_err(|e| PodqueryError::Generation(e.to_string()))?
                .into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(request.prompt.clone())
                .build()
                .map_err(|e| PodqueryError::Generation(e.to_string()))?
                .into(),
        ];

        CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .temperature(request.temperature)
            .max_tokens(request.max_tokens)
            .stream(request.stream)
            .build()
            .map_err(|e| PodqueryError::Generation(e.to_string()))
    }
}

#[async_trait]
impl AnswerGenerator for OpenAIGenerator {
    #[instrument(skip(self, request), fields(model = %self.model, stream = request.stream))]
    async fn complete(&self, request: &CompletionRequest) -> Result<Answer> {
        let chat_request = self.build_request(request)?;

        if !request.stream {
            let response = self.client.chat().create(chat_request).await.map_err(|e| {
                PodqueryError::Generation(format!("Failed to generate response: {}", e))
            })?;

            let answer = response
                .choices
                .first()
                .and_then(|c| c.message.content.as_ref())
                .ok_or_else(|| PodqueryError::Generation("Empty response from LLM".to_string()))?
                .clone();

            debug!("Generated {} characters", answer.len());
            return Ok(Answer::Complete(answer));
        }

        let upstream = self.client.chat().create_stream(chat_request).await.map_err(|e| {
            PodqueryError::Generation(format!("Failed to start response stream: {}", e))
        })?;
        info!("Streaming response from {}", self.model);

        let chunks = upstream.filter_map(|item| async move {
            match item {
                Ok(response) => response
                    .choices
                    .first()
                    .and_then(|c| c.delta.content.clone())
                    .filter(|content| !content.is_empty())
                    .map(Ok),
                Err(e) => Some(Err(PodqueryError::Generation(format!(
                    "Response stream failed: {}",
                    e
                )))),
            }
        });

        Ok(Answer::Stream(Box::pin(chunks)))
    }
}

/// Generator that returns a configured answer without calling a model.
///
/// When streaming, the answer is split after each whitespace run so the
/// chunks concatenate back to the exact text.
#[derive(Debug, Clone)]
pub struct FixedGenerator {
    answer: String,
}

impl FixedGenerator {
    pub fn new(answer: impl Into<String>) -> Self {
        Self { answer: answer.into() }
    }
}

#[async_trait]
impl AnswerGenerator for FixedGenerator {
    async fn complete(&self, request: &CompletionRequest) -> Result<Answer> {
        if !request.stream {
            return Ok(Answer::Complete(self.answer.clone()));
        }

        let chunks: Vec<Result<String>> = self
            .answer
            .split_inclusive(char::is_whitespace)
            .map(|chunk| Ok(chunk.to_string()))
            .collect();
        Ok(Answer::Stream(Box::pin(stream::iter(chunks))))
    }
}
