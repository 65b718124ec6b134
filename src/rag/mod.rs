//! Retrieval-augmented answering: context selection, prompt rendering and generation.

pub mod context;
pub mod generator;
pub mod prompt;

pub use context::{select_context, ContextStatus};
pub use generator::{
    Answer, AnswerGenerator, AnswerStream, CompletionRequest, FixedGenerator, OpenAIGenerator,
};
pub use prompt::{render, sanitize, PromptTemplate};
