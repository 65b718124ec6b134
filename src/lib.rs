//! podquery - conversational search over podcast transcripts
//!
//! Ask a question of a podcast transcript corpus and get an answer grounded
//! in the excerpts that best match it, together with the episodes those
//! excerpts came from.
//!
//! # Architecture
//!
//! One question flows through these modules in order:
//!
//! - `retrieval` - Hybrid (vector + keyword) search over the transcript index
//! - `rerank` - Second-pass relevance scoring of the retrieved hits
//! - `tokenizer` - Token counting for the prompt budget
//! - `rag` - Context selection, prompt rendering and answer generation
//! - `present` - Result cards and the answer region
//! - `orchestrator` - Pipeline coordination
//!
//! `config` holds settings and prompt templates, `dataset` the episode list
//! used for the guest selector, and `cli` the command-line and web front ends.
//!
//! # Example
//!
//! ```rust,no_run
//! use podquery::config::Settings;
//! use podquery::orchestrator::Orchestrator;
//! use podquery::retrieval::GuestFilter;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let mut settings = Settings::load()?;
//!     settings.apply_env();
//!     let orchestrator = Orchestrator::new(settings)?;
//!
//!     let report = orchestrator.ask("What is discipline?", &GuestFilter::none()).await;
//!     println!("{}", report.answer.message());
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod config;
pub mod dataset;
pub mod embedding;
pub mod error;
pub mod openai;
pub mod orchestrator;
pub mod present;
pub mod rag;
pub mod rerank;
pub mod retrieval;
pub mod tokenizer;

pub use error::{PodqueryError, Result};
