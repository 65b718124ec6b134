//! CLI module for podquery.

pub mod commands;
mod output;
pub mod preflight;

pub use output::Output;

use clap::{Parser, Subcommand};

/// podquery - conversational search over podcast transcripts
///
/// Ask a question, get an answer grounded in the most relevant transcript
/// excerpts, and see the episodes they came from.
#[derive(Parser, Debug)]
#[command(name = "podquery")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Check credentials, dataset and configuration
    Doctor,

    /// Ask a question and get an answer with supporting episodes
    Ask {
        /// The question to ask
        question: String,

        /// Restrict to a guest (accepted but not applied yet)
        #[arg(short, long)]
        guest: Option<String>,

        /// Wait for the full answer instead of streaming it
        #[arg(long)]
        no_stream: bool,
    },

    /// Search transcripts without generating an answer
    Search {
        /// Search query
        query: String,

        /// Restrict to a guest (accepted but not applied yet)
        #[arg(short, long)]
        guest: Option<String>,

        /// Number of results kept after reranking
        #[arg(short = 'k', long)]
        top_k: Option<usize>,
    },

    /// List the guests in the episode dataset
    Guests,

    /// Start the web interface and HTTP API
    Serve {
        /// Host to bind to
        #[arg(long)]
        host: Option<String>,

        /// Port to bind to
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,
}
