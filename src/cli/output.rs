//! CLI output formatting utilities.

use crate::present::{AnswerSlot, CardSlot, ResultCard};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::Write;

/// Output helper for CLI formatting.
pub struct Output;

impl Output {
    /// Print an info message.
    pub fn info(msg: &str) {
        println!("{} {}", style(">>").cyan().bold(), msg);
    }

    /// Print a success message.
    pub fn success(msg: &str) {
        println!("{} {}", style(">>").green().bold(), msg);
    }

    /// Print a warning message.
    pub fn warning(msg: &str) {
        eprintln!("{} {}", style(">>").yellow().bold(), msg);
    }

    /// Print an error message.
    pub fn error(msg: &str) {
        eprintln!("{} {}", style(">>").red().bold(), msg);
    }

    /// Print a header.
    pub fn header(msg: &str) {
        println!("\n{}", style(msg).bold().underlined());
    }

    /// Print a key-value pair.
    pub fn kv(key: &str, value: &str) {
        println!("  {}: {}", style(key).dim(), value);
    }

    /// Print a list item.
    pub fn list_item(msg: &str) {
        println!("  {} {}", style("*").cyan(), msg);
    }

    /// Print one chunk of a streaming answer without a newline.
    pub fn answer_chunk(chunk: &str) {
        print!("{}", chunk);
        let _ = std::io::stdout().flush();
    }

    /// Print the answer region once it is final.
    ///
    /// `streamed` means the answer text was already printed chunk by chunk.
    pub fn answer(slot: &AnswerSlot, streamed: bool) {
        match slot {
            AnswerSlot::Answered(text) => {
                if streamed {
                    println!();
                } else {
                    println!("\n{}", text);
                }
            }
            AnswerSlot::Fallback(text) => {
                if streamed {
                    println!();
                }
                Self::warning(text);
            }
            AnswerSlot::NoContext | AnswerSlot::NoResults | AnswerSlot::InvalidQuestion(_) => {
                Self::warning(&slot.message())
            }
            AnswerSlot::SearchUnavailable(_) | AnswerSlot::Failed(_) => Self::error(&slot.message()),
        }
    }

    /// Print a result card, or a marker for one that failed to render.
    pub fn card(slot: &CardSlot) {
        match slot {
            CardSlot::Card(card) => Self::result_card(card),
            CardSlot::Failed { index, reason } => {
                println!(
                    "\n{} {}",
                    style(format!("[{}]", index)).red(),
                    style(format!("could not be displayed: {}", reason)).dim()
                );
            }
        }
    }

    fn result_card(card: &ResultCard) {
        println!(
            "\n{} {} ({}, score: {:.2})",
            style(format!("[{}]", card.index)).green(),
            style(&card.caption).bold(),
            style(&card.duration).cyan(),
            card.score
        );
        println!("   Guest: {}", card.guest);
        println!("   {}", content_preview(&card.content, 200));
        println!("   {}", style(&card.episode_url).dim());
    }

    /// Create a spinner.
    pub fn spinner(msg: &str) -> ProgressBar {
        let pb = ProgressBar::new_spinner();
        if let Ok(spinner_style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
            pb.set_style(spinner_style);
        }
        pb.set_message(msg.to_string());
        pb.enable_steady_tick(std::time::Duration::from_millis(100));
        pb
    }
}

/// Truncate content with ellipsis.
fn content_preview(content: &str, max_chars: usize) -> String {
    let content = content.replace('\n', " ");
    if content.chars().count() <= max_chars {
        content
    } else {
        let cut: String = content.chars().take(max_chars).collect();
        format!("{}...", cut.trim_end())
    }
}
