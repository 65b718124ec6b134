//! Ask command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use crate::present::{guest_notice, render_cards, AnswerSlot};
use crate::retrieval::GuestFilter;
use anyhow::Result;

/// Run the ask command.
pub async fn run_ask(
    question: &str,
    guest: Option<String>,
    no_stream: bool,
    settings: Settings,
) -> Result<()> {
    // Pre-flight checks
    if let Err(e) = preflight::check(Operation::Ask, &settings) {
        Output::error(&format!("{}", e));
        Output::info("Run 'podquery doctor' for detailed diagnostics.");
        return Err(e.into());
    }

    let stream = settings.generation.stream && !no_stream;
    let orchestrator = Orchestrator::new(settings)?;
    let filter = GuestFilter::new(guest);

    if let Some(notice) = guest_notice(&filter) {
        Output::warning(&notice);
    }

    let spinner = Output::spinner("Searching transcripts...");
    let outcome = match orchestrator.search(question, &filter).await {
        Ok(outcome) => outcome,
        Err(e) => {
            spinner.finish_and_clear();
            Output::answer(&AnswerSlot::for_search_error(&e), false);
            return Err(e.into());
        }
    };

    spinner.set_message("Generating response...");
    let mut started = false;
    let answer = orchestrator
        .answer_with(&outcome, stream, |chunk| {
            if !started {
                spinner.finish_and_clear();
                println!();
                started = true;
            }
            Output::answer_chunk(chunk);
        })
        .await;
    spinner.finish_and_clear();
    Output::answer(&answer, started);

    let cards = render_cards(&outcome.ranked);
    if !cards.is_empty() {
        Output::header("Search Results");
        for card in &cards {
            Output::card(card);
        }
    }

    Ok(())
}
