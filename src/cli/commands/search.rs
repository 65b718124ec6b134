//! Search command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use crate::present::{guest_notice, render_cards, AnswerSlot};
use crate::rag::ContextStatus;
use crate::retrieval::GuestFilter;
use anyhow::Result;

/// Run the search command.
pub async fn run_search(
    query: &str,
    guest: Option<String>,
    top_k: Option<usize>,
    mut settings: Settings,
) -> Result<()> {
    if let Some(k) = top_k {
        settings.reranker.top_k = k;
        settings.validate()?;
    }

    if let Err(e) = preflight::check(Operation::Search, &settings) {
        Output::error(&format!("{}", e));
        Output::info("Run 'podquery doctor' for detailed diagnostics.");
        return Err(e.into());
    }

    let orchestrator = Orchestrator::new(settings)?;
    let filter = GuestFilter::new(guest);
    if let Some(notice) = guest_notice(&filter) {
        Output::warning(&notice);
    }

    let spinner = Output::spinner("Searching...");
    let results = orchestrator.search(query, &filter).await;
    spinner.finish_and_clear();

    match results {
        Ok(outcome) => {
            if outcome.status == ContextStatus::NoResults {
                Output::warning("No results found matching your query.");
                return Ok(());
            }

            Output::success(&format!(
                "Found {} results ({} fit the prompt budget)",
                outcome.ranked.len(),
                outcome.context.len()
            ));
            for card in &render_cards(&outcome.ranked) {
                Output::card(card);
            }
        }
        Err(e) => {
            Output::answer(&AnswerSlot::for_search_error(&e), false);
            return Err(e.into());
        }
    }

    Ok(())
}
