//! Guests command implementation.

use crate::cli::Output;
use crate::config::Settings;
use crate::dataset::load_guest_list;
use anyhow::Result;

/// Print the sorted guest list from the episode dataset.
pub fn run_guests(settings: &Settings) -> Result<()> {
    let guests = load_guest_list(&settings.data_path())?;

    if guests.is_empty() {
        Output::warning("The episode dataset lists no guests.");
        return Ok(());
    }

    Output::header(&format!("Guests ({})", guests.len()));
    for guest in &guests {
        Output::list_item(guest);
    }
    Ok(())
}
