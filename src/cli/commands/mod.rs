//! CLI command implementations.

mod ask;
mod config;
mod doctor;
mod guests;
mod search;
mod serve;

pub use ask::run_ask;
pub use config::run_config;
pub use doctor::run_doctor;
pub use guests::run_guests;
pub use search::run_search;
pub use serve::{router, run_serve, AppState};
