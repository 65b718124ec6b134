//! podquery CLI entry point.

use anyhow::Result;
use clap::Parser;
use podquery::cli::{commands, Cli, Commands};
use podquery::config::Settings;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config_path = cli.config.as_ref().map(PathBuf::from);
    let mut settings = Settings::load_from(config_path.as_ref())?;
    settings.apply_env();

    // Initialize logging
    let log_level = match cli.verbose {
        0 => settings.general.log_level.as_str(),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| format!("podquery={}", log_level)),
        ))
        .with(tracing_subscriber::fmt::layer().with_target(false).with_writer(std::io::stderr))
        .init();

    // Execute command
    match &cli.command {
        Commands::Doctor => {
            commands::run_doctor(&settings, config_path.as_ref())?;
        }

        Commands::Config { action } => {
            commands::run_config(action, config_path.as_ref(), &settings)?;
        }

        Commands::Guests => {
            commands::run_guests(&settings)?;
        }

        Commands::Ask {
            question,
            guest,
            no_stream,
        } => {
            settings.validate()?;
            commands::run_ask(question, guest.clone(), *no_stream, settings).await?;
        }

        Commands::Search { query, guest, top_k } => {
            settings.validate()?;
            commands::run_search(query, guest.clone(), *top_k, settings).await?;
        }

        Commands::Serve { host, port } => {
            settings.validate()?;
            commands::run_serve(host.clone(), *port, settings).await?;
        }
    }

    Ok(())
}
