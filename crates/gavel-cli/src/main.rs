//! Gavel CLI - Main entry point

use clap::Parser;
use gavel_cli::{Cli, Commands};
use gavel_common::logging::{init_logging, LogConfig, LogLevel};
use gavel_core::stage::Stage;
use std::process;
use tracing::error;

#[tokio::main]
async fn main() {
    // Parse command-line arguments
    let cli = Cli::parse();

    // GAVEL_LOG_* configures logging; --verbose forces debug level, and
    // without either the console stays quiet (warnings only) so command
    // output is not interleaved with log lines.
    let mut log_config = LogConfig::from_env().unwrap_or_default();
    if cli.verbose {
        log_config.level = LogLevel::Debug;
    } else if std::env::var("GAVEL_LOG_LEVEL").is_err() {
        log_config.level = LogLevel::Warn;
    }

    // Initialize logging (ignore errors as the CLI should work without logging)
    let _ = init_logging(&log_config);

    // Execute command
    if let Err(e) = execute_command(&cli).await {
        error!(error = %e, "Command failed");
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

/// Execute the CLI command
async fn execute_command(cli: &Cli) -> gavel_cli::Result<()> {
    match &cli.command {
        Commands::Ingest { listing } => gavel_cli::commands::ingest::run(listing).await,

        Commands::Transcribe { args } => {
            gavel_cli::commands::worker::run(Stage::Transcribe, args).await
        }

        Commands::Summarize { args } => {
            gavel_cli::commands::worker::run(Stage::Summarize, args).await
        }

        Commands::Status => gavel_cli::commands::status::run().await,

        Commands::Show { id } => gavel_cli::commands::show::run(id).await,

        Commands::Retry { id, all_errors } => {
            gavel_cli::commands::retry::run(id.as_deref(), *all_errors).await
        }

        Commands::Export => gavel_cli::commands::export::run().await,

        Commands::Pipeline { args } => gavel_cli::commands::pipeline::run(args).await,

        Commands::Watchdog { once, roles } => {
            gavel_cli::commands::watchdog::run(*once, roles).await
        }
    }
}
