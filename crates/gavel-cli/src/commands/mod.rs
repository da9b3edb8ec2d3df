//! CLI command implementations
//!
//! Each subcommand has its own module with a `run` function. Commands print
//! human output with `println!`; everything else logs through `tracing`.

pub mod export;
pub mod ingest;
pub mod pipeline;
pub mod retry;
pub mod show;
pub mod status;
pub mod watchdog;
pub mod worker;

use crate::error::{CliError, Result};
use gavel_core::config::PipelineConfig;
use gavel_core::db::create_pool;
use gavel_core::stage::Stage;
use gavel_core::store::RecordStore;

/// Load configuration and open the shared record store.
pub(crate) async fn open_store() -> Result<(PipelineConfig, RecordStore)> {
    let config = PipelineConfig::load()?;
    let pool = create_pool(&config.database).await?;
    Ok((config, RecordStore::new(pool)))
}

/// Configured collaborator command for a stage, or an actionable error.
pub(crate) fn stage_command(config: &PipelineConfig, stage: Stage) -> Result<String> {
    let (command, env_var) = match stage {
        Stage::Transcribe => (&config.stages.transcribe_command, "GAVEL_TRANSCRIBE_COMMAND"),
        Stage::Summarize => (&config.stages.summarize_command, "GAVEL_SUMMARIZE_COMMAND"),
    };
    command
        .clone()
        .ok_or_else(|| CliError::stage_command_missing(stage.role(), env_var))
}

/// Compact, human-readable age ("42s", "3m 10s", "2h 5m").
pub(crate) fn format_age(age: chrono::Duration) -> String {
    let secs = age.num_seconds().max(0);
    if secs < 60 {
        format!("{secs}s")
    } else if secs < 3_600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m", secs / 3_600, (secs % 3_600) / 60)
    }
}
