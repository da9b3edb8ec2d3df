//! `gavel pipeline` command implementation
//!
//! A full cycle runs transcription, then summarization, then export, sharing
//! one worker identity. Stage command failures are tallied per record and do
//! not stop the cycle; an export failure does, since a half-published
//! snapshot is worse than a late one.

use crate::error::Result;
use crate::WorkerArgs;
use colored::Colorize;
use gavel_core::config::PipelineConfig;
use gavel_core::export::{ExportOutcome, Exporter};
use gavel_core::stage::Stage;
use gavel_core::store::RecordStore;
use gavel_core::worker::RunMode;
use std::time::Duration;

/// Run transcribe -> summarize -> export, once or on a loop
pub async fn run(args: &WorkerArgs) -> Result<()> {
    let (config, store) = super::open_store().await?;

    // Both collaborator commands must be configured before any work starts;
    // discovering the second one missing mid-cycle would strand claims.
    let transcribe_command = super::stage_command(&config, Stage::Transcribe)?;
    let summarize_command = super::stage_command(&config, Stage::Summarize)?;

    let worker_id = args
        .worker
        .clone()
        .unwrap_or_else(crate::default_worker_id);

    // Within a cycle each stage runs bounded: one record under --once, a
    // batch cap if given, otherwise a full drain so the export reflects
    // everything summarizable at cutoff. `--continuous` loops whole
    // cycles instead.
    let stage_mode = if args.once {
        RunMode::Once
    } else {
        match args.batch {
            Some(limit) => RunMode::Batch(limit),
            None => RunMode::Drain,
        }
    };

    if !args.continuous {
        return run_cycle(
            &config,
            &store,
            &worker_id,
            &transcribe_command,
            &summarize_command,
            stage_mode,
        )
        .await;
    }

    let delay = Duration::from_secs(args.delay.unwrap_or(config.worker.loop_delay_secs));
    tracing::info!(
        worker_id = %worker_id,
        delay_secs = delay.as_secs(),
        "pipeline loop started"
    );

    loop {
        if let Err(err) = run_cycle(
            &config,
            &store,
            &worker_id,
            &transcribe_command,
            &summarize_command,
            stage_mode,
        )
        .await
        {
            tracing::error!(error = %err, "pipeline cycle failed");
            eprintln!("Pipeline cycle failed: {err}");
        }
        tokio::time::sleep(delay).await;
    }
}

async fn run_cycle(
    config: &PipelineConfig,
    store: &RecordStore,
    worker_id: &str,
    transcribe_command: &str,
    summarize_command: &str,
    stage_mode: RunMode,
) -> Result<()> {
    for (stage, command) in [
        (Stage::Transcribe, transcribe_command),
        (Stage::Summarize, summarize_command),
    ] {
        let summary = super::worker::build_worker(config, store, stage, worker_id, command)
            .run(stage_mode)
            .await?;
        super::worker::print_summary(stage, worker_id, &summary);
        if summary.failed > 0 {
            tracing::warn!(
                stage = %stage,
                failed = summary.failed,
                "stage left records in error; continuing cycle"
            );
        }
    }

    let exporter = Exporter::from_config(store.clone(), config.export.clone());
    match exporter.run_once().await? {
        ExportOutcome::Published { records } => {
            println!("{} snapshot with {} record(s).", "Published".green(), records);
        }
        ExportOutcome::Unchanged { records } => {
            println!("Snapshot unchanged ({records} record(s)).");
        }
    }

    Ok(())
}
