//! Worker subcommands (`gavel transcribe`, `gavel summarize`)
//!
//! Both stages run the same loop; only the claimed status and the
//! configured collaborator command differ.

use crate::error::Result;
use crate::WorkerArgs;
use colored::Colorize;
use gavel_core::claim::ClaimCoordinator;
use gavel_core::config::PipelineConfig;
use gavel_core::retry::RetryPolicy;
use gavel_core::stage::{CommandProcessor, Stage};
use gavel_core::store::RecordStore;
use gavel_core::worker::{RunMode, RunSummary, WorkerLoop};
use std::time::Duration;

/// Run one stage's worker loop in the requested mode
pub async fn run(stage: Stage, args: &WorkerArgs) -> Result<()> {
    let (config, store) = super::open_store().await?;
    let command = super::stage_command(&config, stage)?;

    let worker_id = args
        .worker
        .clone()
        .unwrap_or_else(crate::default_worker_id);
    let mode = run_mode(args, &config);

    let summary = build_worker(&config, &store, stage, &worker_id, &command)
        .run(mode)
        .await?;
    print_summary(stage, &worker_id, &summary);

    Ok(())
}

pub(crate) fn run_mode(args: &WorkerArgs, config: &PipelineConfig) -> RunMode {
    if args.continuous {
        let delay = args.delay.unwrap_or(config.worker.loop_delay_secs);
        RunMode::Continuous {
            delay: Duration::from_secs(delay),
        }
    } else if let Some(limit) = args.batch {
        RunMode::Batch(limit)
    } else {
        RunMode::Once
    }
}

pub(crate) fn build_worker(
    config: &PipelineConfig,
    store: &RecordStore,
    stage: Stage,
    worker_id: &str,
    command: &str,
) -> WorkerLoop {
    let coordinator = ClaimCoordinator::new(store.clone(), worker_id, config.claims.lease());
    let processor = CommandProcessor::new(stage, command, config.stages.timeout());

    WorkerLoop::new(
        coordinator,
        stage,
        Box::new(processor),
        RetryPolicy::from_config(&config.stages),
        Duration::from_secs(config.worker.heartbeat_interval_secs),
    )
}

pub(crate) fn print_summary(stage: Stage, worker_id: &str, summary: &RunSummary) {
    println!(
        "{}",
        format!("{stage} worker '{worker_id}' finished:").cyan().bold()
    );
    println!("  Claimed:   {}", summary.claimed);
    println!("  Succeeded: {}", summary.succeeded.to_string().green());
    if summary.failed > 0 {
        println!("  Failed:    {}", summary.failed.to_string().red());
    } else {
        println!("  Failed:    0");
    }
    if summary.yielded > 0 {
        println!("  Yielded:   {}", summary.yielded.to_string().yellow());
    }
    if summary.lost > 0 {
        println!("  Lost:      {}", summary.lost.to_string().yellow());
    }
}
