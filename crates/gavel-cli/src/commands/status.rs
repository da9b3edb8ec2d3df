//! `gavel status` command implementation
//!
//! Shows the backlog per status, active and stale claims, the most recent
//! error records, and per-role worker heartbeat ages.

use crate::error::Result;
use chrono::Utc;
use colored::Colorize;
use gavel_core::status::RecordStatus;

const RECENT_ERROR_LIMIT: i64 = 5;

/// Show pipeline backlog, errors and worker liveness
pub async fn run() -> Result<()> {
    let (config, store) = super::open_store().await?;
    let now = Utc::now();
    let cutoff = now - config.claims.lease();

    let counts = store.status_counts(cutoff).await?;

    println!("{}", "Pipeline backlog:".cyan().bold());
    println!("  Pending:      {}", counts.pending);
    println!("  Transcribed:  {}", counts.transcribed);
    println!("  Summarized:   {}", counts.summarized.to_string().green());
    if counts.error > 0 {
        println!("  Error:        {}", counts.error.to_string().red());
    } else {
        println!("  Error:        0");
    }
    println!("  Total:        {}", counts.total);
    println!();
    println!("  Active claims: {}", counts.processing);
    if counts.stale_claims > 0 {
        println!(
            "  Stale claims:  {} (lease expired; reclaimable)",
            counts.stale_claims.to_string().yellow()
        );
    }

    let errors = store
        .list_by_status(RecordStatus::Error, RECENT_ERROR_LIMIT)
        .await?;
    if !errors.is_empty() {
        println!();
        println!("{}", "Recent errors:".cyan().bold());
        for rec in &errors {
            println!(
                "  {}  {}",
                rec.id.red(),
                rec.error_message.as_deref().unwrap_or("(no message)")
            );
        }
        println!("  Run 'gavel retry <id>' to requeue a record.");
    }

    println!();
    println!("{}", "Worker heartbeats:".cyan().bold());
    let beats = store.list_heartbeats().await?;
    if beats.is_empty() {
        println!("  No workers have reported.");
    } else {
        for beat in &beats {
            let age = now.signed_duration_since(beat.beat_at);
            println!(
                "  {:<12} {:<28} {} ago",
                beat.role,
                beat.worker_id,
                super::format_age(age)
            );
        }
    }

    Ok(())
}
