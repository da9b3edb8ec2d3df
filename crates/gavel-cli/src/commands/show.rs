//! `gavel show` command implementation

use crate::error::Result;
use chrono::Utc;
use colored::Colorize;
use gavel_core::status::RecordStatus;

/// Show the full detail of one record
pub async fn run(id: &str) -> Result<()> {
    let (config, store) = super::open_store().await?;
    let rec = store.get_required(id).await?;
    let now = Utc::now();
    let lease = config.claims.lease();

    println!("{}", rec.title.cyan().bold());
    println!("  Id:       {}", rec.id);
    println!("  Chamber:  {}", rec.chamber);
    match rec.part {
        Some(part) => println!("  Session:  {} (part {})", rec.session_date, part),
        None => println!("  Session:  {}", rec.session_date),
    }
    println!("  Locator:  {}", rec.locator);

    let status = match rec.status {
        RecordStatus::Summarized => rec.status.to_string().green().to_string(),
        RecordStatus::Error => rec.status.to_string().red().to_string(),
        _ => rec.status.to_string(),
    };
    println!("  Status:   {status}");

    if let Some((worker, _)) = rec.claim() {
        let age = rec.claim_age(now).unwrap_or_else(chrono::Duration::zero);
        let marker = if rec.has_stale_claim(lease, now) {
            " (stale)".yellow().to_string()
        } else {
            String::new()
        };
        println!(
            "  Claim:    {} for {}{}",
            worker,
            super::format_age(age),
            marker
        );
    }

    if !rec.payload_transcript.is_empty() {
        println!("  Transcript: {} chars", rec.payload_transcript.len());
    }
    if !rec.payload_summary.is_empty() {
        println!("  Summary:    {} chars", rec.payload_summary.len());
    }
    if let Some(msg) = &rec.error_message {
        println!("  Error:    {}", msg.red());
        println!("  Run 'gavel retry {}' to requeue it.", rec.id);
    }

    println!("  Created:  {}", rec.created_at.format("%Y-%m-%d %H:%M:%S"));
    println!("  Updated:  {}", rec.updated_at.format("%Y-%m-%d %H:%M:%S"));

    Ok(())
}
