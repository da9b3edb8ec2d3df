//! `gavel ingest` command implementation
//!
//! Loads a JSON listing of discovered recordings (produced by the scraper)
//! into the store. Re-ingesting a listing is harmless: known ids are
//! skipped without touching the existing rows.

use crate::error::{CliError, Result};
use chrono::Utc;
use colored::Colorize;
use gavel_core::record::NewRecording;
use std::io::Read;

/// Ingest recordings from a listing file (or stdin for "-")
pub async fn run(listing: &str) -> Result<()> {
    let raw = read_listing(listing)?;
    let recordings: Vec<NewRecording> =
        serde_json::from_str(&raw).map_err(|e| CliError::invalid_listing(e.to_string()))?;

    // Validate the whole listing before inserting anything, so a bad
    // entry in the middle cannot leave a half-ingested file behind.
    for rec in &recordings {
        rec.validate()?;
    }

    let (_, store) = super::open_store().await?;

    let now = Utc::now();
    let mut inserted = 0usize;
    let mut skipped = 0usize;
    for rec in &recordings {
        if store.insert_if_absent(rec, now).await? {
            inserted += 1;
        } else {
            skipped += 1;
        }
    }

    tracing::info!(inserted, skipped, "Ingest finished");

    println!("{}", "Ingest complete:".cyan().bold());
    println!("  New records:     {}", inserted.to_string().green());
    println!("  Already present: {}", skipped);

    Ok(())
}

fn read_listing(listing: &str) -> Result<String> {
    if listing == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        return Ok(buf);
    }

    std::fs::read_to_string(listing).map_err(|_| CliError::ListingNotFound(listing.to_string()))
}
