//! `gavel export` command implementation

use crate::error::Result;
use colored::Colorize;
use gavel_core::export::{ExportOutcome, Exporter};

/// Assemble and publish a snapshot of all summarized records
pub async fn run() -> Result<()> {
    let (config, store) = super::open_store().await?;
    let exporter = Exporter::from_config(store, config.export.clone());

    match exporter.run_once().await? {
        ExportOutcome::Published { records } => {
            println!(
                "{} snapshot with {} record(s) to {}",
                "Published".green(),
                records,
                config.export.output_dir.display()
            );
        }
        ExportOutcome::Unchanged { records } => {
            println!("Snapshot unchanged ({records} record(s)); nothing published.");
        }
    }

    Ok(())
}
