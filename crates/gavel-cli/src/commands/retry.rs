//! `gavel retry` command implementation
//!
//! Requeues errored records for another pass. Retrying a record that is not
//! in the error status is refused rather than silently ignored, so operators
//! learn the record already moved on.

use crate::error::Result;
use chrono::Utc;
use colored::Colorize;
use gavel_core::error::CoreError;
use gavel_core::status::RecordStatus;

/// Requeue one errored record, or every errored record with `--all-errors`
pub async fn run(id: Option<&str>, all_errors: bool) -> Result<()> {
    let (_config, store) = super::open_store().await?;
    let now = Utc::now();

    if all_errors {
        let count = store.retry_all_errors(now).await?;
        if count == 0 {
            println!("No errored records to retry.");
        } else {
            println!(
                "{} {} record(s) back to pending.",
                "Requeued".green(),
                count
            );
        }
        return Ok(());
    }

    let Some(id) = id else {
        unreachable!("clap requires an id when --all-errors is absent");
    };

    if store.retry_record(id, now).await? {
        tracing::info!(record_id = %id, "record requeued for retry");
        println!("{} '{}' back to pending.", "Requeued".green(), id);
        return Ok(());
    }

    // Zero rows: either the record does not exist or it is not errored.
    // get_required distinguishes the two.
    let rec = store.get_required(id).await?;
    Err(CoreError::WrongStatus {
        id: id.to_string(),
        expected: RecordStatus::Error.to_string(),
        actual: rec.status.to_string(),
    }
    .into())
}
