//! Gavel CLI Library
//!
//! Command-line interface for the legislative session recording pipeline.
//!
//! # Overview
//!
//! The `gavel` binary is every process of the pipeline in one executable:
//!
//! - **Ingest**: load discovered recordings into the store (`gavel ingest`)
//! - **Workers**: run a processing stage (`gavel transcribe`, `gavel summarize`)
//! - **Inspection**: backlog and record state (`gavel status`, `gavel show`)
//! - **Retry**: requeue failed records (`gavel retry`)
//! - **Export**: publish the snapshot of summarized records (`gavel export`)
//! - **Pipeline**: one full cycle of all stages (`gavel pipeline`)
//! - **Watchdog**: supervise and relaunch worker roles (`gavel watchdog`)

pub mod commands;
pub mod error;

// Re-export commonly used types
pub use error::{CliError, Result};

use clap::{Args, Parser, Subcommand};

/// Gavel - legislative session recording pipeline
#[derive(Parser, Debug)]
#[command(name = "gavel")]
#[command(author, version, about, long_about = None)]
#[command(arg_required_else_help = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// Arguments shared by every worker-style subcommand
#[derive(Args, Debug, Clone)]
pub struct WorkerArgs {
    /// Worker identity recorded on claims (defaults to <hostname>-<uuid>)
    #[arg(long)]
    pub worker: Option<String>,

    /// Process at most one record, then exit (the worker default)
    #[arg(long, conflicts_with_all = ["batch", "continuous"])]
    pub once: bool,

    /// Process up to n records, then exit
    #[arg(long, conflicts_with = "continuous")]
    pub batch: Option<u32>,

    /// Loop indefinitely, sleeping between empty polls
    #[arg(long)]
    pub continuous: bool,

    /// Seconds to sleep between empty polls in continuous mode
    #[arg(long, requires = "continuous")]
    pub delay: Option<u64>,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Ingest discovered recordings from a JSON listing
    Ingest {
        /// Listing file (JSON array of recordings), or '-' for stdin
        listing: String,
    },

    /// Run the transcription worker (claims pending records)
    Transcribe {
        #[command(flatten)]
        args: WorkerArgs,
    },

    /// Run the summarization worker (claims transcribed records)
    Summarize {
        #[command(flatten)]
        args: WorkerArgs,
    },

    /// Show backlog counts, recent errors and worker heartbeats
    Status,

    /// Show one record in detail
    Show {
        /// Record id
        id: String,
    },

    /// Reset error records to pending so workers pick them up again
    Retry {
        /// Record id
        #[arg(required_unless_present = "all_errors", conflicts_with = "all_errors")]
        id: Option<String>,

        /// Reset every error record
        #[arg(long)]
        all_errors: bool,
    },

    /// Assemble the export snapshot and publish it if it changed
    Export,

    /// Run one full cycle: transcribe, summarize, export
    Pipeline {
        #[command(flatten)]
        args: WorkerArgs,
    },

    /// Supervise worker roles and relaunch dead ones
    Watchdog {
        /// Check once and exit instead of looping
        #[arg(long)]
        once: bool,

        /// Comma-separated roles to supervise
        #[arg(long, value_delimiter = ',', default_value = "transcribe,summarize")]
        roles: Vec<String>,
    },
}

/// Generated claim identity for workers started without `--worker`.
///
/// Hostname plus a fresh UUID fragment: readable in `gavel status` output
/// and unique across restarts, so a relaunched worker never inherits a
/// dead worker's claims by name.
pub fn default_worker_id() -> String {
    let host = hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .unwrap_or_else(|| "unknown-host".to_string());
    let nonce = uuid::Uuid::new_v4().simple().to_string();
    format!("{host}-{}", &nonce[..8])
}
