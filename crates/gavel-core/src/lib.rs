//! Gavel Core Library
//!
//! Coordination and state-machine layer for the legislative session
//! recording pipeline: discovery, transcription, summarization and
//! publication, executed by independent worker processes over one shared
//! SQLite store.
//!
//! # Overview
//!
//! - **Record Store**: every SQL statement in the pipeline, including the
//!   conditional updates the claim protocol is built on
//! - **Claim Coordinator**: atomic claim/release so N workers never
//!   process the same record twice
//! - **Worker Loop**: claim, run the external stage collaborator,
//!   release by outcome, with in-claim retries and heartbeats
//! - **Watchdog**: heartbeat-based liveness checks that relaunch dead
//!   worker roles
//! - **Export Publisher**: deterministic, digest-keyed snapshots of the
//!   summarized records
//!
//! # Coordination model
//!
//! There is no lock service and no shared memory. Ownership of a record
//! is exactly one thing: a conditional `UPDATE` that matched one row.
//! Selection is advisory, releases re-assert the holder, and a claim
//! outliving its lease is forfeit. Status only moves forward
//! (`pending → transcribed → summarized`), sideways to `error`, or back
//! to `pending` on an explicit retry.
//!
//! # Example
//!
//! ```no_run
//! use gavel_core::claim::ClaimCoordinator;
//! use gavel_core::config::PipelineConfig;
//! use gavel_core::store::RecordStore;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = PipelineConfig::load()?;
//!     let pool = gavel_core::db::create_pool(&config.database).await?;
//!     let store = RecordStore::new(pool);
//!     let claims = ClaimCoordinator::new(store, "worker-1", config.claims.lease());
//!     Ok(())
//! }
//! ```

#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod claim;
pub mod config;
pub mod db;
pub mod error;
pub mod export;
pub mod record;
pub mod retry;
pub mod stage;
pub mod status;
pub mod store;
pub mod watchdog;
pub mod worker;

// Re-export commonly used types
pub use error::{CoreError, Result};
