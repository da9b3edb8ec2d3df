//! Pipeline configuration
//!
//! One [`PipelineConfig`] value is loaded at process startup and passed to
//! each component at construction. There is no process-wide mutable
//! configuration singleton.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

// ============================================================================
// Pipeline Configuration Constants
// ============================================================================

/// Default SQLite database path.
pub const DEFAULT_DB_PATH: &str = "gavel.db";

/// Default SQLite busy timeout in seconds.
pub const DEFAULT_DB_BUSY_TIMEOUT_SECS: u64 = 5;

/// Default claim lease in seconds (2 hours). A claim older than this is
/// considered abandoned and may be reclaimed by another worker.
pub const DEFAULT_CLAIM_LEASE_SECS: u64 = 7_200;

/// Default per-invocation stage timeout in seconds (1 hour).
pub const DEFAULT_STAGE_TIMEOUT_SECS: u64 = 3_600;

/// Default maximum processing attempts per claim before yielding.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default base delay between retry attempts in seconds.
pub const DEFAULT_RETRY_BASE_DELAY_SECS: u64 = 5;

/// Default cap on the retry backoff delay in seconds.
pub const DEFAULT_RETRY_MAX_DELAY_SECS: u64 = 300;

/// Default idle delay between continuous-mode polls in seconds.
pub const DEFAULT_LOOP_DELAY_SECS: u64 = 5;

/// Default interval between worker heartbeats in seconds.
pub const DEFAULT_HEARTBEAT_INTERVAL_SECS: u64 = 60;

/// Default age in seconds past which a role's freshest heartbeat counts
/// as dead.
pub const DEFAULT_HEARTBEAT_STALE_SECS: u64 = 300;

/// Default interval between watchdog checks in seconds.
pub const DEFAULT_WATCH_INTERVAL_SECS: u64 = 300;

/// Default directory for exported snapshots.
pub const DEFAULT_EXPORT_DIR: &str = "export";

/// Default page size for paginated snapshot reads.
pub const DEFAULT_EXPORT_PAGE_SIZE: u32 = 200;

/// Pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub database: DatabaseConfig,
    pub claims: ClaimConfig,
    pub stages: StageConfig,
    pub worker: WorkerConfig,
    pub watchdog: WatchdogConfig,
    pub export: ExportConfig,
}

/// Record store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub path: String,
    pub busy_timeout_secs: u64,
}

/// Claim lease configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaimConfig {
    pub lease_secs: u64,
}

impl ClaimConfig {
    /// Lease as a signed duration for timestamp arithmetic.
    pub fn lease(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.lease_secs as i64)
    }
}

/// External stage collaborator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageConfig {
    /// Shell command producing a transcript on stdout. Unset means the
    /// transcription stage cannot run on this host.
    pub transcribe_command: Option<String>,
    /// Shell command producing a summary on stdout, transcript on stdin.
    pub summarize_command: Option<String>,
    pub timeout_secs: u64,
    pub max_attempts: u32,
    pub retry_base_delay_secs: u64,
    pub retry_max_delay_secs: u64,
}

impl StageConfig {
    pub fn timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.timeout_secs)
    }
}

/// Worker loop configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    pub loop_delay_secs: u64,
    pub heartbeat_interval_secs: u64,
}

/// Watchdog supervisor configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchdogConfig {
    pub check_interval_secs: u64,
    pub heartbeat_stale_secs: u64,
}

/// Export publisher configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    pub output_dir: PathBuf,
    pub page_size: u32,
    /// Shell command run after a changed snapshot is written (e.g. a
    /// commit-and-push script). Unset means write-only export.
    pub publish_command: Option<String>,
}

impl PipelineConfig {
    /// Load configuration from environment and defaults
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = PipelineConfig {
            database: DatabaseConfig {
                path: std::env::var("GAVEL_DB_PATH")
                    .unwrap_or_else(|_| DEFAULT_DB_PATH.to_string()),
                busy_timeout_secs: std::env::var("GAVEL_DB_BUSY_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(DEFAULT_DB_BUSY_TIMEOUT_SECS),
            },
            claims: ClaimConfig {
                lease_secs: std::env::var("GAVEL_CLAIM_LEASE_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(DEFAULT_CLAIM_LEASE_SECS),
            },
            stages: StageConfig {
                transcribe_command: std::env::var("GAVEL_TRANSCRIBE_COMMAND").ok(),
                summarize_command: std::env::var("GAVEL_SUMMARIZE_COMMAND").ok(),
                timeout_secs: std::env::var("GAVEL_STAGE_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(DEFAULT_STAGE_TIMEOUT_SECS),
                max_attempts: std::env::var("GAVEL_MAX_ATTEMPTS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(DEFAULT_MAX_ATTEMPTS),
                retry_base_delay_secs: std::env::var("GAVEL_RETRY_BASE_DELAY")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(DEFAULT_RETRY_BASE_DELAY_SECS),
                retry_max_delay_secs: std::env::var("GAVEL_RETRY_MAX_DELAY")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(DEFAULT_RETRY_MAX_DELAY_SECS),
            },
            worker: WorkerConfig {
                loop_delay_secs: std::env::var("GAVEL_LOOP_DELAY")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(DEFAULT_LOOP_DELAY_SECS),
                heartbeat_interval_secs: std::env::var("GAVEL_HEARTBEAT_INTERVAL")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(DEFAULT_HEARTBEAT_INTERVAL_SECS),
            },
            watchdog: WatchdogConfig {
                check_interval_secs: std::env::var("GAVEL_WATCH_INTERVAL")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(DEFAULT_WATCH_INTERVAL_SECS),
                heartbeat_stale_secs: std::env::var("GAVEL_HEARTBEAT_STALE")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(DEFAULT_HEARTBEAT_STALE_SECS),
            },
            export: ExportConfig {
                output_dir: std::env::var("GAVEL_EXPORT_DIR")
                    .map(PathBuf::from)
                    .unwrap_or_else(|_| PathBuf::from(DEFAULT_EXPORT_DIR)),
                page_size: std::env::var("GAVEL_EXPORT_PAGE_SIZE")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(DEFAULT_EXPORT_PAGE_SIZE),
                publish_command: std::env::var("GAVEL_PUBLISH_COMMAND").ok(),
            },
        };

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.database.path.is_empty() {
            anyhow::bail!("Database path cannot be empty");
        }

        if self.claims.lease_secs == 0 {
            anyhow::bail!("Claim lease must be greater than 0 seconds");
        }

        if self.stages.max_attempts == 0 {
            anyhow::bail!("Stage max_attempts must be at least 1");
        }

        if self.stages.retry_base_delay_secs > self.stages.retry_max_delay_secs {
            anyhow::bail!(
                "Retry base delay ({}s) cannot be greater than the max delay ({}s)",
                self.stages.retry_base_delay_secs,
                self.stages.retry_max_delay_secs
            );
        }

        if self.stages.timeout_secs == 0 {
            anyhow::bail!("Stage timeout must be greater than 0 seconds");
        }

        if self.worker.heartbeat_interval_secs >= self.watchdog.heartbeat_stale_secs {
            anyhow::bail!(
                "Heartbeat interval ({}s) must be shorter than the staleness threshold ({}s)",
                self.worker.heartbeat_interval_secs,
                self.watchdog.heartbeat_stale_secs
            );
        }

        if self.export.page_size == 0 {
            anyhow::bail!("Export page size must be greater than 0");
        }

        Ok(())
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                path: DEFAULT_DB_PATH.to_string(),
                busy_timeout_secs: DEFAULT_DB_BUSY_TIMEOUT_SECS,
            },
            claims: ClaimConfig {
                lease_secs: DEFAULT_CLAIM_LEASE_SECS,
            },
            stages: StageConfig {
                transcribe_command: None,
                summarize_command: None,
                timeout_secs: DEFAULT_STAGE_TIMEOUT_SECS,
                max_attempts: DEFAULT_MAX_ATTEMPTS,
                retry_base_delay_secs: DEFAULT_RETRY_BASE_DELAY_SECS,
                retry_max_delay_secs: DEFAULT_RETRY_MAX_DELAY_SECS,
            },
            worker: WorkerConfig {
                loop_delay_secs: DEFAULT_LOOP_DELAY_SECS,
                heartbeat_interval_secs: DEFAULT_HEARTBEAT_INTERVAL_SECS,
            },
            watchdog: WatchdogConfig {
                check_interval_secs: DEFAULT_WATCH_INTERVAL_SECS,
                heartbeat_stale_secs: DEFAULT_HEARTBEAT_STALE_SECS,
            },
            export: ExportConfig {
                output_dir: PathBuf::from(DEFAULT_EXPORT_DIR),
                page_size: DEFAULT_EXPORT_PAGE_SIZE,
                publish_command: None,
            },
        }
    }
}
