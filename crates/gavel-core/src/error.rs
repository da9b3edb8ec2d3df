//! Error types for the coordination core

use thiserror::Error;

/// Result type alias for core operations
pub type Result<T> = std::result::Result<T, CoreError>;

/// Errors raised by the store, claim protocol, workers, and exporter
#[derive(Error, Debug)]
pub enum CoreError {
    /// SQL query or connection error
    #[error("Database query failed: {0}")]
    Sqlx(#[from] sqlx::Error),

    /// Schema migration failed
    #[error("Database migration failed: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    /// Configuration is invalid or missing
    #[error("Configuration error: {0}. Check GAVEL_* environment variables.")]
    Config(String),

    /// Requested record does not exist
    #[error("Record '{0}' not found")]
    NotFound(String),

    /// A conditional release lost to another owner; the result was dropped
    #[error("Worker '{worker}' no longer holds the claim on record '{id}'; result discarded")]
    ClaimLost { id: String, worker: String },

    /// Record is not in the status the operation requires
    #[error("Record '{id}' is '{actual}', expected '{expected}'")]
    WrongStatus {
        id: String,
        expected: String,
        actual: String,
    },

    /// A stage reported success but produced no output
    #[error("Refusing to complete record '{0}' with an empty payload")]
    EmptyPayload(String),

    /// Ingest input rejected before reaching the store
    #[error("Invalid recording: {0}")]
    InvalidRecord(String),

    /// Chamber value outside the closed set
    #[error("Invalid chamber '{0}'. Expected one of: house, senate, committee")]
    InvalidChamber(String),

    /// Status value outside the closed set
    #[error("Invalid status '{0}'. Expected one of: pending, transcribed, summarized, error")]
    InvalidStatus(String),

    /// Export cycle aborted before publishing
    #[error("Export aborted: {0}")]
    Export(String),

    /// File system operation failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization failed
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CoreError {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a not-found error
    pub fn not_found(id: impl Into<String>) -> Self {
        Self::NotFound(id.into())
    }

    /// Create a claim-lost error
    pub fn claim_lost(id: impl Into<String>, worker: impl Into<String>) -> Self {
        Self::ClaimLost {
            id: id.into(),
            worker: worker.into(),
        }
    }

    /// Create an export error
    pub fn export(msg: impl Into<String>) -> Self {
        Self::Export(msg.into())
    }

    /// Create an invalid-recording error
    pub fn invalid_record(msg: impl Into<String>) -> Self {
        Self::InvalidRecord(msg.into())
    }

    /// True when the failure is a lost conditional update rather than a fault
    pub fn is_claim_lost(&self) -> bool {
        matches!(self, Self::ClaimLost { .. })
    }
}
