//! Error types for the Gavel CLI
//!
//! This module provides user-friendly error types with clear, actionable
//! messages that help operators understand what went wrong and how to fix it.

use thiserror::Error;

/// Result type alias for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;

/// Comprehensive error type for CLI operations
///
/// All errors are designed to be user-facing with clear messages and
/// suggestions.
#[derive(Error, Debug)]
pub enum CliError {
    /// Store, claim or export operation failed in the core library
    #[error(transparent)]
    Core(#[from] gavel_core::CoreError),

    /// Ingest listing file is missing
    #[error("Listing file not found: '{0}'. Verify the path exists and you have read permissions.")]
    ListingNotFound(String),

    /// Ingest listing has invalid format or content
    #[error("Invalid listing: {0}. Expected a JSON array of recordings, each with id, locator, chamber, session_date and title.")]
    InvalidListing(String),

    /// A worker stage has no collaborator command configured
    #[error("No {stage} command configured. Set {env_var} to the shell command that produces the payload.")]
    StageCommandMissing { stage: String, env_var: String },

    /// File system operation failed
    #[error("File operation failed: {0}. Check file permissions and disk space.")]
    Io(#[from] std::io::Error),

    /// JSON parsing failed
    #[error("Failed to parse JSON: {0}. Check the file syntax.")]
    JsonParse(#[from] serde_json::Error),

    /// Generic anyhow error wrapper (configuration assembly)
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl CliError {
    /// Create an invalid listing error
    pub fn invalid_listing(msg: impl Into<String>) -> Self {
        Self::InvalidListing(msg.into())
    }

    /// Create a missing stage command error naming the variable to set
    pub fn stage_command_missing(stage: impl Into<String>, env_var: impl Into<String>) -> Self {
        Self::StageCommandMissing {
            stage: stage.into(),
            env_var: env_var.into(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_command_missing_names_the_variable() {
        let err = CliError::stage_command_missing("transcribe", "GAVEL_TRANSCRIBE_COMMAND");
        let msg = err.to_string();
        assert!(msg.contains("transcribe"));
        assert!(msg.contains("GAVEL_TRANSCRIBE_COMMAND"));
    }

    #[test]
    fn test_core_errors_pass_through_unwrapped() {
        let err: CliError = gavel_core::CoreError::not_found("vid-001").into();
        assert_eq!(err.to_string(), "Record 'vid-001' not found");
    }
}
