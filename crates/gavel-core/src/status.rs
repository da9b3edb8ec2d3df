//! Record status lifecycle
//!
//! Statuses move forward only: `pending → transcribed → summarized`, with
//! `error` reachable from either non-terminal state and `error → pending`
//! on explicit retry. The table here documents legality; the store enforces
//! it structurally with `WHERE status = expected` conditional updates.

use crate::error::CoreError;
use serde::{Deserialize, Serialize};

/// Processing state of a session record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum RecordStatus {
    /// Discovered, waiting for transcription
    Pending,
    /// Transcript stored, waiting for summarization
    Transcribed,
    /// Summary stored; terminal
    Summarized,
    /// A stage failed permanently; excluded from claims until retried
    Error,
}

impl RecordStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordStatus::Pending => "pending",
            RecordStatus::Transcribed => "transcribed",
            RecordStatus::Summarized => "summarized",
            RecordStatus::Error => "error",
        }
    }

    /// All statuses, in pipeline order
    pub fn all() -> [RecordStatus; 4] {
        [
            RecordStatus::Pending,
            RecordStatus::Transcribed,
            RecordStatus::Summarized,
            RecordStatus::Error,
        ]
    }

    /// Whether `next` is a legal transition from `self`
    pub fn can_transition_to(&self, next: RecordStatus) -> bool {
        use RecordStatus::*;
        matches!(
            (self, next),
            (Pending, Transcribed)
                | (Pending, Error)
                | (Transcribed, Summarized)
                | (Transcribed, Error)
                | (Error, Pending)
        )
    }

    /// Summarized records never move again (except administratively)
    pub fn is_terminal(&self) -> bool {
        matches!(self, RecordStatus::Summarized)
    }
}

impl std::str::FromStr for RecordStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(RecordStatus::Pending),
            "transcribed" => Ok(RecordStatus::Transcribed),
            "summarized" => Ok(RecordStatus::Summarized),
            "error" => Ok(RecordStatus::Error),
            other => Err(CoreError::InvalidStatus(other.to_string())),
        }
    }
}

impl std::fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
