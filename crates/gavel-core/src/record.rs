//! Session record model
//!
//! One [`SessionRecord`] per discovered recording. Metadata columns are
//! write-once at ingest; payloads and status are advanced only by the worker
//! holding the claim. The claim itself is the `(claimed_by, claimed_at)`
//! pair: both set or both empty, never one without the other.

use crate::error::CoreError;
use crate::status::RecordStatus;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Originating body of a recording. Closed set; anything else is rejected
/// at the ingest boundary instead of being stored as a loose string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum Chamber {
    House,
    Senate,
    Committee,
}

impl Chamber {
    pub fn as_str(&self) -> &'static str {
        match self {
            Chamber::House => "house",
            Chamber::Senate => "senate",
            Chamber::Committee => "committee",
        }
    }
}

impl std::str::FromStr for Chamber {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "house" => Ok(Chamber::House),
            "senate" => Ok(Chamber::Senate),
            "committee" => Ok(Chamber::Committee),
            other => Err(CoreError::InvalidChamber(other.to_string())),
        }
    }
}

impl std::fmt::Display for Chamber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One work record, as stored
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct SessionRecord {
    /// External source id; immutable after creation
    pub id: String,

    /// Opaque reference collaborators use to fetch the artifact (e.g. a URL)
    pub locator: String,

    /// Originating body
    pub chamber: Chamber,

    /// Date of the session
    pub session_date: NaiveDate,

    /// Part number when a session spans multiple recordings
    pub part: Option<i64>,

    /// Human-readable title from the source listing
    pub title: String,

    /// Transcript text; empty until transcription succeeds
    pub payload_transcript: String,

    /// Summary text; empty until summarization succeeds
    pub payload_summary: String,

    /// Lifecycle status
    pub status: RecordStatus,

    /// Worker holding the claim, if any
    pub claimed_by: Option<String>,

    /// When the claim was taken, if any
    pub claimed_at: Option<DateTime<Utc>>,

    /// Failure description; set only while `status` is `error`
    pub error_message: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SessionRecord {
    /// The claim as a pair, present only when both fields are set.
    pub fn claim(&self) -> Option<(&str, DateTime<Utc>)> {
        match (self.claimed_by.as_deref(), self.claimed_at) {
            (Some(worker), Some(at)) => Some((worker, at)),
            _ => None,
        }
    }

    /// Age of the claim at `now`, if one exists.
    pub fn claim_age(&self, now: DateTime<Utc>) -> Option<Duration> {
        self.claim().map(|(_, at)| now - at)
    }

    /// Whether a claim exists and is still within its lease.
    pub fn has_active_claim(&self, lease: Duration, now: DateTime<Utc>) -> bool {
        self.claim_age(now).is_some_and(|age| age < lease)
    }

    /// Whether a claim exists but has outlived its lease.
    pub fn has_stale_claim(&self, lease: Duration, now: DateTime<Utc>) -> bool {
        self.claim_age(now).is_some_and(|age| age >= lease)
    }
}

/// A recording handed over by the discovery collaborator, ready for
/// insert-if-absent. Chamber validation happens during deserialization;
/// everything else through [`validate`].
///
/// [`validate`]: NewRecording::validate
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewRecording {
    pub id: String,
    pub locator: String,
    pub chamber: Chamber,
    pub session_date: NaiveDate,
    #[serde(default)]
    pub part: Option<i64>,
    pub title: String,
}

impl NewRecording {
    /// Gate at the ingest boundary. Record ids end up as snapshot file
    /// names, so the charset is restricted to path-safe characters.
    pub fn validate(&self) -> Result<(), CoreError> {
        let id_ok = !self.id.is_empty()
            && !self.id.starts_with('.')
            && self
                .id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
        if !id_ok {
            return Err(CoreError::invalid_record(format!(
                "id '{}' must be non-empty, not start with '.', and use only [A-Za-z0-9._-]",
                self.id
            )));
        }

        if self.locator.trim().is_empty() {
            return Err(CoreError::invalid_record(format!(
                "record '{}' has an empty locator",
                self.id
            )));
        }

        Ok(())
    }
}
