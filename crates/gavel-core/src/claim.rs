//! Claim coordination
//!
//! [`ClaimCoordinator`] is how a worker takes exclusive ownership of one
//! record at a time. Ownership is only ever granted by a conditional
//! update reporting one affected row; the candidate select before it is
//! advisory. Losing the race is normal operation, not an error, and the
//! loop simply moves to the next candidate.

use crate::error::{CoreError, Result};
use crate::record::SessionRecord;
use crate::stage::Stage;
use crate::status::RecordStatus;
use crate::store::RecordStore;
use chrono::{Duration, Utc};

/// Per-worker claim handle. Cheap to clone; carries the worker identity
/// that every conditional release re-asserts.
#[derive(Debug, Clone)]
pub struct ClaimCoordinator {
    store: RecordStore,
    worker_id: String,
    lease: Duration,
}

impl ClaimCoordinator {
    pub fn new(store: RecordStore, worker_id: impl Into<String>, lease: Duration) -> Self {
        Self {
            store,
            worker_id: worker_id.into(),
            lease,
        }
    }

    pub fn worker_id(&self) -> &str {
        &self.worker_id
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    /// Claim the oldest eligible record in `status`, or `None` when the
    /// backlog is empty.
    ///
    /// Eligible means unclaimed, or claimed longer ago than the lease;
    /// a worker that died mid-claim forfeits it this way. Each candidate
    /// is taken with a conditional update; when a concurrent worker wins
    /// the same candidate first, the loop selects again (the contended
    /// record is no longer eligible, so the loop shrinks its own input
    /// and terminates).
    pub async fn claim_next(&self, status: RecordStatus) -> Result<Option<SessionRecord>> {
        loop {
            let now = Utc::now();
            let cutoff = now - self.lease;

            let Some(candidate) = self.store.next_candidate(status, cutoff).await? else {
                return Ok(None);
            };

            if candidate.claimed_by.is_some() {
                tracing::info!(
                    record_id = %candidate.id,
                    previous_worker = ?candidate.claimed_by,
                    "Reclaiming record with expired lease"
                );
            }

            if self
                .store
                .try_claim(&candidate.id, status, &self.worker_id, cutoff, now)
                .await?
            {
                tracing::debug!(
                    record_id = %candidate.id,
                    worker = %self.worker_id,
                    status = %status,
                    "Claim acquired"
                );
                return Ok(Some(self.store.get_required(&candidate.id).await?));
            }

            tracing::debug!(
                record_id = %candidate.id,
                worker = %self.worker_id,
                "Lost claim race; selecting next candidate"
            );
        }
    }

    /// Release after stage success: store the payload and advance the
    /// status. Fails with [`CoreError::ClaimLost`] when this worker no
    /// longer holds the claim, in which case the payload is discarded.
    pub async fn complete(&self, id: &str, stage: Stage, payload: &str) -> Result<()> {
        if payload.trim().is_empty() {
            return Err(CoreError::EmptyPayload(id.to_string()));
        }

        let now = Utc::now();
        let released = match stage {
            Stage::Transcribe => {
                self.store
                    .complete_transcription(id, &self.worker_id, payload, now)
                    .await?
            }
            Stage::Summarize => {
                self.store
                    .complete_summarization(id, &self.worker_id, payload, now)
                    .await?
            }
        };

        if released {
            tracing::info!(
                record_id = %id,
                worker = %self.worker_id,
                status = %stage.next_status(),
                "Stage complete"
            );
            Ok(())
        } else {
            Err(CoreError::claim_lost(id, &self.worker_id))
        }
    }

    /// Release after a permanent failure: park the record in `error` with
    /// the message.
    pub async fn fail(&self, id: &str, stage: Stage, message: &str) -> Result<()> {
        let released = self
            .store
            .release_error(id, &self.worker_id, stage.claim_status(), message, Utc::now())
            .await?;

        if released {
            tracing::warn!(
                record_id = %id,
                worker = %self.worker_id,
                error = %message,
                "Stage failed permanently"
            );
            Ok(())
        } else {
            Err(CoreError::claim_lost(id, &self.worker_id))
        }
    }

    /// Release after a transient failure: give the claim back untouched
    /// so any worker can pick the record up again later.
    pub async fn yield_claim(&self, id: &str, stage: Stage) -> Result<()> {
        let released = self
            .store
            .release_yield(id, &self.worker_id, stage.claim_status(), Utc::now())
            .await?;

        if released {
            tracing::info!(
                record_id = %id,
                worker = %self.worker_id,
                "Claim yielded for later retry"
            );
            Ok(())
        } else {
            Err(CoreError::claim_lost(id, &self.worker_id))
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::db::create_memory_pool;
    use crate::record::{Chamber, NewRecording};
    use chrono::NaiveDate;

    async fn seeded_store(ids: &[&str]) -> RecordStore {
        let store = RecordStore::new(create_memory_pool().await.unwrap());
        let mut now = Utc::now() - Duration::minutes(ids.len() as i64);
        for id in ids {
            let rec = NewRecording {
                id: id.to_string(),
                locator: format!("https://video.example/{id}"),
                chamber: Chamber::House,
                session_date: NaiveDate::from_ymd_opt(2025, 1, 15).unwrap(),
                part: None,
                title: format!("Session {id}"),
            };
            store.insert_if_absent(&rec, now).await.unwrap();
            now += Duration::minutes(1);
        }
        store
    }

    fn coordinator(store: &RecordStore, worker: &str) -> ClaimCoordinator {
        ClaimCoordinator::new(store.clone(), worker, Duration::hours(2))
    }

    #[tokio::test]
    async fn test_claim_next_walks_backlog_in_order() {
        let store = seeded_store(&["r1", "r2"]).await;
        let w1 = coordinator(&store, "w1");
        let w2 = coordinator(&store, "w2");

        let first = w1.claim_next(RecordStatus::Pending).await.unwrap().unwrap();
        assert_eq!(first.id, "r1");
        assert_eq!(first.claimed_by.as_deref(), Some("w1"));
        assert_eq!(first.status, RecordStatus::Pending);

        // w1's live claim hides r1 from w2.
        let second = w2.claim_next(RecordStatus::Pending).await.unwrap().unwrap();
        assert_eq!(second.id, "r2");

        assert!(w1.claim_next(RecordStatus::Pending).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_expired_lease_is_reclaimable() {
        let store = seeded_store(&["r1"]).await;
        let w1 = ClaimCoordinator::new(store.clone(), "w1", Duration::zero());
        let w2 = ClaimCoordinator::new(store.clone(), "w2", Duration::zero());

        // Zero lease: every claim is immediately past its cutoff.
        w1.claim_next(RecordStatus::Pending).await.unwrap().unwrap();
        let reclaimed = w2.claim_next(RecordStatus::Pending).await.unwrap().unwrap();
        assert_eq!(reclaimed.claimed_by.as_deref(), Some("w2"));

        // w1 lost the record; its success release must be refused.
        let err = w1.complete("r1", Stage::Transcribe, "text").await.unwrap_err();
        assert!(err.is_claim_lost());

        let rec = store.get_required("r1").await.unwrap();
        assert_eq!(rec.payload_transcript, "");
        assert_eq!(rec.claimed_by.as_deref(), Some("w2"));
    }

    #[tokio::test]
    async fn test_complete_advances_and_clears_claim() {
        let store = seeded_store(&["r1"]).await;
        let w1 = coordinator(&store, "w1");

        w1.claim_next(RecordStatus::Pending).await.unwrap().unwrap();
        w1.complete("r1", Stage::Transcribe, "the transcript").await.unwrap();

        let rec = store.get_required("r1").await.unwrap();
        assert_eq!(rec.status, RecordStatus::Transcribed);
        assert_eq!(rec.payload_transcript, "the transcript");
        assert!(rec.claim().is_none());

        // Same claim cannot be released twice.
        let err = w1.complete("r1", Stage::Transcribe, "again").await.unwrap_err();
        assert!(err.is_claim_lost());
    }

    #[tokio::test]
    async fn test_complete_refuses_empty_payload() {
        let store = seeded_store(&["r1"]).await;
        let w1 = coordinator(&store, "w1");

        w1.claim_next(RecordStatus::Pending).await.unwrap().unwrap();
        let err = w1.complete("r1", Stage::Transcribe, "  \n").await.unwrap_err();
        assert!(matches!(err, CoreError::EmptyPayload(_)));

        // Claim still held, record untouched.
        let rec = store.get_required("r1").await.unwrap();
        assert_eq!(rec.status, RecordStatus::Pending);
        assert_eq!(rec.claimed_by.as_deref(), Some("w1"));
    }

    #[tokio::test]
    async fn test_fail_and_yield_release_paths() {
        let store = seeded_store(&["r1", "r2"]).await;
        let w1 = coordinator(&store, "w1");

        w1.claim_next(RecordStatus::Pending).await.unwrap().unwrap();
        w1.fail("r1", Stage::Transcribe, "source returned 404").await.unwrap();

        let failed = store.get_required("r1").await.unwrap();
        assert_eq!(failed.status, RecordStatus::Error);
        assert_eq!(failed.error_message.as_deref(), Some("source returned 404"));

        w1.claim_next(RecordStatus::Pending).await.unwrap().unwrap();
        w1.yield_claim("r2", Stage::Transcribe).await.unwrap();

        let yielded = store.get_required("r2").await.unwrap();
        assert_eq!(yielded.status, RecordStatus::Pending);
        assert!(yielded.error_message.is_none());
        assert!(yielded.claim().is_none());
    }

    #[tokio::test]
    async fn test_summarize_claims_from_transcribed() {
        let store = seeded_store(&["r1"]).await;
        let w1 = coordinator(&store, "w1");

        // Nothing transcribed yet.
        assert!(w1
            .claim_next(Stage::Summarize.claim_status())
            .await
            .unwrap()
            .is_none());

        w1.claim_next(RecordStatus::Pending).await.unwrap().unwrap();
        w1.complete("r1", Stage::Transcribe, "transcript").await.unwrap();

        let claimed = w1
            .claim_next(Stage::Summarize.claim_status())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(claimed.id, "r1");
        w1.complete("r1", Stage::Summarize, "summary").await.unwrap();

        let rec = store.get_required("r1").await.unwrap();
        assert_eq!(rec.status, RecordStatus::Summarized);
        assert_eq!(rec.payload_transcript, "transcript");
        assert_eq!(rec.payload_summary, "summary");
    }
}
