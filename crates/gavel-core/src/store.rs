//! Record store
//!
//! Every SQL statement in the pipeline lives here. The claim protocol is
//! expressed as conditional updates: a write counts only when its WHERE
//! clause still holds, and `rows_affected` tells the caller whether it won.
//! Callers pass `now`/cutoff timestamps in explicitly, which keeps the
//! store free of clock reads and lets tests replay lease expiry exactly.

use crate::error::{CoreError, Result};
use crate::record::{NewRecording, SessionRecord};
use crate::status::RecordStatus;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqlitePool;
use sqlx::Row;

/// Aggregate view of the backlog. `processing` and `stale_claims` are
/// derived from claim timestamps, not stored statuses.
#[derive(Debug, Clone, Default)]
pub struct StatusCounts {
    pub pending: i64,
    pub transcribed: i64,
    pub summarized: i64,
    pub error: i64,
    /// Records with a claim younger than the lease.
    pub processing: i64,
    /// Records with a claim older than the lease, eligible for reclaim.
    pub stale_claims: i64,
    pub total: i64,
}

/// One worker's latest liveness beat.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct WorkerHeartbeat {
    pub worker_id: String,
    pub role: String,
    pub beat_at: DateTime<Utc>,
}

/// Shared persistence layer for all pipeline processes.
#[derive(Debug, Clone)]
pub struct RecordStore {
    pool: SqlitePool,
}

impl RecordStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    // ------------------------------------------------------------------
    // Ingest
    // ------------------------------------------------------------------

    /// Insert a discovered recording unless its id already exists.
    ///
    /// Returns `true` when the row was inserted. Re-discovering a known id
    /// never modifies the existing row, whatever its current state.
    pub async fn insert_if_absent(&self, rec: &NewRecording, now: DateTime<Utc>) -> Result<bool> {
        let result = sqlx::query(
            r#"
            INSERT OR IGNORE INTO session_records
                (id, locator, chamber, session_date, part, title, status, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, 'pending', ?7, ?7)
            "#,
        )
        .bind(&rec.id)
        .bind(&rec.locator)
        .bind(rec.chamber)
        .bind(rec.session_date)
        .bind(rec.part)
        .bind(&rec.title)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    pub async fn get(&self, id: &str) -> Result<Option<SessionRecord>> {
        let record = sqlx::query_as::<_, SessionRecord>(
            "SELECT * FROM session_records WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    pub async fn get_required(&self, id: &str) -> Result<SessionRecord> {
        self.get(id)
            .await?
            .ok_or_else(|| CoreError::not_found(id))
    }

    /// Most recently touched records in a given status.
    pub async fn list_by_status(
        &self,
        status: RecordStatus,
        limit: i64,
    ) -> Result<Vec<SessionRecord>> {
        let records = sqlx::query_as::<_, SessionRecord>(
            r#"
            SELECT * FROM session_records
            WHERE status = ?1
            ORDER BY updated_at DESC
            LIMIT ?2
            "#,
        )
        .bind(status)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    /// Backlog counts in one round trip. `cutoff` divides claims into
    /// live (`processing`) and stale.
    pub async fn status_counts(&self, cutoff: DateTime<Utc>) -> Result<StatusCounts> {
        let row = sqlx::query(
            r#"
            SELECT
                COUNT(*) AS total,
                COALESCE(SUM(CASE WHEN status = 'pending' THEN 1 ELSE 0 END), 0) AS pending,
                COALESCE(SUM(CASE WHEN status = 'transcribed' THEN 1 ELSE 0 END), 0) AS transcribed,
                COALESCE(SUM(CASE WHEN status = 'summarized' THEN 1 ELSE 0 END), 0) AS summarized,
                COALESCE(SUM(CASE WHEN status = 'error' THEN 1 ELSE 0 END), 0) AS error_count,
                COALESCE(SUM(CASE WHEN claimed_by IS NOT NULL AND claimed_at >= ?1 THEN 1 ELSE 0 END), 0) AS processing,
                COALESCE(SUM(CASE WHEN claimed_by IS NOT NULL AND claimed_at < ?1 THEN 1 ELSE 0 END), 0) AS stale_claims
            FROM session_records
            "#,
        )
        .bind(cutoff)
        .fetch_one(&self.pool)
        .await?;

        Ok(StatusCounts {
            pending: row.get("pending"),
            transcribed: row.get("transcribed"),
            summarized: row.get("summarized"),
            error: row.get("error_count"),
            processing: row.get("processing"),
            stale_claims: row.get("stale_claims"),
            total: row.get("total"),
        })
    }

    // ------------------------------------------------------------------
    // Claim protocol
    // ------------------------------------------------------------------

    /// Oldest record eligible for claiming: in the wanted status, and
    /// either unclaimed or claimed before `cutoff`.
    ///
    /// Selection confers nothing; only a subsequent [`try_claim`] that
    /// reports one affected row makes the caller the owner.
    ///
    /// [`try_claim`]: RecordStore::try_claim
    pub async fn next_candidate(
        &self,
        status: RecordStatus,
        cutoff: DateTime<Utc>,
    ) -> Result<Option<SessionRecord>> {
        let record = sqlx::query_as::<_, SessionRecord>(
            r#"
            SELECT * FROM session_records
            WHERE status = ?1
              AND (claimed_by IS NULL OR claimed_at < ?2)
            ORDER BY created_at ASC, id ASC
            LIMIT 1
            "#,
        )
        .bind(status)
        .bind(cutoff)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    /// Attempt to take the claim on one record. The WHERE clause re-checks
    /// everything the candidate select saw, so a concurrent winner makes
    /// this a zero-row update rather than a double grant. Never modifies
    /// `status`.
    pub async fn try_claim(
        &self,
        id: &str,
        status: RecordStatus,
        worker: &str,
        cutoff: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE session_records
            SET claimed_by = ?1, claimed_at = ?2, updated_at = ?2
            WHERE id = ?3
              AND status = ?4
              AND (claimed_by IS NULL OR claimed_at < ?5)
            "#,
        )
        .bind(worker)
        .bind(now)
        .bind(id)
        .bind(status)
        .bind(cutoff)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    // ------------------------------------------------------------------
    // Releases
    //
    // Each release is conditional on both the holder and the status the
    // holder believes the record is in. Zero affected rows means the
    // claim was lost (lease expired and another worker took over); the
    // caller must drop its result on the floor.
    // ------------------------------------------------------------------

    /// Transcription success: store the transcript, advance to
    /// `transcribed`, clear the claim and any stale error message.
    pub async fn complete_transcription(
        &self,
        id: &str,
        worker: &str,
        transcript: &str,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE session_records
            SET payload_transcript = ?1,
                status = 'transcribed',
                claimed_by = NULL,
                claimed_at = NULL,
                error_message = NULL,
                updated_at = ?2
            WHERE id = ?3 AND claimed_by = ?4 AND status = 'pending'
            "#,
        )
        .bind(transcript)
        .bind(now)
        .bind(id)
        .bind(worker)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Summarization success: store the summary, advance to `summarized`.
    pub async fn complete_summarization(
        &self,
        id: &str,
        worker: &str,
        summary: &str,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE session_records
            SET payload_summary = ?1,
                status = 'summarized',
                claimed_by = NULL,
                claimed_at = NULL,
                error_message = NULL,
                updated_at = ?2
            WHERE id = ?3 AND claimed_by = ?4 AND status = 'transcribed'
            "#,
        )
        .bind(summary)
        .bind(now)
        .bind(id)
        .bind(worker)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Permanent failure: record the message and park the record in
    /// `error`, out of reach of future claims until retried.
    pub async fn release_error(
        &self,
        id: &str,
        worker: &str,
        expected: RecordStatus,
        message: &str,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE session_records
            SET status = 'error',
                error_message = ?1,
                claimed_by = NULL,
                claimed_at = NULL,
                updated_at = ?2
            WHERE id = ?3 AND claimed_by = ?4 AND status = ?5
            "#,
        )
        .bind(message)
        .bind(now)
        .bind(id)
        .bind(worker)
        .bind(expected)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Transient failure: give the claim back with status and payloads
    /// untouched so any worker can try again later.
    pub async fn release_yield(
        &self,
        id: &str,
        worker: &str,
        expected: RecordStatus,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE session_records
            SET claimed_by = NULL, claimed_at = NULL, updated_at = ?1
            WHERE id = ?2 AND claimed_by = ?3 AND status = ?4
            "#,
        )
        .bind(now)
        .bind(id)
        .bind(worker)
        .bind(expected)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    // ------------------------------------------------------------------
    // Retry administration
    // ------------------------------------------------------------------

    /// Reset one `error` record to `pending`. Returns `false` when the
    /// record is not currently in `error`.
    pub async fn retry_record(&self, id: &str, now: DateTime<Utc>) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE session_records
            SET status = 'pending',
                error_message = NULL,
                claimed_by = NULL,
                claimed_at = NULL,
                updated_at = ?1
            WHERE id = ?2 AND status = 'error'
            "#,
        )
        .bind(now)
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Reset every `error` record to `pending`, returning how many moved.
    pub async fn retry_all_errors(&self, now: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE session_records
            SET status = 'pending',
                error_message = NULL,
                claimed_by = NULL,
                claimed_at = NULL,
                updated_at = ?1
            WHERE status = 'error'
            "#,
        )
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    // ------------------------------------------------------------------
    // Heartbeats
    // ------------------------------------------------------------------

    pub async fn record_heartbeat(
        &self,
        worker_id: &str,
        role: &str,
        now: DateTime<Utc>,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO worker_heartbeats (worker_id, role, beat_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(worker_id) DO UPDATE SET
                role = excluded.role,
                beat_at = excluded.beat_at
            "#,
        )
        .bind(worker_id)
        .bind(role)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Freshest beat recorded for a role, across all worker ids.
    pub async fn freshest_heartbeat(&self, role: &str) -> Result<Option<DateTime<Utc>>> {
        let beat = sqlx::query_scalar::<_, DateTime<Utc>>(
            r#"
            SELECT beat_at FROM worker_heartbeats
            WHERE role = ?1
            ORDER BY beat_at DESC
            LIMIT 1
            "#,
        )
        .bind(role)
        .fetch_optional(&self.pool)
        .await?;

        Ok(beat)
    }

    pub async fn list_heartbeats(&self) -> Result<Vec<WorkerHeartbeat>> {
        let beats = sqlx::query_as::<_, WorkerHeartbeat>(
            "SELECT * FROM worker_heartbeats ORDER BY role, worker_id",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(beats)
    }

    // ------------------------------------------------------------------
    // Export reads
    // ------------------------------------------------------------------

    /// One page of records in a status, keyset-paginated by id. Pass the
    /// last id of the previous page to continue; `None` starts over.
    pub async fn page_by_status(
        &self,
        status: RecordStatus,
        after_id: Option<&str>,
        limit: i64,
    ) -> Result<Vec<SessionRecord>> {
        let records = sqlx::query_as::<_, SessionRecord>(
            r#"
            SELECT * FROM session_records
            WHERE status = ?1
              AND (?2 IS NULL OR id > ?2)
            ORDER BY id ASC
            LIMIT ?3
            "#,
        )
        .bind(status)
        .bind(after_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }
}
