//! Worker loop
//!
//! One [`WorkerLoop`] drives one stage: claim the oldest eligible record,
//! hand it to the stage processor, release according to the outcome.
//! Exactly one claim is held at a time, so a crashed worker strands at
//! most one record (recovered by lease expiry). A background task beats
//! the worker's heartbeat for the watchdog while the loop runs.

use crate::claim::ClaimCoordinator;
use crate::error::{CoreError, Result};
use crate::record::SessionRecord;
use crate::retry::RetryPolicy;
use crate::stage::{Stage, StageFailure, StageProcessor};
use chrono::Utc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// How much of the backlog one `run` call works through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Claim at most one record, then return.
    Once,
    /// Claim at most this many records, then return.
    Batch(u32),
    /// Claim until no eligible record remains, then return.
    Drain,
    /// Run forever, sleeping `delay` whenever the backlog is empty.
    Continuous { delay: Duration },
}

/// Outcome tally for one `run` call.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunSummary {
    pub claimed: u64,
    pub succeeded: u64,
    pub failed: u64,
    /// Claims given back after exhausting transient retries.
    pub yielded: u64,
    /// Claims lost to lease expiry before the release; results discarded.
    pub lost: u64,
}

pub struct WorkerLoop {
    coordinator: ClaimCoordinator,
    stage: Stage,
    processor: Box<dyn StageProcessor>,
    retry: RetryPolicy,
    heartbeat_interval: Duration,
}

impl WorkerLoop {
    pub fn new(
        coordinator: ClaimCoordinator,
        stage: Stage,
        processor: Box<dyn StageProcessor>,
        retry: RetryPolicy,
        heartbeat_interval: Duration,
    ) -> Self {
        Self {
            coordinator,
            stage,
            processor,
            retry,
            heartbeat_interval,
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Run the loop to completion (or forever, in continuous mode).
    pub async fn run(&self, mode: RunMode) -> Result<RunSummary> {
        tracing::info!(
            stage = %self.stage,
            worker = %self.coordinator.worker_id(),
            mode = ?mode,
            "Worker starting"
        );

        // First beat happens inline: a worker that cannot reach the store
        // at startup should fail fast, and the watchdog sees liveness
        // before the first claim rather than one interval later.
        self.coordinator
            .store()
            .record_heartbeat(self.coordinator.worker_id(), self.stage.role(), Utc::now())
            .await?;

        let heartbeat = self.start_heartbeat_task();
        let result = self.run_inner(mode).await;
        heartbeat.abort();

        if let Ok(summary) = &result {
            tracing::info!(
                stage = %self.stage,
                claimed = summary.claimed,
                succeeded = summary.succeeded,
                failed = summary.failed,
                yielded = summary.yielded,
                lost = summary.lost,
                "Worker finished"
            );
        }

        result
    }

    async fn run_inner(&self, mode: RunMode) -> Result<RunSummary> {
        let limit = match mode {
            RunMode::Once => Some(1),
            RunMode::Batch(n) => Some(u64::from(n)),
            RunMode::Drain | RunMode::Continuous { .. } => None,
        };
        let mut summary = RunSummary::default();

        loop {
            if limit.is_some_and(|n| summary.claimed >= n) {
                break;
            }

            match self.coordinator.claim_next(self.stage.claim_status()).await? {
                Some(record) => {
                    summary.claimed += 1;
                    self.process_one(&record, &mut summary).await?;
                }
                None => match mode {
                    RunMode::Continuous { delay } => {
                        tracing::debug!(stage = %self.stage, "No claimable work; sleeping");
                        tokio::time::sleep(delay).await;
                    }
                    _ => break,
                },
            }
        }

        Ok(summary)
    }

    /// Process one claimed record through to a release. Transient
    /// collaborator failures are retried in place while the claim is
    /// held; only after the policy is exhausted is the claim yielded.
    async fn process_one(&self, record: &SessionRecord, summary: &mut RunSummary) -> Result<()> {
        let mut attempt = 1u32;

        loop {
            match self.processor.process(record).await {
                Ok(payload) => {
                    match self.coordinator.complete(&record.id, self.stage, &payload).await {
                        Ok(()) => summary.succeeded += 1,
                        Err(CoreError::EmptyPayload(_)) => {
                            // Still our claim; park the record instead of
                            // storing a blank payload as success.
                            self.release_failure(
                                record,
                                "stage reported success without producing output",
                                summary,
                            )
                            .await?;
                        }
                        Err(e) if e.is_claim_lost() => self.note_lost_claim(record, summary),
                        Err(e) => return Err(e),
                    }
                }
                Err(failure) if failure.is_transient() => {
                    if self.retry.allows_retry(attempt) {
                        let delay = self.retry.delay_after(attempt);
                        tracing::warn!(
                            record_id = %record.id,
                            stage = %self.stage,
                            attempt,
                            error = %failure.message(),
                            backoff = ?delay,
                            "Transient stage failure; retrying"
                        );
                        tokio::time::sleep(delay).await;
                        attempt += 1;
                        continue;
                    }

                    match self.coordinator.yield_claim(&record.id, self.stage).await {
                        Ok(()) => summary.yielded += 1,
                        Err(e) if e.is_claim_lost() => self.note_lost_claim(record, summary),
                        Err(e) => return Err(e),
                    }
                }
                Err(failure) => {
                    self.release_failure(record, failure.message(), summary).await?;
                }
            }

            return Ok(());
        }
    }

    async fn release_failure(
        &self,
        record: &SessionRecord,
        message: &str,
        summary: &mut RunSummary,
    ) -> Result<()> {
        match self.coordinator.fail(&record.id, self.stage, message).await {
            Ok(()) => summary.failed += 1,
            Err(e) if e.is_claim_lost() => self.note_lost_claim(record, summary),
            Err(e) => return Err(e),
        }
        Ok(())
    }

    fn note_lost_claim(&self, record: &SessionRecord, summary: &mut RunSummary) {
        summary.lost += 1;
        tracing::warn!(
            record_id = %record.id,
            stage = %self.stage,
            worker = %self.coordinator.worker_id(),
            "Claim lost before release; result discarded"
        );
    }

    fn start_heartbeat_task(&self) -> JoinHandle<()> {
        let store = self.coordinator.store().clone();
        let worker_id = self.coordinator.worker_id().to_string();
        let role = self.stage.role();
        let interval = self.heartbeat_interval;

        tokio::spawn(async move {
            // The startup beat already happened; start one interval out.
            let start = tokio::time::Instant::now() + interval;
            let mut ticker = tokio::time::interval_at(start, interval);
            loop {
                ticker.tick().await;
                if let Err(e) = store.record_heartbeat(&worker_id, role, Utc::now()).await {
                    tracing::warn!(worker = %worker_id, error = %e, "Heartbeat write failed");
                }
            }
        })
    }
}
