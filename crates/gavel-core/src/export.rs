//! Export publisher
//!
//! Serializes the summarized subset of the store into a deterministic
//! file snapshot and hands changed snapshots to a publication
//! collaborator. Identity is content: a SHA-256 digest over the
//! assembled files, compared against the digest of the last successful
//! publish. No snapshot file ever embeds the export time, so re-running
//! against an unchanged store is a no-op however often it happens.
//!
//! Assembly is all-or-nothing: every page is read into memory before a
//! single byte is written, so a mid-read failure aborts the cycle
//! instead of publishing a partial snapshot.

use crate::config::ExportConfig;
use crate::error::{CoreError, Result};
use crate::record::{Chamber, SessionRecord};
use crate::status::RecordStatus;
use crate::store::RecordStore;
use async_trait::async_trait;
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use gavel_common::checksum::DigestBuilder;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::process::Stdio;

/// State file name, written next to the snapshot. Lives outside the
/// snapshot identity.
pub const STATE_FILE: &str = ".export_state.json";

/// Index entry in `records.json`: metadata and summary, no transcript.
#[derive(Debug, Serialize)]
struct IndexEntry<'a> {
    id: &'a str,
    locator: &'a str,
    chamber: Chamber,
    session_date: NaiveDate,
    part: Option<i64>,
    title: &'a str,
    summary: &'a str,
    has_transcript: bool,
}

/// Full per-record document in `records/<id>.json`.
#[derive(Debug, Serialize)]
struct RecordDocument<'a> {
    id: &'a str,
    locator: &'a str,
    chamber: Chamber,
    session_date: NaiveDate,
    part: Option<i64>,
    title: &'a str,
    summary: &'a str,
    transcript: &'a str,
}

#[derive(Debug, Serialize)]
struct Stats {
    total_records: i64,
    summarized: usize,
    year_range: Option<YearRange>,
}

#[derive(Debug, Serialize)]
struct YearRange {
    earliest: i32,
    latest: i32,
}

/// Record of the last successful publish.
#[derive(Debug, Serialize, Deserialize)]
struct ExportState {
    digest: String,
    record_count: usize,
    finished_at: DateTime<Utc>,
}

/// An assembled snapshot: relative path to file content, plus the digest
/// over all of it in path order.
#[derive(Debug)]
pub struct Snapshot {
    pub files: BTreeMap<String, String>,
    pub digest: String,
    pub record_count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportOutcome {
    Published { records: usize },
    Unchanged { records: usize },
}

/// Seam for the commit-and-push side of publication.
#[async_trait]
pub trait SnapshotPublisher: Send + Sync {
    async fn publish(&self, dir: &Path, snapshot: &Snapshot) -> Result<()>;
}

/// Publisher used when no publish command is configured: the snapshot
/// stays on disk and that is the whole publication.
pub struct NoopPublisher;

#[async_trait]
impl SnapshotPublisher for NoopPublisher {
    async fn publish(&self, dir: &Path, snapshot: &Snapshot) -> Result<()> {
        tracing::info!(
            dir = %dir.display(),
            records = snapshot.record_count,
            "No publish command configured; snapshot left on disk"
        );
        Ok(())
    }
}

/// Runs the configured shell command in the export directory after a
/// changed snapshot has been written.
pub struct CommandPublisher {
    command: String,
}

impl CommandPublisher {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }
}

#[async_trait]
impl SnapshotPublisher for CommandPublisher {
    async fn publish(&self, dir: &Path, snapshot: &Snapshot) -> Result<()> {
        let output = tokio::process::Command::new("sh")
            .arg("-c")
            .arg(&self.command)
            .current_dir(dir)
            .env("GAVEL_EXPORT_DIR", dir)
            .env("GAVEL_EXPORT_RECORDS", snapshot.record_count.to_string())
            .env("GAVEL_EXPORT_DIGEST", &snapshot.digest)
            .stdin(Stdio::null())
            .output()
            .await?;

        if output.status.success() {
            tracing::info!(records = snapshot.record_count, "Publish command succeeded");
            return Ok(());
        }

        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        Err(CoreError::export(if stderr.is_empty() {
            format!("publish command exited with {}", output.status)
        } else {
            stderr
        }))
    }
}

pub struct Exporter {
    store: RecordStore,
    config: ExportConfig,
    publisher: Box<dyn SnapshotPublisher>,
}

impl Exporter {
    pub fn new(store: RecordStore, config: ExportConfig, publisher: Box<dyn SnapshotPublisher>) -> Self {
        Self {
            store,
            config,
            publisher,
        }
    }

    /// Wire the publisher from configuration: the publish command when
    /// set, otherwise write-only.
    pub fn from_config(store: RecordStore, config: ExportConfig) -> Self {
        let publisher: Box<dyn SnapshotPublisher> = match &config.publish_command {
            Some(command) => Box::new(CommandPublisher::new(command.clone())),
            None => Box::new(NoopPublisher),
        };
        Self::new(store, config, publisher)
    }

    /// Read every summarized record into a snapshot, newest session
    /// first, id as tiebreaker.
    pub async fn assemble(&self) -> Result<Snapshot> {
        let mut records = Vec::new();
        let mut after: Option<String> = None;

        loop {
            let page = self
                .store
                .page_by_status(
                    RecordStatus::Summarized,
                    after.as_deref(),
                    i64::from(self.config.page_size),
                )
                .await?;

            let page_len = page.len();
            if let Some(last) = page.last() {
                after = Some(last.id.clone());
            }
            records.extend(page);

            if page_len < self.config.page_size as usize {
                break;
            }
        }

        records.sort_by(|a, b| {
            b.session_date
                .cmp(&a.session_date)
                .then_with(|| a.id.cmp(&b.id))
        });

        let counts = self.store.status_counts(Utc::now()).await?;

        let mut files = BTreeMap::new();

        let index: Vec<IndexEntry<'_>> = records.iter().map(index_entry).collect();
        files.insert("records.json".to_string(), pretty_json(&index)?);

        for rec in &records {
            files.insert(
                format!("records/{}.json", rec.id),
                pretty_json(&record_document(rec))?,
            );
            files.insert(format!("transcripts/{}.txt", rec.id), transcript_text(rec));
        }

        let stats = Stats {
            total_records: counts.total,
            summarized: records.len(),
            year_range: year_range(&records),
        };
        files.insert("stats.json".to_string(), pretty_json(&stats)?);

        let mut digest = DigestBuilder::new();
        for (path, content) in &files {
            digest.add_part(path, content.as_bytes());
        }

        Ok(Snapshot {
            digest: digest.finish(),
            record_count: records.len(),
            files,
        })
    }

    /// One export cycle: assemble, compare, and only on change write the
    /// files, run the publisher, and record the new digest. The state
    /// file is written last, so a failed publish leaves the previous
    /// digest in place and the next cycle tries again.
    pub async fn run_once(&self) -> Result<ExportOutcome> {
        let snapshot = self.assemble().await?;
        let state_path = self.config.output_dir.join(STATE_FILE);

        if let Some(state) = read_state(&state_path) {
            if state.digest == snapshot.digest {
                tracing::info!(
                    records = snapshot.record_count,
                    "Snapshot unchanged; skipping publish"
                );
                return Ok(ExportOutcome::Unchanged {
                    records: snapshot.record_count,
                });
            }
        }

        self.write_files(&snapshot)?;
        self.publisher
            .publish(&self.config.output_dir, &snapshot)
            .await?;

        let state = ExportState {
            digest: snapshot.digest.clone(),
            record_count: snapshot.record_count,
            finished_at: Utc::now(),
        };
        let mut serialized = serde_json::to_string_pretty(&state)?;
        serialized.push('\n');
        std::fs::write(&state_path, serialized)?;

        tracing::info!(
            records = snapshot.record_count,
            digest = %snapshot.digest,
            "Snapshot published"
        );
        Ok(ExportOutcome::Published {
            records: snapshot.record_count,
        })
    }

    fn write_files(&self, snapshot: &Snapshot) -> Result<()> {
        for (rel, content) in &snapshot.files {
            let path = self.config.output_dir.join(rel);
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(path, content)?;
        }
        Ok(())
    }
}

fn index_entry(rec: &SessionRecord) -> IndexEntry<'_> {
    IndexEntry {
        id: &rec.id,
        locator: &rec.locator,
        chamber: rec.chamber,
        session_date: rec.session_date,
        part: rec.part,
        title: &rec.title,
        summary: &rec.payload_summary,
        has_transcript: !rec.payload_transcript.is_empty(),
    }
}

fn record_document(rec: &SessionRecord) -> RecordDocument<'_> {
    RecordDocument {
        id: &rec.id,
        locator: &rec.locator,
        chamber: rec.chamber,
        session_date: rec.session_date,
        part: rec.part,
        title: &rec.title,
        summary: &rec.payload_summary,
        transcript: &rec.payload_transcript,
    }
}

fn transcript_text(rec: &SessionRecord) -> String {
    format!(
        "Title: {}\nDate: {}\nChamber: {}\nSource: {}\n{}\n\n{}\n",
        rec.title,
        rec.session_date,
        rec.chamber,
        rec.locator,
        "-".repeat(60),
        rec.payload_transcript.trim_end()
    )
}

fn year_range(records: &[SessionRecord]) -> Option<YearRange> {
    let earliest = records.iter().map(|r| r.session_date.year()).min()?;
    let latest = records.iter().map(|r| r.session_date.year()).max()?;
    Some(YearRange { earliest, latest })
}

fn pretty_json<T: Serialize>(value: &T) -> Result<String> {
    let mut out = serde_json::to_string_pretty(value)?;
    out.push('\n');
    Ok(out)
}

fn read_state(path: &Path) -> Option<ExportState> {
    let raw = std::fs::read_to_string(path).ok()?;
    match serde_json::from_str(&raw) {
        Ok(state) => Some(state),
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "Ignoring unreadable export state; snapshot will republish"
            );
            None
        }
    }
}
