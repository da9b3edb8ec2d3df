//! End-to-end tests for the gavel binary
//!
//! These tests validate the full CLI workflow including:
//! - Ingest from a listing file and from stdin, with idempotent re-runs
//! - Listing validation errors
//! - Worker runs against shell-command collaborators
//! - Status, show and retry flows
//! - Full pipeline cycles and export snapshots
//! - Watchdog liveness checks
//!
//! Each test gets its own temp directory holding the store and export
//! output; stage collaborators are small `sh` one-liners.

use assert_cmd::Command;
use predicates::prelude::*;
use std::path::PathBuf;
use tempfile::TempDir;

const LISTING: &str = r#"[
  {
    "id": "vid-001",
    "locator": "https://video.example/vid-001",
    "chamber": "house",
    "session_date": "2025-03-12",
    "title": "Legislative Day 12"
  },
  {
    "id": "vid-002",
    "locator": "https://video.example/vid-002",
    "chamber": "senate",
    "session_date": "2025-03-13",
    "part": 1,
    "title": "Senate Day 13"
  }
]"#;

/// One isolated pipeline environment per test.
struct TestEnv {
    dir: TempDir,
}

impl TestEnv {
    fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("create temp dir"),
        }
    }

    /// A `gavel` command pointed at this environment's store. Stage and
    /// publish commands are scrubbed so tests opt in explicitly.
    fn gavel(&self) -> Command {
        let mut cmd = Command::cargo_bin("gavel").expect("gavel binary");
        cmd.current_dir(self.dir.path())
            .env("GAVEL_DB_PATH", self.dir.path().join("pipeline.db"))
            .env("GAVEL_EXPORT_DIR", self.export_dir())
            .env_remove("GAVEL_TRANSCRIBE_COMMAND")
            .env_remove("GAVEL_SUMMARIZE_COMMAND")
            .env_remove("GAVEL_PUBLISH_COMMAND")
            .env_remove("GAVEL_LOG_LEVEL");
        cmd
    }

    fn export_dir(&self) -> PathBuf {
        self.dir.path().join("export")
    }

    fn write_listing(&self, name: &str, content: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        std::fs::write(&path, content).expect("write listing");
        path
    }

    fn ingest_fixture(&self) {
        let listing = self.write_listing("listing.json", LISTING);
        self.gavel().arg("ingest").arg(&listing).assert().success();
    }
}

// ============================================================================
// Ingest Tests
// ============================================================================

#[test]
fn test_ingest_then_status() {
    let env = TestEnv::new();
    let listing = env.write_listing("listing.json", LISTING);

    env.gavel()
        .arg("ingest")
        .arg(&listing)
        .assert()
        .success()
        .stdout(predicate::str::contains("New records:     2"));

    // Re-ingesting the same listing must not duplicate or overwrite.
    env.gavel()
        .arg("ingest")
        .arg(&listing)
        .assert()
        .success()
        .stdout(predicate::str::contains("New records:     0"))
        .stdout(predicate::str::contains("Already present: 2"));

    env.gavel()
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("Pending:      2"))
        .stdout(predicate::str::contains("Total:        2"));
}

#[test]
fn test_ingest_reads_stdin() {
    let env = TestEnv::new();

    env.gavel()
        .arg("ingest")
        .arg("-")
        .write_stdin(LISTING)
        .assert()
        .success()
        .stdout(predicate::str::contains("New records:     2"));
}

#[test]
fn test_ingest_rejects_unknown_chamber() {
    let env = TestEnv::new();
    let listing = env.write_listing(
        "bad.json",
        r#"[{
            "id": "vid-003",
            "locator": "https://video.example/vid-003",
            "chamber": "tribunal",
            "session_date": "2025-03-14",
            "title": "???"
        }]"#,
    );

    env.gavel()
        .arg("ingest")
        .arg(&listing)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid listing"));

    // Nothing may land in the store from a rejected listing.
    env.gavel()
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("Total:        0"));
}

#[test]
fn test_ingest_rejects_unsafe_record_id() {
    let env = TestEnv::new();
    let listing = env.write_listing(
        "bad.json",
        r#"[{
            "id": "../escape",
            "locator": "https://video.example/x",
            "chamber": "house",
            "session_date": "2025-03-14",
            "title": "???"
        }]"#,
    );

    env.gavel()
        .arg("ingest")
        .arg(&listing)
        .assert()
        .failure()
        .stderr(predicate::str::contains("../escape"));
}

#[test]
fn test_ingest_missing_file_is_actionable() {
    let env = TestEnv::new();

    env.gavel()
        .arg("ingest")
        .arg("no-such-listing.json")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Listing file not found"));
}

// ============================================================================
// Worker Tests
// ============================================================================

#[test]
fn test_transcribe_default_claims_one_record() {
    let env = TestEnv::new();
    env.ingest_fixture();

    // No mode flag: at most one record per invocation.
    env.gavel()
        .arg("transcribe")
        .arg("--worker")
        .arg("w-test")
        .env(
            "GAVEL_TRANSCRIBE_COMMAND",
            r#"printf 'transcript for %s' "$GAVEL_RECORD_ID""#,
        )
        .assert()
        .success()
        .stdout(predicate::str::contains("transcribe worker 'w-test' finished:"))
        .stdout(predicate::str::contains("Claimed:   1"))
        .stdout(predicate::str::contains("Succeeded: 1"));

    // vid-001 is the oldest, so it went first; vid-002 still waits.
    env.gavel()
        .arg("show")
        .arg("vid-001")
        .assert()
        .success()
        .stdout(predicate::str::contains("transcribed"))
        .stdout(predicate::str::contains("chars"));

    env.gavel()
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("Pending:      1"))
        .stdout(predicate::str::contains("Transcribed:  1"));
}

#[test]
fn test_transcribe_batch_processes_backlog() {
    let env = TestEnv::new();
    env.ingest_fixture();

    env.gavel()
        .arg("transcribe")
        .arg("--worker")
        .arg("w-test")
        .arg("--batch")
        .arg("10")
        .env(
            "GAVEL_TRANSCRIBE_COMMAND",
            r#"printf 'transcript for %s' "$GAVEL_RECORD_ID""#,
        )
        .assert()
        .success()
        .stdout(predicate::str::contains("Claimed:   2"))
        .stdout(predicate::str::contains("Succeeded: 2"));

    env.gavel()
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("Pending:      0"))
        .stdout(predicate::str::contains("Transcribed:  2"));
}

#[test]
fn test_worker_without_stage_command_fails_fast() {
    let env = TestEnv::new();
    env.ingest_fixture();

    env.gavel()
        .arg("transcribe")
        .assert()
        .failure()
        .stderr(predicate::str::contains("GAVEL_TRANSCRIBE_COMMAND"));

    // The backlog is untouched by the aborted run.
    env.gavel()
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("Pending:      2"));
}

#[test]
fn test_failed_stage_parks_record_and_retry_requeues() {
    let env = TestEnv::new();
    env.ingest_fixture();

    env.gavel()
        .arg("transcribe")
        .arg("--worker")
        .arg("w-bad")
        .arg("--batch")
        .arg("1")
        .env(
            "GAVEL_TRANSCRIBE_COMMAND",
            r#"echo 'fetch failed: 404' >&2; exit 2"#,
        )
        .assert()
        .success()
        .stdout(predicate::str::contains("Failed:    1"));

    // vid-001 is the oldest, so it took the failure.
    env.gavel()
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("Error:        1"))
        .stdout(predicate::str::contains("fetch failed: 404"))
        .stdout(predicate::str::contains("gavel retry"));

    env.gavel()
        .arg("retry")
        .arg("vid-001")
        .assert()
        .success()
        .stdout(predicate::str::contains("Requeued"));

    env.gavel()
        .arg("transcribe")
        .arg("--worker")
        .arg("w-good")
        .arg("--batch")
        .arg("10")
        .env(
            "GAVEL_TRANSCRIBE_COMMAND",
            r#"printf 'transcript for %s' "$GAVEL_RECORD_ID""#,
        )
        .assert()
        .success()
        .stdout(predicate::str::contains("Succeeded: 2"));

    env.gavel()
        .arg("show")
        .arg("vid-001")
        .assert()
        .success()
        .stdout(predicate::str::contains("transcribed"));
}

// ============================================================================
// Show / Retry Error Paths
// ============================================================================

#[test]
fn test_show_unknown_record_fails() {
    let env = TestEnv::new();
    env.ingest_fixture();

    env.gavel()
        .arg("show")
        .arg("vid-999")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Record 'vid-999' not found"));
}

#[test]
fn test_retry_refuses_record_that_is_not_errored() {
    let env = TestEnv::new();
    env.ingest_fixture();

    env.gavel()
        .arg("retry")
        .arg("vid-001")
        .assert()
        .failure()
        .stderr(predicate::str::contains("is 'pending', expected 'error'"));
}

#[test]
fn test_retry_all_errors_reports_zero_when_clean() {
    let env = TestEnv::new();
    env.ingest_fixture();

    env.gavel()
        .arg("retry")
        .arg("--all-errors")
        .assert()
        .success()
        .stdout(predicate::str::contains("No errored records"));
}

// ============================================================================
// Pipeline and Export Tests
// ============================================================================

#[test]
fn test_full_pipeline_publishes_snapshot() {
    let env = TestEnv::new();
    env.ingest_fixture();

    env.gavel()
        .arg("pipeline")
        .arg("--worker")
        .arg("w-pipe")
        .env(
            "GAVEL_TRANSCRIBE_COMMAND",
            r#"printf 'transcript for %s' "$GAVEL_RECORD_ID""#,
        )
        .env("GAVEL_SUMMARIZE_COMMAND", r#"printf 'summary: %s' "$(cat)""#)
        .assert()
        .success()
        .stdout(predicate::str::contains("transcribe worker 'w-pipe' finished:"))
        .stdout(predicate::str::contains("summarize worker 'w-pipe' finished:"))
        .stdout(predicate::str::contains("Published snapshot with 2 record(s)"));

    let export = env.export_dir();
    let index = std::fs::read_to_string(export.join("records.json")).expect("index written");
    // Newest session first; the summary came from the piped transcript.
    let vid1 = index.find("vid-001").expect("vid-001 indexed");
    let vid2 = index.find("vid-002").expect("vid-002 indexed");
    assert!(vid2 < vid1);
    assert!(index.contains("summary: transcript for vid-001"));

    let transcript =
        std::fs::read_to_string(export.join("transcripts/vid-001.txt")).expect("transcript");
    assert!(transcript.contains("Title: Legislative Day 12"));
    assert!(transcript.contains("transcript for vid-001"));
    assert!(export.join("records/vid-002.json").exists());
    assert!(export.join("stats.json").exists());

    // A second export with no new work publishes nothing.
    env.gavel()
        .arg("export")
        .assert()
        .success()
        .stdout(predicate::str::contains("unchanged"));
}

#[test]
fn test_export_before_any_work_publishes_empty_snapshot() {
    let env = TestEnv::new();
    env.ingest_fixture();

    env.gavel()
        .arg("export")
        .assert()
        .success()
        .stdout(predicate::str::contains("0 record(s)"));

    assert!(env.export_dir().join("records.json").exists());
}

// ============================================================================
// Watchdog Tests
// ============================================================================

#[test]
fn test_watchdog_sees_recent_worker_as_live() {
    let env = TestEnv::new();
    env.ingest_fixture();

    // An empty-backlog run still beats the role's heartbeat.
    env.gavel()
        .arg("summarize")
        .arg("--worker")
        .arg("w-live")
        .env("GAVEL_SUMMARIZE_COMMAND", "cat")
        .assert()
        .success();

    env.gavel()
        .arg("watchdog")
        .arg("--once")
        .arg("--roles")
        .arg("summarize")
        .assert()
        .success()
        .stdout(predicate::str::contains("summarize"))
        .stdout(predicate::str::contains("live"));
}

#[test]
fn test_watchdog_restarts_role_that_never_beat() {
    let env = TestEnv::new();

    // The relaunched worker exits immediately (no stage command in this
    // environment), so nothing lingers after the test.
    env.gavel()
        .arg("watchdog")
        .arg("--once")
        .arg("--roles")
        .arg("transcribe")
        .assert()
        .success()
        .stdout(predicate::str::contains("never beaten"))
        .stdout(predicate::str::contains("restarted"));
}

// ============================================================================
// Usage Tests
// ============================================================================

#[test]
fn test_help_shows_subcommands() {
    let env = TestEnv::new();

    env.gavel()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("ingest"))
        .stdout(predicate::str::contains("transcribe"))
        .stdout(predicate::str::contains("watchdog"));
}

#[test]
fn test_unknown_subcommand_is_a_usage_error() {
    let env = TestEnv::new();

    env.gavel().arg("bogus").assert().code(2);
}
