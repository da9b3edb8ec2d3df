//! Pipeline stages and their external collaborators
//!
//! A stage turns one record payload into the next (transcript, then
//! summary). The actual media work happens in an external command; this
//! module owns the contract with that command and the classification of
//! its failures into transient (retry later) and permanent (park in
//! error).

use crate::record::SessionRecord;
use crate::status::RecordStatus;
use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// Exit code a collaborator uses to signal "try again later" (sysexits
/// EX_TEMPFAIL).
pub const EXIT_TEMPFAIL: i32 = 75;

/// One payload-producing phase of the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Transcribe,
    Summarize,
}

impl Stage {
    /// Status this stage claims records from.
    pub fn claim_status(&self) -> RecordStatus {
        match self {
            Stage::Transcribe => RecordStatus::Pending,
            Stage::Summarize => RecordStatus::Transcribed,
        }
    }

    /// Status a successful release advances the record to.
    pub fn next_status(&self) -> RecordStatus {
        match self {
            Stage::Transcribe => RecordStatus::Transcribed,
            Stage::Summarize => RecordStatus::Summarized,
        }
    }

    /// Role name used in heartbeats, logs and the watchdog.
    pub fn role(&self) -> &'static str {
        match self {
            Stage::Transcribe => "transcribe",
            Stage::Summarize => "summarize",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.role())
    }
}

/// A stage failure, classified by whether retrying could help.
#[derive(Debug, thiserror::Error)]
pub enum StageFailure {
    /// Rate limits, timeouts, unreachable collaborators. Not recorded on
    /// the record; the claim is given back for a later attempt.
    #[error("transient failure: {0}")]
    Transient(String),

    /// Bad or missing input. Recorded as `error_message`; the record is
    /// excluded from claims until an explicit retry.
    #[error("permanent failure: {0}")]
    Permanent(String),
}

impl StageFailure {
    pub fn transient(msg: impl Into<String>) -> Self {
        Self::Transient(msg.into())
    }

    pub fn permanent(msg: impl Into<String>) -> Self {
        Self::Permanent(msg.into())
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }

    pub fn message(&self) -> &str {
        match self {
            Self::Transient(msg) | Self::Permanent(msg) => msg,
        }
    }
}

/// Seam between the pipeline and whatever produces payloads. Production
/// uses [`CommandProcessor`]; tests substitute scripted fakes.
#[async_trait]
pub trait StageProcessor: Send + Sync {
    /// Produce this stage's payload for one claimed record.
    async fn process(&self, record: &SessionRecord) -> Result<String, StageFailure>;
}

/// Runs the configured shell command for a stage.
///
/// Contract with the command: the record is exposed in `GAVEL_RECORD_ID`,
/// `GAVEL_RECORD_LOCATOR`, `GAVEL_RECORD_CHAMBER` and `GAVEL_RECORD_TITLE`;
/// summarization additionally receives the transcript on stdin. Exit 0
/// with non-empty stdout is success and stdout is the payload. Exit 75
/// means try again later. Any other non-zero exit is permanent, with
/// stderr as the message. Exceeding the timeout kills the command and
/// counts as transient.
pub struct CommandProcessor {
    stage: Stage,
    command: String,
    timeout: Duration,
}

impl CommandProcessor {
    pub fn new(stage: Stage, command: impl Into<String>, timeout: Duration) -> Self {
        Self {
            stage,
            command: command.into(),
            timeout,
        }
    }
}

#[async_trait]
impl StageProcessor for CommandProcessor {
    async fn process(&self, record: &SessionRecord) -> Result<String, StageFailure> {
        let mut cmd = Command::new("sh");
        cmd.arg("-c")
            .arg(&self.command)
            .env("GAVEL_RECORD_ID", &record.id)
            .env("GAVEL_RECORD_LOCATOR", &record.locator)
            .env("GAVEL_RECORD_CHAMBER", record.chamber.as_str())
            .env("GAVEL_RECORD_TITLE", &record.title)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        if self.stage == Stage::Summarize {
            cmd.stdin(Stdio::piped());
        } else {
            cmd.stdin(Stdio::null());
        }

        let mut child = cmd
            .spawn()
            .map_err(|e| StageFailure::transient(format!("failed to spawn stage command: {e}")))?;

        if let Some(mut stdin) = child.stdin.take() {
            // Writing from a task keeps us reading stdout while the child
            // drains stdin; writing inline can deadlock on a full pipe.
            let transcript = record.payload_transcript.clone();
            tokio::spawn(async move {
                let _ = stdin.write_all(transcript.as_bytes()).await;
                let _ = stdin.shutdown().await;
            });
        }

        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Err(_) => {
                return Err(StageFailure::transient(format!(
                    "stage command exceeded {:?} timeout",
                    self.timeout
                )));
            }
            Ok(Err(e)) => {
                return Err(StageFailure::transient(format!(
                    "failed to collect stage command output: {e}"
                )));
            }
            Ok(Ok(output)) => output,
        };

        let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();

        match output.status.code() {
            Some(0) if stdout.is_empty() => {
                Err(StageFailure::permanent("stage command produced no output"))
            }
            Some(0) => Ok(stdout),
            Some(EXIT_TEMPFAIL) => Err(StageFailure::transient(if stderr.is_empty() {
                "stage command asked for a later retry".to_string()
            } else {
                stderr
            })),
            Some(code) => Err(StageFailure::permanent(if stderr.is_empty() {
                format!("stage command exited with status {code}")
            } else {
                stderr
            })),
            // Killed by a signal; the host, not the input, is suspect.
            None => Err(StageFailure::transient(
                "stage command terminated by signal",
            )),
        }
    }
}
