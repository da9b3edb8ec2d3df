//! Watchdog supervisor
//!
//! Judges worker liveness by heartbeat age, not process inspection: a
//! role is live when some worker of that role has beaten within the
//! staleness threshold. Dead roles get exactly one replacement per check.
//! Double-starting is prevented by the liveness check itself; a duplicate
//! worker would be safe anyway since claims are atomic, so the watchdog
//! is a resource guard, not a correctness mechanism.

use crate::error::{CoreError, Result};
use crate::store::RecordStore;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::process::Stdio;

/// Seam for starting replacement worker processes.
#[async_trait]
pub trait ProcessLauncher: Send + Sync {
    /// Start a detached worker for `role`.
    async fn launch(&self, role: &str) -> Result<()>;
}

/// Spawns a configured argv per role, fully detached (no inherited
/// stdio, never waited on).
#[derive(Debug, Default)]
pub struct CommandLauncher {
    commands: HashMap<String, Vec<String>>,
}

impl CommandLauncher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_command(mut self, role: impl Into<String>, argv: Vec<String>) -> Self {
        self.commands.insert(role.into(), argv);
        self
    }
}

#[async_trait]
impl ProcessLauncher for CommandLauncher {
    async fn launch(&self, role: &str) -> Result<()> {
        let argv = self
            .commands
            .get(role)
            .ok_or_else(|| CoreError::config(format!("no launch command for role '{role}'")))?;
        let (program, args) = argv
            .split_first()
            .ok_or_else(|| CoreError::config(format!("empty launch command for role '{role}'")))?;

        let child = tokio::process::Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()?;

        tracing::info!(role = %role, pid = ?child.id(), "Launched replacement worker");
        Ok(())
    }
}

/// Result of checking one role.
#[derive(Debug, Clone)]
pub struct RoleCheck {
    pub role: String,
    pub last_beat: Option<DateTime<Utc>>,
    pub live: bool,
    pub restarted: bool,
    pub launch_error: Option<String>,
}

pub struct Watchdog {
    store: RecordStore,
    launcher: Box<dyn ProcessLauncher>,
    roles: Vec<String>,
    stale_after: Duration,
}

impl Watchdog {
    pub fn new(
        store: RecordStore,
        launcher: Box<dyn ProcessLauncher>,
        roles: Vec<String>,
        stale_after: Duration,
    ) -> Self {
        Self {
            store,
            launcher,
            roles,
            stale_after,
        }
    }

    /// Check every configured role once, launching a replacement for each
    /// role without a live heartbeat. A failed launch is reported in the
    /// check rather than aborting the remaining roles.
    pub async fn check_once(&self) -> Result<Vec<RoleCheck>> {
        let now = Utc::now();
        let mut checks = Vec::with_capacity(self.roles.len());

        for role in &self.roles {
            let last_beat = self.store.freshest_heartbeat(role).await?;
            let live = last_beat.is_some_and(|beat| now - beat < self.stale_after);

            let mut restarted = false;
            let mut launch_error = None;

            if live {
                tracing::debug!(role = %role, last_beat = ?last_beat, "Role is live");
            } else {
                tracing::warn!(
                    role = %role,
                    last_beat = ?last_beat,
                    "Role has no live worker; launching replacement"
                );
                match self.launcher.launch(role).await {
                    Ok(()) => restarted = true,
                    Err(e) => {
                        tracing::error!(role = %role, error = %e, "Replacement launch failed");
                        launch_error = Some(e.to_string());
                    }
                }
            }

            checks.push(RoleCheck {
                role: role.clone(),
                last_beat,
                live,
                restarted,
                launch_error,
            });
        }

        Ok(checks)
    }

    /// Run checks forever on a fixed period. A failed check (store
    /// hiccup) is logged and the next period proceeds; the supervisor
    /// outliving transient faults is the point of having one.
    pub async fn run(&self, interval: std::time::Duration) -> Result<()> {
        loop {
            if let Err(e) = self.check_once().await {
                tracing::error!(error = %e, "Watchdog check failed");
            }
            tokio::time::sleep(interval).await;
        }
    }
}
