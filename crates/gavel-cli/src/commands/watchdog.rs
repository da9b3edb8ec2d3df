//! `gavel watchdog` command implementation
//!
//! Supervises worker roles by heartbeat age. Replacements are launched as
//! `<this binary> <role> --continuous`, so the watchdog machine only needs
//! the `gavel` binary and the same environment the workers use.

use crate::error::Result;
use chrono::Utc;
use colored::Colorize;
use gavel_core::watchdog::{CommandLauncher, RoleCheck, Watchdog};
use std::time::Duration;

/// Check worker liveness once, or supervise on a loop
pub async fn run(once: bool, roles: &[String]) -> Result<()> {
    let (config, store) = super::open_store().await?;

    let exe = std::env::current_exe()?;
    let mut launcher = CommandLauncher::new();
    for role in roles {
        launcher = launcher.with_command(
            role.clone(),
            vec![
                exe.display().to_string(),
                role.clone(),
                "--continuous".to_string(),
            ],
        );
    }

    let watchdog = Watchdog::new(
        store,
        Box::new(launcher),
        roles.to_vec(),
        chrono::Duration::seconds(config.watchdog.heartbeat_stale_secs as i64),
    );

    if once {
        let checks = watchdog.check_once().await?;
        print_checks(&checks);
        return Ok(());
    }

    tracing::info!(
        roles = ?roles,
        interval_secs = config.watchdog.check_interval_secs,
        "watchdog started"
    );
    watchdog
        .run(Duration::from_secs(config.watchdog.check_interval_secs))
        .await
}

fn print_checks(checks: &[RoleCheck]) {
    let now = Utc::now();
    println!("{}", "Worker roles:".cyan().bold());
    for check in checks {
        let beat = match check.last_beat {
            Some(at) => format!("last beat {} ago", super::format_age(now - at)),
            None => "never beaten".to_string(),
        };
        let verdict = if check.live {
            "live".green().to_string()
        } else if check.restarted {
            "restarted".yellow().to_string()
        } else if let Some(err) = &check.launch_error {
            format!("{} ({err})", "launch failed".red())
        } else {
            "down".red().to_string()
        };
        println!("  {:<12} {:<24} {}", check.role, beat, verdict);
    }
}
