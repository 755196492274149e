// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `orch daemon` - daemon lifecycle management.

use crate::client::{ClientError, DaemonClient};
use crate::client_lifecycle::daemon_stop;
use crate::daemon_process::{daemon_dir, find_orcd_binary};
use crate::output::{display_log, OutputFormat};
use anyhow::{anyhow, Result};
use clap::{Args, Subcommand};
use std::path::PathBuf;
use std::process::Command;

#[derive(Args)]
pub struct DaemonArgs {
    #[command(subcommand)]
    pub command: Option<DaemonCommand>,
}

#[derive(Subcommand)]
pub enum DaemonCommand {
    /// Start the daemon (foreground or background)
    Start {
        /// Run in foreground (useful for debugging)
        #[arg(long)]
        foreground: bool,
    },
    /// Stop the daemon
    Stop,
    /// Check daemon status
    Status,
    /// Stop and restart the daemon
    Restart,
    /// View daemon logs
    Logs {
        /// Number of recent lines to show
        #[arg(short = 'n', long, default_value = "50")]
        limit: usize,
        /// Show all lines (no limit)
        #[arg(long, conflicts_with = "limit")]
        no_limit: bool,
        /// Follow log output
        #[arg(long, short)]
        follow: bool,
    },
    /// List worktrees with no corresponding session record
    Orphans,
}

pub async fn daemon(args: DaemonArgs, format: OutputFormat) -> Result<()> {
    match args.command {
        Some(DaemonCommand::Start { foreground }) => start(foreground).await,
        Some(DaemonCommand::Stop) => stop().await,
        Some(DaemonCommand::Restart) => restart().await,
        Some(DaemonCommand::Status) => status(format).await,
        Some(DaemonCommand::Logs { limit, no_limit, follow }) => logs(limit, no_limit, follow, format).await,
        Some(DaemonCommand::Orphans) => orphans(format).await,
        None => Err(anyhow!("a daemon subcommand is required (start, stop, status, restart, logs, orphans)")),
    }
}

async fn start(foreground: bool) -> Result<()> {
    if foreground {
        let orcd_path = find_orcd_binary()?;
        let status = Command::new(&orcd_path).status()?;
        if !status.success() {
            return Err(anyhow!("daemon exited with status: {status}"));
        }
        return Ok(());
    }

    if let Ok(client) = DaemonClient::connect() {
        if let Ok((uptime, ..)) = client.status().await {
            println!("daemon already running (uptime {uptime}s)");
            return Ok(());
        }
    }

    match DaemonClient::for_action() {
        Ok(_) => {
            println!("daemon started");
            Ok(())
        }
        Err(e) => Err(anyhow!("{e}")),
    }
}

async fn stop() -> Result<()> {
    match daemon_stop().await {
        Ok(true) => {
            println!("daemon stopped");
            Ok(())
        }
        Ok(false) => {
            println!("daemon not running");
            Ok(())
        }
        Err(e) => Err(anyhow!("failed to stop daemon: {e}")),
    }
}

async fn restart() -> Result<()> {
    let was_running = daemon_stop().await.map_err(|e| anyhow!("failed to stop daemon: {e}"))?;

    if was_running {
        tokio::time::sleep(std::time::Duration::from_millis(500)).await;
    }

    match DaemonClient::for_action() {
        Ok(_) => {
            println!("daemon restarted");
            Ok(())
        }
        Err(e) => Err(anyhow!("{e}")),
    }
}

fn not_running(format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => println!("daemon not running"),
        OutputFormat::Json => println!(r#"{{"status":"not_running"}}"#),
    }
    Ok(())
}

async fn status(format: OutputFormat) -> Result<()> {
    let client = match DaemonClient::connect() {
        Ok(c) => c,
        Err(_) => return not_running(format),
    };

    let (uptime, repos_configured, sessions_active, orphan_count) = match client.status().await {
        Ok(r) => r,
        Err(ClientError::DaemonNotRunning) => return not_running(format),
        Err(ClientError::Io(ref e))
            if matches!(e.kind(), std::io::ErrorKind::ConnectionRefused | std::io::ErrorKind::NotFound) =>
        {
            return not_running(format);
        }
        Err(e) => return Err(anyhow!("{e}")),
    };
    let version = client.hello().await.unwrap_or_else(|_| "unknown".to_string());

    match format {
        OutputFormat::Text => {
            println!("status: running");
            println!("version: {version}");
            println!("uptime: {}", format_uptime(uptime));
            println!("repos configured: {repos_configured}");
            println!("sessions active: {sessions_active}");
            if orphan_count > 0 {
                println!();
                println!("{orphan_count} orphaned worktree(s) detected — run `orch daemon orphans` for details");
            }
        }
        OutputFormat::Json => {
            let obj = serde_json::json!({
                "status": "running",
                "version": version,
                "uptime_secs": uptime,
                "uptime": format_uptime(uptime),
                "repos_configured": repos_configured,
                "sessions_active": sessions_active,
                "orphan_count": orphan_count,
            });
            println!("{}", serde_json::to_string_pretty(&obj)?);
        }
    }

    Ok(())
}

async fn logs(limit: usize, no_limit: bool, follow: bool, format: OutputFormat) -> Result<()> {
    let log_path = current_log_path()?;

    let Some(log_path) = log_path else {
        match format {
            OutputFormat::Text => println!("no daemon log file found"),
            OutputFormat::Json => println!(r#"{{"log_path":null,"lines":[]}}"#),
        }
        return Ok(());
    };

    let content =
        if no_limit { std::fs::read_to_string(&log_path)? } else { read_last_lines(&log_path, limit)? };
    display_log(&log_path, &content, follow, format, "daemon", "log").await
}

async fn orphans(format: OutputFormat) -> Result<()> {
    let client = DaemonClient::connect().map_err(|e| anyhow!("{e}"))?;
    let groups = client.orphans().await.map_err(|e| anyhow!("{e}"))?;

    match format {
        OutputFormat::Text => {
            if groups.iter().all(|g| g.worktree_paths.is_empty()) {
                println!("no orphaned worktrees detected");
                return Ok(());
            }
            for group in &groups {
                if group.worktree_paths.is_empty() {
                    continue;
                }
                println!("{}:", group.repo);
                for path in &group.worktree_paths {
                    println!("  {}", path.display());
                }
            }
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&groups)?);
        }
    }

    Ok(())
}

fn format_uptime(secs: u64) -> String {
    let hours = secs / 3600;
    let mins = (secs % 3600) / 60;
    let secs = secs % 60;

    if hours > 0 {
        format!("{hours}h {mins}m {secs}s")
    } else if mins > 0 {
        format!("{mins}m {secs}s")
    } else {
        format!("{secs}s")
    }
}

/// Path to today's daemon log file, if the log directory exists.
fn current_log_path() -> Result<Option<PathBuf>> {
    let dir = daemon_dir().map_err(|e| anyhow!("{e}"))?;
    let log_dir = orc_daemon::env::log_dir(&dir);
    if !log_dir.exists() {
        return Ok(None);
    }
    let mut entries: Vec<_> = std::fs::read_dir(&log_dir)?.filter_map(|e| e.ok()).collect();
    entries.sort_by_key(|e| e.file_name());
    Ok(entries.pop().map(|e| e.path()))
}

fn read_last_lines(path: &std::path::Path, n: usize) -> Result<String> {
    use std::io::{BufRead, BufReader};
    let file = std::fs::File::open(path)?;
    let lines: Vec<String> = BufReader::new(file).lines().collect::<std::io::Result<_>>()?;
    let start = lines.len().saturating_sub(n);
    Ok(lines[start..].join("\n"))
}

#[cfg(test)]
#[path = "daemon_tests.rs"]
mod tests;
