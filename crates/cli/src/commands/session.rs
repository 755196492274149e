// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session lifecycle commands: spawn, list, get, update, forward, ack,
//! pause, resume, restart, delete, cancel-all, heartbeat, rollback-delete.

use crate::client::DaemonClient;
use crate::exit_error::ExitError;
use crate::output::{format_time_ago, OutputFormat};
use crate::table::{should_show_repo, Column, Table};
use anyhow::{anyhow, Result};
use orc_core::{Config, DeleteMode, IssueRef, Mode, RepoId, Session, SessionId, SessionStatus};

/// Parse a `--mode` value into the session's execution [`Mode`].
pub fn parse_mode(s: &str) -> Result<Mode, String> {
    match s {
        "user-driven" => Ok(Mode::UserDriven),
        "autonomous-one-shot" => Ok(Mode::AutonomousOneShot),
        "iterative" => Ok(Mode::Iterative),
        other => Err(format!(
            "invalid mode '{other}' (expected user-driven, autonomous-one-shot, or iterative)"
        )),
    }
}

/// Parse a `--mode` value into the delete command's [`DeleteMode`].
pub fn parse_delete_mode(s: &str) -> Result<DeleteMode, String> {
    match s {
        "folder-only" => Ok(DeleteMode::FolderOnly),
        "with-local-branch" => Ok(DeleteMode::WithLocalBranch),
        "everything" => Ok(DeleteMode::Everything),
        other => Err(format!(
            "invalid delete mode '{other}' (expected folder-only, with-local-branch, or everything)"
        )),
    }
}

/// Parse an `--status` value for `update`.
pub fn parse_status(s: &str) -> Result<SessionStatus, String> {
    use SessionStatus::*;
    match s {
        "registered" => Ok(Registered),
        "planning" => Ok(Planning),
        "planning_complete" => Ok(PlanningComplete),
        "working" => Ok(Working),
        "shipping" => Ok(Shipping),
        "reviews_in_progress" => Ok(ReviewsInProgress),
        "pr_ready" => Ok(PrReady),
        "stuck" => Ok(Stuck),
        "paused" => Ok(Paused),
        "complete" => Ok(Complete),
        "cancelled" => Ok(Cancelled),
        other => Err(format!("invalid status '{other}'")),
    }
}

pub async fn spawn(
    config: &Config,
    repo: RepoId,
    issue_number: u64,
    title: Option<String>,
    body: Option<String>,
    mode: Option<Mode>,
    format: OutputFormat,
) -> Result<()> {
    let repo_config = config
        .repos
        .get(repo.as_str())
        .ok_or_else(|| anyhow!("repo '{repo}' not found in config"))?;
    let mode = mode.or(repo_config.default_mode).unwrap_or_default();

    let client = DaemonClient::for_action().map_err(|e| anyhow!("{e}"))?;
    let issue = IssueRef { number: issue_number, title: title.unwrap_or_default(), body };
    let session = client.spawn(repo, issue, mode, String::new(), Vec::new()).await.map_err(|e| anyhow!("{e}"))?;
    print_session(&session, format)
}

pub async fn list(repo: Option<RepoId>, all: bool, format: OutputFormat) -> Result<()> {
    let client = DaemonClient::for_query().map_err(|e| anyhow!("{e}"))?;
    let sessions = client.list(repo, all).await.map_err(|e| anyhow!("{e}"))?;
    print_session_list(&sessions, format)
}

pub async fn get(id: SessionId, format: OutputFormat) -> Result<()> {
    let client = DaemonClient::for_query().map_err(|e| anyhow!("{e}"))?;
    let (session, diff) = client.get(id).await.map_err(|e| anyhow!("{e}"))?;

    match format {
        OutputFormat::Text => {
            print_session_fields(&session);
            println!(
                "diff: {} file(s) changed, +{} -{}{}",
                diff.files_changed,
                diff.insertions,
                diff.deletions,
                if diff.dirty { " (dirty)" } else { "" }
            );
        }
        OutputFormat::Json => {
            let obj = serde_json::json!({ "session": session, "diff": diff });
            println!("{}", serde_json::to_string_pretty(&obj)?);
        }
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
pub async fn update(
    id: SessionId,
    status: SessionStatus,
    reason: Option<String>,
    pull_request_url: Option<String>,
    format: OutputFormat,
) -> Result<()> {
    if matches!(status, SessionStatus::Stuck) && reason.is_none() {
        return Err(ExitError::invalid_args("update --status stuck requires --reason").into());
    }

    let client = DaemonClient::for_action().map_err(|e| anyhow!("{e}"))?;
    let session = client.update(id, status, reason, pull_request_url).await.map_err(|e| anyhow!("{e}"))?;
    print_session(&session, format)
}

pub async fn forward(id: SessionId, message: String, format: OutputFormat) -> Result<()> {
    let client = DaemonClient::for_action().map_err(|e| anyhow!("{e}"))?;
    let session = client.forward(id, message).await.map_err(|e| anyhow!("{e}"))?;
    print_session(&session, format)
}

pub async fn ack(id: SessionId, format: OutputFormat) -> Result<()> {
    let client = DaemonClient::for_action().map_err(|e| anyhow!("{e}"))?;
    let session = client.ack(id).await.map_err(|e| anyhow!("{e}"))?;
    print_session(&session, format)
}

pub async fn pause(id: SessionId, format: OutputFormat) -> Result<()> {
    let client = DaemonClient::for_action().map_err(|e| anyhow!("{e}"))?;
    let session = client.pause(id).await.map_err(|e| anyhow!("{e}"))?;
    print_session(&session, format)
}

pub async fn resume(id: SessionId, format: OutputFormat) -> Result<()> {
    let client = DaemonClient::for_action().map_err(|e| anyhow!("{e}"))?;
    let session = client.resume(id).await.map_err(|e| anyhow!("{e}"))?;
    print_session(&session, format)
}

pub async fn restart(id: SessionId, iteration: Option<u32>, format: OutputFormat) -> Result<()> {
    let client = DaemonClient::for_action().map_err(|e| anyhow!("{e}"))?;
    let session = client.restart(id, iteration).await.map_err(|e| anyhow!("{e}"))?;
    print_session(&session, format)
}

pub async fn delete(id: SessionId, mode: DeleteMode, force: bool, format: OutputFormat) -> Result<()> {
    let client = DaemonClient::for_action().map_err(|e| anyhow!("{e}"))?;
    let outcome = client.delete(id, mode, force).await.map_err(|e| anyhow!("{e}"))?;

    match format {
        OutputFormat::Text => {
            if outcome.success {
                println!("deleted");
            } else {
                println!("deletion failed: {}", outcome.error.as_deref().unwrap_or("unknown error"));
                if let Some(path) = &outcome.orphaned_worktree_path {
                    println!("orphaned worktree left at {}", path.display());
                    println!("retry with `orch delete --force` or `orch rollback-delete`");
                }
            }
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&outcome)?),
    }

    if !outcome.success {
        return Err(ExitError::new(1, "deletion failed").into());
    }
    Ok(())
}

pub async fn cancel_all(keep_worktrees: bool, format: OutputFormat) -> Result<()> {
    let client = DaemonClient::for_action().map_err(|e| anyhow!("{e}"))?;
    let (cancelled, failed) = client.cancel_all(keep_worktrees).await.map_err(|e| anyhow!("{e}"))?;

    match format {
        OutputFormat::Text => {
            println!("cancelled {} session(s)", cancelled.len());
            for (id, err) in &failed {
                println!("failed to cancel {id}: {err}");
            }
        }
        OutputFormat::Json => {
            let obj = serde_json::json!({ "cancelled": cancelled, "failed": failed });
            println!("{}", serde_json::to_string_pretty(&obj)?);
        }
    }

    if !failed.is_empty() {
        return Err(ExitError::new(1, format!("{} session(s) failed to cancel", failed.len())).into());
    }
    Ok(())
}

pub async fn heartbeat(id: SessionId, quiet: bool, format: OutputFormat) -> Result<()> {
    let client = DaemonClient::for_signal().map_err(|e| anyhow!("{e}"))?;
    let outcome = client.heartbeat(id).await.map_err(|e| anyhow!("{e}"))?;

    if quiet {
        return Ok(());
    }

    match format {
        OutputFormat::Text => {
            println!("recorded{}", if outcome.has_message { "; forwarded message pending" } else { "" });
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&outcome)?),
    }
    Ok(())
}

pub async fn rollback_delete(id: SessionId, format: OutputFormat) -> Result<()> {
    let client = DaemonClient::for_action().map_err(|e| anyhow!("{e}"))?;
    let session = client.rollback_delete(id).await.map_err(|e| anyhow!("{e}"))?;
    print_session(&session, format)
}

fn print_session(session: &Session, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => print_session_fields(session),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(session)?),
    }
    Ok(())
}

fn print_session_fields(session: &Session) {
    println!("id: {}", session.id);
    println!("repo: {}", session.repo);
    println!("issue: #{} {}", session.issue.number, session.issue.title);
    println!("status: {}", crate::color::status(&session.status.to_string()));
    println!("mode: {}", session.mode);
    println!("branch: {}", session.branch);
    println!("worktree: {}", session.worktree_path.display());
    println!("heartbeat: {} ago", format_time_ago(session.last_heartbeat));
    if let Some(reason) = &session.stuck_reason {
        println!("stuck reason: {reason}");
    }
    if let Some(message) = &session.forwarded_message {
        println!("forwarded message: {message}");
    }
    if let Some(pr) = &session.pull_request_url {
        println!("pull request: {pr}");
    }
}

fn print_session_list(sessions: &[Session], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => {
            if sessions.is_empty() {
                println!("no sessions");
                return Ok(());
            }

            let show_repo = should_show_repo(sessions.iter().map(|s| s.repo.as_str()));
            let mut columns = vec![Column::left("ID")];
            if show_repo {
                columns.push(Column::left("REPO"));
            }
            columns.push(Column::left("ISSUE"));
            columns.push(Column::status("STATUS"));
            columns.push(Column::left("MODE"));
            columns.push(Column::muted("HEARTBEAT"));

            let mut table = Table::new(columns);
            for session in sessions {
                let mut row = vec![session.id.to_string()];
                if show_repo {
                    row.push(session.repo.to_string());
                }
                row.push(format!("#{}", session.issue.number));
                row.push(session.status.to_string());
                row.push(session.mode.to_string());
                row.push(format!("{} ago", format_time_ago(session.last_heartbeat)));
                table.row(row);
            }
            table.render(&mut std::io::stdout());
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(sessions)?),
    }
    Ok(())
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
