// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! orch - orchestrator command-line interface

mod client;
mod client_lifecycle;
mod color;
mod commands;
mod daemon_process;
mod env;
mod exit_error;
mod output;
mod repo;
mod table;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{daemon, dashboard, session};
use orc_core::{Config, SessionId};
use output::OutputFormat;

#[derive(Parser)]
#[command(name = "orch", version, about = "Autonomous coding worker orchestrator")]
struct Cli {
    /// Configured repo to operate on, by its short id. Inferred from the
    /// current directory's git root when omitted.
    #[arg(long, global = true)]
    repo: Option<String>,

    /// Output format
    #[arg(short = 'o', long = "output", value_enum, default_value_t, global = true)]
    output: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a session for an issue and spawn its worker.
    Spawn {
        /// Issue number to work.
        issue: u64,
        /// Issue title, recorded on the session for display purposes.
        #[arg(long)]
        title: Option<String>,
        /// Issue body text, passed through to the worker's prompt.
        #[arg(long)]
        body: Option<String>,
        /// Execution mode: user-driven, autonomous-one-shot, or iterative.
        #[arg(long, value_parser = session::parse_mode)]
        mode: Option<orc_core::Mode>,
    },
    /// List sessions.
    List {
        /// Include terminal-status (complete/cancelled) sessions.
        #[arg(long)]
        all: bool,
    },
    /// Show one session plus its computed worktree diff summary.
    Get { session: SessionId },
    /// Record a status transition (and optional reason/PR url).
    Update {
        #[arg(long = "id")]
        id: SessionId,
        #[arg(long, value_parser = session::parse_status)]
        status: orc_core::SessionStatus,
        #[arg(long)]
        reason: Option<String>,
        #[arg(long = "pr")]
        pull_request_url: Option<String>,
    },
    /// Attach guidance to a session for the worker to pick up.
    Forward { session: SessionId, message: String },
    /// Clear a session's forwarded message.
    Ack { session: SessionId },
    /// Pause a session.
    Pause { session: SessionId },
    /// Resume a paused session.
    Resume { session: SessionId },
    /// Restart a session's worker in place.
    Restart {
        session: SessionId,
        /// Iterative-mode iteration to resume at.
        #[arg(long)]
        iteration: Option<u32>,
    },
    /// Delete a session and (depending on mode) its worktree/branch.
    Delete {
        session: SessionId,
        #[arg(long, default_value = "folder-only", value_parser = session::parse_delete_mode)]
        mode: orc_core::DeleteMode,
        /// Force deletion even if the worktree is dirty.
        #[arg(long)]
        force: bool,
    },
    /// Alias for `delete --mode folder-only`.
    Cancel { session: SessionId },
    /// Cancel every active session.
    CancelAll {
        /// Leave worktrees on disk instead of removing them.
        #[arg(long)]
        keep_worktrees: bool,
    },
    /// Record a worker heartbeat (the worker's side-channel).
    Heartbeat {
        #[arg(long = "id")]
        id: SessionId,
        /// Suppress output on success.
        #[arg(short = 'q', long)]
        quiet: bool,
    },
    /// Roll back a deletion that left an orphaned worktree behind.
    RollbackDelete { session: SessionId },
    /// Daemon lifecycle management.
    Daemon(daemon::DaemonArgs),
    /// Launch a live terminal view of the push channel.
    Dashboard(dashboard::DashboardArgs),
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        let code = e.downcast_ref::<exit_error::ExitError>().map_or(1, |c| c.code);
        eprintln!("Error: {e}");
        std::process::exit(code);
    }
}

fn cli_command() -> clap::Command {
    use clap::CommandFactory;
    Cli::command().styles(color::styles())
}

async fn run() -> Result<()> {
    use clap::FromArgMatches;
    let matches = cli_command().get_matches();
    let cli = Cli::from_arg_matches(&matches)?;
    let format = cli.output;

    if let Commands::Daemon(args) = cli.command {
        return daemon::daemon(args, format).await;
    }
    if let Commands::Dashboard(args) = cli.command {
        return dashboard::dashboard(args, format).await;
    }

    match cli.command {
        Commands::Spawn { issue, title, body, mode } => {
            let config = Config::load()?;
            let cwd = std::env::current_dir()?;
            let repo = repo::resolve_repo(&config, &cwd, cli.repo.as_deref())?;
            session::spawn(&config, repo, issue, title, body, mode, format).await
        }
        Commands::List { all } => {
            let repo = resolve_optional_repo(cli.repo.as_deref())?;
            session::list(repo, all, format).await
        }
        Commands::Get { session: id } => session::get(id, format).await,
        Commands::Update { id, status, reason, pull_request_url } => {
            session::update(id, status, reason, pull_request_url, format).await
        }
        Commands::Forward { session: id, message } => session::forward(id, message, format).await,
        Commands::Ack { session: id } => session::ack(id, format).await,
        Commands::Pause { session: id } => session::pause(id, format).await,
        Commands::Resume { session: id } => session::resume(id, format).await,
        Commands::Restart { session: id, iteration } => session::restart(id, iteration, format).await,
        Commands::Delete { session: id, mode, force } => session::delete(id, mode, force, format).await,
        Commands::Cancel { session: id } => {
            session::delete(id, orc_core::DeleteMode::FolderOnly, false, format).await
        }
        Commands::CancelAll { keep_worktrees } => session::cancel_all(keep_worktrees, format).await,
        Commands::Heartbeat { id, quiet } => session::heartbeat(id, quiet, format).await,
        Commands::RollbackDelete { session: id } => session::rollback_delete(id, format).await,
        Commands::Daemon(_) | Commands::Dashboard(_) => unreachable!("handled above"),
    }
}

/// Resolve an optional repo filter for `list`: `None` means "every
/// configured repo", matching `Request::List`'s own semantics.
fn resolve_optional_repo(explicit: Option<&str>) -> Result<Option<orc_core::RepoId>> {
    let Some(id) = explicit else { return Ok(None) };
    let config = Config::load()?;
    if !config.repos.contains_key(id) {
        return Err(anyhow::anyhow!("no repo named '{id}' in config"));
    }
    Ok(Some(orc_core::RepoId::new(id)))
}

#[cfg(test)]
#[path = "main_tests.rs"]
mod tests;
