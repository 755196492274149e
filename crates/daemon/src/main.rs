// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Orchestration Daemon (orcd)
//!
//! Background process that owns every configured repository's session
//! lifecycle, the iterative-loop driver tasks, and the Unix control socket
//! `orch` (and any connected dashboard) speaks to. Started implicitly by
//! the CLI on first use; not meant to be invoked directly by an operator.

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

use orc_daemon::state::AppState;
use orc_daemon::{env, lifecycle, LifecycleError};
use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    if let Some(arg) = std::env::args().nth(1) {
        match arg.as_str() {
            "--version" | "-V" | "-v" => {
                println!("orcd {}", env!("CARGO_PKG_VERSION"));
                return Ok(());
            }
            "--help" | "-h" | "help" => {
                println!("orcd {}", env!("CARGO_PKG_VERSION"));
                println!("Orchestration daemon - owns session lifecycle and the worker loop");
                println!();
                println!("USAGE:");
                println!("    orcd");
                println!();
                println!("The daemon is typically started by the `orch` CLI and should not");
                println!("be invoked directly. It listens on a Unix socket for commands.");
                return Ok(());
            }
            _ => {
                eprintln!("error: unexpected argument '{arg}'");
                eprintln!("Usage: orcd [--help | --version]");
                std::process::exit(2);
            }
        }
    }

    let log_guard = setup_logging();

    info!("starting orchestration daemon");

    let daemon = match lifecycle::Daemon::startup().await {
        Ok(d) => d,
        Err(LifecycleError::LockFailed { pid }) => {
            eprintln!("orcd is already running");
            if let Some(pid) = pid {
                eprintln!("  pid: {pid}");
            }
            std::process::exit(1);
        }
        Err(e) => {
            error!(error = %e, "failed to start daemon");
            drop(log_guard);
            return Err(e.into());
        }
    };

    let state = std::sync::Arc::clone(&daemon.state);
    spawn_orphan_sweep(std::sync::Arc::clone(&state));
    spawn_staleness_sweep(std::sync::Arc::clone(&state));

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;
    let mut shutdown_signal = state.shutdown_signal();

    info!(socket = %daemon.socket_path.display(), "daemon ready");
    println!("READY");

    tokio::select! {
        result = orc_daemon::listener::serve(std::sync::Arc::clone(&state), daemon.listener) => {
            if let Err(e) = result {
                error!(error = %e, "listener task ended unexpectedly");
            }
        }
        _ = sigterm.recv() => {
            info!("received SIGTERM, shutting down");
        }
        _ = sigint.recv() => {
            info!("received SIGINT, shutting down");
        }
        _ = shutdown_signal.changed() => {
            info!("shutdown requested via control socket");
        }
    }

    daemon.shutdown();
    info!("daemon stopped");
    Ok(())
}

/// Periodically log (but do not act on) orphaned worktrees: the CLI's
/// `orphans`/`rollback-delete` commands are the operator-facing remediation
/// path, so the sweep here is observability only.
fn spawn_orphan_sweep(state: std::sync::Arc<AppState>) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(env::orphan_sweep_interval());
        loop {
            interval.tick().await;
            let orphans = state.multi_repo.detect_orphans();
            for (repo_id, paths) in &orphans {
                warn!(repo = repo_id.as_str(), count = paths.len(), "orphaned worktrees detected");
            }
        }
    });
}

/// Periodically mark sessions with no heartbeat in over 90s as `stuck`, per
/// `Session::is_stale`.
fn spawn_staleness_sweep(state: std::sync::Arc<AppState>) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(env::staleness_sweep_interval());
        loop {
            interval.tick().await;
            let now = chrono::Utc::now();
            for repo_id in state.multi_repo.repo_ids().cloned().collect::<Vec<_>>() {
                let Some(service) = state.multi_repo.service(&repo_id) else {
                    continue;
                };
                let sessions = match service.list() {
                    Ok(s) => s,
                    Err(e) => {
                        warn!(repo = repo_id.as_str(), error = %e, "staleness sweep: list failed");
                        continue;
                    }
                };
                for session in sessions {
                    if !session.is_stale(now) {
                        continue;
                    }
                    let reason = "no heartbeat received in over 90 seconds".to_string();
                    if let Err(e) = service.update(
                        &session.id,
                        orc_core::SessionStatus::Stuck,
                        Some(reason),
                        None,
                    ) {
                        warn!(session_id = %session.id, error = %e, "staleness sweep: update failed");
                    }
                }
            }
        }
    });
}

/// Daily-rotating file logger under `<state_dir>/logs/orcd.log`, falling
/// back to stderr if the state directory cannot be determined (startup
/// will fail shortly after anyway in that case).
fn setup_logging() -> Option<tracing_appender::non_blocking::WorkerGuard> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let Some(state_dir) = env::state_dir() else {
        tracing_subscriber::registry().with(filter).with(fmt::layer()).init();
        return None;
    };
    let log_dir = env::log_dir(&state_dir);
    if std::fs::create_dir_all(&log_dir).is_err() {
        tracing_subscriber::registry().with(filter).with(fmt::layer()).init();
        return None;
    }

    let file_appender = tracing_appender::rolling::daily(&log_dir, "orcd.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
        .init();

    Some(guard)
}
