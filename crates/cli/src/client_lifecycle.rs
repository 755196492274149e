// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle and diagnostic logging for the CLI client.

use std::path::PathBuf;

use crate::client::{timeout_exit, ClientError, DaemonClient};
use crate::daemon_process::{daemon_dir, daemon_socket, force_kill_daemon, process_exists, read_daemon_pid, wait_for_exit};

/// Stop the daemon (graceful first, then forceful).
/// Returns `true` if the daemon was stopped, `false` if it wasn't running.
pub async fn daemon_stop() -> Result<bool, ClientError> {
    let client = match DaemonClient::connect() {
        Ok(c) => c,
        Err(ClientError::DaemonNotRunning) => return Ok(false),
        Err(e) => return Err(e),
    };

    let shutdown_result = client.shutdown().await;

    if let Some(pid) = read_daemon_pid()? {
        if shutdown_result.is_ok() {
            wait_for_exit(pid, timeout_exit()).await;
        }
        if process_exists(pid) {
            force_kill_daemon(pid);
            wait_for_exit(pid, timeout_exit()).await;
        }
    }

    Ok(true)
}

/// Write a diagnostic message to `<state_dir>/cli.log`.
fn write_cli_log(message: String) {
    use std::io::Write;
    use std::time::SystemTime;

    let log_path = daemon_dir()
        .unwrap_or_else(|_| {
            std::env::var("HOME")
                .map(|h| PathBuf::from(h).join(".orchestration"))
                .unwrap_or_else(|_| PathBuf::from("/tmp"))
        })
        .join("cli.log");

    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    if let Ok(mut file) = std::fs::OpenOptions::new().create(true).append(true).open(&log_path) {
        let timestamp =
            SystemTime::now().duration_since(SystemTime::UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(0);
        let pid = std::process::id();
        let cwd =
            std::env::current_dir().map(|p| p.display().to_string()).unwrap_or_else(|_| "(unknown)".to_string());
        let state_dir = std::env::var("ORC_STATE_DIR").unwrap_or_else(|_| "(not set)".to_string());

        let _ = writeln!(file, "[ts={timestamp}] pid={pid} cwd={cwd} ORC_STATE_DIR={state_dir} {message}");
    }
}

/// Log a connection error for debugging. Helps diagnose daemon connectivity
/// issues in spawned workers where stdout/stderr may not be visible.
pub fn log_connection_error(error: &ClientError) {
    let socket_path = daemon_socket().map(|p| p.display().to_string()).unwrap_or_else(|_| "(unknown)".to_string());
    write_cli_log(format!("socket={socket_path} error={error}"));
}
