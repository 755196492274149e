// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon process management: starting, stopping, and probing `orcd`.

use crate::client::ClientError;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::{Duration, Instant};

/// Start `orcd` in the background, returning the child process handle.
pub fn start_daemon_background() -> Result<std::process::Child, ClientError> {
    let orcd_path = find_orcd_binary()?;

    Command::new(&orcd_path)
        .stdin(std::process::Stdio::null())
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .spawn()
        .map_err(|e| ClientError::DaemonStartFailed(e.to_string()))
}

/// Stop the daemon synchronously via SIGTERM, falling back to SIGKILL.
/// Used during a version-mismatch restart, where we're in a sync context
/// inside a tokio runtime and can't `block_on`.
pub fn stop_daemon_sync() {
    if let Ok(Some(pid)) = read_daemon_pid() {
        kill_signal("-15", pid);

        let start = Instant::now();
        let timeout = super::client::timeout_exit();
        while start.elapsed() < timeout {
            if !process_exists(pid) {
                break;
            }
            std::thread::sleep(Duration::from_millis(50));
        }

        if process_exists(pid) {
            force_kill_daemon(pid);
            let start = Instant::now();
            while start.elapsed() < timeout {
                if !process_exists(pid) {
                    break;
                }
                std::thread::sleep(Duration::from_millis(50));
            }
        }
    }

    if let Ok(dir) = daemon_dir() {
        let _ = std::fs::remove_file(dir.join("orc.sock"));
    }
}

/// Wait for a process to exit.
pub async fn wait_for_exit(pid: u32, timeout: Duration) -> bool {
    let start = Instant::now();
    while start.elapsed() < timeout {
        if !process_exists(pid) {
            return true;
        }
        tokio::time::sleep(super::client::poll_interval()).await;
    }
    false
}

fn find_orcd_binary() -> Result<PathBuf, ClientError> {
    if let Some(path) = crate::env::daemon_binary() {
        return Ok(PathBuf::from(path));
    }

    let current_exe = std::env::current_exe().ok();

    // Only trust CARGO_MANIFEST_DIR when the CLI itself is a debug build, so
    // an agent's tmux session that inherits a dev environment's variables
    // doesn't accidentally resolve a release build's sibling debug binary.
    let is_debug_build = current_exe
        .as_ref()
        .and_then(|p| p.to_str())
        .map(|s| s.contains("target/debug"))
        .unwrap_or(false);

    if is_debug_build {
        if let Some(manifest_dir) = crate::env::cargo_manifest_dir() {
            let dev_path = PathBuf::from(manifest_dir)
                .parent()
                .and_then(|p| p.parent())
                .map(|p| p.join("target/debug/orcd"));
            if let Some(path) = dev_path {
                if path.exists() {
                    return Ok(path);
                }
            }
        }
    }

    if let Some(ref exe) = current_exe {
        if let Some(dir) = exe.parent() {
            let sibling = dir.join("orcd");
            if sibling.exists() {
                return Ok(sibling);
            }
        }
    }

    Ok(PathBuf::from("orcd"))
}

/// Socket path for the daemon's control connection.
pub fn daemon_socket() -> Result<PathBuf, ClientError> {
    Ok(orc_daemon::env::socket_path(&daemon_dir()?))
}

/// The daemon's state directory.
pub fn daemon_dir() -> Result<PathBuf, ClientError> {
    crate::env::state_dir().ok_or(ClientError::NoStateDir)
}

/// Read the daemon's pid from the lock file it writes on startup (the first
/// line of `orc.lock`; see `orc_daemon::lifecycle::LockGuard::write_pid`).
pub fn read_daemon_pid() -> Result<Option<u32>, ClientError> {
    let dir = daemon_dir()?;
    let lock_path = orc_daemon::env::lock_path(&dir);

    match std::fs::read_to_string(&lock_path) {
        Ok(content) => Ok(content.lines().next().and_then(|l| l.trim().parse().ok())),
        Err(_) => Ok(None),
    }
}

fn kill_signal(signal: &str, pid: u32) -> bool {
    Command::new("kill")
        .args([signal, &pid.to_string()])
        .stdin(std::process::Stdio::null())
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

pub fn process_exists(pid: u32) -> bool {
    kill_signal("-0", pid)
}

pub fn force_kill_daemon(pid: u32) -> bool {
    kill_signal("-9", pid)
}

/// Startup marker prefix the daemon writes to its log before anything else,
/// so a restart's log doesn't get confused with the previous run's tail.
const STARTUP_MARKER_PREFIX: &str = "starting orchestration daemon";

/// Read the daemon log from the last startup marker onward, looking for
/// errors logged during that startup attempt.
pub fn read_startup_error() -> Option<String> {
    let dir = daemon_dir().ok()?;
    let log_dir = orc_daemon::env::log_dir(&dir);
    let today = latest_log_file(&log_dir)?;
    let content = std::fs::read_to_string(today).ok()?;
    parse_startup_error(&content)
}

fn latest_log_file(log_dir: &Path) -> Option<PathBuf> {
    let mut entries: Vec<_> = std::fs::read_dir(log_dir).ok()?.filter_map(|e| e.ok()).collect();
    entries.sort_by_key(|e| e.file_name());
    entries.pop().map(|e| e.path())
}

fn parse_startup_error(content: &str) -> Option<String> {
    let start_pos = content.rfind(STARTUP_MARKER_PREFIX)?;
    let startup_log = &content[start_pos..];

    let errors: Vec<&str> =
        startup_log.lines().filter(|line| line.contains("ERROR") || line.contains("error")).collect();

    if errors.is_empty() {
        return None;
    }
    Some(errors.join("\n"))
}

/// Wrap an error with startup log info if available.
pub fn wrap_with_startup_error(err: ClientError) -> ClientError {
    if matches!(err, ClientError::DaemonStartFailed(_)) {
        return err;
    }
    match read_startup_error() {
        Some(startup_error) => ClientError::DaemonStartFailed(startup_error),
        None => err,
    }
}

/// Probe whether a Unix socket is accepting connections.
pub fn probe_socket(socket_path: &Path) -> bool {
    std::os::unix::net::UnixStream::connect(socket_path).is_ok()
}

/// Remove a stale socket file left behind by a daemon that crashed without
/// releasing its lock cleanly.
pub fn cleanup_stale_socket() -> Result<(), ClientError> {
    let dir = daemon_dir()?;
    let socket_path = orc_daemon::env::socket_path(&dir);

    match read_daemon_pid()? {
        Some(pid) if process_exists(pid) => {}
        _ => {
            let _ = std::fs::remove_file(&socket_path);
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "daemon_process_tests.rs"]
mod tests;
