// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tests for daemon client behavior.

use super::{ClientError, DaemonClient};
use crate::client_lifecycle::log_connection_error;
use crate::daemon_process::{cleanup_stale_socket, daemon_dir, probe_socket};
use serial_test::serial;
use std::fs;
use tempfile::tempdir;

/// `connect()` must not delete any state file on a failed connection — it
/// only reports `DaemonNotRunning`. Cleanup is `cleanup_stale_socket`'s job,
/// invoked explicitly by `for_action`, never implicitly by a query.
#[test]
#[serial]
fn connect_does_not_delete_lock_file() {
    let state_dir = tempdir().unwrap();
    std::env::set_var("ORC_STATE_DIR", state_dir.path());

    let dir = daemon_dir().unwrap();
    fs::create_dir_all(&dir).unwrap();
    let lock_path = dir.join("orc.lock");
    fs::write(&lock_path, "12345\n").unwrap();

    let result = DaemonClient::connect();
    assert!(matches!(result, Err(ClientError::DaemonNotRunning)));
    assert!(lock_path.exists(), "connect() must not delete the lock file");
}

#[test]
#[serial]
fn log_connection_error_creates_log_file() {
    let state_dir = tempdir().unwrap();
    std::env::set_var("ORC_STATE_DIR", state_dir.path());

    let error = ClientError::DaemonNotRunning;
    log_connection_error(&error);

    let log_path = state_dir.path().join("cli.log");
    assert!(log_path.exists(), "cli.log should be created");

    let content = fs::read_to_string(&log_path).unwrap();
    assert!(content.contains("pid="), "log should contain pid");
    assert!(content.contains("cwd="), "log should contain cwd");
    assert!(content.contains("ORC_STATE_DIR="), "log should contain ORC_STATE_DIR");
    assert!(content.contains("socket="), "log should contain socket path");
    assert!(content.contains("daemon not running"), "log should contain error message");
}

#[test]
#[serial]
fn log_connection_error_includes_socket_path() {
    let state_dir = tempdir().unwrap();
    std::env::set_var("ORC_STATE_DIR", state_dir.path());

    let error = ClientError::DaemonNotRunning;
    log_connection_error(&error);

    let log_path = state_dir.path().join("cli.log");
    let content = fs::read_to_string(&log_path).unwrap();

    let expected_socket = state_dir.path().join("orc.sock");
    assert!(
        content.contains(&expected_socket.display().to_string()),
        "log should contain expected socket path"
    );
}

/// A socket file that isn't a real Unix socket (e.g. left behind by a
/// crashed daemon) is removed when no live process holds its lock.
#[test]
#[serial]
fn stale_socket_with_dead_lock_pid_is_cleaned_up() {
    let state_dir = tempdir().unwrap();
    std::env::set_var("ORC_STATE_DIR", state_dir.path());

    let socket_path = state_dir.path().join("orc.sock");
    fs::write(&socket_path, "").unwrap();

    let mut child = std::process::Command::new("true").spawn().unwrap();
    let dead_pid = child.id();
    child.wait().unwrap();

    let lock_path = state_dir.path().join("orc.lock");
    fs::write(&lock_path, format!("{dead_pid}\n")).unwrap();

    assert!(!probe_socket(&socket_path));

    cleanup_stale_socket().unwrap();

    assert!(!socket_path.exists(), "stale socket should be removed");
}

/// With no lock file at all, a leftover socket is unconditionally stale.
#[test]
#[serial]
fn stale_socket_with_no_lock_file_is_cleaned_up() {
    let state_dir = tempdir().unwrap();
    std::env::set_var("ORC_STATE_DIR", state_dir.path());

    let socket_path = state_dir.path().join("orc.sock");
    fs::write(&socket_path, "").unwrap();

    let lock_path = state_dir.path().join("orc.lock");
    assert!(!lock_path.exists());

    cleanup_stale_socket().unwrap();

    assert!(!socket_path.exists(), "stale socket should be removed");
}

/// A socket whose lock file names this process's own pid is left alone —
/// the process is alive, so the socket (probe failure notwithstanding, e.g.
/// mid-bind) is not declared stale.
#[test]
#[serial]
fn socket_with_live_lock_pid_is_not_removed() {
    let state_dir = tempdir().unwrap();
    std::env::set_var("ORC_STATE_DIR", state_dir.path());

    let socket_path = state_dir.path().join("orc.sock");
    fs::write(&socket_path, "").unwrap();

    let lock_path = state_dir.path().join("orc.lock");
    fs::write(&lock_path, format!("{}\n", std::process::id())).unwrap();

    cleanup_stale_socket().unwrap();

    assert!(socket_path.exists(), "socket backed by a live pid should be kept");
}
