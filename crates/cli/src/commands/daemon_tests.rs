// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serial_test::serial;
use tempfile::tempdir;

#[test]
fn format_uptime_seconds_only() {
    assert_eq!(format_uptime(42), "42s");
}

#[test]
fn format_uptime_minutes_and_seconds() {
    assert_eq!(format_uptime(125), "2m 5s");
}

#[test]
fn format_uptime_hours_minutes_seconds() {
    assert_eq!(format_uptime(3725), "1h 2m 5s");
}

#[test]
#[serial]
fn current_log_path_none_when_log_dir_missing() {
    let state_dir = tempdir().unwrap();
    std::env::set_var("ORC_STATE_DIR", state_dir.path());
    assert!(current_log_path().unwrap().is_none());
}

#[test]
#[serial]
fn current_log_path_picks_last_by_filename() {
    let state_dir = tempdir().unwrap();
    std::env::set_var("ORC_STATE_DIR", state_dir.path());

    let log_dir = state_dir.path().join("logs");
    std::fs::create_dir_all(&log_dir).unwrap();
    std::fs::write(log_dir.join("orcd.log.2026-01-01"), "old\n").unwrap();
    std::fs::write(log_dir.join("orcd.log.2026-01-02"), "new\n").unwrap();

    let found = current_log_path().unwrap().unwrap();
    assert_eq!(found.file_name().unwrap().to_str().unwrap(), "orcd.log.2026-01-02");
}

#[test]
fn read_last_lines_truncates_to_requested_count() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("orcd.log");
    std::fs::write(&path, "one\ntwo\nthree\nfour\n").unwrap();

    let tail = read_last_lines(&path, 2).unwrap();
    assert_eq!(tail, "three\nfour");
}
