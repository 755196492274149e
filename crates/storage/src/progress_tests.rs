// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use orc_core::SessionId;
use tempfile::tempdir;

fn entry(completed: u32) -> ProgressEntry {
    ProgressEntry {
        timestamp: chrono::Utc::now(),
        session_id: SessionId::new("42"),
        issue_number: 42,
        iteration: Some(1),
        total_tasks: 3,
        completed_tasks: completed,
        status: "task_done".into(),
        message: None,
    }
}

#[test]
fn append_creates_log_when_absent() {
    let dir = tempdir().unwrap();
    let now = chrono::Utc::now();
    append_progress_entry(dir.path(), now, entry(1)).unwrap();

    let log = read_progress_log(dir.path()).unwrap().unwrap();
    assert_eq!(log.entries.len(), 1);
    assert_eq!(log.created_at, now);
    assert_eq!(log.updated_at, now);
}

#[test]
fn append_is_append_only_and_refreshes_updated_at() {
    let dir = tempdir().unwrap();
    let t0 = chrono::Utc::now();
    let t1 = t0 + chrono::Duration::seconds(5);
    append_progress_entry(dir.path(), t0, entry(1)).unwrap();
    append_progress_entry(dir.path(), t1, entry(2)).unwrap();

    let log = read_progress_log(dir.path()).unwrap().unwrap();
    assert_eq!(log.entries.len(), 2);
    assert_eq!(log.created_at, t0);
    assert_eq!(log.updated_at, t1);
    assert_eq!(log.entries[1].completed_tasks, 2);
}

#[test]
fn read_missing_log_returns_none() {
    let dir = tempdir().unwrap();
    assert!(read_progress_log(dir.path()).unwrap().is_none());
}
