// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use orc_core::{IssueRef, Mode, RepoId, SessionStatus};
use tempfile::tempdir;

fn session(id: &str, issue: u64) -> Session {
    let now = chrono::Utc::now();
    Session {
        id: SessionId::new(id),
        issue: IssueRef {
            number: issue,
            title: "fix the thing".into(),
            body: None,
        },
        status: SessionStatus::Working,
        mode: Mode::Iterative,
        repo: RepoId::new("acme-widgets"),
        branch: format!("session/{id}"),
        worktree_path: format!("/tmp/worktrees/{id}").into(),
        started_at: now,
        last_heartbeat: now,
        stuck_reason: None,
        forwarded_message: None,
        pull_request_url: None,
        spawn_id: None,
        iteration: None,
        review_cycle: None,
        last_review_feedback: None,
        previous_status: None,
        deletion_error: None,
        orphaned_worktree_path: None,
    }
}

#[test]
fn save_then_load_round_trips() {
    let dir = tempdir().unwrap();
    let store = FileSessionStore::new(dir.path());
    let s = session("42", 42);
    store.save(&s).unwrap();

    let loaded = store.load(&s.id).unwrap().unwrap();
    assert_eq!(loaded.id, s.id);
    assert_eq!(loaded.issue, s.issue);
    assert_eq!(loaded.branch, s.branch);
}

#[test]
fn load_missing_returns_none() {
    let dir = tempdir().unwrap();
    let store = FileSessionStore::new(dir.path());
    assert!(store.load(&SessionId::new("999")).unwrap().is_none());
}

#[test]
fn file_is_named_work_id_json() {
    let dir = tempdir().unwrap();
    let store = FileSessionStore::new(dir.path());
    let s = session("42", 42);
    store.save(&s).unwrap();
    assert!(dir.path().join("work-42.json").exists());
}

#[test]
fn delete_removes_file_and_is_idempotent() {
    let dir = tempdir().unwrap();
    let store = FileSessionStore::new(dir.path());
    let s = session("42", 42);
    store.save(&s).unwrap();
    store.delete(&s.id).unwrap();
    assert!(!store.exists(&s.id));
    // Deleting again is not an error.
    store.delete(&s.id).unwrap();
}

#[test]
fn list_all_sorts_by_issue_number_ascending() {
    let dir = tempdir().unwrap();
    let store = FileSessionStore::new(dir.path());
    store.save(&session("9", 9)).unwrap();
    store.save(&session("1", 1)).unwrap();
    store.save(&session("5", 5)).unwrap();

    let all = store.list_all().unwrap();
    let numbers: Vec<u64> = all.iter().map(|s| s.issue.number).collect();
    assert_eq!(numbers, vec![1, 5, 9]);
}

#[test]
fn list_active_excludes_terminal_statuses() {
    let dir = tempdir().unwrap();
    let store = FileSessionStore::new(dir.path());
    let mut done = session("1", 1);
    done.status = SessionStatus::Complete;
    store.save(&done).unwrap();
    store.save(&session("2", 2)).unwrap();

    let active = store.list_active().unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].id.as_str(), "2");
}

#[test]
fn list_all_ignores_files_not_matching_naming_convention() {
    let dir = tempdir().unwrap();
    let store = FileSessionStore::new(dir.path());
    store.save(&session("1", 1)).unwrap();
    std::fs::write(dir.path().join("notes.txt"), "not a session").unwrap();
    std::fs::write(dir.path().join("work-broken.json"), "{not json").unwrap();

    let all = store.list_all().unwrap();
    assert_eq!(all.len(), 1);
}

#[test]
fn concurrent_saves_to_distinct_ids_both_survive() {
    let dir = tempdir().unwrap();
    let store = FileSessionStore::new(dir.path());
    let a = session("1", 1);
    let b = session("2", 2);
    store.save(&a).unwrap();
    store.save(&b).unwrap();

    let all = store.list_all().unwrap();
    assert_eq!(all.len(), 2);
}

#[test]
fn same_id_last_write_wins() {
    let dir = tempdir().unwrap();
    let store = FileSessionStore::new(dir.path());
    let mut s = session("1", 1);
    store.save(&s).unwrap();
    s.status = SessionStatus::Paused;
    store.save(&s).unwrap();

    let loaded = store.load(&s.id).unwrap().unwrap();
    assert_eq!(loaded.status, SessionStatus::Paused);
}
