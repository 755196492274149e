use super::*;
use orc_core::{IssueRef, Mode, RepoId, SessionId, SessionStatus};
use parking_lot::Mutex as StdMutex;
use std::sync::Arc;
use tempfile::tempdir;

fn sample_session(id: &str) -> Session {
    let now = chrono::Utc::now();
    Session {
        id: SessionId::new(id),
        issue: IssueRef {
            number: 7,
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
        iteration: Some(1),
        review_cycle: None,
        last_review_feedback: None,
        previous_status: None,
        deletion_error: None,
        orphaned_worktree_path: None,
        legacy_issue_number: None,
    }
}

fn write_session_file(dir: &Path, id: &str) {
    let session = sample_session(id);
    let path = dir.join(format!("work-{id}.json"));
    std::fs::write(path, serde_json::to_string(&session).unwrap()).unwrap();
}

#[test]
fn rescan_detects_added_file() {
    let dir = tempdir().unwrap();
    write_session_file(dir.path(), "42");

    let watcher = SessionWatcher::new(dir.path());
    let events = watcher.rescan_once();
    assert_eq!(events.len(), 1);
    assert!(matches!(events[0], ChangeEvent::Added { .. }));
    assert_eq!(events[0].session_id().as_str(), "42");
}

#[test]
fn rescan_ignores_non_session_files() {
    let dir = tempdir().unwrap();
    std::fs::write(dir.path().join("notes.txt"), "hello").unwrap();
    write_session_file(dir.path(), "42");

    let watcher = SessionWatcher::new(dir.path());
    let events = watcher.rescan_once();
    assert_eq!(events.len(), 1);
}

#[test]
fn rescan_twice_with_no_change_reports_nothing() {
    let dir = tempdir().unwrap();
    write_session_file(dir.path(), "42");

    let watcher = SessionWatcher::new(dir.path());
    assert_eq!(watcher.rescan_once().len(), 1);
    assert_eq!(watcher.rescan_once().len(), 0);
}

#[test]
fn rescan_detects_update_after_mtime_changes() {
    let dir = tempdir().unwrap();
    write_session_file(dir.path(), "42");
    let watcher = SessionWatcher::new(dir.path());
    watcher.rescan_once();

    // Ensure the modification time actually advances on coarse-grained
    // filesystems.
    std::thread::sleep(std::time::Duration::from_millis(20));
    let mut session = sample_session("42");
    session.status = SessionStatus::Stuck;
    std::fs::write(
        dir.path().join("work-42.json"),
        serde_json::to_string(&session).unwrap(),
    )
    .unwrap();

    let events = watcher.rescan_once();
    assert_eq!(events.len(), 1);
    assert!(matches!(events[0], ChangeEvent::Updated { .. }));
}

#[test]
fn rescan_detects_removal() {
    let dir = tempdir().unwrap();
    write_session_file(dir.path(), "42");
    let watcher = SessionWatcher::new(dir.path());
    watcher.rescan_once();

    std::fs::remove_file(dir.path().join("work-42.json")).unwrap();
    let events = watcher.rescan_once();
    assert_eq!(events.len(), 1);
    assert!(matches!(events[0], ChangeEvent::Removed { .. }));
    assert_eq!(events[0].session_id().as_str(), "42");
}

#[test]
fn rescan_drops_unparsable_file_without_emitting() {
    let dir = tempdir().unwrap();
    std::fs::write(dir.path().join("work-broken.json"), "{not json").unwrap();

    let watcher = SessionWatcher::new(dir.path());
    let events = watcher.rescan_once();
    assert!(events.is_empty());
}

#[test]
fn callbacks_fire_in_registration_order_and_a_panic_does_not_stop_delivery() {
    let dir = tempdir().unwrap();
    write_session_file(dir.path(), "42");

    let watcher = SessionWatcher::new(dir.path());
    let order = Arc::new(StdMutex::new(Vec::new()));

    let order_a = Arc::clone(&order);
    watcher.on_event(move |_| {
        order_a.lock().push("a");
        panic!("simulated callback failure");
    });
    let order_b = Arc::clone(&order);
    watcher.on_event(move |_| order_b.lock().push("b"));

    watcher.rescan_once();
    assert_eq!(*order.lock(), vec!["a", "b"]);
}

#[test]
fn session_id_from_filename_strips_prefix_and_suffix() {
    assert_eq!(
        session_id_from_filename("work-abc123.json"),
        Some("abc123".to_string())
    );
    assert_eq!(session_id_from_filename("notes.txt"), None);
}
