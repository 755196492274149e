// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use orc_adapters::{FakeSpawner, VcsAdapter};
use orc_core::FakeClock;
use std::process::Command as StdCommand;
use std::sync::Arc;
use tempfile::tempdir;

fn init_repo(dir: &std::path::Path) {
    let run = |args: &[&str]| {
        let status = StdCommand::new("git").current_dir(dir).args(args).status().unwrap();
        assert!(status.success(), "git {args:?} failed");
    };
    run(&["init", "-q", "-b", "main"]);
    run(&["config", "user.email", "test@example.com"]);
    run(&["config", "user.name", "Test"]);
    std::fs::write(dir.join("README.md"), "hello\n").unwrap();
    run(&["add", "."]);
    run(&["commit", "-q", "-m", "initial"]);
}

fn service(
    repo_root: &std::path::Path,
    spawner: Arc<FakeSpawner>,
) -> (SessionService<FakeClock>, tempfile::TempDir) {
    let sessions_dir = tempdir().unwrap();
    let repo = RepoConfig {
        path: repo_root.to_path_buf(),
        github_owner: None,
        github_repo: None,
        base_branch: Some("main".to_string()),
        worktree_root: None,
        worktree_prefix: "issue-".to_string(),
        default_mode: None,
        cli_command: None,
        hooks: Default::default(),
    };
    let svc = SessionService::new(
        RepoId::new("demo"),
        repo,
        "orch".to_string(),
        FileSessionStore::new(sessions_dir.path()),
        VcsAdapter::new(),
        spawner,
        HookExecutor::default(),
        FakeClock::default(),
    );
    (svc, sessions_dir)
}

fn issue(number: u64) -> IssueRef {
    IssueRef {
        number,
        title: "Fix the thing".to_string(),
        body: None,
    }
}

#[tokio::test]
async fn spawn_creates_worktree_record_and_context() {
    let repo = tempdir().unwrap();
    init_repo(repo.path());
    let spawner = Arc::new(FakeSpawner::new());
    let (svc, _sessions) = service(repo.path(), spawner.clone());

    let session = svc
        .spawn(issue(42), Mode::UserDriven, "do the thing", vec![])
        .await
        .unwrap();

    assert_eq!(session.status, SessionStatus::Working);
    assert_eq!(session.branch, "issue-42");
    assert!(session.worktree_path.join("README.md").exists());
    assert!(session.worktree_path.join(".claude/session-prompt.md").exists());
    assert!(session.worktree_path.join("session-context.json").exists());
    assert!(session.spawn_id.is_some());

    let expected_name = format!(
        "{}-issue-42",
        repo.path().file_name().unwrap().to_string_lossy()
    );
    assert_eq!(session.worktree_path.file_name().unwrap().to_string_lossy(), expected_name);

    let context_raw = std::fs::read_to_string(session.worktree_path.join("session-context.json")).unwrap();
    assert!(context_raw.contains("orch update --id 42"));

    let calls = spawner.calls();
    assert_eq!(calls.len(), 1);
}

#[tokio::test]
async fn spawn_duplicate_issue_is_a_conflict() {
    let repo = tempdir().unwrap();
    init_repo(repo.path());
    let spawner = Arc::new(FakeSpawner::new());
    let (svc, _sessions) = service(repo.path(), spawner);

    svc.spawn(issue(42), Mode::UserDriven, "p", vec![]).await.unwrap();
    let err = svc.spawn(issue(42), Mode::UserDriven, "p", vec![]).await.unwrap_err();
    assert!(matches!(err, ServiceError::Conflict(_)));
}

#[tokio::test]
async fn spawn_rolls_back_worktree_when_spawner_unavailable() {
    let repo = tempdir().unwrap();
    init_repo(repo.path());
    let spawner = Arc::new(FakeSpawner::new());
    spawner.set_should_fail(true);
    let (svc, _sessions) = service(repo.path(), spawner);

    let err = svc.spawn(issue(42), Mode::UserDriven, "p", vec![]).await.unwrap_err();
    assert!(matches!(err, ServiceError::ExternalFailure(_, _)));

    let id = SessionId::new("42");
    assert!(svc.get(&id).is_err());
}

#[tokio::test]
async fn list_sorts_by_issue_number_and_skips_vanished_worktrees() {
    let repo = tempdir().unwrap();
    init_repo(repo.path());
    let spawner = Arc::new(FakeSpawner::new());
    let (svc, _sessions) = service(repo.path(), spawner);

    svc.spawn(issue(7), Mode::UserDriven, "p", vec![]).await.unwrap();
    let s2 = svc.spawn(issue(2), Mode::UserDriven, "p", vec![]).await.unwrap();

    std::fs::remove_dir_all(&s2.worktree_path).unwrap();

    let listed = svc.list().unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].issue.number, 7);

    // The vanished-worktree record isn't just filtered out of this call's
    // result, it's gone from the store: a later restore of the worktree
    // path (e.g. an orphan-recovery flow) can't resurrect it.
    assert!(svc.get(&s2.id).is_err());
}

#[tokio::test]
async fn update_validates_transitions_and_requires_reason_for_stuck() {
    let repo = tempdir().unwrap();
    init_repo(repo.path());
    let spawner = Arc::new(FakeSpawner::new());
    let (svc, _sessions) = service(repo.path(), spawner);
    let session = svc.spawn(issue(42), Mode::UserDriven, "p", vec![]).await.unwrap();

    let err = svc.update(&session.id, SessionStatus::Stuck, None, None).unwrap_err();
    assert!(matches!(err, ServiceError::Conflict(_)));

    let updated = svc
        .update(&session.id, SessionStatus::Stuck, Some("blocked on review".into()), None)
        .unwrap();
    assert_eq!(updated.status, SessionStatus::Stuck);
    assert_eq!(updated.stuck_reason.as_deref(), Some("blocked on review"));

    let err = svc.update(&session.id, SessionStatus::PrReady, None, None).unwrap_err();
    assert!(matches!(err, ServiceError::Conflict(_)));
}

#[tokio::test]
async fn pause_and_resume_are_idempotent() {
    let repo = tempdir().unwrap();
    init_repo(repo.path());
    let spawner = Arc::new(FakeSpawner::new());
    let (svc, _sessions) = service(repo.path(), spawner);
    let session = svc.spawn(issue(42), Mode::UserDriven, "p", vec![]).await.unwrap();

    let paused = svc.pause(&session.id).unwrap();
    assert_eq!(paused.status, SessionStatus::Paused);
    let paused_again = svc.pause(&session.id).unwrap();
    assert_eq!(paused_again.status, SessionStatus::Paused);

    let resumed = svc.resume(&session.id).unwrap();
    assert_eq!(resumed.status, SessionStatus::Working);
    let resumed_again = svc.resume(&session.id).unwrap();
    assert_eq!(resumed_again.status, SessionStatus::Working);
}

#[tokio::test]
async fn restart_rotates_spawn_id_without_forcing_a_status_change() {
    let repo = tempdir().unwrap();
    init_repo(repo.path());
    let spawner = Arc::new(FakeSpawner::new());
    let (svc, _sessions) = service(repo.path(), spawner);
    let session = svc.spawn(issue(42), Mode::UserDriven, "p", vec![]).await.unwrap();
    let first_spawn_id = session.spawn_id.clone().unwrap();

    let restarted = svc.restart(&session.id, Some(3)).await.unwrap();
    assert_ne!(restarted.spawn_id.unwrap(), first_spawn_id);
    assert_eq!(restarted.iteration, Some(3));
    assert_eq!(restarted.status, SessionStatus::Working);
}

#[tokio::test]
async fn restart_on_terminal_session_is_a_conflict() {
    let repo = tempdir().unwrap();
    init_repo(repo.path());
    let spawner = Arc::new(FakeSpawner::new());
    let (svc, _sessions) = service(repo.path(), spawner);
    let session = svc.spawn(issue(42), Mode::UserDriven, "p", vec![]).await.unwrap();
    svc.update(&session.id, SessionStatus::Shipping, None, None).unwrap();
    svc.update(&session.id, SessionStatus::ReviewsInProgress, None, None).unwrap();
    svc.update(&session.id, SessionStatus::PrReady, None, None).unwrap();
    svc.update(&session.id, SessionStatus::Complete, None, None).unwrap();

    let err = svc.restart(&session.id, None).await.unwrap_err();
    assert!(matches!(err, ServiceError::Conflict(_)));
}

#[tokio::test]
async fn delete_with_dirty_worktree_without_force_fails_and_records_orphan() {
    let repo = tempdir().unwrap();
    init_repo(repo.path());
    let spawner = Arc::new(FakeSpawner::new());
    let (svc, _sessions) = service(repo.path(), spawner);
    let session = svc.spawn(issue(42), Mode::UserDriven, "p", vec![]).await.unwrap();

    std::fs::write(session.worktree_path.join("dirty.txt"), "x").unwrap();

    let result = svc.delete(&session.id, DeleteMode::FolderOnly, false).await.unwrap();
    assert!(!result.success);
    assert!(result.orphaned_worktree_path.is_some());

    let record = svc.get(&session.id).unwrap();
    assert_eq!(record.status, SessionStatus::DeletionFailed);
    assert_eq!(record.previous_status, Some(SessionStatus::Working));

    let rolled_back = svc.rollback_delete(&session.id).unwrap();
    assert_eq!(rolled_back.status, SessionStatus::Working);
    assert!(rolled_back.deletion_error.is_none());
}

#[tokio::test]
async fn delete_clean_worktree_removes_record_and_directory() {
    let repo = tempdir().unwrap();
    init_repo(repo.path());
    let spawner = Arc::new(FakeSpawner::new());
    let (svc, _sessions) = service(repo.path(), spawner);
    let session = svc.spawn(issue(42), Mode::UserDriven, "p", vec![]).await.unwrap();

    let result = svc.delete(&session.id, DeleteMode::FolderOnly, false).await.unwrap();
    assert!(result.success);
    assert!(!session.worktree_path.exists());
    assert!(svc.get(&session.id).is_err());
}

#[tokio::test]
async fn retry_delete_requires_deletion_failed_state() {
    let repo = tempdir().unwrap();
    init_repo(repo.path());
    let spawner = Arc::new(FakeSpawner::new());
    let (svc, _sessions) = service(repo.path(), spawner);
    let session = svc.spawn(issue(42), Mode::UserDriven, "p", vec![]).await.unwrap();

    let err = svc.retry_delete(&session.id, DeleteMode::FolderOnly).await.unwrap_err();
    assert!(matches!(err, ServiceError::Conflict(_)));
}

#[tokio::test]
async fn heartbeat_reports_pending_forwarded_message() {
    let repo = tempdir().unwrap();
    init_repo(repo.path());
    let spawner = Arc::new(FakeSpawner::new());
    let (svc, _sessions) = service(repo.path(), spawner);
    let session = svc.spawn(issue(42), Mode::UserDriven, "p", vec![]).await.unwrap();

    let result = svc.heartbeat(&session.id).unwrap();
    assert!(result.recorded);
    assert!(!result.has_message);

    svc.forward(&session.id, "please check the logs".to_string()).unwrap();
    let result = svc.heartbeat(&session.id).unwrap();
    assert!(result.has_message);

    let acked = svc.acknowledge(&session.id).unwrap();
    assert!(acked.forwarded_message.is_none());
}

#[tokio::test]
async fn detect_orphans_finds_unmatched_sibling_directory() {
    let repo = tempdir().unwrap();
    init_repo(repo.path());
    let spawner = Arc::new(FakeSpawner::new());
    let (svc, _sessions) = service(repo.path(), spawner);
    let session = svc.spawn(issue(42), Mode::UserDriven, "p", vec![]).await.unwrap();

    let repo_dir_name = repo.path().file_name().unwrap().to_string_lossy().into_owned();
    let orphan_dir = repo.path().parent().unwrap().join(format!("{repo_dir_name}-issue-99"));
    std::fs::create_dir_all(&orphan_dir).unwrap();

    let orphans = svc.detect_orphans().unwrap();
    assert_eq!(orphans, vec![orphan_dir.clone()]);
    assert!(!orphans.contains(&session.worktree_path));

    std::fs::remove_dir_all(&orphan_dir).unwrap();
}
