use super::*;
use orc_core::{IssueRef, Mode, RepoConfig, SessionStatus};
use std::collections::HashMap;
use std::process::Command as StdCommand;
use tempfile::TempDir;

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

fn minimal_config(repo_path: &std::path::Path) -> Config {
    let mut config = Config::default();
    config.repos.insert(
        "demo".into(),
        RepoConfig {
            path: repo_path.to_path_buf(),
            github_owner: None,
            github_repo: None,
            base_branch: Some("main".into()),
            worktree_root: None,
            worktree_prefix: "issue-".into(),
            default_mode: None,
            cli_command: None,
            hooks: HashMap::new(),
        },
    );
    config
}

fn dummy_session(number: u64, status: SessionStatus) -> Session {
    let now = chrono::Utc::now();
    Session {
        id: SessionId::new(number.to_string()),
        issue: IssueRef { number, title: "x".into(), body: None },
        status,
        mode: Mode::UserDriven,
        repo: RepoId::new("demo"),
        branch: format!("issue-{number}"),
        worktree_path: std::path::PathBuf::from("/tmp/nonexistent"),
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
        legacy_issue_number: None,
    }
}

#[test]
fn filter_sorted_drops_terminal_unless_all() {
    let sessions = vec![
        dummy_session(7, SessionStatus::Working),
        dummy_session(3, SessionStatus::Complete),
        dummy_session(5, SessionStatus::Stuck),
    ];

    let active = filter_sorted(sessions.clone(), false);
    assert_eq!(active.iter().map(|s| s.issue.number).collect::<Vec<_>>(), vec![5, 7]);

    let all = filter_sorted(sessions, true);
    assert_eq!(all.iter().map(|s| s.issue.number).collect::<Vec<_>>(), vec![3, 5, 7]);
}

#[test]
fn unknown_repo_message_names_the_repo() {
    let resp = unknown_repo(&RepoId::new("ghost"));
    match resp {
        Response::Error { message } => assert!(message.contains("ghost")),
        other => panic!("expected Error, got {other:?}"),
    }
}

#[tokio::test]
async fn dispatch_list_on_unconfigured_repo_returns_error() {
    let state_dir = TempDir::new().unwrap();
    let repo_dir = TempDir::new().unwrap();
    init_repo(repo_dir.path());
    let config = minimal_config(repo_dir.path());
    let app = AppState::build(state_dir.path().to_path_buf(), config).unwrap();

    let resp = dispatch(&app, Request::List { repo: Some(RepoId::new("ghost")), all: false }).await;
    assert!(matches!(resp, Response::Error { .. }));
    app.shutdown();
}

#[tokio::test]
async fn dispatch_list_on_fresh_state_is_empty() {
    let state_dir = TempDir::new().unwrap();
    let repo_dir = TempDir::new().unwrap();
    init_repo(repo_dir.path());
    let config = minimal_config(repo_dir.path());
    let app = AppState::build(state_dir.path().to_path_buf(), config).unwrap();

    let resp = dispatch(&app, Request::List { repo: None, all: true }).await;
    match resp {
        Response::Sessions { sessions } => assert!(sessions.is_empty()),
        other => panic!("expected Sessions, got {other:?}"),
    }
    app.shutdown();
}

#[tokio::test]
async fn dispatch_heartbeat_unknown_session_reports_not_found() {
    let state_dir = TempDir::new().unwrap();
    let repo_dir = TempDir::new().unwrap();
    init_repo(repo_dir.path());
    let config = minimal_config(repo_dir.path());
    let app = AppState::build(state_dir.path().to_path_buf(), config).unwrap();

    let resp = dispatch(&app, Request::Heartbeat { id: SessionId::new("999") }).await;
    match resp {
        Response::Error { message } => assert!(message.contains("999")),
        other => panic!("expected Error, got {other:?}"),
    }
    app.shutdown();
}

#[tokio::test]
async fn dispatch_orphans_on_fresh_state_is_empty() {
    let state_dir = TempDir::new().unwrap();
    let repo_dir = TempDir::new().unwrap();
    init_repo(repo_dir.path());
    let config = minimal_config(repo_dir.path());
    let app = AppState::build(state_dir.path().to_path_buf(), config).unwrap();

    let resp = dispatch(&app, Request::Orphans).await;
    match resp {
        Response::Orphans { groups } => assert!(groups.is_empty()),
        other => panic!("expected Orphans, got {other:?}"),
    }
    app.shutdown();
}
