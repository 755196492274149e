use super::*;
use crate::state::AppState;
use orc_core::{Config, IssueRef, Mode, RepoConfig, Session, SessionStatus};
use orc_engine::LoopState;
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

fn session_with_mode(id: &str, number: u64, mode: Mode) -> Session {
    let now = chrono::Utc::now();
    Session {
        id: SessionId::new(id),
        issue: IssueRef { number, title: "x".into(), body: None },
        status: SessionStatus::Working,
        mode,
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

fn seed_session(state_dir: &std::path::Path, repo_key: &str, session: &Session) {
    let dir = state_dir.join("sessions").join(repo_key);
    let store = orc_storage::FileSessionStore::new(dir);
    store.save(session).unwrap();
}

#[tokio::test]
async fn driver_not_launched_for_unconfigured_repo() {
    let state_dir = TempDir::new().unwrap();
    let repo_dir = TempDir::new().unwrap();
    init_repo(repo_dir.path());
    let config = minimal_config(repo_dir.path());
    let app = AppState::build(state_dir.path().to_path_buf(), config).unwrap();

    spawn_driver_if_iterative(&app, RepoId::new("ghost"), SessionId::new("1"));

    assert!(app.loop_controllers.lock().is_empty());
    app.shutdown();
}

#[tokio::test]
async fn driver_not_launched_for_missing_session() {
    let state_dir = TempDir::new().unwrap();
    let repo_dir = TempDir::new().unwrap();
    init_repo(repo_dir.path());
    let config = minimal_config(repo_dir.path());
    let app = AppState::build(state_dir.path().to_path_buf(), config).unwrap();

    spawn_driver_if_iterative(&app, RepoId::new("demo"), SessionId::new("missing"));

    assert!(app.loop_controllers.lock().is_empty());
    app.shutdown();
}

#[tokio::test]
async fn driver_not_launched_for_non_iterative_mode() {
    let state_dir = TempDir::new().unwrap();
    let repo_dir = TempDir::new().unwrap();
    init_repo(repo_dir.path());
    let config = minimal_config(repo_dir.path());
    let session = session_with_mode("1", 1, Mode::UserDriven);
    seed_session(state_dir.path(), "demo", &session);
    let app = AppState::build(state_dir.path().to_path_buf(), config).unwrap();

    spawn_driver_if_iterative(&app, RepoId::new("demo"), session.id.clone());

    assert!(app.loop_controllers.lock().is_empty());
    app.shutdown();
}

#[tokio::test]
async fn driver_launch_marks_controller_running_and_is_idempotent() {
    let state_dir = TempDir::new().unwrap();
    let repo_dir = TempDir::new().unwrap();
    init_repo(repo_dir.path());
    let config = minimal_config(repo_dir.path());
    let session = session_with_mode("2", 2, Mode::Iterative);
    seed_session(state_dir.path(), "demo", &session);
    let app = AppState::build(state_dir.path().to_path_buf(), config).unwrap();

    spawn_driver_if_iterative(&app, RepoId::new("demo"), session.id.clone());

    let controller = app.loop_controller_for(&session.id);
    assert_eq!(controller.state(), LoopState::Running);

    // A second call while the controller is still running must not start
    // a second driver task (`controller.start()` fails `AlreadyRunning`);
    // the map still holds exactly the one entry created above.
    spawn_driver_if_iterative(&app, RepoId::new("demo"), session.id.clone());
    assert_eq!(app.loop_controllers.lock().len(), 1);

    app.shutdown();
}
