use super::*;
use orc_core::RepoConfig;
use tempfile::TempDir;

fn minimal_config(repo_path: &std::path::Path) -> Config {
    let mut config = Config::default();
    config.repos.insert(
        "demo".into(),
        RepoConfig {
            path: repo_path.to_path_buf(),
            github_owner: None,
            github_repo: None,
            base_branch: None,
            worktree_root: None,
            worktree_prefix: "issue-".into(),
            default_mode: None,
            cli_command: None,
            hooks: HashMap::new(),
        },
    );
    config
}

#[tokio::test]
async fn build_creates_one_service_and_watcher_per_repo() {
    let state_dir = TempDir::new().unwrap();
    let repo_dir = TempDir::new().unwrap();
    let config = minimal_config(repo_dir.path());

    let app = AppState::build(state_dir.path().to_path_buf(), config).unwrap();
    assert_eq!(app.multi_repo.repo_ids().count(), 1);
    assert_eq!(app.watchers.len(), 1);
    assert!(state_dir.path().join("sessions").join("demo").is_dir());
    app.shutdown();
}

#[tokio::test]
async fn find_session_reports_not_found_for_unknown_id() {
    let state_dir = TempDir::new().unwrap();
    let repo_dir = TempDir::new().unwrap();
    let config = minimal_config(repo_dir.path());
    let app = AppState::build(state_dir.path().to_path_buf(), config).unwrap();

    let err = app.find_session(&SessionId::from("999")).unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));
    app.shutdown();
}

#[tokio::test]
async fn uptime_is_non_negative_immediately_after_build() {
    let state_dir = TempDir::new().unwrap();
    let repo_dir = TempDir::new().unwrap();
    let config = minimal_config(repo_dir.path());
    let app = AppState::build(state_dir.path().to_path_buf(), config).unwrap();
    // uptime_secs truncates to whole seconds, so 0 is the expected value
    // immediately after construction.
    assert_eq!(app.uptime_secs(), 0);
    app.shutdown();
}
