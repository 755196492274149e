use super::*;
use tempfile::tempdir;

fn base_request(worktree: &std::path::Path) -> SpawnRequest {
    SpawnRequest {
        command: "true".to_string(),
        prompt_file: worktree.join("prompt.md"),
        context_file: worktree.join("session-context.json"),
        worktree_path: worktree.to_path_buf(),
        env: vec![],
        use_pty: false,
    }
}

#[tokio::test]
async fn spawn_plain_process_reports_success_and_running_status() {
    let dir = tempdir().unwrap();
    let spawner = HeadlessSpawner::new();
    let outcome = spawner.spawn(base_request(dir.path())).await.unwrap();
    assert!(outcome.success);

    // `true` exits almost immediately; poll until it's no longer running
    // rather than asserting a specific race-prone instant.
    for _ in 0..50 {
        let status = spawner.get_status(&outcome.spawn_id).await.unwrap();
        if !status.running {
            assert_eq!(status.exit_code, Some(0));
            return;
        }
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    }
    panic!("process never reported exit");
}

#[tokio::test]
async fn spawn_missing_binary_reports_failure_not_error() {
    let dir = tempdir().unwrap();
    let spawner = HeadlessSpawner::new();
    let mut request = base_request(dir.path());
    request.command = "this-binary-does-not-exist-anywhere".to_string();
    let outcome = spawner.spawn(request).await.unwrap();
    assert!(!outcome.success);
    assert!(outcome.error.is_some());
}

#[tokio::test]
async fn stop_unknown_spawn_id_reports_not_stopped() {
    let spawner = HeadlessSpawner::new();
    let bogus = orc_core::SpawnId::new("does-not-exist".to_string());
    let result = spawner.stop(&bogus).await.unwrap();
    assert!(!result.stopped);
}

#[tokio::test]
async fn get_status_unknown_spawn_id_is_an_error() {
    let spawner = HeadlessSpawner::new();
    let bogus = orc_core::SpawnId::new("does-not-exist".to_string());
    assert!(spawner.get_status(&bogus).await.is_err());
}

#[tokio::test]
async fn stop_sleeping_process_kills_it() {
    let dir = tempdir().unwrap();
    let spawner = HeadlessSpawner::new();
    let mut request = base_request(dir.path());
    request.command = "sleep".to_string();
    request.prompt_file = "30".into();
    let outcome = spawner.spawn(request).await.unwrap();
    assert!(outcome.success);

    let result = spawner.stop(&outcome.spawn_id).await.unwrap();
    assert!(result.stopped);
}

#[tokio::test]
async fn is_available_reports_true_when_true_binary_resolves() {
    let spawner = HeadlessSpawner::new();
    assert!(spawner.is_available().await);
}

#[tokio::test]
async fn ring_buffer_is_none_for_plain_non_pty_spawn() {
    let dir = tempdir().unwrap();
    let spawner = HeadlessSpawner::new();
    let outcome = spawner.spawn(base_request(dir.path())).await.unwrap();
    assert!(spawner.ring_buffer(&outcome.spawn_id).is_none());
}
