use super::*;
use orc_core::DockerSpawnerConfig;
use tempfile::tempdir;

fn config() -> DockerSpawnerConfig {
    DockerSpawnerConfig {
        image: "acme/worker:latest".to_string(),
        memory_limit: Some("512m".to_string()),
        cpu_limit: None,
    }
}

#[tokio::test]
async fn is_available_is_false_when_runtime_binary_is_missing() {
    let spawner = SandboxedSpawner::with_runtime(config(), "this-runtime-does-not-exist");
    assert!(!spawner.is_available().await);
}

#[tokio::test]
async fn spawn_with_missing_runtime_reports_failure_not_error() {
    let dir = tempdir().unwrap();
    let spawner = SandboxedSpawner::with_runtime(config(), "this-runtime-does-not-exist");
    let request = SpawnRequest {
        command: "worker".to_string(),
        prompt_file: dir.path().join("prompt.md"),
        context_file: dir.path().join("session-context.json"),
        worktree_path: dir.path().to_path_buf(),
        env: vec![],
        use_pty: false,
    };
    let outcome = spawner.spawn(request).await.unwrap();
    assert!(!outcome.success);
    assert!(outcome.error.is_some());
}

#[tokio::test]
async fn stop_with_missing_runtime_is_an_error() {
    let spawner = SandboxedSpawner::with_runtime(config(), "this-runtime-does-not-exist");
    let spawn_id = orc_core::SpawnId::new("deadbeef".to_string());
    assert!(spawner.stop(&spawn_id).await.is_err());
}

#[tokio::test]
async fn get_status_with_missing_runtime_is_an_error() {
    let spawner = SandboxedSpawner::with_runtime(config(), "this-runtime-does-not-exist");
    let spawn_id = orc_core::SpawnId::new("deadbeef".to_string());
    assert!(spawner.get_status(&spawn_id).await.is_err());
}

#[test]
fn name_identifies_the_variant() {
    let spawner = SandboxedSpawner::new(config());
    assert_eq!(spawner.name(), "sandboxed");
}
