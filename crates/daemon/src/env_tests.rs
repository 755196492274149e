use super::*;
use serial_test::serial;

#[test]
#[serial]
fn state_dir_honors_override() {
    std::env::set_var("ORC_STATE_DIR", "/tmp/orc-env-test-state");
    assert_eq!(state_dir(), Some(PathBuf::from("/tmp/orc-env-test-state")));
    std::env::remove_var("ORC_STATE_DIR");
}

#[test]
fn socket_path_defaults_under_state_dir() {
    std::env::remove_var("ORC_SOCKET_PATH");
    let dir = PathBuf::from("/tmp/orc-env-test");
    assert_eq!(socket_path(&dir), dir.join("orc.sock"));
}

#[test]
fn lock_and_version_paths_are_siblings_of_socket() {
    let dir = PathBuf::from("/tmp/orc-env-test");
    assert_eq!(lock_path(&dir), dir.join("orc.lock"));
    assert_eq!(version_path(&dir), dir.join("orc.version"));
}

#[test]
fn default_intervals_are_positive() {
    std::env::remove_var("ORC_ORPHAN_SWEEP_MS");
    std::env::remove_var("ORC_STALENESS_SWEEP_MS");
    std::env::remove_var("ORC_IPC_TIMEOUT_MS");
    assert!(orphan_sweep_interval().as_secs() > 0);
    assert!(staleness_sweep_interval().as_secs() > 0);
    assert!(ipc_timeout().as_millis() > 0);
}
