use super::*;

#[test]
fn process_exists_true_for_self() {
    assert!(process_exists(std::process::id()));
}

#[test]
fn process_exists_false_for_unlikely_pid() {
    assert!(!process_exists(u32::MAX - 1));
}

#[test]
fn parse_startup_error_finds_error_lines_after_marker() {
    let log = "2026-01-01 INFO stray line before any daemon ever started\n\
               2026-01-02 INFO starting orchestration daemon\n\
               2026-01-02 ERROR failed to bind socket: address in use\n";
    let found = parse_startup_error(log).unwrap();
    assert!(found.contains("failed to bind socket"));
}

#[test]
fn parse_startup_error_none_when_marker_missing() {
    assert!(parse_startup_error("no markers here\n").is_none());
}

#[test]
fn parse_startup_error_none_when_startup_was_clean() {
    let log = "2026-01-02 INFO starting orchestration daemon\n\
               2026-01-02 INFO daemon ready\n";
    assert!(parse_startup_error(log).is_none());
}

#[test]
fn probe_socket_false_for_nonexistent_path() {
    assert!(!probe_socket(std::path::Path::new("/tmp/orc-daemon-process-tests-no-such.sock")));
}
