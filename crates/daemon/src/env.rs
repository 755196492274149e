// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon-specific environment variable overrides, mirroring the style of
//! `orc_adapters::env`: every knob has a sane default and an `ORC_`-prefixed
//! override for tests and operators.

use std::path::PathBuf;
use std::time::Duration;

fn parse_ms(var: &str) -> Option<Duration> {
    std::env::var(var).ok().and_then(|s| s.parse::<u64>().ok()).map(Duration::from_millis)
}

/// Root of the daemon's state directory, default `~/.orchestration`.
/// Overridable so tests never touch a real home directory.
pub fn state_dir() -> Option<PathBuf> {
    if let Ok(dir) = std::env::var("ORC_STATE_DIR") {
        return Some(PathBuf::from(dir));
    }
    dirs::home_dir().map(|home| home.join(".orchestration"))
}

/// Path to the Unix control socket, default `<state_dir>/orc.sock`.
pub fn socket_path(state_dir: &std::path::Path) -> PathBuf {
    std::env::var("ORC_SOCKET_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| state_dir.join("orc.sock"))
}

/// Path to the single-instance lock file, default `<state_dir>/orc.lock`.
pub fn lock_path(state_dir: &std::path::Path) -> PathBuf {
    state_dir.join("orc.lock")
}

/// Path to the daemon's version marker, default `<state_dir>/orc.version`.
pub fn version_path(state_dir: &std::path::Path) -> PathBuf {
    state_dir.join("orc.version")
}

/// Path to the daemon's rolling log file directory.
pub fn log_dir(state_dir: &std::path::Path) -> PathBuf {
    state_dir.join("logs")
}

/// Interval between orphan-detection sweeps. Default 5 minutes.
pub fn orphan_sweep_interval() -> Duration {
    parse_ms("ORC_ORPHAN_SWEEP_MS").unwrap_or(Duration::from_secs(300))
}

/// Interval between staleness sweeps (sessions with no heartbeat for
/// longer than `Session::is_stale`'s 90s budget). Default 30s.
pub fn staleness_sweep_interval() -> Duration {
    parse_ms("ORC_STALENESS_SWEEP_MS").unwrap_or(Duration::from_secs(30))
}

/// IPC read/write timeout for one control-socket request/response.
pub fn ipc_timeout() -> Duration {
    parse_ms("ORC_IPC_TIMEOUT_MS").unwrap_or(crate::protocol_wire::DEFAULT_TIMEOUT)
}

/// Delay between iterations of the ralph ("iterative") loop driver,
/// falling back to the configured `ralph.iteration_delay_ms` when unset.
pub fn iteration_poll_interval() -> Duration {
    parse_ms("ORC_ITERATION_POLL_MS").unwrap_or(Duration::from_millis(1000))
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
