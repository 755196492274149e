// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! CLI-specific environment variable overrides, mirroring the daemon's own
//! `orc_daemon::env` module so the two crates agree on state-directory
//! resolution without the CLI depending on daemon-internal helpers.

use std::path::PathBuf;

/// Mirrors `orc_daemon::env::state_dir` exactly: both processes must agree
/// on where the socket, lock, and version marker live.
pub fn state_dir() -> Option<PathBuf> {
    if let Ok(dir) = std::env::var("ORC_STATE_DIR") {
        return Some(PathBuf::from(dir));
    }
    dirs::home_dir().map(|home| home.join(".orchestration"))
}

/// Override for the `orcd` binary path, mainly for tests that run against a
/// freshly built binary outside `$PATH`.
pub fn daemon_binary() -> Option<String> {
    std::env::var("ORC_DAEMON_BINARY").ok()
}

pub fn cargo_manifest_dir() -> Option<String> {
    std::env::var("CARGO_MANIFEST_DIR").ok()
}
