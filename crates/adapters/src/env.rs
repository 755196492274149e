// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the adapters crate.

use std::time::Duration;

fn parse_duration_ms(var: &str) -> Option<Duration> {
    std::env::var(var)
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
}

/// Session-file watcher fallback poll interval, used when the `notify`
/// backend is unavailable on the host (default: 5000ms).
pub fn watcher_poll_ms() -> Duration {
    parse_duration_ms("ORC_WATCHER_POLL_MS").unwrap_or(Duration::from_secs(5))
}

/// Process tracker liveness poll interval (default: every 3s).
pub fn process_tracker_poll_ms() -> Duration {
    parse_duration_ms("ORC_PROCESS_POLL_MS").unwrap_or(Duration::from_secs(3))
}

/// Subprocess availability probe timeout.
pub fn availability_probe_timeout() -> Duration {
    parse_duration_ms("ORC_PROBE_TIMEOUT_MS").unwrap_or(Duration::from_secs(5))
}
