// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Clock abstraction for testable time.
//!
//! All timestamps the orchestrator persists (`startedAt`, `lastHeartbeat`,
//! spawn times, hook durations) go through a [`Clock`] rather than calling
//! `SystemTime::now()`/`Instant::now()` directly, so staleness checks and
//! iteration-delay logic can be driven deterministically in tests.

use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

/// Source of the current time.
pub trait Clock: Clone + Send + Sync + 'static {
    /// Current time as milliseconds since the Unix epoch.
    fn epoch_ms(&self) -> u64;

    /// Current time as an ISO-8601 timestamp, the shape persisted for
    /// session record timestamps.
    fn now_iso(&self) -> DateTime<Utc> {
        let ms = self.epoch_ms() as i64;
        DateTime::from_timestamp_millis(ms).unwrap_or_else(Utc::now)
    }
}

/// Real wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn epoch_ms(&self) -> u64 {
        Utc::now().timestamp_millis() as u64
    }

    fn now_iso(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Deterministic clock for tests. Starts at a fixed epoch and only advances
/// when [`FakeClock::advance`] is called.
#[derive(Debug, Clone)]
pub struct FakeClock {
    millis: Arc<AtomicI64>,
}

impl FakeClock {
    /// Create a fake clock fixed at the given epoch milliseconds.
    pub fn new(epoch_ms: i64) -> Self {
        Self {
            millis: Arc::new(AtomicI64::new(epoch_ms)),
        }
    }

    /// Advance the clock by the given number of milliseconds.
    pub fn advance(&self, ms: i64) {
        self.millis.fetch_add(ms, Ordering::SeqCst);
    }

    /// Set the clock to an absolute epoch-millisecond value.
    pub fn set(&self, epoch_ms: i64) {
        self.millis.store(epoch_ms, Ordering::SeqCst);
    }
}

impl Default for FakeClock {
    fn default() -> Self {
        Self::new(1_700_000_000_000)
    }
}

impl Clock for FakeClock {
    fn epoch_ms(&self) -> u64 {
        self.millis.load(Ordering::SeqCst) as u64
    }
}

#[cfg(test)]
#[path = "clock_tests.rs"]
mod tests;
