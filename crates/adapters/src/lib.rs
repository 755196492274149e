// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
// Enable coverage(off) attribute for excluding test infrastructure
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Adapters for external I/O: the version-control adapter, the worker
//! spawner variants, the process tracker, the session-file
//! change-notification pipeline, and desktop notifications.

pub mod env;
pub mod notify;
pub mod process_tracker;
pub mod spawner;
pub mod subprocess;
pub mod vcs;
pub mod watcher;

pub use notify::{DesktopNotifyAdapter, NoOpNotifyAdapter, NotifyAdapter};
pub use process_tracker::{ProcessTracker, TrackedProcess};
pub use spawner::{
    HeadlessSpawner, SandboxedSpawner, SpawnOutcome, SpawnRequest, Spawner, SpawnerError,
    StopResult, WorkerStatus,
};
pub use vcs::{RemoteIdentity, VcsAdapter, VcsError, WorktreeDiffSummary};
pub use watcher::{SessionWatcher, WatchEvent};

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
pub use notify::{FakeNotifyAdapter, NotifyCall};
#[cfg(any(test, feature = "test-support"))]
pub use spawner::FakeSpawner;
