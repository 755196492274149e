// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! orc-storage: durable persistence for session records and the
//! in-worktree files the orchestrator writes alongside a worker
//! (`session-context.json`, `session-state.json`, `.claude/progress.json`).
//!
//! Every write in this crate goes through the same
//! write-to-staging-file-then-rename sequence: a crash mid-write leaves the
//! previous version intact rather than a half-written file.

mod context;
mod progress;
mod store;

pub use context::{write_context, write_dynamic_state, DynamicState, SessionContext};
pub use progress::{append_progress_entry, read_progress_log, ProgressEntry, ProgressLog};
pub use store::{FileSessionStore, StoreError};
