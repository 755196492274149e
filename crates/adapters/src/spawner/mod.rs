// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker spawner capability.
//!
//! Modeled as a capability set rather than a class hierarchy: the concrete
//! spawner is picked once at startup from configuration, and the iterative
//! loop controller and session service depend only on this trait, never on
//! a concrete variant.

mod headless;
mod pty;
mod sandboxed;

pub use headless::HeadlessSpawner;
pub use sandboxed::SandboxedSpawner;

#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeSpawner;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use orc_core::SpawnId;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SpawnerError {
    #[error("spawner unavailable: {0}")]
    Unavailable(String),
    #[error("spawn failed: {0}")]
    SpawnFailed(String),
    #[error("stop failed: {0}")]
    StopFailed(String),
    #[error("status check failed: {0}")]
    StatusFailed(String),
}

/// Everything a spawner needs to launch one worker invocation.
#[derive(Debug, Clone)]
pub struct SpawnRequest {
    /// The worker CLI binary/command name (`config.cli_command`, or a
    /// repo-specific override).
    pub command: String,
    /// Absolute path to the prompt file the worker should read.
    pub prompt_file: PathBuf,
    /// Absolute path to `session-context.json`, passed so the worker can
    /// locate its identity handle without re-deriving it.
    pub context_file: PathBuf,
    /// Working directory: the session's worktree.
    pub worktree_path: PathBuf,
    /// Additional environment variables layered on top of the spawner's own.
    pub env: Vec<(String, String)>,
    /// Attach a pseudo-terminal instead of redirecting to a log file only.
    pub use_pty: bool,
}

/// Result of a `spawn` call.
#[derive(Debug, Clone)]
pub struct SpawnOutcome {
    pub success: bool,
    pub spawn_id: SpawnId,
    pub spawned_at: DateTime<Utc>,
    pub error: Option<String>,
}

/// Result of a `stop` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StopResult {
    pub stopped: bool,
    pub forced: bool,
}

/// Result of a `get_status` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerStatus {
    pub running: bool,
    pub exit_code: Option<i32>,
}

/// Capability set implemented by each spawner variant. `stop`/`get_status`
/// are required here even though not every caller needs them: both
/// variants in this crate implement them, and a capability that can spawn
/// but never report back is not useful to the iterative loop controller.
#[async_trait]
pub trait Spawner: Send + Sync + 'static {
    /// Stable name for logging/diagnostics (`"headless"`, `"sandboxed"`).
    fn name(&self) -> &'static str;

    /// Cheap probe for whether this spawner can run at all (missing
    /// binary, missing container runtime). Checked before `spawn` is
    /// called so unavailability surfaces as a clear error rather than a
    /// spawn failure deep in the call stack.
    async fn is_available(&self) -> bool;

    async fn spawn(&self, request: SpawnRequest) -> Result<SpawnOutcome, SpawnerError>;

    async fn stop(&self, spawn_id: &SpawnId) -> Result<StopResult, SpawnerError>;

    async fn get_status(&self, spawn_id: &SpawnId) -> Result<WorkerStatus, SpawnerError>;
}
