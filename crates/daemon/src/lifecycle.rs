// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon startup/shutdown sequencing: acquire the single-instance lock
//! before touching anything else, create the state directory tree, write
//! the version marker, wire every repository's services, and only then
//! bind the Unix socket — binding last means a failure anywhere earlier
//! never leaves a stale socket file behind for a client to connect to.

use crate::env;
use crate::state::{AppState, StateError};
use fs2::FileExt;
use orc_core::{Config, CoreError};
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio::net::UnixListener;

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("another orcd is already running (pid {pid:?})")]
    LockFailed { pid: Option<u32> },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config error: {0}")]
    Config(#[from] CoreError),

    #[error("state wiring error: {0}")]
    State(#[from] StateError),
}

/// Holds the lock file open for the daemon's lifetime; releasing it
/// (dropping this guard, or process exit) frees the lock for the next
/// `orcd` to acquire.
pub struct LockGuard {
    file: File,
    path: PathBuf,
}

impl LockGuard {
    /// Try to acquire the exclusive lock at `path` without truncating it
    /// first — if another daemon holds it, callers need the pre-existing
    /// pid/version contents to build a helpful "already running" message.
    fn acquire(path: &Path) -> Result<Self, LifecycleError> {
        let file = OpenOptions::new().read(true).write(true).create(true).open(path)?;
        match file.try_lock_exclusive() {
            Ok(()) => Ok(Self { file, path: path.to_path_buf() }),
            Err(_) => {
                let mut contents = String::new();
                let mut reader = file;
                let _ = reader.read_to_string(&mut contents);
                let pid = contents.lines().next().and_then(|l| l.trim().parse().ok());
                Err(LifecycleError::LockFailed { pid })
            }
        }
    }

    fn write_pid(&mut self) -> std::io::Result<()> {
        self.file.set_len(0)?;
        self.file.seek(SeekFrom::Start(0))?;
        writeln!(self.file, "{}", std::process::id())?;
        self.file.flush()
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        let _ = fs2::FileExt::unlock(&self.file);
        let _ = std::fs::remove_file(&self.path);
    }
}

/// Everything a running daemon process holds: the lock (never read again,
/// just kept alive), the shared state, and the bound listener.
pub struct Daemon {
    _lock: LockGuard,
    pub state: Arc<AppState>,
    pub listener: UnixListener,
    pub socket_path: PathBuf,
}

impl Daemon {
    /// Full startup sequence. Cleans up any partially-created state on
    /// failure, except when the failure is `LockFailed` — in that case
    /// another daemon owns the state directory and nothing here is ours
    /// to remove.
    pub async fn startup() -> Result<Self, LifecycleError> {
        let config = Config::load()?;
        match Self::startup_inner(config).await {
            Ok(daemon) => Ok(daemon),
            Err(e @ LifecycleError::LockFailed { .. }) => Err(e),
            Err(e) => Err(e),
        }
    }

    async fn startup_inner(config: Config) -> Result<Self, LifecycleError> {
        let state_dir = env::state_dir().unwrap_or_else(|| PathBuf::from(".orchestration"));
        std::fs::create_dir_all(&state_dir)?;

        let lock_path = env::lock_path(&state_dir);
        let mut lock = LockGuard::acquire(&lock_path)?;
        lock.write_pid()?;

        std::fs::create_dir_all(env::log_dir(&state_dir))?;
        std::fs::create_dir_all(state_dir.join("sessions"))?;

        std::fs::write(env::version_path(&state_dir), crate::protocol_wire::PROTOCOL_VERSION)?;

        let state = AppState::build(state_dir.clone(), config)?;

        let socket_path = env::socket_path(&state_dir);
        if socket_path.exists() {
            let _ = std::fs::remove_file(&socket_path);
        }
        let listener = UnixListener::bind(&socket_path)?;

        let orphans = state.multi_repo.detect_orphans();
        for (repo_id, paths) in &orphans {
            tracing::warn!(repo = repo_id.as_str(), count = paths.len(), "orphaned worktrees detected at startup");
        }

        Ok(Self {
            _lock: lock,
            state,
            listener,
            socket_path,
        })
    }

    pub fn shutdown(&self) {
        self.state.shutdown();
        let _ = std::fs::remove_file(&self.socket_path);
    }
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
