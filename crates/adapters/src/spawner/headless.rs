// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Headless spawner: launches the worker binary directly, redirecting
//! stdout/stderr to a rotating log file, or (when `use_pty` is set)
//! attaches a tmux-backed pseudo-terminal via [`crate::spawner::pty`].

use super::pty::PtySession;
use super::{SpawnOutcome, SpawnRequest, Spawner, SpawnerError, StopResult, WorkerStatus};
use async_trait::async_trait;
use chrono::Utc;
use orc_core::{IdGen, SpawnId, UuidIdGen};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::process::Stdio;
use std::sync::Arc;
use tokio::process::{Child, Command};

enum Handle {
    Plain(Child),
    Pty(PtySession),
}

/// Headless variant: direct child process, optional pty attach.
pub struct HeadlessSpawner {
    id_gen: UuidIdGen,
    handles: Arc<Mutex<HashMap<String, Handle>>>,
}

impl Default for HeadlessSpawner {
    fn default() -> Self {
        Self::new()
    }
}

impl HeadlessSpawner {
    pub fn new() -> Self {
        Self {
            id_gen: UuidIdGen,
            handles: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Borrow the ring buffer for a live pty-attached spawn, for the push
    /// channel to stream as `data` frames. Returns `None` for plain
    /// (non-pty) spawns or unknown ids.
    pub fn ring_buffer(&self, spawn_id: &SpawnId) -> Option<super::pty::RingBuffer> {
        match self.handles.lock().get(spawn_id.as_str())? {
            Handle::Pty(pty) => Some(pty.ring.clone()),
            Handle::Plain(_) => None,
        }
    }

    /// The OS process id backing a plain (non-pty) spawn, for the process
    /// tracker's liveness polling. `None` for pty spawns (tmux itself is
    /// the long-lived process; the worker's own pid isn't tracked here)
    /// and for unknown ids.
    pub fn pid(&self, spawn_id: &SpawnId) -> Option<u32> {
        match self.handles.lock().get(spawn_id.as_str())? {
            Handle::Plain(child) => child.id(),
            Handle::Pty(_) => None,
        }
    }

    pub async fn send_pty_input(&self, spawn_id: &SpawnId, bytes: &str) -> Result<(), SpawnerError> {
        self.with_pty(spawn_id, |p| {
            let bytes = bytes.to_string();
            async move { p.send_input(&bytes).await }
        })
        .await
    }

    pub async fn resize_pty(&self, spawn_id: &SpawnId, cols: u16, rows: u16) -> Result<(), SpawnerError> {
        self.with_pty(spawn_id, |p| async move { p.resize(cols, rows).await })
            .await
    }

    async fn with_pty<F, Fut>(&self, spawn_id: &SpawnId, f: F) -> Result<(), SpawnerError>
    where
        F: FnOnce(PtyRef) -> Fut,
        Fut: std::future::Future<Output = Result<(), super::pty::PtyError>>,
    {
        // tmux operations are cheap subprocess calls; we re-acquire the
        // session id under the lock and issue the command outside it.
        let session_id = {
            let handles = self.handles.lock();
            match handles.get(spawn_id.as_str()) {
                Some(Handle::Pty(p)) => p.tmux_session_id.clone(),
                Some(Handle::Plain(_)) => {
                    return Err(SpawnerError::StatusFailed("not a pty spawn".into()))
                }
                None => return Err(SpawnerError::StatusFailed("unknown spawn id".into())),
            }
        };
        f(PtyRef { tmux_session_id: session_id })
            .await
            .map_err(|e| SpawnerError::StatusFailed(e.to_string()))
    }
}

/// A detached reference carrying just enough to issue tmux commands
/// without holding the handle map lock across an await point.
struct PtyRef {
    tmux_session_id: String,
}

impl PtyRef {
    async fn send_input(&self, bytes: &str) -> Result<(), super::pty::PtyError> {
        send_keys(&self.tmux_session_id, bytes).await
    }

    async fn resize(&self, cols: u16, rows: u16) -> Result<(), super::pty::PtyError> {
        resize_window(&self.tmux_session_id, cols, rows).await
    }
}

async fn send_keys(session_id: &str, bytes: &str) -> Result<(), super::pty::PtyError> {
    let output = Command::new("tmux")
        .args(["send-keys", "-t", session_id, "-l", "--", bytes])
        .output()
        .await
        .map_err(|e| super::pty::PtyError::CommandFailed(e.to_string()))?;
    if output.status.success() {
        Ok(())
    } else {
        Err(super::pty::PtyError::NotFound(session_id.to_string()))
    }
}

async fn resize_window(session_id: &str, cols: u16, rows: u16) -> Result<(), super::pty::PtyError> {
    let output = Command::new("tmux")
        .args([
            "resize-window",
            "-t",
            session_id,
            "-x",
            &cols.to_string(),
            "-y",
            &rows.to_string(),
        ])
        .output()
        .await
        .map_err(|e| super::pty::PtyError::CommandFailed(e.to_string()))?;
    if output.status.success() {
        Ok(())
    } else {
        Err(super::pty::PtyError::NotFound(session_id.to_string()))
    }
}

#[async_trait]
impl Spawner for HeadlessSpawner {
    fn name(&self) -> &'static str {
        "headless"
    }

    async fn is_available(&self) -> bool {
        tokio::process::Command::new("true")
            .output()
            .await
            .is_ok()
    }

    async fn spawn(&self, request: SpawnRequest) -> Result<SpawnOutcome, SpawnerError> {
        let spawn_id = SpawnId::new(self.id_gen.next());
        let spawned_at = Utc::now();

        if request.use_pty {
            let log_path = request.worktree_path.join(".claude").join("worker.log");
            let full_command = format!(
                "{} {} --context {}",
                request.command,
                request.prompt_file.display(),
                request.context_file.display()
            );
            match PtySession::start(
                spawn_id.as_str(),
                &request.worktree_path,
                &full_command,
                &request.env,
                log_path,
            )
            .await
            {
                Ok(pty) => {
                    self.handles
                        .lock()
                        .insert(spawn_id.as_str().to_string(), Handle::Pty(pty));
                    Ok(SpawnOutcome {
                        success: true,
                        spawn_id,
                        spawned_at,
                        error: None,
                    })
                }
                Err(e) => Ok(SpawnOutcome {
                    success: false,
                    spawn_id,
                    spawned_at,
                    error: Some(e.to_string()),
                }),
            }
        } else {
            let log_path = request.worktree_path.join(".claude").join("worker.log");
            if let Some(parent) = log_path.parent() {
                let _ = tokio::fs::create_dir_all(parent).await;
            }
            let log_file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&log_path)
                .map_err(|e| SpawnerError::SpawnFailed(e.to_string()))?;
            let log_file_err = log_file
                .try_clone()
                .map_err(|e| SpawnerError::SpawnFailed(e.to_string()))?;

            let mut cmd = Command::new(&request.command);
            cmd.arg(&request.prompt_file)
                .arg("--context")
                .arg(&request.context_file)
                .current_dir(&request.worktree_path)
                .stdout(Stdio::from(log_file))
                .stderr(Stdio::from(log_file_err));
            for (k, v) in &request.env {
                cmd.env(k, v);
            }

            match cmd.spawn() {
                Ok(child) => {
                    self.handles
                        .lock()
                        .insert(spawn_id.as_str().to_string(), Handle::Plain(child));
                    Ok(SpawnOutcome {
                        success: true,
                        spawn_id,
                        spawned_at,
                        error: None,
                    })
                }
                Err(e) => Ok(SpawnOutcome {
                    success: false,
                    spawn_id,
                    spawned_at,
                    error: Some(e.to_string()),
                }),
            }
        }
    }

    async fn stop(&self, spawn_id: &SpawnId) -> Result<StopResult, SpawnerError> {
        let handle = self.handles.lock().remove(spawn_id.as_str());
        match handle {
            Some(Handle::Plain(mut child)) => {
                let graceful = tokio::time::timeout(
                    std::time::Duration::from_secs(5),
                    child.wait(),
                )
                .await;
                if graceful.is_err() {
                    let _ = child.kill().await;
                    Ok(StopResult {
                        stopped: true,
                        forced: true,
                    })
                } else {
                    Ok(StopResult {
                        stopped: true,
                        forced: false,
                    })
                }
            }
            Some(Handle::Pty(pty)) => {
                pty.kill().await;
                Ok(StopResult {
                    stopped: true,
                    forced: false,
                })
            }
            None => Ok(StopResult {
                stopped: false,
                forced: false,
            }),
        }
    }

    async fn get_status(&self, spawn_id: &SpawnId) -> Result<WorkerStatus, SpawnerError> {
        // Plain children need `&mut` to poll; pty sessions are polled
        // through tmux without needing exclusive access. Take the handle
        // out, poll it, and put it back rather than holding the lock
        // across an await.
        let handle = self.handles.lock().remove(spawn_id.as_str());
        match handle {
            Some(Handle::Plain(mut child)) => {
                let status = match child.try_wait() {
                    Ok(Some(exit)) => WorkerStatus {
                        running: false,
                        exit_code: exit.code(),
                    },
                    Ok(None) => WorkerStatus {
                        running: true,
                        exit_code: None,
                    },
                    Err(e) => return Err(SpawnerError::StatusFailed(e.to_string())),
                };
                if status.running {
                    self.handles
                        .lock()
                        .insert(spawn_id.as_str().to_string(), Handle::Plain(child));
                }
                Ok(status)
            }
            Some(Handle::Pty(pty)) => {
                let alive = pty.is_alive().await;
                let exit_code = if alive { None } else { pty.get_exit_code().await };
                let status = WorkerStatus {
                    running: alive,
                    exit_code,
                };
                self.handles
                    .lock()
                    .insert(spawn_id.as_str().to_string(), Handle::Pty(pty));
                Ok(status)
            }
            None => Err(SpawnerError::StatusFailed(format!(
                "unknown spawn id {spawn_id}"
            ))),
        }
    }
}

#[cfg(test)]
#[path = "headless_tests.rs"]
mod tests;
