// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pseudo-terminal attach for the headless spawner's `usePty` path.
//!
//! A tmux session is the pty. Output is teed to a log file with
//! `pipe-pane` and mirrored into an in-memory ring buffer (capped at
//! ~100 KiB) so a dashboard subscriber that connects after the worker has
//! produced output still sees recent history.

use crate::subprocess::{run_with_timeout, VCS_STATUS_TIMEOUT};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::process::Command;
use tokio::sync::oneshot;

const RING_BUFFER_CAP_BYTES: usize = 100 * 1024;

#[derive(Debug, thiserror::Error)]
pub enum PtyError {
    #[error("tmux command failed: {0}")]
    CommandFailed(String),
    #[error("pty session not found: {0}")]
    NotFound(String),
}

/// Shared ring buffer of recent pty output bytes.
#[derive(Clone, Default)]
pub struct RingBuffer {
    inner: Arc<Mutex<VecDeque<u8>>>,
}

impl RingBuffer {
    pub fn push(&self, bytes: &[u8]) {
        let mut buf = self.inner.lock();
        buf.extend(bytes.iter().copied());
        while buf.len() > RING_BUFFER_CAP_BYTES {
            buf.pop_front();
        }
    }

    pub fn snapshot(&self) -> Vec<u8> {
        self.inner.lock().iter().copied().collect()
    }
}

/// A live pty-backed worker session. Dropping this does not kill the
/// underlying tmux session; call [`PtySession::kill`] explicitly.
pub struct PtySession {
    pub tmux_session_id: String,
    pub log_path: PathBuf,
    pub ring: RingBuffer,
    tail_shutdown: Option<oneshot::Sender<()>>,
}

impl Drop for PtySession {
    fn drop(&mut self) {
        if let Some(tx) = self.tail_shutdown.take() {
            let _ = tx.send(());
        }
    }
}

async fn run(cmd: Command, desc: &str) -> Result<std::process::Output, PtyError> {
    run_with_timeout(cmd, VCS_STATUS_TIMEOUT, desc)
        .await
        .map_err(PtyError::CommandFailed)
}

impl PtySession {
    /// Start a new tmux-backed pty session running `command` in `cwd`,
    /// teeing its output to `log_path` and mirroring it into a ring buffer.
    pub async fn start(
        session_name: &str,
        cwd: &Path,
        command: &str,
        env: &[(String, String)],
        log_path: PathBuf,
    ) -> Result<Self, PtyError> {
        let tmux_session_id = format!("orc-{session_name}");

        let existing = Command::new("tmux")
            .args(["has-session", "-t", &tmux_session_id])
            .output()
            .await;
        if existing.map(|o| o.status.success()).unwrap_or(false) {
            let _ = Command::new("tmux")
                .args(["kill-session", "-t", &tmux_session_id])
                .output()
                .await;
        }

        let mut new_session = Command::new("tmux");
        new_session
            .args(["new-session", "-d", "-s", &tmux_session_id, "-c"])
            .arg(cwd);
        for (k, v) in env {
            new_session.arg("-e").arg(format!("{k}={v}"));
        }
        new_session.arg(command);
        let output = run(new_session, "tmux new-session").await?;
        if !output.status.success() {
            return Err(PtyError::CommandFailed(
                String::from_utf8_lossy(&output.stderr).to_string(),
            ));
        }

        if let Some(parent) = log_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| PtyError::CommandFailed(e.to_string()))?;
        }
        let pipe = Command::new("tmux")
            .args([
                "pipe-pane",
                "-t",
                &tmux_session_id,
                "-o",
                &format!("cat >> {}", log_path.display()),
            ])
            .output()
            .await
            .map_err(|e| PtyError::CommandFailed(e.to_string()))?;
        if !pipe.status.success() {
            tracing::warn!(
                session = %tmux_session_id,
                "pipe-pane failed, ring buffer will stay empty until capture-pane is polled"
            );
        }

        let ring = RingBuffer::default();
        let tail_shutdown = spawn_tail_task(log_path.clone(), ring.clone());

        Ok(Self {
            tmux_session_id,
            log_path,
            ring,
            tail_shutdown: Some(tail_shutdown),
        })
    }

    pub async fn send_input(&self, bytes: &str) -> Result<(), PtyError> {
        let output = Command::new("tmux")
            .args(["send-keys", "-t", &self.tmux_session_id, "-l", "--", bytes])
            .output()
            .await
            .map_err(|e| PtyError::CommandFailed(e.to_string()))?;
        if output.status.success() {
            Ok(())
        } else {
            Err(PtyError::NotFound(self.tmux_session_id.clone()))
        }
    }

    pub async fn resize(&self, cols: u16, rows: u16) -> Result<(), PtyError> {
        let output = Command::new("tmux")
            .args([
                "resize-window",
                "-t",
                &self.tmux_session_id,
                "-x",
                &cols.to_string(),
                "-y",
                &rows.to_string(),
            ])
            .output()
            .await
            .map_err(|e| PtyError::CommandFailed(e.to_string()))?;
        if output.status.success() {
            Ok(())
        } else {
            Err(PtyError::NotFound(self.tmux_session_id.clone()))
        }
    }

    pub async fn is_alive(&self) -> bool {
        Command::new("tmux")
            .args(["has-session", "-t", &self.tmux_session_id])
            .output()
            .await
            .map(|o| o.status.success())
            .unwrap_or(false)
    }

    pub async fn get_exit_code(&self) -> Option<i32> {
        let output = Command::new("tmux")
            .args([
                "display-message",
                "-t",
                &self.tmux_session_id,
                "-p",
                "#{pane_dead_status}",
            ])
            .output()
            .await
            .ok()?;
        if !output.status.success() {
            return None;
        }
        String::from_utf8_lossy(&output.stdout).trim().parse().ok()
    }

    pub async fn kill(&self) {
        let _ = Command::new("tmux")
            .args(["kill-session", "-t", &self.tmux_session_id])
            .output()
            .await;
    }
}

/// Tail `log_path` for newly appended bytes and mirror them into `ring`
/// until shutdown. Missing log files are tolerated: the tail simply waits
/// for the file to appear (pipe-pane creates it lazily on first output).
fn spawn_tail_task(log_path: PathBuf, ring: RingBuffer) -> oneshot::Sender<()> {
    let (tx, mut rx) = oneshot::channel();
    tokio::spawn(async move {
        let mut offset: u64 = 0;
        loop {
            if rx.try_recv().is_ok() {
                return;
            }
            if let Ok(mut file) = std::fs::File::open(&log_path) {
                if file.seek(SeekFrom::Start(offset)).is_ok() {
                    let mut buf = Vec::new();
                    if let Ok(n) = file.read_to_end(&mut buf) {
                        if n > 0 {
                            ring.push(&buf);
                            offset += n as u64;
                        }
                    }
                }
            }
            tokio::select! {
                _ = &mut rx => return,
                _ = tokio::time::sleep(std::time::Duration::from_millis(200)) => {}
            }
        }
    });
    tx
}
