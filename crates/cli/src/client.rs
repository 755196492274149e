// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon client for CLI commands.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crate::client_lifecycle::log_connection_error;
use crate::daemon_process::{
    cleanup_stale_socket, daemon_dir, daemon_socket, probe_socket, read_startup_error,
    start_daemon_background, stop_daemon_sync, wrap_with_startup_error,
};

use orc_adapters::WorktreeDiffSummary;
use orc_core::{DeleteMode, IssueRef, Mode, RepoId, Session, SessionId, SessionStatus};
use orc_daemon::protocol_wire::{self, ProtocolError};
use orc_daemon::{OrphanGroup, Request, Response};
use orc_engine::{DeleteResult, HeartbeatResult};
use thiserror::Error;
use tokio::net::UnixStream;

fn parse_duration_ms(var: &str) -> Option<Duration> {
    std::env::var(var).ok().and_then(|s| s.parse::<u64>().ok()).map(Duration::from_millis)
}

/// Timeout for IPC requests (hello, status, most commands).
pub fn timeout_ipc() -> Duration {
    parse_duration_ms("ORC_TIMEOUT_IPC_MS").unwrap_or(Duration::from_secs(5))
}

/// Timeout for waiting for the daemon to start.
pub fn timeout_connect() -> Duration {
    parse_duration_ms("ORC_TIMEOUT_CONNECT_MS").unwrap_or(Duration::from_secs(5))
}

/// Timeout for waiting for the daemon process to exit.
pub fn timeout_exit() -> Duration {
    parse_duration_ms("ORC_TIMEOUT_EXIT_MS").unwrap_or(Duration::from_secs(2))
}

/// Polling interval for connection retries.
pub fn poll_interval() -> Duration {
    parse_duration_ms("ORC_CONNECT_POLL_MS").unwrap_or(Duration::from_millis(50))
}

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("daemon not running")]
    DaemonNotRunning,

    #[error("failed to start daemon: {0}")]
    DaemonStartFailed(String),

    #[error("timeout waiting for daemon to start")]
    DaemonStartTimeout,

    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("request rejected: {0}")]
    Rejected(String),

    #[error("unexpected response from daemon")]
    UnexpectedResponse,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("could not determine state directory")]
    NoStateDir,
}

pub struct DaemonClient {
    socket_path: PathBuf,
}

impl DaemonClient {
    /// For action commands (spawn, update, pause, ...): auto-start the
    /// daemon with a version check, limited to one restart per process so a
    /// persistently broken daemon can't loop forever.
    pub fn for_action() -> Result<Self, ClientError> {
        Self::connect_or_start_once()
    }

    /// For query commands (list, get, ...): connect only, no restart. If
    /// the running daemon is the wrong version there is nothing useful to
    /// query from it anyway.
    pub fn for_query() -> Result<Self, ClientError> {
        Self::connect()
    }

    /// For signal commands (heartbeat, forward, ...): connect only, no
    /// restart. These are often invoked from inside a worker's own hooks,
    /// where restarting the daemon out from under it would be disruptive.
    pub fn for_signal() -> Result<Self, ClientError> {
        Self::connect()
    }

    fn connect_or_start_once() -> Result<Self, ClientError> {
        static RESTARTED: AtomicBool = AtomicBool::new(false);

        if RESTARTED.load(Ordering::SeqCst) {
            return Self::connect();
        }

        if let Ok(dir) = daemon_dir() {
            let version_path = orc_daemon::env::version_path(&dir);
            if let Ok(daemon_version) = std::fs::read_to_string(&version_path) {
                let cli_version = env!("CARGO_PKG_VERSION");
                if daemon_version.trim() != cli_version {
                    RESTARTED.store(true, Ordering::SeqCst);
                    eprintln!(
                        "warn: daemon version {} does not match cli version {cli_version}, restarting daemon",
                        daemon_version.trim(),
                    );
                    stop_daemon_sync();
                }
            }
        }

        match Self::connect() {
            Ok(client) => {
                if probe_socket(&client.socket_path) {
                    Ok(client)
                } else {
                    cleanup_stale_socket()?;
                    let child = start_daemon_background()?;
                    Self::connect_with_retry(timeout_connect(), child)
                }
            }
            Err(ClientError::DaemonNotRunning) => {
                let child = start_daemon_background()?;
                Self::connect_with_retry(timeout_connect(), child)
            }
            Err(e) => Err(wrap_with_startup_error(e)),
        }
    }

    /// Connect to an existing daemon (no auto-start).
    pub fn connect() -> Result<Self, ClientError> {
        let socket_path = daemon_socket()?;

        if !socket_path.exists() {
            let err = ClientError::DaemonNotRunning;
            log_connection_error(&err);
            return Err(err);
        }

        Ok(Self { socket_path })
    }

    fn connect_with_retry(timeout: Duration, mut child: std::process::Child) -> Result<Self, ClientError> {
        let start = Instant::now();
        while start.elapsed() < timeout {
            match child.try_wait() {
                Ok(Some(status)) => {
                    let poll_start = Instant::now();
                    while poll_start.elapsed() < timeout_exit() {
                        if let Some(err) = read_startup_error() {
                            return Err(ClientError::DaemonStartFailed(err));
                        }
                        std::thread::sleep(poll_interval());
                    }
                    return Err(ClientError::DaemonStartFailed(format!("exited with {status}")));
                }
                Ok(None) => {}
                Err(_) => {}
            }

            match Self::connect() {
                Ok(client) => return Ok(client),
                Err(ClientError::DaemonNotRunning) => std::thread::sleep(poll_interval()),
                Err(e) => return Err(wrap_with_startup_error(e)),
            }
        }

        Err(wrap_with_startup_error(ClientError::DaemonStartTimeout))
    }

    async fn send_with_timeout(
        &self,
        request: &Request,
        read_timeout: Duration,
        write_timeout: Duration,
    ) -> Result<Response, ClientError> {
        let stream = UnixStream::connect(&self.socket_path).await?;
        let (mut reader, mut writer) = stream.into_split();

        protocol_wire::write_timed(&mut writer, request, write_timeout).await?;
        Ok(protocol_wire::read_timed(&mut reader, read_timeout).await?)
    }

    pub async fn send(&self, request: &Request) -> Result<Response, ClientError> {
        match self.send_with_timeout(request, timeout_ipc(), timeout_ipc()).await {
            Ok(response) => Ok(response),
            Err(e) => {
                log_connection_error(&e);
                Err(e)
            }
        }
    }

    async fn send_session(&self, request: &Request) -> Result<Session, ClientError> {
        match self.send(request).await? {
            Response::Session { session } => Ok(*session),
            other => Self::reject(other),
        }
    }

    pub async fn hello(&self) -> Result<String, ClientError> {
        let request = Request::Hello { version: env!("CARGO_PKG_VERSION").to_string() };
        match self.send(&request).await? {
            Response::Hello { version } => Ok(version),
            other => Self::reject(other),
        }
    }

    /// `(uptime_secs, repos_configured, sessions_active, orphan_count)`.
    pub async fn status(&self) -> Result<(u64, usize, usize, usize), ClientError> {
        match self.send(&Request::Status).await? {
            Response::Status { uptime_secs, repos_configured, sessions_active, orphan_count } => {
                Ok((uptime_secs, repos_configured, sessions_active, orphan_count))
            }
            other => Self::reject(other),
        }
    }

    pub async fn shutdown(&self) -> Result<(), ClientError> {
        match self.send(&Request::Shutdown).await? {
            Response::Ok | Response::ShuttingDown => Ok(()),
            other => Self::reject(other),
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn spawn(
        &self,
        repo: RepoId,
        issue: IssueRef,
        mode: Mode,
        prompt_text: String,
        extra_env: Vec<(String, String)>,
    ) -> Result<Session, ClientError> {
        self.send_session(&Request::Spawn { repo, issue, mode, prompt_text, extra_env }).await
    }

    pub async fn list(&self, repo: Option<RepoId>, all: bool) -> Result<Vec<Session>, ClientError> {
        match self.send(&Request::List { repo, all }).await? {
            Response::Sessions { sessions } => Ok(sessions),
            other => Self::reject(other),
        }
    }

    pub async fn get(&self, id: SessionId) -> Result<(Session, WorktreeDiffSummary), ClientError> {
        match self.send(&Request::Get { id }).await? {
            Response::SessionWithDiff { session, diff } => Ok((*session, diff)),
            other => Self::reject(other),
        }
    }

    pub async fn update(
        &self,
        id: SessionId,
        status: SessionStatus,
        reason: Option<String>,
        pull_request_url: Option<String>,
    ) -> Result<Session, ClientError> {
        self.send_session(&Request::Update { id, status, reason, pull_request_url }).await
    }

    pub async fn forward(&self, id: SessionId, message: String) -> Result<Session, ClientError> {
        self.send_session(&Request::Forward { id, message }).await
    }

    pub async fn ack(&self, id: SessionId) -> Result<Session, ClientError> {
        self.send_session(&Request::Ack { id }).await
    }

    pub async fn pause(&self, id: SessionId) -> Result<Session, ClientError> {
        self.send_session(&Request::Pause { id }).await
    }

    pub async fn resume(&self, id: SessionId) -> Result<Session, ClientError> {
        self.send_session(&Request::Resume { id }).await
    }

    pub async fn restart(&self, id: SessionId, iteration: Option<u32>) -> Result<Session, ClientError> {
        self.send_session(&Request::Restart { id, iteration }).await
    }

    pub async fn delete(&self, id: SessionId, mode: DeleteMode, force: bool) -> Result<DeleteResult, ClientError> {
        match self.send(&Request::Delete { id, mode, force }).await? {
            Response::Deleted { outcome } => Ok(outcome),
            other => Self::reject(other),
        }
    }

    pub async fn retry_delete(&self, id: SessionId, mode: DeleteMode) -> Result<DeleteResult, ClientError> {
        match self.send(&Request::RetryDelete { id, mode }).await? {
            Response::Deleted { outcome } => Ok(outcome),
            other => Self::reject(other),
        }
    }

    pub async fn cancel_all(
        &self,
        keep_worktrees: bool,
    ) -> Result<(Vec<SessionId>, Vec<(SessionId, String)>), ClientError> {
        match self.send(&Request::CancelAll { keep_worktrees }).await? {
            Response::CancelAllResult { cancelled, failed } => Ok((cancelled, failed)),
            other => Self::reject(other),
        }
    }

    pub async fn heartbeat(&self, id: SessionId) -> Result<HeartbeatResult, ClientError> {
        match self.send(&Request::Heartbeat { id }).await? {
            Response::Heartbeat { outcome } => Ok(outcome),
            other => Self::reject(other),
        }
    }

    pub async fn orphans(&self) -> Result<Vec<OrphanGroup>, ClientError> {
        match self.send(&Request::Orphans).await? {
            Response::Orphans { groups } => Ok(groups),
            other => Self::reject(other),
        }
    }

    pub async fn rollback_delete(&self, id: SessionId) -> Result<Session, ClientError> {
        self.send_session(&Request::RollbackDelete { id }).await
    }

    fn reject<T>(resp: Response) -> Result<T, ClientError> {
        match resp {
            Response::Error { message } => Err(ClientError::Rejected(message)),
            _ => Err(ClientError::UnexpectedResponse),
        }
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
