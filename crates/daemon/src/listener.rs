// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Control-socket connection handling: accepts `UnixStream`s, dispatches
//! one-shot `Request`/`Response` pairs against [`AppState`], and upgrades
//! a connection that opens with `HelloDashboard` to the push-channel
//! framing instead.

use crate::protocol::{
    OrphanGroup, PushClientMessage, PushServerMessage, Request, Response,
};
use crate::protocol_wire::{self, ProtocolError, PROTOCOL_VERSION};
use crate::ralph;
use crate::state::AppState;
use orc_core::{ChangeEvent, DeleteMode, RepoId, Session, SessionId};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::net::UnixListener;
use tokio::sync::mpsc;

/// How often a dashboard connection polls subscribed sessions' pty ring
/// buffers for new output. Ring buffers are push-only in-process data
/// structures, not their own notify source, so polling is the simplest
/// correct way to surface new bytes.
const TERMINAL_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Accept loop: one task per connection, running until
/// [`AppState::request_shutdown`] fires.
pub async fn serve(state: Arc<AppState>, listener: UnixListener) {
    let mut shutdown = state.shutdown_signal();
    loop {
        tokio::select! {
            accepted = listener.accept() => {
                match accepted {
                    Ok((stream, _addr)) => {
                        let state = Arc::clone(&state);
                        tokio::spawn(async move {
                            if let Err(e) = handle_connection(state, stream).await {
                                tracing::debug!(error = %e, "control connection ended");
                            }
                        });
                    }
                    Err(e) => tracing::warn!(error = %e, "accept failed"),
                }
            }
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    return;
                }
            }
        }
    }
}

async fn handle_connection(
    state: Arc<AppState>,
    stream: tokio::net::UnixStream,
) -> Result<(), ProtocolError> {
    let (mut reader, mut writer) = stream.into_split();

    let first: Request = match protocol_wire::decode(&protocol_wire::read_message(&mut reader).await?) {
        Ok(r) => r,
        Err(e) => return Err(e),
    };

    match first {
        Request::HelloDashboard => {
            return serve_dashboard(state, reader, writer).await;
        }
        Request::Hello { .. } => {
            let resp = Response::Hello {
                version: PROTOCOL_VERSION.to_string(),
            };
            protocol_wire::write_message(&mut writer, &protocol_wire::encode(&resp)?).await?;
        }
        other => {
            // Tolerate a client that skips the handshake and sends its
            // first real request directly.
            let resp = dispatch(&state, other).await;
            protocol_wire::write_message(&mut writer, &protocol_wire::encode(&resp)?).await?;
        }
    }

    loop {
        let bytes = match protocol_wire::read_message(&mut reader).await {
            Ok(b) => b,
            Err(ProtocolError::ConnectionClosed) => return Ok(()),
            Err(e) => return Err(e),
        };
        let req: Request = protocol_wire::decode(&bytes)?;
        let shutdown_requested = matches!(req, Request::Shutdown);
        let resp = dispatch(&state, req).await;
        protocol_wire::write_message(&mut writer, &protocol_wire::encode(&resp)?).await?;
        if shutdown_requested {
            state.request_shutdown();
            return Ok(());
        }
    }
}

/// One `Request` in, one `Response` out. `Hello`/`HelloDashboard` are
/// handled by the caller before the connection reaches here; `Shutdown`
/// is handled here (so it still gets an `Response::ShuttingDown` reply)
/// but the actual signal is raised by the caller after this returns.
async fn dispatch(state: &Arc<AppState>, req: Request) -> Response {
    match req {
        Request::Hello { .. } | Request::HelloDashboard => Response::Error {
            message: "handshake request received mid-session".to_string(),
        },
        Request::Shutdown => Response::ShuttingDown,

        Request::Spawn { repo, issue, mode, prompt_text, extra_env } => {
            let Some(service) = state.multi_repo.service(&repo) else {
                return unknown_repo(&repo);
            };
            match service.spawn(issue, mode, &prompt_text, extra_env).await {
                Ok(session) => {
                    ralph::spawn_driver_if_iterative(state, repo, session.id.clone());
                    Response::Session { session: Box::new(session) }
                }
                Err(e) => error_response(e),
            }
        }

        Request::List { repo, all } => {
            let sessions = match repo {
                Some(repo) => {
                    let Some(service) = state.multi_repo.service(&repo) else {
                        return unknown_repo(&repo);
                    };
                    match service.list() {
                        Ok(s) => s,
                        Err(e) => return error_response(e),
                    }
                }
                None => {
                    let mut sessions = Vec::new();
                    for repo_id in state.multi_repo.repo_ids().cloned().collect::<Vec<_>>() {
                        let Some(service) = state.multi_repo.service(&repo_id) else {
                            continue;
                        };
                        match service.list() {
                            Ok(s) => sessions.extend(s),
                            Err(e) => tracing::warn!(repo = repo_id.as_str(), error = %e, "list failed"),
                        }
                    }
                    sessions
                }
            };
            let sessions = filter_sorted(sessions, all);
            Response::Sessions { sessions }
        }

        Request::Get { id } => match state.find_session(&id) {
            Ok((_repo_id, session)) => {
                let diff = orc_adapters::VcsAdapter::new()
                    .diff_summary(&session.worktree_path)
                    .await
                    .unwrap_or_default();
                Response::SessionWithDiff { session: Box::new(session), diff }
            }
            Err(e) => error_response(e),
        },

        Request::Update { id, status, reason, pull_request_url } => {
            with_owning_service(state, id, |service, id| {
                Box::pin(async move { service.update(&id, status, reason, pull_request_url) })
            })
            .await
        }

        Request::Forward { id, message } => {
            with_owning_service(state, id, |service, id| {
                Box::pin(async move { service.forward(&id, message) })
            })
            .await
        }

        Request::Ack { id } => {
            with_owning_service(state, id, |service, id| {
                Box::pin(async move { service.acknowledge(&id) })
            })
            .await
        }

        Request::Pause { id } => {
            state.loop_controller_for(&id).pause();
            with_owning_service(state, id, |service, id| {
                Box::pin(async move { service.pause(&id) })
            })
            .await
        }

        Request::Resume { id } => {
            let controller = state.loop_controller_for(&id);
            let resp = with_owning_service(state, id, |service, id| {
                Box::pin(async move { service.resume(&id) })
            })
            .await;
            if matches!(resp, Response::Session { .. }) {
                // `continue_loop` errors when the controller was never
                // paused at the loop-controller level; the session-status
                // resume above is enough in that case.
                let _ = controller.continue_loop();
            }
            resp
        }

        Request::Restart { id, iteration } => {
            let repo_id = match state.find_session(&id) {
                Ok((repo_id, _)) => repo_id,
                Err(e) => return error_response(e),
            };
            let Some(service) = state.multi_repo.service(&repo_id) else {
                return unknown_repo(&repo_id);
            };
            match service.restart(&id, iteration).await {
                Ok(session) => {
                    ralph::spawn_driver_if_iterative(state, repo_id, id);
                    Response::Session { session: Box::new(session) }
                }
                Err(e) => error_response(e),
            }
        }

        Request::Delete { id, mode, force } => delete(state, id, mode, force).await,

        Request::RetryDelete { id, mode } => {
            let repo_id = match state.find_session(&id) {
                Ok((repo_id, _)) => repo_id,
                Err(e) => return error_response(e),
            };
            let Some(service) = state.multi_repo.service(&repo_id) else {
                return unknown_repo(&repo_id);
            };
            match service.retry_delete(&id, mode).await {
                Ok(outcome) => Response::Deleted { outcome },
                Err(e) => error_response(e),
            }
        }

        Request::CancelAll { keep_worktrees } => cancel_all(state, keep_worktrees).await,

        Request::Heartbeat { id } => {
            let repo_id = match state.find_session(&id) {
                Ok((repo_id, _)) => repo_id,
                Err(e) => return error_response(e),
            };
            let Some(service) = state.multi_repo.service(&repo_id) else {
                return unknown_repo(&repo_id);
            };
            match service.heartbeat(&id) {
                Ok(outcome) => Response::Heartbeat { outcome },
                Err(e) => error_response(e),
            }
        }

        Request::Orphans => {
            let groups = state
                .multi_repo
                .detect_orphans()
                .into_iter()
                .map(|(repo, worktree_paths)| OrphanGroup { repo, worktree_paths })
                .collect();
            Response::Orphans { groups }
        }

        Request::Status => {
            let repo_ids: Vec<_> = state.multi_repo.repo_ids().cloned().collect();
            let mut sessions_active = 0usize;
            for repo_id in &repo_ids {
                let Some(service) = state.multi_repo.service(repo_id) else {
                    continue;
                };
                match service.list() {
                    Ok(sessions) => {
                        sessions_active += sessions.iter().filter(|s| !s.status.is_terminal()).count();
                    }
                    Err(e) => tracing::warn!(repo = repo_id.as_str(), error = %e, "status: list failed"),
                }
            }
            let orphan_count: usize =
                state.multi_repo.detect_orphans().values().map(|paths| paths.len()).sum();
            Response::Status {
                uptime_secs: state.uptime_secs(),
                repos_configured: repo_ids.len(),
                sessions_active,
                orphan_count,
            }
        }

        Request::RollbackDelete { id } => {
            let repo_id = match state.find_session(&id) {
                Ok((repo_id, _)) => repo_id,
                Err(e) => return error_response(e),
            };
            let Some(service) = state.multi_repo.service(&repo_id) else {
                return unknown_repo(&repo_id);
            };
            match service.rollback_delete(&id) {
                Ok(session) => Response::Session { session: Box::new(session) },
                Err(e) => error_response(e),
            }
        }
    }
}

/// Find the repo owning `id` and run `f` against its service, handing `id`
/// back to `f` by value. Shared by every request shape that is
/// `(id, ...) -> Result<Session, ServiceError>`.
async fn with_owning_service<F>(state: &Arc<AppState>, id: SessionId, f: F) -> Response
where
    F: for<'b> FnOnce(
        &'b orc_engine::SessionService<orc_core::SystemClock>,
        SessionId,
    ) -> std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Session, orc_engine::ServiceError>> + 'b>,
    >,
{
    let repo_id = match state.find_session(&id) {
        Ok((repo_id, _)) => repo_id,
        Err(e) => return error_response(e),
    };
    let Some(service) = state.multi_repo.service(&repo_id) else {
        return unknown_repo(&repo_id);
    };
    match f(service, id).await {
        Ok(session) => Response::Session { session: Box::new(session) },
        Err(e) => error_response(e),
    }
}

async fn delete(state: &Arc<AppState>, id: SessionId, mode: DeleteMode, force: bool) -> Response {
    let repo_id = match state.find_session(&id) {
        Ok((repo_id, _)) => repo_id,
        Err(e) => return error_response(e),
    };
    let Some(service) = state.multi_repo.service(&repo_id) else {
        return unknown_repo(&repo_id);
    };
    match service.delete(&id, mode, force).await {
        Ok(outcome) => Response::Deleted { outcome },
        Err(e) => error_response(e),
    }
}

async fn cancel_all(state: &Arc<AppState>, keep_worktrees: bool) -> Response {
    let mode = if keep_worktrees {
        DeleteMode::FolderOnly
    } else {
        DeleteMode::WithLocalBranch
    };
    let mut cancelled = Vec::new();
    let mut failed = Vec::new();
    for repo_id in state.multi_repo.repo_ids().cloned().collect::<Vec<_>>() {
        let Some(service) = state.multi_repo.service(&repo_id) else {
            continue;
        };
        let sessions = match service.list() {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!(repo = repo_id.as_str(), error = %e, "cancel-all: list failed");
                continue;
            }
        };
        for session in sessions {
            if session.status.is_terminal() {
                continue;
            }
            match service.delete(&session.id, mode, true).await {
                Ok(outcome) if outcome.success => cancelled.push(session.id),
                Ok(outcome) => {
                    failed.push((session.id, outcome.error.unwrap_or_else(|| "unknown error".into())))
                }
                Err(e) => failed.push((session.id, e.to_string())),
            }
        }
    }
    Response::CancelAllResult { cancelled, failed }
}

fn filter_sorted(mut sessions: Vec<Session>, all: bool) -> Vec<Session> {
    if !all {
        sessions.retain(|s| !s.status.is_terminal());
    }
    sessions.sort_by_key(|s| s.issue.number);
    sessions
}

fn unknown_repo(repo: &RepoId) -> Response {
    Response::Error {
        message: format!("no configured repository {repo}"),
    }
}

fn error_response(e: orc_engine::ServiceError) -> Response {
    Response::Error { message: e.to_string() }
}

// --- Push channel (dashboard) ---

/// Upgrade a connection that opened with `HelloDashboard` to the
/// push-channel framing: an initial snapshot of every session, then a
/// live stream of `add`/`update`/`remove` events plus terminal I/O for
/// whatever sessions the client subscribes to.
async fn serve_dashboard<R, W>(state: Arc<AppState>, mut reader: R, writer: W) -> Result<(), ProtocolError>
where
    R: AsyncRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (tx, mut rx) = mpsc::channel::<Vec<u8>>(256);
    let writer_task = tokio::spawn(async move {
        let mut writer = writer;
        while let Some(bytes) = rx.recv().await {
            if protocol_wire::write_message(&mut writer, &bytes).await.is_err() {
                return;
            }
        }
        let _ = writer.shutdown().await;
    });

    for repo_id in state.multi_repo.repo_ids().cloned().collect::<Vec<_>>() {
        let Some(service) = state.multi_repo.service(&repo_id) else {
            continue;
        };
        let Ok(sessions) = service.list() else {
            continue;
        };
        for session in sessions {
            let msg = PushServerMessage::SessionAdd { session: Box::new(session) };
            if send_push(&tx, &msg).await.is_err() {
                writer_task.abort();
                return Ok(());
            }
        }
    }

    let subscriptions: Arc<std::sync::Mutex<HashSet<SessionId>>> =
        Arc::new(std::sync::Mutex::new(HashSet::new()));

    let event_task = {
        let tx = tx.clone();
        let mut events = state.event_bus.subscribe();
        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok((_repo_id, event)) => {
                        let msg = match event {
                            ChangeEvent::Added { record, .. } => {
                                PushServerMessage::SessionAdd { session: record }
                            }
                            ChangeEvent::Updated { record, .. } => {
                                PushServerMessage::SessionUpdate { session: record }
                            }
                            ChangeEvent::Removed { session_id } => {
                                PushServerMessage::SessionRemove { session_id }
                            }
                        };
                        if send_push(&tx, &msg).await.is_err() {
                            return;
                        }
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => return,
                }
            }
        })
    };

    let terminal_task = {
        let tx = tx.clone();
        let state = Arc::clone(&state);
        let subscriptions = Arc::clone(&subscriptions);
        tokio::spawn(async move {
            let mut offsets: HashMap<SessionId, usize> = HashMap::new();
            loop {
                tokio::time::sleep(TERMINAL_POLL_INTERVAL).await;
                let ids: Vec<SessionId> = subscriptions.lock().unwrap().iter().cloned().collect();
                for id in ids {
                    let Some(headless) = state.headless.as_ref() else { continue };
                    let Ok((_, session)) = state.find_session(&id) else { continue };
                    let Some(spawn_id) = session.spawn_id.as_ref() else { continue };
                    let Some(ring) = headless.ring_buffer(spawn_id) else { continue };
                    let snapshot = ring.snapshot();
                    let sent = offsets.entry(id.clone()).or_insert(0);
                    if snapshot.len() > *sent {
                        let fresh = snapshot[*sent..].to_vec();
                        *sent = snapshot.len();
                        let msg = PushServerMessage::TerminalData { session_id: id.clone(), bytes: fresh };
                        if send_push(&tx, &msg).await.is_err() {
                            return;
                        }
                    }
                }
            }
        })
    };

    loop {
        let bytes = match protocol_wire::read_message(&mut reader).await {
            Ok(b) => b,
            Err(ProtocolError::ConnectionClosed) => break,
            Err(_) => break,
        };
        let Ok(msg) = protocol_wire::decode::<PushClientMessage>(&bytes) else {
            continue;
        };
        handle_dashboard_client_message(&state, &subscriptions, &tx, msg).await;
    }

    event_task.abort();
    terminal_task.abort();
    drop(tx);
    let _ = writer_task.await;
    Ok(())
}

async fn handle_dashboard_client_message(
    state: &Arc<AppState>,
    subscriptions: &Arc<std::sync::Mutex<HashSet<SessionId>>>,
    tx: &mpsc::Sender<Vec<u8>>,
    msg: PushClientMessage,
) {
    match msg {
        PushClientMessage::Subscribe { session_id } => {
            subscriptions.lock().unwrap().insert(session_id.clone());
            let msg = PushServerMessage::TerminalConnected { session_id };
            let _ = send_push(tx, &msg).await;
        }
        PushClientMessage::Unsubscribe { session_id } => {
            subscriptions.lock().unwrap().remove(&session_id);
        }
        PushClientMessage::Input { session_id, bytes } => {
            if let Err(e) = send_terminal_input(state, &session_id, &bytes).await {
                let msg = PushServerMessage::TerminalError { session_id, message: e };
                let _ = send_push(tx, &msg).await;
            }
        }
        PushClientMessage::Resize { session_id, cols, rows } => {
            if let Err(e) = resize_terminal(state, &session_id, cols, rows).await {
                let msg = PushServerMessage::TerminalError { session_id, message: e };
                let _ = send_push(tx, &msg).await;
            }
        }
    }
}

async fn send_terminal_input(state: &Arc<AppState>, id: &SessionId, bytes: &[u8]) -> Result<(), String> {
    let headless = state.headless.as_ref().ok_or("spawner has no pty support")?;
    let (_, session) = state.find_session(id).map_err(|e| e.to_string())?;
    let spawn_id = session.spawn_id.ok_or("session has no active spawn")?;
    let text = String::from_utf8_lossy(bytes).into_owned();
    headless.send_pty_input(&spawn_id, &text).await.map_err(|e| e.to_string())
}

async fn resize_terminal(state: &Arc<AppState>, id: &SessionId, cols: u16, rows: u16) -> Result<(), String> {
    let headless = state.headless.as_ref().ok_or("spawner has no pty support")?;
    let (_, session) = state.find_session(id).map_err(|e| e.to_string())?;
    let spawn_id = session.spawn_id.ok_or("session has no active spawn")?;
    headless.resize_pty(&spawn_id, cols, rows).await.map_err(|e| e.to_string())
}

async fn send_push(tx: &mpsc::Sender<Vec<u8>>, msg: &PushServerMessage) -> Result<(), ()> {
    let bytes = protocol_wire::encode(msg).map_err(|_| ())?;
    tx.send(bytes).await.map_err(|_| ())
}

#[cfg(test)]
#[path = "listener_tests.rs"]
mod tests;
