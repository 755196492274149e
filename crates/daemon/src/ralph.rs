// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The iterative ("ralph") loop driver: one task per `Mode::Iterative`
//! session, running spawn -> wait-for-exit -> evaluate-plan -> re-spawn
//! cycles against a session's [`LoopController`].
//!
//! Exit detection forks on spawner kind: a headless, pid-backed spawn is
//! registered with the shared process tracker and awaited through a
//! oneshot; a sandboxed spawn has no pid, so its exit is detected by
//! polling `Spawner::get_status` on an interval instead.

use crate::env;
use crate::state::AppState;
use orc_core::{Mode, RepoId, SessionId, SessionStatus};
use std::sync::Arc;
use std::time::Duration;

const PLAN_FILE_NAME: &str = "IMPLEMENTATION_PLAN.md";

/// Launch the driver task for a session that was just spawned or
/// restarted under `Mode::Iterative`. A no-op for any other mode.
pub fn spawn_driver_if_iterative(state: &Arc<AppState>, repo_id: RepoId, session_id: SessionId) {
    let Some(service) = state.multi_repo.service(&repo_id) else {
        return;
    };
    let Ok(session) = service.get(&session_id) else {
        return;
    };
    if session.mode != Mode::Iterative {
        return;
    }

    let controller = state.loop_controller_for(&session_id);
    if controller.start().is_err() {
        // Already running: a driver task is already live for this session
        // (e.g. `restart` was called while one was in flight).
        return;
    }

    let state = Arc::clone(state);
    tokio::spawn(async move {
        run_driver(state, repo_id, session_id, controller).await;
    });
}

async fn run_driver(
    state: Arc<AppState>,
    repo_id: RepoId,
    session_id: SessionId,
    controller: Arc<orc_engine::LoopController>,
) {
    loop {
        let Some(service) = state.multi_repo.service(&repo_id) else {
            controller.fail("repository no longer configured");
            return;
        };

        let session = match service.get(&session_id) {
            Ok(s) => s,
            Err(e) => {
                controller.fail(format!("session lookup failed: {e}"));
                return;
            }
        };

        let Some(spawn_id) = session.spawn_id.clone() else {
            controller.fail("session has no active spawn id");
            return;
        };

        controller.enter_waiting_exit();
        wait_for_exit(&state, &repo_id, &session_id, &spawn_id).await;

        // The loop may have been paused or stopped (operator action)
        // while we were waiting for the worker to exit.
        if controller.state() != orc_engine::LoopState::WaitingExit {
            return;
        }

        let session = match service.get(&session_id) {
            Ok(s) => s,
            Err(e) => {
                controller.fail(format!("session lookup failed: {e}"));
                return;
            }
        };
        state.multi_repo.fire_hook(&repo_id, "onTest", &session).await;

        let status_signal = service.status_signal(&session);
        let plan_path = session.worktree_path.join(PLAN_FILE_NAME);
        let plan = orc_plan::parse_plan_file(&plan_path).ok();

        // The configured `doneSignal` is only consulted when the status
        // file didn't already give a recognized answer.
        let done_signal_met = if status_signal.as_deref() == Some("complete") {
            false
        } else {
            resolve_done_signal(&state, &session, &spawn_id).await
        };

        match controller.evaluate(status_signal.as_deref(), done_signal_met, plan.as_ref()) {
            orc_engine::LoopDecision::Completed => {
                if let Err(e) = service.update(&session_id, SessionStatus::Complete, None, None) {
                    tracing::warn!(session_id = %session_id, error = %e, "failed to record loop completion");
                }
                return;
            }
            orc_engine::LoopDecision::Failed(reason) => {
                tracing::warn!(session_id = %session_id, reason = %reason, "iterative loop failed");
                return;
            }
            orc_engine::LoopDecision::Respawn { iteration } => {
                state.multi_repo.fire_hook(&repo_id, "onIteration", &session).await;
                tokio::time::sleep(Duration::from_millis(state.config.ralph.iteration_delay_ms)).await;
                if let Err(e) = service.restart(&session_id, Some(iteration)).await {
                    controller.fail(format!("restart failed: {e}"));
                    tracing::warn!(session_id = %session_id, error = %e, "iterative loop restart failed");
                    return;
                }
            }
        }
    }
}

/// Resolves the configured `ralph.doneSignal` against whatever it guards.
/// `Status` has nothing left to check here (the status file already came
/// back absent/unrecognized); `File` checks for a marker file relative to
/// the worktree; `ExitCode` compares the worker's last known exit code.
async fn resolve_done_signal(
    state: &Arc<AppState>,
    session: &orc_core::Session,
    spawn_id: &orc_core::SpawnId,
) -> bool {
    let signal = &state.config.ralph.done_signal;
    match signal.kind {
        orc_core::DoneSignalType::Status => false,
        orc_core::DoneSignalType::File => session.worktree_path.join(&signal.value).exists(),
        orc_core::DoneSignalType::ExitCode => {
            let Ok(expected) = signal.value.trim().parse::<i32>() else {
                return false;
            };
            matches!(
                state.spawner.get_status(spawn_id).await,
                Ok(status) if status.exit_code == Some(expected)
            )
        }
    }
}

/// Block until the worker process backing `spawn_id` has exited, via
/// pid-tracked oneshot when available, polling `get_status` otherwise.
async fn wait_for_exit(
    state: &Arc<AppState>,
    repo_id: &RepoId,
    session_id: &SessionId,
    spawn_id: &orc_core::SpawnId,
) {
    if let Some(rx) = state.register_exit_wait(session_id.clone(), repo_id.clone(), spawn_id) {
        let _ = rx.await;
        return;
    }

    let interval = env::iteration_poll_interval();
    loop {
        match state.spawner.get_status(spawn_id).await {
            Ok(status) if !status.running => return,
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(session_id = %session_id, error = %e, "status poll failed while waiting for exit");
                return;
            }
        }
        tokio::time::sleep(interval).await;
    }
}

#[cfg(test)]
#[path = "ralph_tests.rs"]
mod tests;
