// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The iterative-loop ("ralph") controller: a per-session
//! state machine driving spawn -> wait-for-exit -> evaluate-plan ->
//! re-spawn cycles.
//!
//! Modeled as an explicit state machine behind a mutex rather than a
//! coroutine ("implement as an explicit state
//! machine with a single driver task per session"). [`LoopController`]
//! itself holds no spawner/store references — it only tracks state and
//! decides the next action; the daemon's per-session driver task owns the
//! actual spawn/respawn calls through [`crate::session_service::SessionService`].

use orc_plan::Plan;
use parking_lot::Mutex;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Idle,
    Running,
    WaitingExit,
    Evaluating,
    Paused,
    Completed,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoopStatus {
    pub state: LoopState,
    pub iteration: u32,
    pub failure_reason: Option<String>,
}

#[derive(Debug, Error)]
pub enum LoopError {
    #[error("loop is already running")]
    AlreadyRunning,
    #[error("loop is not paused")]
    NotPaused,
}

/// What the driver task should do next after an exit has been evaluated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoopDecision {
    /// All tasks done (either the worker signaled `complete`, or the plan
    /// has zero remaining tasks). The driver should call
    /// `service.update(id, Complete)` and stop.
    Completed,
    /// The budget was exhausted or the plan could not be read. The driver
    /// should stop without mutating the session's own status.
    Failed(String),
    /// More work remains and the budget allows another attempt. The
    /// driver should wait `iteration_delay` and call `restart` again.
    Respawn { iteration: u32 },
}

/// Per-session iterative-loop state machine.
pub struct LoopController {
    max_iterations: u32,
    status: Mutex<LoopStatus>,
}

impl LoopController {
    pub fn new(max_iterations: u32) -> Self {
        Self {
            max_iterations,
            status: Mutex::new(LoopStatus {
                state: LoopState::Idle,
                iteration: 0,
                failure_reason: None,
            }),
        }
    }

    pub fn status(&self) -> LoopStatus {
        self.status.lock().clone()
    }

    pub fn state(&self) -> LoopState {
        self.status.lock().state
    }

    /// `idle -> running`. Sets `iteration = 1`. The caller is responsible
    /// for checking the session exists and is not in a terminal state
    /// before calling this (the controller has no session reference).
    pub fn start(&self) -> Result<(), LoopError> {
        let mut s = self.status.lock();
        if s.state != LoopState::Idle {
            return Err(LoopError::AlreadyRunning);
        }
        s.state = LoopState::Running;
        s.iteration = 1;
        s.failure_reason = None;
        Ok(())
    }

    /// `running -> waiting-exit`, called immediately after the spawn for
    /// this iteration completes.
    pub fn enter_waiting_exit(&self) {
        let mut s = self.status.lock();
        if s.state == LoopState::Running {
            s.state = LoopState::WaitingExit;
        }
    }

    /// `waiting-exit -> evaluating -> {completed, failed, running}`.
    ///
    /// `status_signal` is the literal content of `.claude/worker-status`.
    /// The signal file takes precedence over the configured `doneSignal`;
    /// `done_signal_met` is the caller's resolution of that config against
    /// whatever it guards (a marker file, an exit code) and must be `false`
    /// whenever `status_signal` was present and recognized.
    /// `plan` is `None` when the plan file could not be read or parsed,
    /// which is itself a failure ("plan parse failure in
    /// evaluating -> failed with parse diagnostic").
    pub fn evaluate(
        &self,
        status_signal: Option<&str>,
        done_signal_met: bool,
        plan: Option<&Plan>,
    ) -> LoopDecision {
        let mut s = self.status.lock();
        s.state = LoopState::Evaluating;

        if status_signal == Some("complete") || done_signal_met {
            s.state = LoopState::Completed;
            return LoopDecision::Completed;
        }
        // `task_done` falls through to the plan re-check below, same as
        // any other/missing signal content or an unmet configured signal.

        let Some(plan) = plan else {
            let reason = "plan parse diagnostic: plan file unavailable".to_string();
            s.state = LoopState::Failed;
            s.failure_reason = Some(reason.clone());
            return LoopDecision::Failed(reason);
        };

        if plan.is_promise_met() {
            s.state = LoopState::Completed;
            return LoopDecision::Completed;
        }

        s.iteration += 1;
        if s.iteration > self.max_iterations {
            let reason = "iteration budget exhausted".to_string();
            s.state = LoopState::Failed;
            s.failure_reason = Some(reason.clone());
            return LoopDecision::Failed(reason);
        }

        s.state = LoopState::Running;
        LoopDecision::Respawn { iteration: s.iteration }
    }

    /// Any state -> `idle`. The caller is responsible for the best-effort
    /// `spawner.stop(spawnId)` call; the controller only tracks state.
    pub fn stop(&self) {
        let mut s = self.status.lock();
        s.state = LoopState::Idle;
    }

    /// The controller enters `paused` when the worker signals `stuck`;
    /// `continue_loop` is the operator's manual advance back to `running`.
    pub fn pause(&self) {
        let mut s = self.status.lock();
        if matches!(
            s.state,
            LoopState::Running | LoopState::WaitingExit | LoopState::Evaluating
        ) {
            s.state = LoopState::Paused;
        }
    }

    pub fn continue_loop(&self) -> Result<(), LoopError> {
        let mut s = self.status.lock();
        if s.state != LoopState::Paused {
            return Err(LoopError::NotPaused);
        }
        s.state = LoopState::Running;
        Ok(())
    }

    /// Spawner failure while `running`, or any other externally-observed
    /// fatal condition: `-> failed` with the given diagnostic.
    pub fn fail(&self, reason: impl Into<String>) {
        let mut s = self.status.lock();
        s.state = LoopState::Failed;
        s.failure_reason = Some(reason.into());
    }
}

#[cfg(test)]
#[path = "loop_controller_tests.rs"]
mod tests;
