// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process tracker: periodic liveness polling of registered process ids,
//! emitting an exit event to registered callbacks when a tracked process
//! is no longer alive.
//!
//! The tracked set is in-memory only; callers must re-register after a
//! restart. Liveness is checked by refreshing the process table entry for
//! the pid rather than signaling it, so no `unsafe` is required.

use crate::env::process_tracker_poll_ms;
use orc_core::{ExitEvent, RepoId, SessionId};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use sysinfo::{Pid, System};
use tokio::sync::oneshot;

type ExitCallback = Box<dyn Fn(ExitEvent) + Send + Sync>;

/// A process registered for liveness polling.
#[derive(Debug, Clone)]
pub struct TrackedProcess {
    pub session_id: SessionId,
    pub repo_id: RepoId,
    pub pid: u32,
    pub started_at_epoch_ms: u64,
}

/// Returns whether `pid` still exists, by refreshing just that entry in
/// the process table.
fn pid_is_alive(pid: u32) -> bool {
    let sys_pid = Pid::from_u32(pid);
    let mut system = System::new();
    system.refresh_process(sys_pid);
    system.process(sys_pid).is_some()
}

/// Tracks process ids for liveness and fans out exit events to registered
/// callbacks. One tracker instance is shared by the whole daemon process.
pub struct ProcessTracker {
    tracked: Arc<Mutex<HashMap<String, TrackedProcess>>>,
    callbacks: Arc<Mutex<Vec<ExitCallback>>>,
    shutdown: Mutex<Option<oneshot::Sender<()>>>,
}

impl Default for ProcessTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessTracker {
    pub fn new() -> Self {
        Self {
            tracked: Arc::new(Mutex::new(HashMap::new())),
            callbacks: Arc::new(Mutex::new(Vec::new())),
            shutdown: Mutex::new(None),
        }
    }

    /// Register a process for liveness polling, keyed by `spawn_id`.
    pub fn register(
        &self,
        spawn_id: &str,
        session_id: SessionId,
        repo_id: RepoId,
        pid: u32,
        started_at_epoch_ms: u64,
    ) {
        self.tracked.lock().insert(
            spawn_id.to_string(),
            TrackedProcess {
                session_id,
                repo_id,
                pid,
                started_at_epoch_ms,
            },
        );
    }

    /// Stop tracking a process without emitting an exit event (used when
    /// the caller already knows the outcome, e.g. after an explicit stop).
    pub fn deregister(&self, spawn_id: &str) {
        self.tracked.lock().remove(spawn_id);
    }

    /// Register a one-shot callback invoked for every exit event this
    /// tracker detects, in registration order.
    pub fn on_exit<F>(&self, callback: F)
    where
        F: Fn(ExitEvent) + Send + Sync + 'static,
    {
        self.callbacks.lock().push(Box::new(callback));
    }

    pub fn tracked_count(&self) -> usize {
        self.tracked.lock().len()
    }

    pub fn list_tracked(&self) -> Vec<TrackedProcess> {
        self.tracked.lock().values().cloned().collect()
    }

    /// Run one poll pass immediately, returning the exit events detected.
    /// Exposed directly so tests don't need to wait out the poll interval.
    pub fn poll_once(&self) -> Vec<ExitEvent> {
        let dead: Vec<(String, TrackedProcess)> = {
            let tracked = self.tracked.lock();
            tracked
                .iter()
                .filter(|(_, t)| !pid_is_alive(t.pid))
                .map(|(id, t)| (id.clone(), t.clone()))
                .collect()
        };

        let mut events = Vec::with_capacity(dead.len());
        for (spawn_id, t) in dead {
            self.tracked.lock().remove(&spawn_id);
            let event = ExitEvent {
                session_id: t.session_id,
                repo_id: t.repo_id,
                spawn_id: orc_core::SpawnId::new(spawn_id),
                started_at_epoch_ms: t.started_at_epoch_ms,
                exit_code: None,
            };
            for callback in self.callbacks.lock().iter() {
                callback(event.clone());
            }
            events.push(event);
        }
        events
    }

    /// Spawn the background poll loop on the current tokio runtime. Returns
    /// a guard; dropping it does not stop the loop — call [`Self::stop`].
    pub fn start(self: &Arc<Self>) {
        let (tx, mut rx) = oneshot::channel();
        *self.shutdown.lock() = Some(tx);
        let tracker = Arc::clone(self);
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = &mut rx => return,
                    _ = tokio::time::sleep(process_tracker_poll_ms()) => {
                        tracker.poll_once();
                    }
                }
            }
        });
    }

    pub fn stop(&self) {
        if let Some(tx) = self.shutdown.lock().take() {
            let _ = tx.send(());
        }
    }
}

#[cfg(test)]
#[path = "process_tracker_tests.rs"]
mod tests;
