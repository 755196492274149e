// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory spawner fake for tests in other crates (the engine's loop
//! controller and session service, chiefly) that need a `Spawner` without
//! shelling out to tmux or docker.

use super::{SpawnOutcome, SpawnRequest, Spawner, SpawnerError, StopResult, WorkerStatus};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use orc_core::SpawnId;
use parking_lot::Mutex;
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub enum SpawnerCall {
    Spawn(SpawnRequest),
    Stop(SpawnId),
    GetStatus(SpawnId),
}

#[derive(Clone)]
struct FakeState {
    running: bool,
    exit_code: Option<i32>,
}

/// Records every call it receives and answers from pre-seeded state. Each
/// `spawn` is assigned a sequential id (`fake-1`, `fake-2`, ...) unless the
/// request carries no seeded failure.
pub struct FakeSpawner {
    available: Mutex<bool>,
    next_id: Mutex<u64>,
    should_fail: Mutex<bool>,
    states: Mutex<HashMap<String, FakeState>>,
    calls: Mutex<Vec<SpawnerCall>>,
    spawned_at: DateTime<Utc>,
}

impl Default for FakeSpawner {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeSpawner {
    pub fn new() -> Self {
        Self {
            available: Mutex::new(true),
            next_id: Mutex::new(1),
            should_fail: Mutex::new(false),
            states: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            spawned_at: Utc::now(),
        }
    }

    pub fn set_available(&self, available: bool) {
        *self.available.lock() = available;
    }

    pub fn set_should_fail(&self, should_fail: bool) {
        *self.should_fail.lock() = should_fail;
    }

    /// Mark a previously spawned id as exited, as the process tracker would
    /// observe after polling the OS.
    pub fn mark_exited(&self, spawn_id: &SpawnId, exit_code: Option<i32>) {
        if let Some(state) = self.states.lock().get_mut(spawn_id.as_str()) {
            state.running = false;
            state.exit_code = exit_code;
        }
    }

    pub fn calls(&self) -> Vec<SpawnerCall> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl Spawner for FakeSpawner {
    fn name(&self) -> &'static str {
        "fake"
    }

    async fn is_available(&self) -> bool {
        *self.available.lock()
    }

    async fn spawn(&self, request: SpawnRequest) -> Result<SpawnOutcome, SpawnerError> {
        self.calls.lock().push(SpawnerCall::Spawn(request.clone()));
        if *self.should_fail.lock() {
            return Ok(SpawnOutcome {
                success: false,
                spawn_id: SpawnId::new(String::new()),
                spawned_at: self.spawned_at,
                error: Some("seeded failure".to_string()),
            });
        }
        let mut next_id = self.next_id.lock();
        let spawn_id = SpawnId::new(format!("fake-{next_id}"));
        *next_id += 1;
        self.states.lock().insert(
            spawn_id.as_str().to_string(),
            FakeState {
                running: true,
                exit_code: None,
            },
        );
        Ok(SpawnOutcome {
            success: true,
            spawn_id,
            spawned_at: self.spawned_at,
            error: None,
        })
    }

    async fn stop(&self, spawn_id: &SpawnId) -> Result<StopResult, SpawnerError> {
        self.calls.lock().push(SpawnerCall::Stop(spawn_id.clone()));
        let mut states = self.states.lock();
        match states.get_mut(spawn_id.as_str()) {
            Some(state) => {
                state.running = false;
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
        self.calls
            .lock()
            .push(SpawnerCall::GetStatus(spawn_id.clone()));
        match self.states.lock().get(spawn_id.as_str()) {
            Some(state) => Ok(WorkerStatus {
                running: state.running,
                exit_code: state.exit_code,
            }),
            None => Err(SpawnerError::StatusFailed(format!(
                "unknown spawn id {spawn_id}"
            ))),
        }
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
