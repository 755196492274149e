// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event vocabulary shared between the change-notification pipeline, the
//! process tracker, and their consumers.
//!
//! A tagged enum is used in preference to separate event structs plus a
//! trait object: callers match once on `ChangeEvent::Added(...)` instead of
//! downcasting, and adding a new kind is a single new arm everywhere instead
//! of a new type implementing a marker trait.

use crate::ids::{RepoId, SessionId, SpawnId};
use crate::session::Session;
use serde::{Deserialize, Serialize};

/// One observation of a session record file changing on disk.
///
/// `Removed` carries no record: by the time a delete is observed the file
/// is already gone, so only the id is known.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChangeEvent {
    Added {
        session_id: SessionId,
        record: Box<Session>,
    },
    Updated {
        session_id: SessionId,
        record: Box<Session>,
    },
    Removed {
        session_id: SessionId,
    },
}

impl ChangeEvent {
    pub fn session_id(&self) -> &SessionId {
        match self {
            ChangeEvent::Added { session_id, .. }
            | ChangeEvent::Updated { session_id, .. }
            | ChangeEvent::Removed { session_id } => session_id,
        }
    }

    pub fn record(&self) -> Option<&Session> {
        match self {
            ChangeEvent::Added { record, .. } | ChangeEvent::Updated { record, .. } => {
                Some(record)
            }
            ChangeEvent::Removed { .. } => None,
        }
    }
}

/// Emitted by the process tracker when a tracked process/container is no
/// longer alive. Emitted exactly once per tracked id, then the id is
/// dropped from the tracker's in-memory set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExitEvent {
    pub session_id: SessionId,
    pub repo_id: RepoId,
    pub spawn_id: SpawnId,
    pub started_at_epoch_ms: u64,
    /// `None` when the platform could not recover an exit code (e.g. the
    /// process was reaped by something else first).
    pub exit_code: Option<i32>,
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
