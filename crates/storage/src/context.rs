// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The worker's identity handle (`session-context.json`) and the optional
//! dynamic-state mirror (`session-state.json`), both written inside the
//! worktree at spawn time. Both use the same atomic write used by
//! [`crate::store::FileSessionStore`].

use chrono::{DateTime, Utc};
use orc_core::{RepoId, SessionId, SessionStatus};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use crate::store::StoreError;

/// Read-only identity handle written into the worktree at spawn time. This
/// is the worker's only way to learn who it is and how to call back.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionContext {
    pub session_id: SessionId,
    pub issue_number: u64,
    pub issue_title: String,
    pub repo_id: RepoId,
    pub branch: String,
    pub worktree_path: PathBuf,
    pub commands: SessionCommands,
    /// Absolute path back to `work-<id>.json`, for a worker that wants to
    /// read its own record directly instead of going through the CLI.
    pub record_path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionCommands {
    pub update: String,
    pub heartbeat: String,
}

/// Dynamic state mirror: written only when a repo's worker prompt was
/// authored to read status/forwarded-message from the worktree rather than
/// shelling out to the CLI.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DynamicState {
    pub status: SessionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub forwarded_message: Option<String>,
    pub updated_at: DateTime<Utc>,
}

fn atomic_write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), StoreError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| StoreError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    let tmp_path = path.with_extension(format!(
        "tmp-{}",
        path.extension().and_then(|e| e.to_str()).unwrap_or("json")
    ));
    {
        let file = File::create(&tmp_path).map_err(|source| StoreError::Io {
            path: tmp_path.clone(),
            source,
        })?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, value).map_err(|source| StoreError::Parse {
            path: tmp_path.clone(),
            source,
        })?;
        let file = writer.into_inner().map_err(|e| StoreError::Io {
            path: tmp_path.clone(),
            source: e.into_error(),
        })?;
        file.sync_all().map_err(|source| StoreError::Io {
            path: tmp_path.clone(),
            source,
        })?;
    }
    fs::rename(&tmp_path, path).map_err(|source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Write `session-context.json` at the worktree root.
pub fn write_context(worktree_path: &Path, context: &SessionContext) -> Result<(), StoreError> {
    atomic_write_json(&worktree_path.join("session-context.json"), context)
}

/// Write `session-state.json` at the worktree root.
pub fn write_dynamic_state(worktree_path: &Path, state: &DynamicState) -> Result<(), StoreError> {
    atomic_write_json(&worktree_path.join("session-state.json"), state)
}

#[cfg(test)]
#[path = "context_tests.rs"]
mod tests;
