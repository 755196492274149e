// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Append-only structured progress log (`.claude/progress.json`).
//!
//! Unlike the session record and context files, this one is append-only:
//! each append reads the current log (or starts an empty one), pushes an
//! entry, refreshes `updated_at`, and writes the whole document back with
//! the same atomic rename used elsewhere in this crate.

use chrono::{DateTime, Utc};
use orc_core::SessionId;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::Path;

use crate::store::StoreError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressEntry {
    pub timestamp: DateTime<Utc>,
    pub session_id: SessionId,
    pub issue_number: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iteration: Option<u32>,
    pub total_tasks: u32,
    pub completed_tasks: u32,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressLog {
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub entries: Vec<ProgressEntry>,
}

impl ProgressLog {
    fn new(now: DateTime<Utc>) -> Self {
        Self {
            created_at: now,
            updated_at: now,
            entries: Vec::new(),
        }
    }
}

fn progress_path(worktree_path: &Path) -> std::path::PathBuf {
    worktree_path.join(".claude").join("progress.json")
}

/// Read the progress log, if it exists. A malformed file is treated as a
/// parse failure rather than silently discarded: the progress log is
/// orchestrator-owned, so corruption here is unexpected.
pub fn read_progress_log(worktree_path: &Path) -> Result<Option<ProgressLog>, StoreError> {
    let path = progress_path(worktree_path);
    if !path.exists() {
        return Ok(None);
    }
    let file = File::open(&path).map_err(|source| StoreError::Io {
        path: path.clone(),
        source,
    })?;
    let reader = BufReader::new(file);
    let log: ProgressLog = serde_json::from_reader(reader).map_err(|source| StoreError::Parse {
        path: path.clone(),
        source,
    })?;
    Ok(Some(log))
}

/// Append `entry`, creating the log if absent.
pub fn append_progress_entry(
    worktree_path: &Path,
    now: DateTime<Utc>,
    entry: ProgressEntry,
) -> Result<(), StoreError> {
    let path = progress_path(worktree_path);
    let mut log = read_progress_log(worktree_path)?.unwrap_or_else(|| ProgressLog::new(now));
    log.entries.push(entry);
    log.updated_at = now;

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| StoreError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    let tmp_path = path.with_extension("tmp-json");
    {
        let file = File::create(&tmp_path).map_err(|source| StoreError::Io {
            path: tmp_path.clone(),
            source,
        })?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, &log).map_err(|source| StoreError::Parse {
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
    fs::rename(&tmp_path, &path).map_err(|source| StoreError::Io {
        path: path.clone(),
        source,
    })
}

#[cfg(test)]
#[path = "progress_tests.rs"]
mod tests;
