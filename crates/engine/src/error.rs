// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The error taxonomy at the service boundary: not-found,
//! conflict, external-subprocess failure, parse failure, timeout, and
//! deletion-failure. Downstream callers (the daemon listener, the CLI) map
//! these onto exit codes / HTTP statuses; this crate only classifies.

use orc_core::{SessionId, TransitionError};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("no session {0}")]
    NotFound(SessionId),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("{0} failed: {1}")]
    ExternalFailure(&'static str, String),

    #[error("parse failure: {0}")]
    Parse(String),

    #[error("{operation} timed out after {elapsed_ms}ms")]
    Timeout { operation: String, elapsed_ms: u64 },

    #[error("deletion failed: {reason}")]
    DeletionFailed {
        orphaned_worktree_path: PathBuf,
        reason: String,
    },
}

impl From<TransitionError> for ServiceError {
    fn from(e: TransitionError) -> Self {
        ServiceError::Conflict(e.to_string())
    }
}

impl From<orc_adapters::VcsError> for ServiceError {
    fn from(e: orc_adapters::VcsError) -> Self {
        ServiceError::ExternalFailure("git", e.to_string())
    }
}

impl From<orc_adapters::SpawnerError> for ServiceError {
    fn from(e: orc_adapters::SpawnerError) -> Self {
        ServiceError::ExternalFailure("spawner", e.to_string())
    }
}

impl From<orc_storage::StoreError> for ServiceError {
    fn from(e: orc_storage::StoreError) -> Self {
        ServiceError::ExternalFailure("store", e.to_string())
    }
}
