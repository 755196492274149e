// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The session record and its supporting types.
//!
//! Heterogeneous record shapes across historical versions (single-issue vs
//! multi-issue, `issueNumber` vs `issue: {...}`) are upgraded on read: the
//! canonical shape below is the multi-field form, and `#[serde(default)]`
//! plus a couple of serde aliases absorb the legacy shapes.

use crate::ids::{RepoId, SessionId, SpawnId};
use crate::status::SessionStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Execution mode selected at spawn time; immutable thereafter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Mode {
    UserDriven,
    AutonomousOneShot,
    Iterative,
}

impl Default for Mode {
    fn default() -> Self {
        Mode::UserDriven
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Mode::UserDriven => "user-driven",
            Mode::AutonomousOneShot => "autonomous-one-shot",
            Mode::Iterative => "iterative",
        };
        write!(f, "{s}")
    }
}

/// The issue this session was spawned for. Immutable after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueRef {
    pub number: u64,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

impl Default for IssueRef {
    fn default() -> Self {
        Self { number: 0, title: String::new(), body: None }
    }
}

/// Deletion mode for [`crate::session::Session`] deletion requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DeleteMode {
    FolderOnly,
    WithLocalBranch,
    Everything,
}

/// Durable session record, persisted as `work-<id>.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    #[serde(default)]
    pub issue: IssueRef,
    pub status: SessionStatus,
    pub mode: Mode,
    #[serde(alias = "repo_id", alias = "repoId")]
    pub repo: RepoId,
    pub branch: String,
    pub worktree_path: std::path::PathBuf,
    pub started_at: DateTime<Utc>,
    pub last_heartbeat: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stuck_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub forwarded_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pull_request_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spawn_id: Option<SpawnId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iteration: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub review_cycle: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_review_feedback: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_status: Option<SessionStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deletion_error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub orphaned_worktree_path: Option<std::path::PathBuf>,

    // --- legacy shape absorption ---
    /// Older single-issue records stored a bare `issueNumber` instead of
    /// `issue: {number, title, ...}`. Present only to accept that shape on
    /// deserialize; never written by this crate (`issue` always is).
    #[serde(default, skip_serializing_if = "Option::is_none", rename = "issueNumber")]
    pub(crate) legacy_issue_number: Option<u64>,
}

impl Session {
    /// Is this session stale: active-for-staleness and no heartbeat for
    /// more than 90s?
    pub fn is_stale(&self, now: DateTime<Utc>) -> bool {
        self.status.is_active_for_staleness()
            && (now - self.last_heartbeat).num_milliseconds() > 90_000
    }

    /// Upgrade a deserialized record to the canonical shape, absorbing the
    /// legacy `issueNumber`-only form by synthesizing an `IssueRef` when the
    /// modern `issue` field was itself defaulted out (empty title, number 0)
    /// but a legacy number was present.
    pub fn canonicalize(mut self) -> Self {
        if let Some(n) = self.legacy_issue_number.take() {
            if self.issue.number == 0 {
                self.issue = IssueRef {
                    number: n,
                    title: String::new(),
                    body: None,
                };
            }
        }
        self
    }
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
