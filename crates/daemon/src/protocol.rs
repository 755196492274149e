// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Control-socket request/response vocabulary. One `Request` maps to
//! exactly one `Response`, except `HelloDashboard`, which upgrades the
//! connection to the push-channel framing (`PushServerMessage`/
//! `PushClientMessage` below) for the remainder of its lifetime instead of
//! the one-request-one-response pattern every other variant follows.

use orc_adapters::WorktreeDiffSummary;
use orc_core::{DeleteMode, IssueRef, Mode, RepoId, Session, SessionId, SessionStatus};
use orc_engine::{DeleteResult, HeartbeatResult};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// One repository's orphaned worktrees, for the `Orphans` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrphanGroup {
    pub repo: RepoId,
    pub worktree_paths: Vec<PathBuf>,
}

/// Requests sent from `orch` (the CLI) to `orcd` (the daemon) over the
/// Unix control socket.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Request {
    /// Version handshake; sent once per connection ahead of anything else.
    Hello { version: String },

    /// `spawn <issue> [--mode …]`. `repo` is resolved by the CLI from the
    /// current working directory's git root against the configured repos.
    Spawn {
        repo: RepoId,
        issue: IssueRef,
        mode: Mode,
        prompt_text: String,
        #[serde(default)]
        extra_env: Vec<(String, String)>,
    },

    /// `list [--all] [--json]`. `repo` narrows to one configured
    /// repository; `None` lists across every configured repository.
    /// `all` includes terminal-status sessions; otherwise only active ones.
    List {
        #[serde(default)]
        repo: Option<RepoId>,
        #[serde(default)]
        all: bool,
    },

    /// `get <session> [--json]`.
    Get { id: SessionId },

    /// `update --id <id> --status <status> [--reason <text>] [--pr <url>]`.
    Update {
        id: SessionId,
        status: SessionStatus,
        #[serde(default)]
        reason: Option<String>,
        #[serde(default)]
        pull_request_url: Option<String>,
    },

    /// `forward <session> <message>`.
    Forward { id: SessionId, message: String },

    /// `ack <session>`.
    Ack { id: SessionId },

    /// `pause <session>`.
    Pause { id: SessionId },

    /// `resume <session>`.
    Resume { id: SessionId },

    /// `restart <session>`.
    Restart {
        id: SessionId,
        #[serde(default)]
        iteration: Option<u32>,
    },

    /// `delete <session> [--mode …] [--force]`; `cancel` is the CLI alias
    /// for `Delete { mode: FolderOnly, force: false }`.
    Delete {
        id: SessionId,
        mode: DeleteMode,
        #[serde(default)]
        force: bool,
    },

    /// Retry a previously-failed deletion with a possibly different mode.
    RetryDelete { id: SessionId, mode: DeleteMode },

    /// `cancel-all [--keep-worktrees]`.
    CancelAll {
        #[serde(default)]
        keep_worktrees: bool,
    },

    /// `heartbeat --id <session> [-q]`. The daemon always records the
    /// heartbeat; `quiet` only affects whether the CLI prints anything.
    Heartbeat { id: SessionId },

    /// List orphaned worktrees detected across every configured repository.
    Orphans,

    /// Roll back a deletion that left an orphaned worktree behind
    /// (spec §7's partial-failure recovery for `delete`).
    RollbackDelete { id: SessionId },

    /// First frame on a dashboard connection, distinguishing it from a
    /// plain control-socket client so the listener can upgrade it to the
    /// push-channel framing described in SPEC_FULL.md's push channel
    /// section instead of dispatching it through `handle_request`.
    HelloDashboard,

    /// `daemon status`: uptime and a coarse activity count, without
    /// forcing the caller to fan out `List`/`Orphans` across every
    /// configured repository itself.
    Status,

    /// Ask the daemon to shut down cleanly.
    Shutdown,
}

/// Responses returned from `orcd` to `orch`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Response {
    Hello { version: String },
    Ok,
    Error { message: String },
    Session { session: Box<Session> },
    Sessions { sessions: Vec<Session> },
    SessionWithDiff { session: Box<Session>, diff: WorktreeDiffSummary },
    Heartbeat { outcome: HeartbeatResult },
    Deleted { outcome: DeleteResult },
    CancelAllResult {
        cancelled: Vec<SessionId>,
        failed: Vec<(SessionId, String)>,
    },
    Orphans { groups: Vec<OrphanGroup> },
    Status {
        uptime_secs: u64,
        repos_configured: usize,
        sessions_active: usize,
        orphan_count: usize,
    },
    ShuttingDown,
}

/// Push-channel messages, server to dashboard. Distinct enum from
/// `Response` since this connection class never speaks `Request`/`Response`
/// again once it sends `HelloDashboard`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum PushServerMessage {
    #[serde(rename = "add")]
    SessionAdd { session: Box<Session> },
    #[serde(rename = "update")]
    SessionUpdate { session: Box<Session> },
    #[serde(rename = "remove")]
    SessionRemove { session_id: SessionId },
    #[serde(rename = "connected")]
    TerminalConnected { session_id: SessionId },
    #[serde(rename = "data")]
    TerminalData { session_id: SessionId, bytes: Vec<u8> },
    #[serde(rename = "exit")]
    TerminalExit { session_id: SessionId, exit_code: Option<i32> },
    #[serde(rename = "error")]
    TerminalError { session_id: SessionId, message: String },
}

/// Push-channel messages, dashboard to server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum PushClientMessage {
    #[serde(rename = "subscribe")]
    Subscribe { session_id: SessionId },
    #[serde(rename = "unsubscribe")]
    Unsubscribe { session_id: SessionId },
    #[serde(rename = "input")]
    Input { session_id: SessionId, bytes: Vec<u8> },
    #[serde(rename = "resize")]
    Resize { session_id: SessionId, cols: u16, rows: u16 },
}

#[cfg(test)]
#[path = "protocol_tests.rs"]
mod tests;
