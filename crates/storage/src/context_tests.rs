// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use orc_core::{RepoId, SessionId, SessionStatus};
use tempfile::tempdir;

fn ctx() -> SessionContext {
    SessionContext {
        session_id: SessionId::new("42"),
        issue_number: 42,
        issue_title: "fix the thing".into(),
        repo_id: RepoId::new("acme-widgets"),
        branch: "session/42".into(),
        worktree_path: "/tmp/worktrees/42".into(),
        commands: SessionCommands {
            update: "orch update --id 42".into(),
            heartbeat: "orch heartbeat --id 42".into(),
        },
        record_path: "/home/u/.orchestration/acme-widgets/work-42.json".into(),
    }
}

#[test]
fn write_context_round_trips() {
    let dir = tempdir().unwrap();
    write_context(dir.path(), &ctx()).unwrap();

    let raw = std::fs::read_to_string(dir.path().join("session-context.json")).unwrap();
    let back: SessionContext = serde_json::from_str(&raw).unwrap();
    assert_eq!(back.session_id, SessionId::new("42"));
    assert_eq!(back.commands.update, "orch update --id 42");
}

#[test]
fn write_dynamic_state_round_trips() {
    let dir = tempdir().unwrap();
    let state = DynamicState {
        status: SessionStatus::Working,
        forwarded_message: Some("use option A".into()),
        updated_at: chrono::Utc::now(),
    };
    write_dynamic_state(dir.path(), &state).unwrap();

    let raw = std::fs::read_to_string(dir.path().join("session-state.json")).unwrap();
    let back: DynamicState = serde_json::from_str(&raw).unwrap();
    assert_eq!(back.status, SessionStatus::Working);
    assert_eq!(back.forwarded_message.as_deref(), Some("use option A"));
}

#[test]
fn write_context_creates_parent_directories() {
    let dir = tempdir().unwrap();
    let nested = dir.path().join("nested").join("worktree");
    write_context(&nested, &ctx()).unwrap();
    assert!(nested.join("session-context.json").exists());
}
