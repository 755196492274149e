// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn session_id_equals_issue_number_string() {
    let id = SessionId::new("42");
    assert_eq!(id.as_str(), "42");
}

#[test]
fn spawn_id_default_is_empty() {
    let id = SpawnId::default();
    assert_eq!(id.as_str(), "");
}

#[test]
fn repo_id_display() {
    let id = RepoId::new("my-repo");
    assert_eq!(id.to_string(), "my-repo");
}

#[test]
fn hook_name_from_str() {
    let id: HookName = "onSpawn".into();
    assert_eq!(id, "onSpawn");
}
