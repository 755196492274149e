// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn parse_mode_accepts_known_values() {
    assert_eq!(parse_mode("user-driven").unwrap(), Mode::UserDriven);
    assert_eq!(parse_mode("autonomous-one-shot").unwrap(), Mode::AutonomousOneShot);
    assert_eq!(parse_mode("iterative").unwrap(), Mode::Iterative);
}

#[test]
fn parse_mode_rejects_unknown_value() {
    assert!(parse_mode("yolo").is_err());
}

#[test]
fn parse_delete_mode_accepts_known_values() {
    assert_eq!(parse_delete_mode("folder-only").unwrap(), DeleteMode::FolderOnly);
    assert_eq!(parse_delete_mode("with-local-branch").unwrap(), DeleteMode::WithLocalBranch);
    assert_eq!(parse_delete_mode("everything").unwrap(), DeleteMode::Everything);
}

#[test]
fn parse_status_round_trips_through_display() {
    for status in [
        SessionStatus::Registered,
        SessionStatus::Planning,
        SessionStatus::PlanningComplete,
        SessionStatus::Working,
        SessionStatus::Shipping,
        SessionStatus::ReviewsInProgress,
        SessionStatus::PrReady,
        SessionStatus::Stuck,
        SessionStatus::Paused,
        SessionStatus::Complete,
        SessionStatus::Cancelled,
    ] {
        assert_eq!(parse_status(&status.to_string()).unwrap(), status);
    }
}

#[test]
fn parse_status_rejects_transition_only_states() {
    assert!(parse_status("deleting").is_err());
    assert!(parse_status("deletion_failed").is_err());
}
