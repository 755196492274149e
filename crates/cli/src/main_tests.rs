// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use clap::error::ErrorKind;

use super::cli_command;

#[test]
fn version_short() {
    let err = cli_command().try_get_matches_from(["orch", "-V"]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DisplayVersion);
}

#[test]
fn version_long() {
    let err = cli_command().try_get_matches_from(["orch", "--version"]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DisplayVersion);
}

#[test]
fn spawn_requires_issue_argument() {
    let err = cli_command().try_get_matches_from(["orch", "spawn"]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
}

#[test]
fn spawn_accepts_issue_and_mode() {
    let matches = cli_command()
        .try_get_matches_from(["orch", "spawn", "42", "--mode", "iterative"])
        .unwrap();
    let (name, sub) = matches.subcommand().unwrap();
    assert_eq!(name, "spawn");
    assert_eq!(sub.get_one::<u64>("issue").copied(), Some(42));
}

#[test]
fn update_rejects_transition_only_status_value() {
    let err = cli_command()
        .try_get_matches_from(["orch", "update", "--id", "1", "--status", "deleting"])
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ValueValidation);
}

#[test]
fn delete_mode_defaults_to_folder_only() {
    let matches = cli_command().try_get_matches_from(["orch", "delete", "7"]).unwrap();
    let (_, sub) = matches.subcommand().unwrap();
    assert_eq!(
        sub.get_one::<orc_core::DeleteMode>("mode").copied(),
        Some(orc_core::DeleteMode::FolderOnly)
    );
}

#[test]
fn cancel_is_a_distinct_subcommand_from_delete() {
    let matches = cli_command().try_get_matches_from(["orch", "cancel", "9"]).unwrap();
    assert_eq!(matches.subcommand().unwrap().0, "cancel");
}

#[test]
fn global_output_flag_is_accepted_before_and_after_subcommand() {
    assert!(cli_command()
        .try_get_matches_from(["orch", "-o", "json", "list"])
        .is_ok());
    assert!(cli_command()
        .try_get_matches_from(["orch", "list", "-o", "json"])
        .is_ok());
}

#[test]
fn help_does_not_panic_clap_debug_assertions() {
    // `Cli::command()` runs clap's internal `debug_assert!` validation of
    // the derive output; any ID/conflict mistake in the `Commands` enum
    // would panic here before a single argument is ever parsed.
    cli_command().debug_assert();
}
