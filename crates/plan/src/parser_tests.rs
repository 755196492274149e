// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

const SAMPLE: &str = "\
### Task 0: Setup
- [ ] **Description**: scaffold the crate
- **Phase**: 1
- **Files**: Cargo.toml, src/lib.rs

### Task 1: Core
- [x] **Description**: implement the core algorithm
- **Depends On**: 0
- **Acceptance**: all unit tests pass
- **Test**: cargo test -p core

### Task 2: Bad
This section has no recognized checkbox line, so it is dropped.
";

#[test]
fn sample_plan_yields_exactly_two_tasks() {
    let plan = parse_plan_text(SAMPLE);
    assert_eq!(plan.tasks.len(), 2);
    assert_eq!(plan.tasks[0].number, 0);
    assert_eq!(plan.tasks[1].number, 1);
}

#[test]
fn sample_plan_summary_matches_scenario() {
    let plan = parse_plan_text(SAMPLE);
    let summary = plan.summary();
    assert_eq!(summary.total, 2);
    assert_eq!(summary.complete, 1);
    assert_eq!(summary.incomplete, 1);
}

#[test]
fn current_task_is_the_first_unchecked() {
    let plan = parse_plan_text(SAMPLE);
    let current = plan.current_task().expect("task 0 is unchecked");
    assert_eq!(current.number, 0);
}

#[test]
fn malformed_section_is_fully_dropped_not_just_uncheckboxed() {
    let plan = parse_plan_text(SAMPLE);
    assert!(plan.tasks.iter().all(|t| t.number != 2));
}

#[test]
fn fields_are_parsed_from_their_own_sections() {
    let plan = parse_plan_text(SAMPLE);
    assert_eq!(plan.tasks[0].phase, 1);
    assert_eq!(
        plan.tasks[0].files,
        vec!["Cargo.toml".to_string(), "src/lib.rs".to_string()]
    );
    assert_eq!(plan.tasks[1].depends_on, vec![0]);
    assert_eq!(plan.tasks[1].acceptance, "all unit tests pass");
    assert_eq!(plan.tasks[1].test, "cargo test -p core");
}

#[test]
fn missing_fields_default_to_sensible_zeros() {
    let plan = parse_plan_text(SAMPLE);
    assert_eq!(plan.tasks[0].acceptance, "");
    assert_eq!(plan.tasks[0].test, "");
    assert!(plan.tasks[1].parallel_with.is_empty());
    assert_eq!(plan.tasks[1].phase, 0);
}

#[yare::parameterized(
    uppercase_x_is_not_checked = { "- [X] **Description**: d", false },
    lowercase_x_is_checked = { "- [x] **Description**: d", true },
    space_is_unchecked = { "- [ ] **Description**: d", false },
)]
fn checkbox_matching_is_case_sensitive(line: &str, expected_complete: bool) {
    let text = format!("### Task 0: T\n{line}\n");
    let plan = parse_plan_text(&text);
    assert_eq!(plan.tasks[0].complete, expected_complete);
}

#[test]
fn empty_plan_has_no_current_task_and_promise_not_met() {
    let plan = parse_plan_text("");
    assert!(plan.current_task().is_none());
    assert!(!plan.is_promise_met());
}

#[test]
fn is_promise_met_requires_non_empty_and_all_checked() {
    let all_checked = "\
### Task 0: A
- [x] **Description**: a

### Task 1: B
- [x] **Description**: b
";
    assert!(parse_plan_text(all_checked).is_promise_met());

    let one_unchecked = "\
### Task 0: A
- [x] **Description**: a

### Task 1: B
- [ ] **Description**: b
";
    assert!(!parse_plan_text(one_unchecked).is_promise_met());
}

#[test]
fn sections_without_description_checkbox_are_skipped_entirely() {
    let text = "\
### Task 0: Orphan
Some prose with no checkbox at all.

### Task 1: Real
- [ ] **Description**: real task
";
    let plan = parse_plan_text(text);
    assert_eq!(plan.tasks.len(), 1);
    assert_eq!(plan.tasks[0].number, 1);
}

#[test]
fn parse_plan_file_reads_from_disk() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("IMPLEMENTATION_PLAN.md");
    std::fs::write(&path, SAMPLE).expect("write plan");
    let plan = crate::parse_plan_file(&path).expect("parse plan file");
    assert_eq!(plan.tasks.len(), 2);
}

#[test]
fn parse_plan_file_missing_is_an_io_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("missing.md");
    let err = crate::parse_plan_file(&path).expect_err("should fail to read");
    assert!(matches!(err, PlanError::Io { .. }));
}
