// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! orc-plan: deterministic parser for the plan file a planning agent
//! authors in a session's worktree (`IMPLEMENTATION_PLAN.md`) before the
//! iterative loop begins.
//!
//! Parsing never fails on a malformed *section* — a section without a
//! recognized description-checkbox line is dropped, not an error — but
//! reading the file itself can fail, hence the split between
//! [`parse_plan_text`] (infallible) and [`parse_plan_file`] (adds I/O).

mod parser;

pub use parser::{parse_plan_text, Plan, PlanError, PlanSummary, Task};

use std::path::Path;

/// Read and parse a plan file from disk.
pub fn parse_plan_file(path: &Path) -> Result<Plan, PlanError> {
    let text = std::fs::read_to_string(path).map_err(|source| PlanError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(parse_plan_text(&text))
}
