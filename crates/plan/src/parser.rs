// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The parser itself.
//!
//! A task section begins at a line matching `### Task N: Title`. Within a
//! section, the first line matching `- [ ] **Description**: ...` or
//! `- [x] **Description**: ...` is the task's checkbox; the checkbox
//! character match is case-sensitive, so `[X]` is not "checked" — only the
//! literal lowercase `x` is. A section with no such line is dropped
//! entirely: it never becomes a [`Task`], and its other fields (even if
//! present) are never read.

use regex::Regex;
use std::path::PathBuf;
use std::sync::LazyLock;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PlanError {
    #[error("failed to read plan file at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// One task section successfully parsed out of a plan file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    pub number: u32,
    pub title: String,
    pub description: String,
    pub complete: bool,
    pub phase: u32,
    pub depends_on: Vec<u32>,
    pub parallel_with: Vec<u32>,
    pub acceptance: String,
    pub files: Vec<String>,
    pub test: String,
}

/// Completion counts over a parsed plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PlanSummary {
    pub total: usize,
    pub complete: usize,
    pub incomplete: usize,
}

/// The ordered set of tasks extracted from one plan file, in document
/// order (not sorted by task number — a plan author may interleave).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Plan {
    pub tasks: Vec<Task>,
}

impl Plan {
    pub fn summary(&self) -> PlanSummary {
        let total = self.tasks.len();
        let complete = self.tasks.iter().filter(|t| t.complete).count();
        PlanSummary {
            total,
            complete,
            incomplete: total - complete,
        }
    }

    /// The first task whose checkbox is unchecked, in document order.
    /// `None` if every task is checked, or if there are no tasks at all.
    pub fn current_task(&self) -> Option<&Task> {
        self.tasks.iter().find(|t| !t.complete)
    }

    /// True iff the plan is non-empty and every task is checked.
    pub fn is_promise_met(&self) -> bool {
        !self.tasks.is_empty() && self.tasks.iter().all(|t| t.complete)
    }
}

static HEADER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^###\s+Task\s+(\d+):\s*(.+?)\s*$").expect("static regex"));

static DESCRIPTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^-\s*\[([^\]])\]\s*\*\*Description\*\*:\s*(.*)$").expect("static regex")
});

fn field_re(label: &str) -> Regex {
    Regex::new(&format!(r"\*\*{label}\*\*:\s*(.*)")).expect("dynamic field regex is valid")
}

fn first_match<'a>(re: &Regex, text: &'a str) -> Option<&'a str> {
    text.lines()
        .find_map(|line| re.captures(line))
        .map(|c| c.get(1).expect("group 1 always present").as_str().trim())
}

fn parse_int_list(raw: &str) -> Vec<u32> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter_map(|s| s.parse::<u32>().ok())
        .collect()
}

fn parse_string_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Parse plan text into an ordered set of tasks. Never fails: sections
/// without a recognized description-checkbox line are silently skipped.
pub fn parse_plan_text(text: &str) -> Plan {
    let headers: Vec<(usize, u32, String)> = HEADER_RE
        .captures_iter(text)
        .filter_map(|caps| {
            let m = caps.get(0)?;
            let number: u32 = caps[1].parse().ok()?;
            let title = caps[2].trim().to_string();
            Some((m.start(), number, title))
        })
        .collect();

    let mut tasks = Vec::with_capacity(headers.len());
    for (i, (start, number, title)) in headers.iter().enumerate() {
        let end = headers.get(i + 1).map(|h| h.0).unwrap_or(text.len());
        let section = &text[*start..end];

        let Some(desc_caps) = section
            .lines()
            .find_map(|line| DESCRIPTION_RE.captures(line))
        else {
            continue;
        };
        let complete = &desc_caps[1] == "x";
        let description = desc_caps[2].trim().to_string();

        let phase = first_match(&field_re("Phase"), section)
            .and_then(|s| s.parse::<u32>().ok())
            .unwrap_or(0);
        let depends_on = first_match(&field_re("Depends On"), section)
            .map(parse_int_list)
            .unwrap_or_default();
        let parallel_with = first_match(&field_re("Parallel With"), section)
            .map(parse_int_list)
            .unwrap_or_default();
        let acceptance = first_match(&field_re("Acceptance"), section)
            .unwrap_or_default()
            .to_string();
        let files = first_match(&field_re("Files"), section)
            .map(parse_string_list)
            .unwrap_or_default();
        let test = first_match(&field_re("Test"), section)
            .unwrap_or_default()
            .to_string();

        tasks.push(Task {
            number: *number,
            title: title.clone(),
            description,
            complete,
            phase,
            depends_on,
            parallel_with,
            acceptance,
            files,
            test,
        });
    }

    Plan { tasks }
}

#[cfg(test)]
#[path = "parser_tests.rs"]
mod tests;
