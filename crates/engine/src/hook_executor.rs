// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Hook executor: runs a command hook's shell template with
//! literal `${var}` substitution, in a subshell rooted at the session's
//! worktree, under a timeout. Prompt hooks are never executed here — the
//! caller is responsible for injecting their literal text into the
//! worker's prompt at spawn time instead.

use std::path::Path;
use std::time::{Duration, Instant};
use tokio::process::Command;

/// The substitution variables available to a command hook template:
/// `${sessionId}`, `${issueNumber}`, `${repoId}`, `${worktreePath}`,
/// `${branch}`, `${status}`, `${issueTitle}`. Substitution is literal —
/// no quoting is applied, so badly authored templates are the author's
/// problem.
#[derive(Debug, Clone, Copy)]
pub struct HookVars<'a> {
    pub session_id: &'a str,
    pub issue_number: u64,
    pub repo_id: &'a str,
    pub worktree_path: &'a Path,
    pub branch: &'a str,
    pub status: &'a str,
    pub issue_title: &'a str,
}

pub fn substitute(template: &str, vars: &HookVars<'_>) -> String {
    template
        .replace("${sessionId}", vars.session_id)
        .replace("${issueNumber}", &vars.issue_number.to_string())
        .replace("${repoId}", vars.repo_id)
        .replace("${worktreePath}", &vars.worktree_path.display().to_string())
        .replace("${branch}", vars.branch)
        .replace("${status}", vars.status)
        .replace("${issueTitle}", vars.issue_title)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookOutcome {
    pub success: bool,
    pub output: Option<String>,
    pub error: Option<String>,
    pub duration_ms: u64,
}

/// Runs the literal substituted command line through a subshell. One
/// instance is shared process-wide; `timeout` is the default 60s from
/// overridable per construction.
#[derive(Debug, Clone)]
pub struct HookExecutor {
    timeout: Duration,
}

impl Default for HookExecutor {
    fn default() -> Self {
        Self::new(Duration::from_secs(60))
    }
}

impl HookExecutor {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Substitute `vars` into `command_template` and run it with `sh -c`,
    /// working directory set to `worktree_path`. Never panics or hangs:
    /// a timeout becomes `{success: false, error: "timeout"}`.
    pub async fn run_command(
        &self,
        command_template: &str,
        worktree_path: &Path,
        vars: &HookVars<'_>,
    ) -> HookOutcome {
        let command = substitute(command_template, vars);
        let start = Instant::now();

        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg(&command).current_dir(worktree_path);

        let outcome = tokio::time::timeout(self.timeout, cmd.output()).await;
        let duration_ms = start.elapsed().as_millis() as u64;

        match outcome {
            Ok(Ok(output)) => HookOutcome {
                success: output.status.success(),
                output: Some(String::from_utf8_lossy(&output.stdout).into_owned()),
                error: if output.status.success() {
                    None
                } else {
                    Some(String::from_utf8_lossy(&output.stderr).into_owned())
                },
                duration_ms,
            },
            Ok(Err(e)) => HookOutcome {
                success: false,
                output: None,
                error: Some(e.to_string()),
                duration_ms,
            },
            Err(_elapsed) => HookOutcome {
                success: false,
                output: None,
                error: Some("timeout".to_string()),
                duration_ms,
            },
        }
    }
}

#[cfg(test)]
#[path = "hook_executor_tests.rs"]
mod tests;
