// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Version-control adapter: worktree create/remove, branch delete,
//! status/diff summary, and parsing of the remote URL into (owner, repo).
//!
//! Worktree creation tries `git worktree add -b <branch>` first and falls
//! back to an existing branch if that name is already taken; removal runs
//! `git worktree remove --force` and cleans up any remnants left on disk.
//! Every call is driven through [`crate::subprocess::run_with_timeout`].

use crate::subprocess::{run_with_timeout, GIT_WORKTREE_TIMEOUT, VCS_STATUS_TIMEOUT};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use thiserror::Error;
use tokio::process::Command;

#[derive(Debug, Error)]
pub enum VcsError {
    #[error("{command} failed: {stderr}")]
    CommandFailed { command: String, stderr: String },
    #[error("{0}")]
    Io(String),
    #[error("could not parse owner/repo from remote url: {0}")]
    UnparsableRemote(String),
}

/// Owner/repo extracted from a remote URL (`git@host:owner/repo.git` or
/// `https://host/owner/repo`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteIdentity {
    pub owner: String,
    pub repo: String,
}

/// Uncommitted-changes summary used by `delete` (non-force conflict check)
/// and by `get`'s worktree diff summary.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorktreeDiffSummary {
    pub files_changed: u32,
    pub insertions: u32,
    pub deletions: u32,
    pub dirty: bool,
}

/// Thin wrapper over the `git` binary. Every method shells out; callers on
/// the async runtime incur a suspension point per call.
#[derive(Debug, Clone, Default)]
pub struct VcsAdapter;

impl VcsAdapter {
    pub fn new() -> Self {
        Self
    }

    fn strip_git_env(cmd: &mut Command) {
        cmd.env_remove("GIT_DIR").env_remove("GIT_WORK_TREE");
    }

    async fn run(cmd: Command, description: &str) -> Result<std::process::Output, VcsError> {
        run_with_timeout(cmd, GIT_WORKTREE_TIMEOUT, description)
            .await
            .map_err(VcsError::Io)
    }

    /// Create a worktree at `worktree_path` on `branch`, starting from
    /// `start_point`. Tries `git worktree add -b <branch>` first; if that
    /// fails because the branch already exists, falls back to `git worktree
    /// add` against the existing branch ("create-with-new-branch
    /// falls back to create-with-existing-branch").
    pub async fn worktree_add(
        &self,
        repo_root: &Path,
        worktree_path: &Path,
        branch: &str,
        start_point: &str,
    ) -> Result<(), VcsError> {
        let mut cmd = Command::new("git");
        cmd.current_dir(repo_root).args([
            "worktree",
            "add",
            "-b",
            branch,
            &worktree_path.display().to_string(),
            start_point,
        ]);
        Self::strip_git_env(&mut cmd);
        let output = Self::run(cmd, "git worktree add -b").await?;
        if output.status.success() {
            return Ok(());
        }

        let stderr = String::from_utf8_lossy(&output.stderr).to_string();
        if !stderr.contains("already exists") {
            return Err(VcsError::CommandFailed {
                command: "git worktree add -b".into(),
                stderr,
            });
        }

        tracing::warn!(branch, %stderr, "branch already exists, retrying against existing branch");
        let mut fallback = Command::new("git");
        fallback
            .current_dir(repo_root)
            .args(["worktree", "add", &worktree_path.display().to_string(), branch]);
        Self::strip_git_env(&mut fallback);
        let output = Self::run(fallback, "git worktree add (existing branch)").await?;
        if output.status.success() {
            Ok(())
        } else {
            Err(VcsError::CommandFailed {
                command: "git worktree add (existing branch)".into(),
                stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            })
        }
    }

    /// Remove a worktree. Unregisters it with `git worktree remove --force`
    /// first (best-effort: failures here are swallowed, since a worktree
    /// whose directory was already deleted out-of-band is still "gone" from
    /// git's perspective after the directory cleanup below), then removes
    /// any remnants left on disk.
    pub async fn worktree_remove(
        &self,
        repo_root: &Path,
        worktree_path: &Path,
    ) -> Result<(), VcsError> {
        if worktree_path.join(".git").exists() {
            let mut cmd = Command::new("git");
            cmd.current_dir(repo_root).args([
                "worktree",
                "remove",
                "--force",
                &worktree_path.display().to_string(),
            ]);
            Self::strip_git_env(&mut cmd);
            let _ = Self::run(cmd, "git worktree remove").await;
        }

        if worktree_path.exists() {
            tokio::fs::remove_dir_all(worktree_path)
                .await
                .map_err(|e| VcsError::Io(format!("failed to remove worktree dir: {e}")))?;
        }
        Ok(())
    }

    /// Delete a branch. `remote` selects `git push origin --delete` vs a
    /// local `git branch -D`.
    pub async fn branch_delete(
        &self,
        repo_root: &Path,
        branch: &str,
        remote: bool,
    ) -> Result<(), VcsError> {
        let mut cmd = Command::new("git");
        cmd.current_dir(repo_root);
        if remote {
            cmd.args(["push", "origin", "--delete", branch]);
        } else {
            cmd.args(["branch", "-D", branch]);
        }
        Self::strip_git_env(&mut cmd);
        let output = Self::run(cmd, "git branch delete").await?;
        if output.status.success() {
            Ok(())
        } else {
            Err(VcsError::CommandFailed {
                command: "git branch delete".into(),
                stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            })
        }
    }

    /// Porcelain status + `--stat` diff summary for a worktree, used both
    /// to decide whether a non-force delete must be rejected and to answer
    /// `get`'s "computed worktree diff summary".
    pub async fn diff_summary(&self, worktree_path: &Path) -> Result<WorktreeDiffSummary, VcsError> {
        let mut status_cmd = Command::new("git");
        status_cmd
            .current_dir(worktree_path)
            .args(["status", "--porcelain"]);
        Self::strip_git_env(&mut status_cmd);
        let status_output = run_with_timeout(status_cmd, VCS_STATUS_TIMEOUT, "git status")
            .await
            .map_err(VcsError::Io)?;
        let dirty = !String::from_utf8_lossy(&status_output.stdout).trim().is_empty();

        let mut diff_cmd = Command::new("git");
        diff_cmd.current_dir(worktree_path).args(["diff", "--shortstat", "HEAD"]);
        Self::strip_git_env(&mut diff_cmd);
        let diff_output = run_with_timeout(diff_cmd, VCS_STATUS_TIMEOUT, "git diff --shortstat")
            .await
            .map_err(VcsError::Io)?;
        let stat = String::from_utf8_lossy(&diff_output.stdout);
        let (files_changed, insertions, deletions) = parse_shortstat(&stat);

        Ok(WorktreeDiffSummary {
            files_changed,
            insertions,
            deletions,
            dirty,
        })
    }

    /// Resolve the repository root for the git repository containing `dir`.
    pub async fn repo_root(&self, dir: &Path) -> Result<PathBuf, VcsError> {
        let mut cmd = Command::new("git");
        cmd.args(["-C", &dir.display().to_string(), "rev-parse", "--show-toplevel"]);
        Self::strip_git_env(&mut cmd);
        let output = run_with_timeout(cmd, VCS_STATUS_TIMEOUT, "git rev-parse")
            .await
            .map_err(VcsError::Io)?;
        if !output.status.success() {
            return Err(VcsError::CommandFailed {
                command: "git rev-parse --show-toplevel".into(),
                stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            });
        }
        Ok(PathBuf::from(
            String::from_utf8_lossy(&output.stdout).trim().to_string(),
        ))
    }

    /// Read the `origin` remote URL and parse it into (owner, repo), used
    /// to auto-discover `githubOwner`/`githubRepo` when the config omits
    /// them.
    pub async fn remote_identity(&self, repo_root: &Path) -> Result<RemoteIdentity, VcsError> {
        let mut cmd = Command::new("git");
        cmd.current_dir(repo_root)
            .args(["config", "--get", "remote.origin.url"]);
        Self::strip_git_env(&mut cmd);
        let output = run_with_timeout(cmd, VCS_STATUS_TIMEOUT, "git config remote.origin.url")
            .await
            .map_err(VcsError::Io)?;
        if !output.status.success() {
            return Err(VcsError::CommandFailed {
                command: "git config --get remote.origin.url".into(),
                stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            });
        }
        let url = String::from_utf8_lossy(&output.stdout).trim().to_string();
        parse_remote_url(&url)
    }
}

/// Parse `owner/repo` out of either the SSH (`git@host:owner/repo.git`) or
/// HTTPS (`https://host/owner/repo(.git)`) remote URL shapes.
pub fn parse_remote_url(url: &str) -> Result<RemoteIdentity, VcsError> {
    let re = Regex::new(r"(?:[:/])([^/:]+)/([^/]+?)(?:\.git)?/?$")
        .expect("static regex is valid");
    let caps = re
        .captures(url)
        .ok_or_else(|| VcsError::UnparsableRemote(url.to_string()))?;
    Ok(RemoteIdentity {
        owner: caps[1].to_string(),
        repo: caps[2].to_string(),
    })
}

fn parse_shortstat(stat: &str) -> (u32, u32, u32) {
    let files = extract_count(stat, r"(\d+) files? changed");
    let insertions = extract_count(stat, r"(\d+) insertions?\(\+\)");
    let deletions = extract_count(stat, r"(\d+) deletions?\(-\)");
    (files, insertions, deletions)
}

fn extract_count(text: &str, pattern: &str) -> u32 {
    Regex::new(pattern)
        .ok()
        .and_then(|re| re.captures(text))
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(0)
}

#[cfg(test)]
#[path = "vcs_tests.rs"]
mod tests;
