// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Resolve the current working directory's configured repository.
//!
//! There is no `.oj`-style project marker in this system — a "repo" is just
//! an entry in the central config's `repos` map, keyed by a short id and
//! pointing at a path. Resolution walks up from the cwd to the nearest git
//! root, then matches that root's canonical path against each configured
//! repo's canonical path.

use anyhow::{anyhow, Result};
use orc_core::{Config, RepoId};
use std::path::{Path, PathBuf};

/// Resolve which configured repo the current command applies to.
///
/// `explicit` takes priority (an `--repo <id>` flag); it must name a repo
/// present in `config.repos`. Otherwise, the repo is inferred from the
/// nearest enclosing git root of `cwd`.
pub fn resolve_repo(config: &Config, cwd: &Path, explicit: Option<&str>) -> Result<RepoId> {
    if let Some(id) = explicit {
        if config.repos.contains_key(id) {
            return Ok(RepoId::new(id));
        }
        return Err(anyhow!("no repo named '{id}' in config"));
    }

    let git_root = find_git_root(cwd);

    if let Some(ref root) = git_root {
        for (id, repo) in &config.repos {
            if paths_match(root, &repo.path) {
                return Ok(RepoId::new(id.clone()));
            }
        }
    }

    match config.repos.len() {
        0 => Err(anyhow!("no repos configured; add one to ~/.orchestration/config.json")),
        1 => Ok(RepoId::new(config.repos.keys().next().expect("len checked above").clone())),
        _ => Err(anyhow!(
            "current directory does not match any configured repo; pass --repo explicitly"
        )),
    }
}

fn paths_match(a: &Path, b: &Path) -> bool {
    let canon_a = std::fs::canonicalize(a).unwrap_or_else(|_| a.to_path_buf());
    let canon_b = std::fs::canonicalize(b).unwrap_or_else(|_| b.to_path_buf());
    canon_a == canon_b
}

fn find_git_root(start: &Path) -> Option<PathBuf> {
    let mut current = start.to_path_buf();
    loop {
        if current.join(".git").exists() {
            return Some(current);
        }
        if !current.pop() {
            return None;
        }
    }
}

#[cfg(test)]
#[path = "repo_tests.rs"]
mod tests;
