// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Multi-repository service: fans the single-repo
//! session service across every configured repository, dispatches change
//! events from the watcher, fires status-edge hooks with at-least-once,
//! dedup-by-previous-status semantics, and detects orphan worktrees.

use crate::hook_executor::{HookExecutor, HookVars};
use crate::session_service::SessionService;
use orc_core::{ChangeEvent, Clock, Config, RepoId, Session, SessionId, SessionStatus};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, Default)]
struct PrevState {
    status: Option<SessionStatus>,
    had_pull_request_url: bool,
}

/// Fans out across every configured repository's [`SessionService`].
pub struct MultiRepoService<C: Clock> {
    config: Config,
    services: HashMap<RepoId, Arc<SessionService<C>>>,
    hooks: HookExecutor,
    previous: Mutex<HashMap<(RepoId, SessionId), PrevState>>,
}

impl<C: Clock> MultiRepoService<C> {
    pub fn new(config: Config, services: HashMap<RepoId, Arc<SessionService<C>>>, hooks: HookExecutor) -> Self {
        Self {
            config,
            services,
            hooks,
            previous: Mutex::new(HashMap::new()),
        }
    }

    pub fn service(&self, repo_id: &RepoId) -> Option<&Arc<SessionService<C>>> {
        self.services.get(repo_id)
    }

    pub fn repo_ids(&self) -> impl Iterator<Item = &RepoId> {
        self.services.keys()
    }

    /// React to one change event observed in `repo_id`'s sessions
    /// directory: re-evaluate status and fire transition-edge hooks.
    /// Idempotent per key: replaying the same event twice fires nothing
    /// the second time, since the previous-status map has already
    /// absorbed it.
    pub async fn handle_change_event(&self, repo_id: &RepoId, event: &ChangeEvent) {
        let key = (repo_id.clone(), event.session_id().clone());

        let Some(record) = event.record() else {
            self.previous.lock().remove(&key);
            return;
        };

        let prev = self.previous.lock().get(&key).copied().unwrap_or_default();
        let now_pr = record.pull_request_url.is_some();

        if record.status == SessionStatus::Stuck && prev.status != Some(SessionStatus::Stuck) {
            self.fire_hook(repo_id, "onStuck", record).await;
        }
        if record.status == SessionStatus::Complete && prev.status != Some(SessionStatus::Complete) {
            self.fire_hook(repo_id, "onComplete", record).await;
        }
        if record.status == SessionStatus::Shipping && now_pr && !prev.had_pull_request_url {
            self.fire_hook(repo_id, "onShip", record).await;
        }

        self.previous.lock().insert(
            key,
            PrevState {
                status: Some(record.status),
                had_pull_request_url: now_pr,
            },
        );
    }

    /// Fires `name` for `session` against `repo_id`'s effective hook
    /// configuration, if one is set and it's a command hook. Exposed
    /// beyond status-edge dispatch above so the iterative loop driver can
    /// fire `onTest`/`onIteration` at its own points in the cycle.
    pub async fn fire_hook(&self, repo_id: &RepoId, name: &str, session: &Session) {
        let Some(repo_config) = self.config.repos.get(repo_id.as_str()) else {
            return;
        };
        let Some(hook) = self.config.effective_hook(repo_config, name) else {
            return;
        };
        if !hook.is_command() {
            // Prompt hooks are injected into the worker's prompt at spawn
            // time, never executed here.
            return;
        }

        let vars = HookVars {
            session_id: session.id.as_str(),
            issue_number: session.issue.number,
            repo_id: repo_id.as_str(),
            worktree_path: &session.worktree_path,
            branch: &session.branch,
            status: &session.status.to_string(),
            issue_title: &session.issue.title,
        };
        let outcome = self.hooks.run_command(hook.value(), &session.worktree_path, &vars).await;
        if !outcome.success {
            tracing::warn!(
                repo = repo_id.as_str(),
                session_id = %session.id,
                hook = name,
                error = ?outcome.error,
                "hook failed"
            );
        }
    }

    /// Orphan worktrees across every configured repository.
    pub fn detect_orphans(&self) -> HashMap<RepoId, Vec<PathBuf>> {
        let mut out = HashMap::new();
        for (repo_id, service) in &self.services {
            match service.detect_orphans() {
                Ok(orphans) if !orphans.is_empty() => {
                    out.insert(repo_id.clone(), orphans);
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(repo = repo_id.as_str(), error = %e, "orphan detection failed");
                }
            }
        }
        out
    }
}

#[cfg(test)]
#[path = "multi_repo_tests.rs"]
mod tests;
