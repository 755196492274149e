// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session lifecycle manager: owns every mutation of one
//! repository's session records. Coordinates the vcs adapter (worktree
//! create/teardown), the file store (record persistence), the spawner
//! (worker process launch), and the hook executor (`onSpawn`).

use crate::error::ServiceError;
use crate::hook_executor::{HookExecutor, HookVars};
use orc_adapters::{Spawner, SpawnRequest, VcsAdapter};
use orc_core::{
    Clock, DeleteMode, IssueRef, Mode, RepoConfig, RepoId, Session, SessionId, SessionStatus,
    SpawnId,
};
use orc_storage::{
    write_context, write_dynamic_state, DynamicState, FileSessionStore, SessionCommands,
    SessionContext,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;

/// Outcome of a `delete` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteResult {
    pub success: bool,
    pub error: Option<String>,
    pub orphaned_worktree_path: Option<PathBuf>,
}

/// Outcome of a `heartbeat` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeartbeatResult {
    pub recorded: bool,
    pub has_message: bool,
}

/// Owns every mutation of session records for a single configured
/// repository. `C: Clock` so staleness/heartbeat timestamps are
/// deterministic under test.
pub struct SessionService<C: Clock> {
    repo_id: RepoId,
    repo: RepoConfig,
    cli_command: String,
    store: FileSessionStore,
    vcs: VcsAdapter,
    spawner: Arc<dyn Spawner>,
    hooks: HookExecutor,
    clock: C,
}

impl<C: Clock> SessionService<C> {
    pub fn new(
        repo_id: RepoId,
        repo: RepoConfig,
        cli_command: String,
        store: FileSessionStore,
        vcs: VcsAdapter,
        spawner: Arc<dyn Spawner>,
        hooks: HookExecutor,
        clock: C,
    ) -> Self {
        Self {
            repo_id,
            repo,
            cli_command,
            store,
            vcs,
            spawner,
            hooks,
            clock,
        }
    }

    pub fn repo_id(&self) -> &RepoId {
        &self.repo_id
    }

    /// `<repo-dir-name>-<prefix><issue>`, a sibling of the repo root when
    /// `worktreeRoot` is unconfigured, else `worktreeRoot/<prefix><issue>`
    /// (spec.md scenario 1: `/repos/x` -> `/repos/x-issue-42/`).
    fn worktree_path(&self, issue_number: u64) -> PathBuf {
        let name = format!("{}{}", self.repo.worktree_prefix, issue_number);
        match &self.repo.worktree_root {
            Some(root) => root.join(name),
            None => {
                let repo_dir_name = self
                    .repo
                    .path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                let sibling_name = format!("{repo_dir_name}-{name}");
                self.repo
                    .path
                    .parent()
                    .map(|p| p.join(&sibling_name))
                    .unwrap_or_else(|| PathBuf::from(sibling_name))
            }
        }
    }

    fn branch_name(issue_number: u64) -> String {
        format!("issue-{issue_number}")
    }

    fn session_id_for(issue_number: u64) -> SessionId {
        SessionId::new(issue_number.to_string())
    }

    fn prompt_path(worktree_path: &std::path::Path) -> PathBuf {
        worktree_path.join(".claude").join("session-prompt.md")
    }

    fn status_signal_path(worktree_path: &std::path::Path) -> PathBuf {
        worktree_path.join(".claude").join("worker-status")
    }

    pub fn status_signal(&self, session: &Session) -> Option<String> {
        std::fs::read_to_string(Self::status_signal_path(&session.worktree_path))
            .ok()
            .map(|s| s.trim().to_string())
    }

    /// Create a worktree, persist the record, launch the worker, fire
    /// `onSpawn` non-fatally. Rolls back the worktree and/or record on any
    /// failure before the worker is actually launched.
    pub async fn spawn(
        &self,
        issue: IssueRef,
        mode: Mode,
        prompt_text: &str,
        extra_env: Vec<(String, String)>,
    ) -> Result<Session, ServiceError> {
        let id = Self::session_id_for(issue.number);
        if self.store.exists(&id) {
            return Err(ServiceError::Conflict(format!(
                "session for issue {} already exists",
                issue.number
            )));
        }

        let worktree_path = self.worktree_path(issue.number);
        let branch = Self::branch_name(issue.number);
        let now = self.clock.now_iso();

        let mut session = Session {
            id: id.clone(),
            issue,
            status: SessionStatus::Registered,
            mode,
            repo: self.repo_id.clone(),
            branch: branch.clone(),
            worktree_path: worktree_path.clone(),
            started_at: now,
            last_heartbeat: now,
            stuck_reason: None,
            forwarded_message: None,
            pull_request_url: None,
            spawn_id: None,
            iteration: None,
            review_cycle: None,
            last_review_feedback: None,
            previous_status: None,
            deletion_error: None,
            orphaned_worktree_path: None,
            legacy_issue_number: None,
        };
        self.store.save(&session)?;

        let base_branch = self.repo.base_branch.as_deref().unwrap_or("HEAD");
        if let Err(e) = self
            .vcs
            .worktree_add(&self.repo.path, &worktree_path, &branch, base_branch)
            .await
        {
            let _ = self.store.delete(&id);
            return Err(e.into());
        }

        let prompt_path = Self::prompt_path(&worktree_path);
        if let Some(parent) = prompt_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                ServiceError::ExternalFailure("write prompt", e.to_string())
            })?;
        }
        std::fs::write(&prompt_path, prompt_text)
            .map_err(|e| ServiceError::ExternalFailure("write prompt", e.to_string()))?;

        let cli_command = self.repo.cli_command.clone().unwrap_or_else(|| self.cli_command.clone());
        let context = SessionContext {
            session_id: id.clone(),
            issue_number: session.issue.number,
            issue_title: session.issue.title.clone(),
            repo_id: self.repo_id.clone(),
            branch: branch.clone(),
            worktree_path: worktree_path.clone(),
            commands: SessionCommands {
                update: format!("{cli_command} update --id {}", id.as_str()),
                heartbeat: format!("{cli_command} heartbeat --id {}", id.as_str()),
            },
            record_path: self.store.path_for(&id),
        };
        write_context(&worktree_path, &context)?;

        let request = SpawnRequest {
            command: cli_command,
            prompt_file: prompt_path,
            context_file: worktree_path.join("session-context.json"),
            worktree_path: worktree_path.clone(),
            env: extra_env,
            use_pty: false,
        };
        let outcome = match self.spawner.spawn(request).await {
            Ok(outcome) if outcome.success => outcome,
            Ok(outcome) => {
                let _ = self.vcs.worktree_remove(&self.repo.path, &worktree_path).await;
                let _ = self.store.delete(&id);
                return Err(ServiceError::ExternalFailure(
                    "spawner",
                    outcome.error.unwrap_or_else(|| "spawn failed".to_string()),
                ));
            }
            Err(e) => {
                let _ = self.vcs.worktree_remove(&self.repo.path, &worktree_path).await;
                let _ = self.store.delete(&id);
                return Err(e.into());
            }
        };

        session.spawn_id = Some(outcome.spawn_id);
        session.status = SessionStatus::Working;
        self.store.save(&session)?;

        let vars = HookVars {
            session_id: id.as_str(),
            issue_number: session.issue.number,
            repo_id: self.repo_id.as_str(),
            worktree_path: &worktree_path,
            branch: &branch,
            status: "working",
            issue_title: &session.issue.title,
        };
        if let Some(hook) = self.repo.hooks.get("onSpawn") {
            if hook.is_command() {
                let outcome = self.hooks.run_command(hook.value(), &worktree_path, &vars).await;
                if !outcome.success {
                    tracing::warn!(session_id = %id, error = ?outcome.error, "onSpawn hook failed");
                }
            }
        }

        Ok(session)
    }

    /// All records, sorted by issue number, transparently garbage-collecting
    /// ones whose worktree has vanished (unless mid-delete): the stale
    /// record is removed from the store, not just filtered from the result.
    pub fn list(&self) -> Result<Vec<Session>, ServiceError> {
        let all = self.store.list_all()?;
        let mut out = Vec::with_capacity(all.len());
        for session in all {
            let deleting = matches!(
                session.status,
                SessionStatus::Deleting | SessionStatus::DeletionFailed
            );
            if !deleting && !session.worktree_path.exists() {
                if let Err(e) = self.store.delete(&session.id) {
                    tracing::warn!(session_id = %session.id, error = %e, "failed to garbage-collect vanished-worktree record");
                }
                continue;
            }
            out.push(session);
        }
        Ok(out)
    }

    pub fn get(&self, id: &SessionId) -> Result<Session, ServiceError> {
        self.store
            .load(id)?
            .ok_or_else(|| ServiceError::NotFound(id.clone()))
    }

    /// Validate and apply a status transition. Hook firing for
    /// status-edge transitions is the multi-repo service's job, reacting
    /// to the resulting change event, not this method's.
    pub fn update(
        &self,
        id: &SessionId,
        next: SessionStatus,
        reason: Option<String>,
        pull_request_url: Option<String>,
    ) -> Result<Session, ServiceError> {
        let mut session = self.get(id)?;
        session.status.validate_transition(next)?;

        if next == SessionStatus::Stuck && reason.is_none() {
            return Err(ServiceError::Conflict(
                "transition to stuck requires a reason".to_string(),
            ));
        }

        session.previous_status = Some(session.status);
        session.status = next;
        if next == SessionStatus::Stuck {
            session.stuck_reason = reason;
        } else {
            session.stuck_reason = None;
        }
        if let Some(url) = pull_request_url {
            session.pull_request_url = Some(url);
        }
        session.last_heartbeat = self.clock.now_iso();
        self.store.save(&session)?;

        write_dynamic_state(
            &session.worktree_path,
            &DynamicState {
                status: session.status,
                forwarded_message: session.forwarded_message.clone(),
                updated_at: session.last_heartbeat,
            },
        )?;

        Ok(session)
    }

    pub fn heartbeat(&self, id: &SessionId) -> Result<HeartbeatResult, ServiceError> {
        let mut session = self.get(id)?;
        session.last_heartbeat = self.clock.now_iso();
        let has_message = session.forwarded_message.is_some();
        self.store.save(&session)?;
        Ok(HeartbeatResult {
            recorded: true,
            has_message,
        })
    }

    pub fn forward(&self, id: &SessionId, message: String) -> Result<Session, ServiceError> {
        let mut session = self.get(id)?;
        session.forwarded_message = Some(message);
        self.store.save(&session)?;
        Ok(session)
    }

    pub fn acknowledge(&self, id: &SessionId) -> Result<Session, ServiceError> {
        let mut session = self.get(id)?;
        session.forwarded_message = None;
        self.store.save(&session)?;
        Ok(session)
    }

    /// Idempotent: pausing an already-paused session just refreshes the
    /// heartbeat, it does not error.
    pub fn pause(&self, id: &SessionId) -> Result<Session, ServiceError> {
        let mut session = self.get(id)?;
        if session.status != SessionStatus::Paused {
            session.status.validate_transition(SessionStatus::Paused)?;
            session.previous_status = Some(session.status);
            session.status = SessionStatus::Paused;
        }
        session.last_heartbeat = self.clock.now_iso();
        self.store.save(&session)?;
        Ok(session)
    }

    /// Idempotent: resuming a session that is not paused just refreshes
    /// the heartbeat, it does not error.
    pub fn resume(&self, id: &SessionId) -> Result<Session, ServiceError> {
        let mut session = self.get(id)?;
        if session.status == SessionStatus::Paused {
            session.status.validate_transition(SessionStatus::Working)?;
            session.previous_status = Some(session.status);
            session.status = SessionStatus::Working;
        }
        session.last_heartbeat = self.clock.now_iso();
        self.store.save(&session)?;
        Ok(session)
    }

    /// Re-run the spawner in the existing worktree and rotate `spawnId`.
    /// Does not itself force a status change.
    pub async fn restart(
        &self,
        id: &SessionId,
        iteration: Option<u32>,
    ) -> Result<Session, ServiceError> {
        let mut session = self.get(id)?;
        if session.status.is_terminal()
            || matches!(
                session.status,
                SessionStatus::Deleting | SessionStatus::DeletionFailed
            )
        {
            return Err(ServiceError::Conflict(format!(
                "cannot restart session in status {}",
                session.status
            )));
        }

        if let Some(old_spawn_id) = &session.spawn_id {
            let _ = self.spawner.stop(old_spawn_id).await;
        }

        let cli_command = self
            .repo
            .cli_command
            .clone()
            .unwrap_or_else(|| self.cli_command.clone());
        let request = SpawnRequest {
            command: cli_command,
            prompt_file: Self::prompt_path(&session.worktree_path),
            context_file: session.worktree_path.join("session-context.json"),
            worktree_path: session.worktree_path.clone(),
            env: Vec::new(),
            use_pty: false,
        };
        let outcome = self.spawner.spawn(request).await?;
        if !outcome.success {
            return Err(ServiceError::ExternalFailure(
                "spawner",
                outcome.error.unwrap_or_else(|| "restart failed".to_string()),
            ));
        }

        session.spawn_id = Some(outcome.spawn_id);
        session.iteration = Some(iteration.unwrap_or_else(|| session.iteration.unwrap_or(0) + 1));
        session.last_heartbeat = self.clock.now_iso();
        self.store.save(&session)?;
        Ok(session)
    }

    /// Non-force delete fails closed on a dirty worktree.
    pub async fn delete(
        &self,
        id: &SessionId,
        mode: DeleteMode,
        force: bool,
    ) -> Result<DeleteResult, ServiceError> {
        let mut session = self.get(id)?;
        session.previous_status = Some(session.status);
        session.status = SessionStatus::Deleting;
        self.store.save(&session)?;

        if !force {
            match self.vcs.diff_summary(&session.worktree_path).await {
                Ok(summary) if summary.dirty => {
                    let reason = format!(
                        "worktree has uncommitted changes ({} file(s))",
                        summary.files_changed
                    );
                    session.status = SessionStatus::DeletionFailed;
                    session.deletion_error = Some(reason.clone());
                    session.orphaned_worktree_path = Some(session.worktree_path.clone());
                    self.store.save(&session)?;
                    return Ok(DeleteResult {
                        success: false,
                        error: Some(reason),
                        orphaned_worktree_path: Some(session.worktree_path),
                    });
                }
                Ok(_) => {}
                Err(_) => {}
            }
        }

        if let Err(e) = self.vcs.worktree_remove(&self.repo.path, &session.worktree_path).await {
            let reason = e.to_string();
            session.status = SessionStatus::DeletionFailed;
            session.deletion_error = Some(reason.clone());
            session.orphaned_worktree_path = Some(session.worktree_path.clone());
            self.store.save(&session)?;
            return Ok(DeleteResult {
                success: false,
                error: Some(reason),
                orphaned_worktree_path: Some(session.worktree_path),
            });
        }

        match mode {
            DeleteMode::FolderOnly => {}
            DeleteMode::WithLocalBranch => {
                let _ = self.vcs.branch_delete(&self.repo.path, &session.branch, false).await;
            }
            DeleteMode::Everything => {
                let _ = self.vcs.branch_delete(&self.repo.path, &session.branch, false).await;
                let _ = self.vcs.branch_delete(&self.repo.path, &session.branch, true).await;
            }
        }

        self.store.delete(id)?;
        Ok(DeleteResult {
            success: true,
            error: None,
            orphaned_worktree_path: None,
        })
    }

    /// Retry a non-force delete that previously left the session
    /// `deletion_failed`.
    pub async fn retry_delete(&self, id: &SessionId, mode: DeleteMode) -> Result<DeleteResult, ServiceError> {
        let session = self.get(id)?;
        if session.status != SessionStatus::DeletionFailed {
            return Err(ServiceError::Conflict(
                "retry-delete requires a deletion_failed session".to_string(),
            ));
        }
        self.delete(id, mode, false).await
    }

    /// Directories matching this repo's worktree naming convention with no
    /// corresponding session record (an "orphan worktree").
    pub fn detect_orphans(&self) -> Result<Vec<PathBuf>, ServiceError> {
        let known: std::collections::HashSet<PathBuf> =
            self.store.list_all()?.into_iter().map(|s| s.worktree_path).collect();

        let (scan_dir, match_prefix) = match &self.repo.worktree_root {
            Some(root) => (root.clone(), self.repo.worktree_prefix.clone()),
            None => {
                let repo_dir_name = self
                    .repo
                    .path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                let scan_dir = self.repo.path.parent().map(|p| p.to_path_buf()).unwrap_or_default();
                (scan_dir, format!("{repo_dir_name}-{}", self.repo.worktree_prefix))
            }
        };

        let mut orphans = Vec::new();
        let Ok(read_dir) = std::fs::read_dir(&scan_dir) else {
            return Ok(orphans);
        };
        for entry in read_dir.filter_map(|e| e.ok()) {
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with(&match_prefix) && !known.contains(&path) {
                orphans.push(path);
            }
        }
        Ok(orphans)
    }

    /// Restore a `deletion_failed` session to its pre-delete status.
    pub fn rollback_delete(&self, id: &SessionId) -> Result<Session, ServiceError> {
        let mut session = self.get(id)?;
        if session.status != SessionStatus::DeletionFailed {
            return Err(ServiceError::Conflict(
                "rollback-delete requires a deletion_failed session".to_string(),
            ));
        }
        session.status = session.previous_status.unwrap_or(SessionStatus::Working);
        session.previous_status = None;
        session.deletion_error = None;
        session.orphaned_worktree_path = None;
        self.store.save(&session)?;
        Ok(session)
    }
}

#[cfg(test)]
#[path = "session_service_tests.rs"]
mod tests;
