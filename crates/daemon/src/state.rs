// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-repository wiring: builds one [`SessionService`] per configured
//! repository plus the shared spawner/process-tracker/watcher
//! infrastructure, and assembles them behind a single [`AppState`] the
//! listener and the iterative-loop driver both hold an `Arc` to.

use orc_adapters::{
    HeadlessSpawner, ProcessTracker, SandboxedSpawner, SessionWatcher, Spawner, VcsAdapter,
};
use orc_core::{ChangeEvent, Config, ExitEvent, RepoId, SessionId, SpawnerType, SystemClock};
use orc_engine::{HookExecutor, LoopController, MultiRepoService, ServiceError, SessionService};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{broadcast, oneshot, watch};

/// Capacity of the change-event broadcast bus a dashboard connection
/// subscribes to (`listener::serve_dashboard`). Sized generously since a
/// lagged receiver only drops its own oldest events, not other
/// subscribers'.
const EVENT_BUS_CAPACITY: usize = 1024;

#[derive(Debug, Error)]
pub enum StateError {
    #[error("repository {0} has no configured path entry")]
    MissingRepoId(String),

    #[error("failed to create directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Everything the listener and the ralph driver need: one
/// [`SessionService`] per repo (fanned out by [`MultiRepoService`]), the
/// shared spawner, the shared process tracker, and one [`SessionWatcher`]
/// per repo.
pub struct AppState {
    pub state_dir: PathBuf,
    pub config: Config,
    pub multi_repo: Arc<MultiRepoService<SystemClock>>,
    pub spawner: Arc<dyn Spawner>,
    /// The same instance as `spawner`, narrowed to its concrete type when
    /// that type is `HeadlessSpawner`, so the ralph driver can recover a
    /// pid for process-tracker registration. `None` when the configured
    /// spawner is `SandboxedSpawner`, which exposes no pid at all.
    pub headless: Option<Arc<HeadlessSpawner>>,
    pub process_tracker: Arc<ProcessTracker>,
    pub watchers: HashMap<RepoId, Arc<SessionWatcher>>,
    /// Exit waiters registered by the ralph driver, keyed by spawn id: a
    /// headless spawn's pid is tracked by `process_tracker`, and its exit
    /// callback resolves the matching waiter here instead of the ralph
    /// driver polling `get_status` itself. Sandboxed spawns have no pid to
    /// register, so the ralph driver polls `get_status` directly for them
    /// and never populates this map.
    pub exit_waiters: Mutex<HashMap<String, oneshot::Sender<ExitEvent>>>,
    /// One [`LoopController`] per session currently in (or ever put into)
    /// the iterative loop, created on first spawn/restart under
    /// `Mode::Iterative` and consulted by `Pause`/`Resume` requests as
    /// well as the driver task itself.
    pub loop_controllers: Mutex<HashMap<SessionId, Arc<LoopController>>>,
    pub started_at: chrono::DateTime<chrono::Utc>,
    /// Every change event observed across every repo's watcher, fanned out
    /// to dashboard connections (`listener::serve_dashboard`). Dropped
    /// silently when no dashboard is connected (`send` on a bus with no
    /// receivers is not an error).
    pub event_bus: broadcast::Sender<(RepoId, ChangeEvent)>,
    shutdown_tx: watch::Sender<bool>,
}

impl AppState {
    /// Build every repo's `SessionService`, the shared spawner and process
    /// tracker, and one watcher per repo, wiring watcher events into the
    /// multi-repo service's hook dispatch.
    pub fn build(state_dir: PathBuf, config: Config) -> Result<Arc<Self>, StateError> {
        let (spawner, headless): (Arc<dyn Spawner>, Option<Arc<HeadlessSpawner>>) =
            match config.ralph.spawner.as_ref().map(|s| s.kind) {
                Some(SpawnerType::Docker) => {
                    let docker_cfg = config
                        .ralph
                        .spawner
                        .as_ref()
                        .and_then(|s| s.docker.clone())
                        .unwrap_or(orc_core::DockerSpawnerConfig {
                            image: "orchestration/worker:latest".into(),
                            memory_limit: None,
                            cpu_limit: None,
                        });
                    (Arc::new(SandboxedSpawner::new(docker_cfg)), None)
                }
                _ => {
                    let headless = Arc::new(HeadlessSpawner::new());
                    (Arc::clone(&headless) as Arc<dyn Spawner>, Some(headless))
                }
            };

        let process_tracker = Arc::new(ProcessTracker::new());

        let sessions_root = state_dir.join("sessions");
        let mut services = HashMap::new();
        let mut watchers = HashMap::new();

        for (repo_key, repo_cfg) in &config.repos {
            let repo_id = RepoId::from(repo_key.as_str());
            let sessions_dir = sessions_root.join(repo_key);
            std::fs::create_dir_all(&sessions_dir).map_err(|source| StateError::CreateDir {
                path: sessions_dir.clone(),
                source,
            })?;

            let store = orc_storage::FileSessionStore::new(sessions_dir.clone());
            let vcs = VcsAdapter::new();
            let hooks = HookExecutor::new(std::time::Duration::from_secs(60));
            let service = Arc::new(SessionService::new(
                repo_id.clone(),
                repo_cfg.clone(),
                config.cli_command.clone(),
                store,
                vcs,
                Arc::clone(&spawner),
                hooks,
                SystemClock,
            ));
            services.insert(repo_id.clone(), service);

            let watcher = Arc::new(SessionWatcher::new(sessions_dir));
            watchers.insert(repo_id, watcher);
        }

        let hooks = HookExecutor::new(std::time::Duration::from_secs(60));
        let multi_repo = Arc::new(MultiRepoService::new(config.clone(), services, hooks));

        let (event_bus, _) = broadcast::channel(EVENT_BUS_CAPACITY);
        let (shutdown_tx, _) = watch::channel(false);

        let state = Arc::new(Self {
            state_dir,
            config,
            multi_repo,
            spawner,
            headless,
            process_tracker,
            watchers,
            exit_waiters: Mutex::new(HashMap::new()),
            loop_controllers: Mutex::new(HashMap::new()),
            started_at: chrono::Utc::now(),
            event_bus,
            shutdown_tx,
        });

        state.wire_watchers();
        state.wire_process_tracker();
        Ok(state)
    }

    fn wire_watchers(self: &Arc<Self>) {
        for (repo_id, watcher) in &self.watchers {
            let state = Arc::clone(self);
            let repo_id = repo_id.clone();
            watcher.on_event(move |event: ChangeEvent| {
                let state = Arc::clone(&state);
                let repo_id = repo_id.clone();
                tokio::spawn(async move {
                    state.multi_repo.handle_change_event(&repo_id, &event).await;
                    // A bus with no dashboard connected has no receivers;
                    // `send` returning an error in that case is expected,
                    // not a failure.
                    let _ = state.event_bus.send((repo_id, event));
                });
            });
            watcher.start();
        }
    }

    fn wire_process_tracker(self: &Arc<Self>) {
        let state = Arc::clone(self);
        self.process_tracker.on_exit(move |event: ExitEvent| {
            if let Some(tx) = state.exit_waiters.lock().remove(event.spawn_id.as_str()) {
                let _ = tx.send(event);
            }
        });
        self.process_tracker.start();
    }

    /// Every configured repository's `SessionService`, searched in
    /// insertion order, used to resolve a bare session id to its owning
    /// repository without requiring the CLI to track repo context for
    /// every session-scoped command (sessions are keyed by issue number
    /// today, so collisions across repos are possible but rare; the first
    /// match wins and is logged).
    pub fn find_session(
        &self,
        id: &SessionId,
    ) -> Result<(RepoId, orc_core::Session), ServiceError> {
        let mut found = None;
        for repo_id in self.multi_repo.repo_ids() {
            let Some(service) = self.multi_repo.service(repo_id) else {
                continue;
            };
            if let Ok(session) = service.get(id) {
                if found.is_some() {
                    tracing::warn!(session_id = %id, "session id resolved in more than one repo; using the first match");
                    break;
                }
                found = Some((repo_id.clone(), session));
            }
        }
        found.ok_or_else(|| ServiceError::NotFound(id.clone()))
    }

    /// Register a headless spawn's pid for exit-liveness polling and
    /// return the receiver half of the oneshot the process tracker's exit
    /// callback will resolve. `None` when the configured spawner is
    /// `SandboxedSpawner` (no pid to register) or the spawn id is not a
    /// pid-backed handle (e.g. a pty session); the ralph driver falls back
    /// to polling `Spawner::get_status` in that case.
    pub fn register_exit_wait(
        &self,
        session_id: SessionId,
        repo_id: RepoId,
        spawn_id: &orc_core::SpawnId,
    ) -> Option<oneshot::Receiver<ExitEvent>> {
        let headless = self.headless.as_ref()?;
        let pid = headless.pid(spawn_id)?;
        let started_at_epoch_ms = chrono::Utc::now().timestamp_millis().max(0) as u64;
        let (tx, rx) = oneshot::channel();
        self.exit_waiters.lock().insert(spawn_id.as_str().to_string(), tx);
        self.process_tracker.register(spawn_id.as_str(), session_id, repo_id, pid, started_at_epoch_ms);
        Some(rx)
    }

    /// The session's `LoopController`, creating one on first access.
    pub fn loop_controller_for(&self, session_id: &SessionId) -> Arc<LoopController> {
        let mut controllers = self.loop_controllers.lock();
        Arc::clone(controllers.entry(session_id.clone()).or_insert_with(|| {
            Arc::new(LoopController::new(self.config.ralph.max_iterations))
        }))
    }

    pub fn uptime_secs(&self) -> u64 {
        (chrono::Utc::now() - self.started_at).num_seconds().max(0) as u64
    }

    pub fn shutdown(&self) {
        self.process_tracker.stop();
        for watcher in self.watchers.values() {
            watcher.stop();
        }
    }

    /// A receiver that resolves once [`Self::request_shutdown`] is called,
    /// for the listener's accept loop to race against `listener.accept()`.
    pub fn shutdown_signal(&self) -> watch::Receiver<bool> {
        self.shutdown_tx.subscribe()
    }

    /// Requested by a `Request::Shutdown` control-socket call: tells the
    /// listener's accept loop to stop taking new connections.
    pub fn request_shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
