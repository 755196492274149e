// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Change-notification pipeline: watches a project's sessions directory
//! for `work-*.json` files and fans out add/update/remove events.
//!
//! A best-effort native file
//! watcher drives a debounced rescan, with a polling fallback if the
//! native watcher can't be created (e.g. an exhausted inotify instance
//! limit). Both paths converge on the same rescan-and-diff routine so a
//! test can drive the logic directly without waiting on filesystem events.

use crate::env::watcher_poll_ms;
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use orc_core::{ChangeEvent, Session};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;
use tokio::sync::{mpsc, oneshot};

/// Alias kept for callers that think in terms of "what the watcher saw"
/// rather than "what changed in the domain model" — the two coincide.
pub type WatchEvent = ChangeEvent;

type Callback = Box<dyn Fn(ChangeEvent) + Send + Sync>;

#[derive(Clone)]
struct FileState {
    modified: SystemTime,
}

fn session_id_from_filename(name: &str) -> Option<String> {
    name.strip_prefix("work-")
        .and_then(|rest| rest.strip_suffix(".json"))
        .map(|id| id.to_string())
}

fn is_session_file(name: &str) -> bool {
    name.starts_with("work-") && name.ends_with(".json")
}

/// Watches `dir` for `work-*.json` files and delivers [`ChangeEvent`]s to
/// every registered callback, in registration order, on every rescan.
pub struct SessionWatcher {
    dir: PathBuf,
    callbacks: Arc<parking_lot::Mutex<Vec<Callback>>>,
    known: Arc<parking_lot::Mutex<HashMap<String, FileState>>>,
    shutdown: parking_lot::Mutex<Option<oneshot::Sender<()>>>,
}

impl SessionWatcher {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            callbacks: Arc::new(parking_lot::Mutex::new(Vec::new())),
            known: Arc::new(parking_lot::Mutex::new(HashMap::new())),
            shutdown: parking_lot::Mutex::new(None),
        }
    }

    pub fn on_event<F>(&self, callback: F)
    where
        F: Fn(ChangeEvent) + Send + Sync + 'static,
    {
        self.callbacks.lock().push(Box::new(callback));
    }

    /// Scan `dir` once, diff against the previously known file set, and
    /// deliver any resulting events. Returns the events delivered, mainly
    /// for test assertions.
    pub fn rescan_once(&self) -> Vec<ChangeEvent> {
        let entries = list_session_files(&self.dir);
        let mut events = Vec::new();
        let mut known = self.known.lock();

        let mut seen = std::collections::HashSet::new();
        for (name, modified, path) in &entries {
            seen.insert(name.clone());
            let changed = match known.get(name) {
                None => true,
                Some(prev) => prev.modified != *modified,
            };
            if !changed {
                continue;
            }
            match read_and_parse(path) {
                Ok(session) => {
                    let session_id = session.id.clone();
                    let is_new = !known.contains_key(name);
                    known.insert(
                        name.clone(),
                        FileState {
                            modified: *modified,
                        },
                    );
                    events.push(if is_new {
                        ChangeEvent::Added {
                            session_id,
                            record: Box::new(session),
                        }
                    } else {
                        ChangeEvent::Updated {
                            session_id,
                            record: Box::new(session),
                        }
                    });
                }
                Err(e) => {
                    tracing::warn!(file = %path.display(), error = %e, "dropping unparsable session file");
                }
            }
        }

        let removed: Vec<String> = known
            .keys()
            .filter(|name| !seen.contains(*name))
            .cloned()
            .collect();
        for name in removed {
            known.remove(&name);
            if let Some(session_id) = session_id_from_filename(&name) {
                events.push(ChangeEvent::Removed {
                    session_id: session_id.into(),
                });
            }
        }
        drop(known);

        let callbacks = self.callbacks.lock();
        for event in &events {
            for callback in callbacks.iter() {
                let event = event.clone();
                let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                    callback(event);
                }));
                if result.is_err() {
                    tracing::error!("session watcher callback panicked; continuing delivery");
                }
            }
        }
        events
    }

    /// Start the background watch loop: a native watcher when available,
    /// falling back to polling at [`watcher_poll_ms`] otherwise.
    pub fn start(self: &Arc<Self>) {
        let (tx, mut shutdown_rx) = oneshot::channel();
        *self.shutdown.lock() = Some(tx);
        let watcher = Arc::clone(self);

        tokio::spawn(async move {
            let (fs_tx, mut fs_rx) = mpsc::channel(32);
            let _native = create_native_watcher(&watcher.dir, fs_tx);
            if _native.is_none() {
                tracing::warn!(dir = %watcher.dir.display(), "native file watcher unavailable, falling back to polling");
            }

            watcher.rescan_once();
            loop {
                tokio::select! {
                    Some(()) = fs_rx.recv() => {
                        watcher.rescan_once();
                    }
                    _ = tokio::time::sleep(watcher_poll_ms()) => {
                        watcher.rescan_once();
                    }
                    _ = &mut shutdown_rx => return,
                }
            }
        });
    }

    pub fn stop(&self) {
        if let Some(tx) = self.shutdown.lock().take() {
            let _ = tx.send(());
        }
    }
}

fn create_native_watcher(dir: &Path, tx: mpsc::Sender<()>) -> Option<RecommendedWatcher> {
    let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
        if res.is_ok() {
            let _ = tx.try_send(());
        }
    })
    .ok()?;
    watcher.watch(dir, RecursiveMode::NonRecursive).ok()?;
    Some(watcher)
}

fn list_session_files(dir: &Path) -> Vec<(String, SystemTime, PathBuf)> {
    let Ok(read_dir) = std::fs::read_dir(dir) else {
        return Vec::new();
    };
    read_dir
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| {
            let name = entry.file_name().to_string_lossy().into_owned();
            if !is_session_file(&name) {
                return None;
            }
            let modified = entry.metadata().ok()?.modified().ok()?;
            Some((name, modified, entry.path()))
        })
        .collect()
}

fn read_and_parse(path: &Path) -> Result<Session, String> {
    let contents = std::fs::read_to_string(path).map_err(|e| e.to_string())?;
    serde_json::from_str(&contents).map_err(|e| e.to_string())
}

#[cfg(test)]
#[path = "watcher_tests.rs"]
mod tests;
