// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Sandboxed spawner: runs the worker inside a short-lived container with
//! dropped capabilities, a process-count limit, a read-only bind of the
//! worktree, and no privilege escalation. The `spawn_id` returned here is
//! the container runtime's own identifier.

use super::{SpawnOutcome, SpawnRequest, Spawner, SpawnerError, StopResult, WorkerStatus};
use crate::env::availability_probe_timeout;
use crate::subprocess::run_with_timeout;
use async_trait::async_trait;
use chrono::Utc;
use orc_core::{DockerSpawnerConfig, SpawnId};
use tokio::process::Command;

/// Docker-backed container spawner. Named `Sandboxed` after the spawner
/// capability it provides rather than the runtime binary, so a future
/// rootless/podman backend can slot in behind the same type.
pub struct SandboxedSpawner {
    runtime: String,
    image: String,
    memory_limit: Option<String>,
    cpu_limit: Option<String>,
}

impl SandboxedSpawner {
    pub fn new(config: DockerSpawnerConfig) -> Self {
        Self {
            runtime: "docker".to_string(),
            image: config.image,
            memory_limit: config.memory_limit,
            cpu_limit: config.cpu_limit,
        }
    }

    #[cfg(test)]
    fn with_runtime(config: DockerSpawnerConfig, runtime: &str) -> Self {
        Self {
            runtime: runtime.to_string(),
            image: config.image,
            memory_limit: config.memory_limit,
            cpu_limit: config.cpu_limit,
        }
    }
}

#[async_trait]
impl Spawner for SandboxedSpawner {
    fn name(&self) -> &'static str {
        "sandboxed"
    }

    async fn is_available(&self) -> bool {
        let cmd = Command::new(&self.runtime).arg("info").output();
        match tokio::time::timeout(availability_probe_timeout(), cmd).await {
            Ok(Ok(output)) => output.status.success(),
            _ => false,
        }
    }

    async fn spawn(&self, request: SpawnRequest) -> Result<SpawnOutcome, SpawnerError> {
        let spawned_at = Utc::now();

        let mut cmd = Command::new(&self.runtime);
        cmd.arg("run")
            .arg("-d")
            .arg("--cap-drop=ALL")
            .arg("--security-opt=no-new-privileges")
            .arg("--pids-limit=256")
            .arg("--read-only")
            .arg("-v")
            .arg(format!("{}:/workspace:ro", request.worktree_path.display()))
            .arg("-w")
            .arg("/workspace");

        if let Some(mem) = &self.memory_limit {
            cmd.arg(format!("--memory={mem}"));
        }
        if let Some(cpus) = &self.cpu_limit {
            cmd.arg(format!("--cpus={cpus}"));
        }
        for (k, v) in &request.env {
            cmd.arg("-e").arg(format!("{k}={v}"));
        }
        cmd.arg(&self.image)
            .arg(&request.command)
            .arg(&request.prompt_file)
            .arg("--context")
            .arg(&request.context_file);

        match run_with_timeout(cmd, availability_probe_timeout() * 4, "docker run").await {
            Ok(output) if output.status.success() => {
                let container_id = String::from_utf8_lossy(&output.stdout).trim().to_string();
                Ok(SpawnOutcome {
                    success: true,
                    spawn_id: SpawnId::new(container_id),
                    spawned_at,
                    error: None,
                })
            }
            Ok(output) => Ok(SpawnOutcome {
                success: false,
                spawn_id: SpawnId::new(String::new()),
                spawned_at,
                error: Some(String::from_utf8_lossy(&output.stderr).to_string()),
            }),
            Err(e) => Ok(SpawnOutcome {
                success: false,
                spawn_id: SpawnId::new(String::new()),
                spawned_at,
                error: Some(e),
            }),
        }
    }

    async fn stop(&self, spawn_id: &SpawnId) -> Result<StopResult, SpawnerError> {
        let mut cmd = Command::new(&self.runtime);
        cmd.args(["stop", "-t", "5", spawn_id.as_str()]);
        match run_with_timeout(cmd, availability_probe_timeout() * 3, "docker stop").await {
            Ok(output) => Ok(StopResult {
                stopped: output.status.success(),
                forced: false,
            }),
            Err(e) => Err(SpawnerError::StopFailed(e)),
        }
    }

    async fn get_status(&self, spawn_id: &SpawnId) -> Result<WorkerStatus, SpawnerError> {
        let mut cmd = Command::new(&self.runtime);
        cmd.args([
            "inspect",
            "--format",
            "{{.State.Running}} {{.State.ExitCode}}",
            spawn_id.as_str(),
        ]);
        let output = run_with_timeout(cmd, availability_probe_timeout(), "docker inspect")
            .await
            .map_err(SpawnerError::StatusFailed)?;
        if !output.status.success() {
            return Err(SpawnerError::StatusFailed(format!(
                "unknown container {spawn_id}"
            )));
        }
        let text = String::from_utf8_lossy(&output.stdout);
        let mut parts = text.trim().split_whitespace();
        let running = parts.next() == Some("true");
        let exit_code = if running {
            None
        } else {
            parts.next().and_then(|s| s.parse().ok())
        };
        Ok(WorkerStatus { running, exit_code })
    }
}

#[cfg(test)]
#[path = "sandboxed_tests.rs"]
mod tests;
