// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The central configuration document (`~/.orchestration/config.json`).
//!
//! Loaded with `serde_json`; missing fields upgrade to their defaults rather
//! than failing the load, the same "upgrade on read" treatment applied to
//! session records.

use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::session::Mode;

fn default_cli_command() -> String {
    "orch".into()
}

fn default_worktree_prefix() -> String {
    "issue-".into()
}

/// Per-repository configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepoConfig {
    pub path: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github_owner: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github_repo: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_branch: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub worktree_root: Option<PathBuf>,
    #[serde(default = "default_worktree_prefix")]
    pub worktree_prefix: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_mode: Option<Mode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cli_command: Option<String>,
    #[serde(default)]
    pub hooks: HashMap<String, HookConfig>,
}

/// A single hook's effective definition. Accepts the shorthand bare-string
/// form (`"/bin/echo ${sessionId}"` => command, anything else => prompt) as
/// well as the explicit `{type, value}` form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HookConfig {
    Command { value: String },
    Prompt { value: String },
}

impl HookConfig {
    pub fn value(&self) -> &str {
        match self {
            HookConfig::Command { value } | HookConfig::Prompt { value } => value,
        }
    }

    pub fn is_command(&self) -> bool {
        matches!(self, HookConfig::Command { .. })
    }
}

/// Shorthand deserialization helper: `serde_json::from_value` on a raw
/// `Value` that may be either the shorthand string or the tagged object.
pub fn hook_config_from_value(value: Value) -> Result<HookConfig, serde_json::Error> {
    if let Value::String(s) = &value {
        return Ok(if s.starts_with('/') {
            HookConfig::Command { value: s.clone() }
        } else {
            HookConfig::Prompt { value: s.clone() }
        });
    }
    serde_json::from_value(value)
}

/// Which signal the iterative loop controller trusts to decide a worker is
/// done, and the fallback precedence between the configured signal and the
/// literal status-signal file (the file wins; see `DESIGN.md`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DoneSignalType {
    Status,
    File,
    ExitCode,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoneSignal {
    #[serde(rename = "type")]
    pub kind: DoneSignalType,
    pub value: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DockerSpawnerConfig {
    pub image: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory_limit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu_limit: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpawnerType {
    Docker,
    Headless,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpawnerConfig {
    #[serde(rename = "type")]
    pub kind: SpawnerType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub docker: Option<DockerSpawnerConfig>,
    #[serde(default)]
    pub use_pty: bool,
}

fn default_max_iterations() -> u32 {
    10
}

fn default_iteration_delay_ms() -> u64 {
    5_000
}

fn default_done_signal() -> DoneSignal {
    DoneSignal {
        kind: DoneSignalType::Status,
        value: "complete".into(),
    }
}

/// Iterative-loop ("ralph") configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RalphConfig {
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,
    #[serde(default = "default_done_signal")]
    pub done_signal: DoneSignal,
    #[serde(default = "default_iteration_delay_ms")]
    pub iteration_delay_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spawner: Option<SpawnerConfig>,
}

impl Default for RalphConfig {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            done_signal: default_done_signal(),
            iteration_delay_ms: default_iteration_delay_ms(),
            spawner: None,
        }
    }
}

fn default_dashboard_port() -> u16 {
    3847
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardConfig {
    #[serde(default = "default_dashboard_port")]
    pub port: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sessions_dir: Option<PathBuf>,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            port: default_dashboard_port(),
            sessions_dir: None,
        }
    }
}

fn default_version() -> u32 {
    1
}

/// The central orchestrator configuration document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub repos: HashMap<String, RepoConfig>,
    #[serde(default)]
    pub hooks: HashMap<String, HookConfig>,
    #[serde(default)]
    pub ralph: RalphConfig,
    #[serde(default)]
    pub dashboard: DashboardConfig,
    /// Opaque to the core; passed through untouched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sounds: Option<Value>,
    #[serde(default = "default_cli_command")]
    pub cli_command: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: default_version(),
            repos: HashMap::new(),
            hooks: HashMap::new(),
            ralph: RalphConfig::default(),
            dashboard: DashboardConfig::default(),
            sounds: None,
            cli_command: default_cli_command(),
        }
    }
}

impl Config {
    /// Conventional discovery path: `~/.orchestration/config.json`.
    pub fn default_path() -> Result<PathBuf, CoreError> {
        let home = dirs::home_dir().ok_or(CoreError::NoHomeDir)?;
        Ok(home.join(".orchestration").join("config.json"))
    }

    /// Load from an explicit path, upgrading missing fields to defaults.
    pub fn load_from(path: &Path) -> Result<Self, CoreError> {
        let raw = std::fs::read_to_string(path).map_err(|source| CoreError::ConfigIo {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Config =
            serde_json::from_str(&raw).map_err(|source| CoreError::ConfigParse {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(config)
    }

    /// Load from the conventional discovery path, returning the default
    /// (empty) configuration if no file exists yet.
    pub fn load() -> Result<Self, CoreError> {
        let path = Self::default_path()?;
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::load_from(&path)
    }

    /// Effective hook for `name` in the context of `repo`: the repo's own
    /// hook map overrides the global one.
    pub fn effective_hook<'a>(&'a self, repo: &'a RepoConfig, name: &str) -> Option<&'a HookConfig> {
        repo.hooks.get(name).or_else(|| self.hooks.get(name))
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
