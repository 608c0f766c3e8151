// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon and CLI configuration.
//!
//! Loaded from TOML; every field has a default so an empty file (or no file
//! at all) yields a working local setup. `MJ_REDIS_URL` and `MJ_QUEUE_POLICY`
//! override the file.

use crate::env;
use crate::queue::{QueuePolicy, UnknownPolicy};
use mj_core::{UserQuota, DEFAULT_TIMEOUT_MULTIPLIER};
use mj_engine::{DatabaseLayout, ExecutorConfig};
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("MJ_QUEUE_POLICY: {0}")]
    Policy(#[from] UnknownPolicy),
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub paths: PathsConfig,
    pub store: StoreConfig,
    pub queue: QueueConfig,
    pub tools: ToolsConfig,
    pub quota: QuotaConfig,
}

/// Database roots. Defaults live under the data dir.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PathsConfig {
    pub grass_database: PathBuf,
    pub user_database: PathBuf,
    pub tmp_workdir: PathBuf,
    pub download_cache: PathBuf,
    pub resource_storage: PathBuf,
    /// Daily rolling log files go here; stderr when unset
    pub log_dir: Option<PathBuf>,
}

impl Default for PathsConfig {
    fn default() -> Self {
        let layout = DatabaseLayout::under(&env::data_dir());
        Self {
            grass_database: layout.grass_database,
            user_database: layout.user_database,
            tmp_workdir: layout.tmp_workdir,
            download_cache: layout.download_cache,
            resource_storage: layout.resource_storage,
            log_dir: None,
        }
    }
}

impl PathsConfig {
    pub fn layout(&self) -> DatabaseLayout {
        DatabaseLayout {
            grass_database: self.grass_database.clone(),
            user_database: self.user_database.clone(),
            tmp_workdir: self.tmp_workdir.clone(),
            download_cache: self.download_cache.clone(),
            resource_storage: self.resource_storage.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoreConfig {
    /// `redis://...`, or `memory://` for a process-local store
    pub url: String,
    pub status_ttl_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self { url: "redis://127.0.0.1:6379/0".to_string(), status_ttl_secs: 864_000 }
    }
}

impl StoreConfig {
    pub fn is_memory(&self) -> bool {
        self.url.starts_with("memory://")
    }

    pub fn status_ttl(&self) -> Duration {
        Duration::from_secs(self.status_ttl_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct QueueConfig {
    pub policy: QueuePolicy,
    /// Size of the shared pool under the `redis` policy
    pub queue_count: usize,
    /// Jobs a worker runs at once
    pub worker_concurrency: usize,
    /// Jobs of one user a worker runs at once
    pub max_jobs_per_user: usize,
    pub poll_interval_ms: u64,
    pub timeout_multiplier: u64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            policy: QueuePolicy::default(),
            queue_count: 1,
            worker_concurrency: 4,
            max_jobs_per_user: 2,
            poll_interval_ms: 500,
            timeout_multiplier: DEFAULT_TIMEOUT_MULTIPLIER,
        }
    }
}

impl QueueConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ToolsConfig {
    /// Installation root of the geoprocessing tools
    pub grass_base: Option<PathBuf>,
    /// Extra environment for every tool invocation
    pub env: BTreeMap<String, String>,
    /// Modules whose failure does not abort a chain
    pub best_effort: BTreeSet<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct QuotaConfig {
    pub default: UserQuota,
    pub users: BTreeMap<String, UserQuota>,
}

impl QuotaConfig {
    pub fn for_user(&self, user: &str) -> UserQuota {
        self.users.get(user).unwrap_or(&self.default).clone()
    }
}

impl Config {
    /// Load from `path`, else `MJ_CONFIG`, else the XDG config file if it
    /// exists, else defaults. Environment overrides are applied last.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let explicit = path.map(Path::to_path_buf).or_else(env::config_path);
        let mut config = match explicit {
            Some(path) => Self::read(&path)?,
            None => match env::default_config_path().filter(|p| p.is_file()) {
                Some(path) => Self::read(&path)?,
                None => Self::default(),
            },
        };
        config.apply_env()?;
        Ok(config)
    }

    fn read(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })?;
        let config = Self::parse(&raw).map_err(|source| ConfigError::Parse { path: path.to_path_buf(), source })?;
        tracing::debug!(path = %path.display(), "config loaded");
        Ok(config)
    }

    pub fn parse(raw: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(raw)
    }

    fn apply_env(&mut self) -> Result<(), ConfigError> {
        if let Some(url) = env::redis_url() {
            self.store.url = url;
        }
        if let Some(policy) = env::queue_policy() {
            self.queue.policy = policy.parse()?;
        }
        Ok(())
    }

    pub fn executor_config(&self) -> ExecutorConfig {
        ExecutorConfig {
            layout: self.paths.layout(),
            best_effort: self.tools.best_effort.clone(),
            timeout_multiplier: self.queue.timeout_multiplier,
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
