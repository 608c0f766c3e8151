// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-user limits and permissions.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

/// Multiplier applied to `process_time_limit × process_num_limit` for the
/// hard job timeout handed to the worker queue.
pub const DEFAULT_TIMEOUT_MULTIPLIER: u64 = 20;

/// Quota and permission set attached to a submitting principal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserQuota {
    /// Maximum number of raster cells a computational region may hold
    pub cell_limit: u64,
    /// Maximum number of steps in one resolved process chain
    pub process_num_limit: u64,
    /// Per-step wall-clock limit in seconds
    pub process_time_limit: u64,
    /// Modules and executables the user may invoke
    pub accessible_modules: BTreeSet<String>,
    /// Readable global mapsets per project
    pub accessible_datasets: BTreeMap<String, BTreeSet<String>>,
}

impl Default for UserQuota {
    fn default() -> Self {
        Self {
            cell_limit: 100_000_000,
            process_num_limit: 1000,
            process_time_limit: 600,
            accessible_modules: BTreeSet::new(),
            accessible_datasets: BTreeMap::new(),
        }
    }
}

impl UserQuota {
    pub fn may_run(&self, module: &str) -> bool {
        self.accessible_modules.contains(module)
    }

    /// Whether the user may read `mapset` of the global `project`.
    pub fn may_read(&self, project: &str, mapset: &str) -> bool {
        self.accessible_datasets
            .get(project)
            .is_some_and(|mapsets| mapsets.contains(mapset))
    }

    pub fn step_timeout(&self) -> Duration {
        Duration::from_secs(self.process_time_limit)
    }

    /// Lock expiry covering a full chain at the per-step limit.
    pub fn lock_ttl(&self) -> Duration {
        Duration::from_secs(self.process_time_limit.saturating_mul(self.process_num_limit))
    }

    /// Hard bound on how long a job may occupy a worker.
    pub fn job_timeout(&self, multiplier: u64) -> Duration {
        self.lock_ttl().saturating_mul(multiplier.min(u32::MAX as u64) as u32)
    }
}

#[cfg(test)]
#[path = "quota_tests.rs"]
mod tests;
