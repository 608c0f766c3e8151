// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! CLI command implementations

pub mod queue;
pub mod status;
pub mod submit;
pub mod terminate;
pub mod unlock;

use anyhow::{anyhow, Result};
use clap::Args;
use mj_core::ResourceId;
use mj_store::{CoordinationStore, JobStatusStore, StatusKey};

/// Addresses one job: user, resource and optionally an iteration.
#[derive(Args, Debug, Clone)]
pub struct JobRef {
    /// Submitting user
    #[arg(long)]
    pub user: String,
    /// Resource id printed by `mj submit`
    pub resource: String,
    /// Iteration (default: the latest)
    #[arg(long)]
    pub iteration: Option<u32>,
}

impl JobRef {
    pub async fn key<S: CoordinationStore>(&self, statuses: &JobStatusStore<S>) -> Result<StatusKey> {
        let resource = ResourceId::from(self.resource.as_str());
        let iteration = match self.iteration {
            Some(iteration) => iteration,
            None => statuses
                .latest_iteration(&self.user, &resource)
                .await?
                .ok_or_else(|| anyhow!("no job {} for user {}", self.resource, self.user))?,
        };
        Ok(StatusKey::new(&self.user, resource, iteration))
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
