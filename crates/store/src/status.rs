// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job status records and termination requests in the coordination store.

use crate::error::StoreError;
use crate::kv::CoordinationStore;
use mj_core::{JobStatus, ResourceId};
use std::fmt;
use std::time::Duration;
use tokio::time::Instant;

pub const STATUS_PREFIX: &str = "RESOURCE-STATUS::";
pub const TERMINATION_PREFIX: &str = "RESOURCE-TERMINATION::";
const ITERATION_PREFIX: &str = "RESOURCE-ITERATION::";
/// Wire names of the terminal states, checked by the store on every commit
const TERMINAL_STATES: &[&str] = &["finished", "error", "terminated"];

/// Identifies one iteration of a user's resource.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StatusKey {
    pub user_id: String,
    pub resource_id: ResourceId,
    pub iteration: u32,
}

impl StatusKey {
    pub fn new(user_id: impl Into<String>, resource_id: ResourceId, iteration: u32) -> Self {
        Self { user_id: user_id.into(), resource_id, iteration }
    }

    pub fn of(status: &JobStatus) -> Self {
        Self::new(&status.user_id, status.resource_id.clone(), status.iteration)
    }
}

impl fmt::Display for StatusKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}::{}", self.user_id, self.resource_id, self.iteration)
    }
}

/// Backoff schedule for [`JobStatusStore::poll`].
#[derive(Debug, Clone, Copy)]
pub struct PollOptions {
    pub initial: Duration,
    pub max_interval: Duration,
    /// Give up after this long; `None` waits forever
    pub timeout: Option<Duration>,
}

impl Default for PollOptions {
    fn default() -> Self {
        Self {
            initial: Duration::from_millis(100),
            max_interval: Duration::from_secs(5),
            timeout: None,
        }
    }
}

/// Reads and writes [`JobStatus`] records.
///
/// Records expire after `ttl`. Terminal records are never overwritten; the
/// check and the write are one atomic store operation.
#[derive(Clone)]
pub struct JobStatusStore<S> {
    store: S,
    ttl: Duration,
}

impl<S: CoordinationStore> JobStatusStore<S> {
    pub fn new(store: S, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    pub fn coordination(&self) -> &S {
        &self.store
    }

    pub async fn get(&self, key: &StatusKey) -> Result<Option<JobStatus>, StoreError> {
        match self.store.get(&status_key(key)).await? {
            Some(raw) => Ok(Some(JobStatus::from_json(&raw)?)),
            None => Ok(None),
        }
    }

    /// Write `status`, refusing to replace a terminal record.
    pub async fn commit(&self, status: &JobStatus) -> Result<(), StoreError> {
        let key = StatusKey::of(status);
        let refused = self
            .store
            .set_unless_sealed(&status_key(&key), &status.to_json()?, Some(self.ttl), "status", TERMINAL_STATES)
            .await?;
        if let Some(existing) = refused {
            let existing = JobStatus::from_json(&existing)?;
            return Err(StoreError::TerminalOverwrite { key: key.to_string(), state: existing.status });
        }
        tracing::debug!(key = %key, status = %status.status, step = status.progress.step, "status committed");
        Ok(())
    }

    /// Wait for a terminal record, backing off between reads.
    ///
    /// A missing record is treated like a non-terminal one.
    pub async fn poll(&self, key: &StatusKey, opts: PollOptions) -> Result<JobStatus, StoreError> {
        let started = Instant::now();
        let mut interval = opts.initial;
        loop {
            if let Some(status) = self.get(key).await? {
                if status.is_terminal() {
                    return Ok(status);
                }
            }
            if let Some(timeout) = opts.timeout {
                let elapsed = started.elapsed();
                if elapsed >= timeout {
                    return Err(StoreError::PollTimeout {
                        key: key.to_string(),
                        waited_ms: elapsed.as_millis() as u64,
                    });
                }
                interval = interval.min(timeout - elapsed);
            }
            tokio::time::sleep(interval).await;
            interval = (interval * 2).min(opts.max_interval);
        }
    }

    /// Allocate the next iteration number of a resource, starting at 1.
    pub async fn next_iteration(&self, user_id: &str, resource_id: &ResourceId) -> Result<u32, StoreError> {
        let key = format!("{}{}::{}", ITERATION_PREFIX, user_id, resource_id);
        let n = self.store.incr(&key).await?;
        u32::try_from(n).map_err(|_| StoreError::NotAnInteger(key))
    }

    /// Latest allocated iteration, if any.
    pub async fn latest_iteration(&self, user_id: &str, resource_id: &ResourceId) -> Result<Option<u32>, StoreError> {
        let key = format!("{}{}::{}", ITERATION_PREFIX, user_id, resource_id);
        match self.store.get(&key).await? {
            Some(raw) => raw.parse().map(Some).map_err(|_| StoreError::NotAnInteger(key)),
            None => Ok(None),
        }
    }

    pub async fn request_termination(&self, key: &StatusKey) -> Result<(), StoreError> {
        self.store.set(&termination_key(key), "1", Some(self.ttl)).await?;
        tracing::info!(key = %key, "termination requested");
        Ok(())
    }

    pub async fn termination_requested(&self, key: &StatusKey) -> Result<bool, StoreError> {
        Ok(self.store.get(&termination_key(key)).await?.is_some())
    }

    pub async fn clear_termination(&self, key: &StatusKey) -> Result<(), StoreError> {
        self.store.del(&termination_key(key)).await?;
        Ok(())
    }
}

fn status_key(key: &StatusKey) -> String {
    format!("{}{}", STATUS_PREFIX, key)
}

fn termination_key(key: &StatusKey) -> String {
    format!("{}{}", TERMINATION_PREFIX, key)
}

#[cfg(test)]
#[path = "status_tests.rs"]
mod tests;
