// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker loop: pops tickets from the registered queues and runs them.
//!
//! Concurrency is bounded globally by a semaphore and per user by a slot
//! count. A ticket whose user has no free slot goes back to the tail of its
//! queue.

use crate::queue::QUEUE_REGISTRY;
use mj_adapters::ToolRunner;
use mj_core::Clock;
use mj_engine::{JobExecutor, JobTicket};
use mj_store::{CoordinationStore, StoreError};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerOptions {
    pub concurrency: usize,
    pub max_jobs_per_user: usize,
    pub poll_interval: Duration,
}

impl Default for WorkerOptions {
    fn default() -> Self {
        Self { concurrency: 4, max_jobs_per_user: 2, poll_interval: Duration::from_millis(500) }
    }
}

/// Running job count per user.
#[derive(Clone, Default)]
struct UserSlots {
    running: Arc<Mutex<HashMap<String, usize>>>,
}

impl UserSlots {
    fn try_take(&self, user: &str, limit: usize) -> Option<UserSlot> {
        let mut running = self.running.lock();
        let count = running.entry(user.to_string()).or_default();
        if *count >= limit {
            return None;
        }
        *count += 1;
        Some(UserSlot { slots: self.clone(), user: user.to_string() })
    }

    fn running(&self, user: &str) -> usize {
        self.running.lock().get(user).copied().unwrap_or(0)
    }
}

/// Held for the duration of one job.
struct UserSlot {
    slots: UserSlots,
    user: String,
}

impl Drop for UserSlot {
    fn drop(&mut self) {
        let mut running = self.slots.running.lock();
        if let Some(count) = running.get_mut(&self.user) {
            *count = count.saturating_sub(1);
            if *count == 0 {
                running.remove(&self.user);
            }
        }
    }
}

pub struct Worker<S, R, C> {
    executor: JobExecutor<S, R, C>,
    opts: WorkerOptions,
    permits: Arc<Semaphore>,
    slots: UserSlots,
    tasks: JoinSet<()>,
}

impl<S, R, C> Worker<S, R, C>
where
    S: CoordinationStore,
    R: ToolRunner,
    C: Clock,
{
    pub fn new(executor: JobExecutor<S, R, C>, opts: WorkerOptions) -> Self {
        Self {
            executor,
            permits: Arc::new(Semaphore::new(opts.concurrency.max(1))),
            opts,
            slots: UserSlots::default(),
            tasks: JoinSet::new(),
        }
    }

    fn store(&self) -> &S {
        self.executor.statuses().coordination()
    }

    /// Jobs currently executing.
    pub fn active(&self) -> usize {
        self.tasks.len()
    }

    pub fn running_for(&self, user: &str) -> usize {
        self.slots.running(user)
    }

    /// Poll until cancelled, then wait for running jobs to finish.
    pub async fn run(mut self, cancel: CancellationToken) {
        tracing::info!(
            concurrency = self.opts.concurrency,
            max_jobs_per_user = self.opts.max_jobs_per_user,
            "worker started"
        );
        while !cancel.is_cancelled() {
            let started = match self.poll_once().await {
                Ok(n) => n,
                Err(e) => {
                    tracing::warn!(error = %e, "queue poll failed");
                    0
                }
            };
            if started == 0 {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(self.opts.poll_interval) => {}
                }
            }
        }
        tracing::info!(active = self.active(), "worker stopping, draining running jobs");
        self.drain().await;
    }

    /// One pass over all registered queues, taking at most one ticket from
    /// each. Returns the number of jobs started.
    pub async fn poll_once(&mut self) -> Result<usize, StoreError> {
        self.reap();
        let mut started = 0;
        for queue in self.store().members(QUEUE_REGISTRY).await? {
            let Ok(permit) = Arc::clone(&self.permits).try_acquire_owned() else {
                break;
            };
            let Some(raw) = self.store().pop(&queue).await? else {
                if self.store().remove_member_if_empty(QUEUE_REGISTRY, &queue).await? {
                    tracing::debug!(queue = %queue, "drained queue unregistered");
                }
                continue;
            };
            let ticket = match JobTicket::from_json(&raw) {
                Ok(ticket) => ticket,
                Err(e) => {
                    tracing::error!(queue = %queue, error = %e, "dropping undecodable ticket");
                    continue;
                }
            };
            let Some(slot) = self.slots.try_take(&ticket.user_id, self.opts.max_jobs_per_user.max(1)) else {
                tracing::debug!(queue = %queue, user = %ticket.user_id, "user at job limit, requeueing");
                self.store().push(&queue, &raw).await?;
                continue;
            };
            self.spawn(ticket, permit, slot);
            started += 1;
        }
        Ok(started)
    }

    fn spawn(&mut self, ticket: JobTicket, permit: OwnedSemaphorePermit, slot: UserSlot) {
        let executor = self.executor.clone();
        self.tasks.spawn(async move {
            let _permit = permit;
            let _slot = slot;
            executor.execute(&ticket).await;
        });
    }

    fn reap(&mut self) {
        while let Some(result) = self.tasks.try_join_next() {
            if let Err(e) = result {
                tracing::error!(error = %e, "job task panicked");
            }
        }
    }

    /// Wait for every running job.
    pub async fn drain(&mut self) {
        while let Some(result) = self.tasks.join_next().await {
            if let Err(e) = result {
                tracing::error!(error = %e, "job task panicked");
            }
        }
    }
}

#[cfg(test)]
#[path = "worker_tests.rs"]
mod tests;
