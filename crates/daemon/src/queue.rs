// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job submission and dispatch onto named worker queues.
//!
//! Queues are lists in the coordination store holding serialized
//! [`JobTicket`]s. Every queue name ever used is recorded in a registry set
//! so workers know what to poll.

use mj_adapters::ToolRunner;
use mj_core::{Clock, JobStatus};
use mj_engine::{JobError, JobExecutor, JobTicket};
use mj_store::{CoordinationStore, StoreError};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

pub const QUEUE_PREFIX: &str = "job_queue_";
/// Set of every queue name a job was pushed to
pub const QUEUE_REGISTRY: &str = "JOB-QUEUE-NAMES";
/// Counter spreading jobs over the shared pool
pub const QUEUE_COUNTER: &str = "JOB-QUEUE-COUNTER";

/// How a job's queue name is chosen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueuePolicy {
    /// One queue per resource
    #[default]
    PerJob,
    /// One queue per user, so a user's jobs run in submission order
    PerUser,
    /// A fixed pool of `queue_count` queues filled round robin
    Redis,
    /// No queue: the submitting process runs the job itself
    Local,
}

mj_core::simple_display! {
    QueuePolicy {
        PerJob => "per_job",
        PerUser => "per_user",
        Redis => "redis",
        Local => "local",
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown queue policy '{0}', expected per_job, per_user, redis or local")]
pub struct UnknownPolicy(pub String);

impl FromStr for QueuePolicy {
    type Err = UnknownPolicy;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "per_job" => Ok(QueuePolicy::PerJob),
            "per_user" => Ok(QueuePolicy::PerUser),
            "redis" => Ok(QueuePolicy::Redis),
            "local" => Ok(QueuePolicy::Local),
            other => Err(UnknownPolicy(other.to_string())),
        }
    }
}

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error(transparent)]
    Job(#[from] JobError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("cannot encode job ticket: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Outcome of a submission.
#[derive(Debug, Clone, PartialEq)]
pub enum Submission {
    /// Accepted and pushed onto `queue`
    Queued { queue: String, status: JobStatus },
    /// Ran to completion in-process (`local` policy)
    Completed(JobStatus),
}

impl Submission {
    pub fn status(&self) -> &JobStatus {
        match self {
            Submission::Queued { status, .. } => status,
            Submission::Completed(status) => status,
        }
    }
}

pub struct Dispatcher<S, R, C> {
    policy: QueuePolicy,
    queue_count: u64,
    executor: JobExecutor<S, R, C>,
}

impl<S, R, C> Dispatcher<S, R, C>
where
    S: CoordinationStore,
    R: ToolRunner,
    C: Clock,
{
    pub fn new(policy: QueuePolicy, queue_count: usize, executor: JobExecutor<S, R, C>) -> Self {
        Self { policy, queue_count: queue_count.max(1) as u64, executor }
    }

    pub fn policy(&self) -> QueuePolicy {
        self.policy
    }

    pub fn executor(&self) -> &JobExecutor<S, R, C> {
        &self.executor
    }

    fn store(&self) -> &S {
        self.executor.statuses().coordination()
    }

    /// Name of the queue `ticket` goes to, `None` for the local policy.
    pub async fn queue_name(&self, ticket: &JobTicket) -> Result<Option<String>, StoreError> {
        let suffix = match self.policy {
            QueuePolicy::Local => return Ok(None),
            QueuePolicy::PerJob => ticket.resource_id.to_string(),
            QueuePolicy::PerUser => ticket.user_id.clone(),
            QueuePolicy::Redis => {
                let n = self.store().incr(QUEUE_COUNTER).await?;
                (n.saturating_sub(1) % self.queue_count).to_string()
            }
        };
        Ok(Some(format!("{QUEUE_PREFIX}{suffix}")))
    }

    /// Assign the next iteration, validate and record `accepted`, then
    /// dispatch.
    ///
    /// Validation errors surface here and nothing is queued.
    pub async fn submit(&self, mut ticket: JobTicket) -> Result<(JobTicket, Submission), DispatchError> {
        ticket.iteration =
            self.executor.statuses().next_iteration(&ticket.user_id, &ticket.resource_id).await?;
        let status = self.executor.accept(&ticket).await?;

        let Some(queue) = self.queue_name(&ticket).await? else {
            let status = self.executor.execute(&ticket).await;
            return Ok((ticket, Submission::Completed(status)));
        };
        self.store().push(&queue, &ticket.to_json()?).await?;
        self.store().add_member(QUEUE_REGISTRY, &queue).await?;
        tracing::info!(
            job = %ticket.resource_id,
            user = %ticket.user_id,
            iteration = ticket.iteration,
            queue = %queue,
            "job queued"
        );
        Ok((ticket, Submission::Queued { queue, status }))
    }
}

/// Registered queue names with their current lengths.
pub async fn queue_lengths<S: CoordinationStore>(store: &S) -> Result<Vec<(String, usize)>, StoreError> {
    let mut out = Vec::new();
    for name in store.members(QUEUE_REGISTRY).await? {
        let len = store.list_len(&name).await?;
        out.push((name, len));
    }
    Ok(out)
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
