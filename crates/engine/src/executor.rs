// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job executor: the state machine driving one job from `accepted` to a
//! terminal state.
//!
//! Locks held and the workspace created are tracked outside the job body so
//! that cleanup runs on every exit path, including the job timeout. The job
//! timeout bounds validation, the steps and the exports. A merge that has
//! started is never abandoned: it is awaited with the locks kept alive.

use crate::error::{JobError, WorkspaceError};
use crate::export::{export_resource, plan};
use crate::files::remove_path;
use crate::layout::{DatabaseLayout, MapsetArea};
use crate::merge::merge_mapset;
use crate::run::{run_steps, RunOptions, StepObserver};
use crate::ticket::JobTicket;
use crate::workspace::Workspace;
use async_trait::async_trait;
use mj_adapters::ToolRunner;
use mj_chain::{ProcessChain, ProcessStep, ValidatedChain, ValidationContext, Validator};
use mj_core::{Clock, JobState, JobStatus, ProcessLogEntry, DEFAULT_TIMEOUT_MULTIPLIER};
use mj_store::{CoordinationStore, JobStatusStore, ResourceLocker, StatusKey};
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::Instrument;

/// Static configuration shared by all jobs of a worker.
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    pub layout: DatabaseLayout,
    /// Modules whose non-zero exit does not abort the chain
    pub best_effort: BTreeSet<String>,
    pub timeout_multiplier: u64,
}

impl ExecutorConfig {
    pub fn new(layout: DatabaseLayout) -> Self {
        Self { layout, best_effort: BTreeSet::new(), timeout_multiplier: DEFAULT_TIMEOUT_MULTIPLIER }
    }
}

/// Resources acquired by a running job.
struct JobRun {
    status: JobStatus,
    locks: Vec<String>,
    workspace: Option<Workspace>,
    /// Workspace creation still in flight when the timeout fired
    creating: Option<JoinHandle<Result<Workspace, WorkspaceError>>>,
    exported: Vec<PathBuf>,
}

#[derive(Clone)]
pub struct JobExecutor<S, R, C> {
    config: ExecutorConfig,
    statuses: JobStatusStore<S>,
    locks: ResourceLocker<S>,
    runner: R,
    clock: C,
}

impl<S, R, C> JobExecutor<S, R, C>
where
    S: CoordinationStore,
    R: ToolRunner,
    C: Clock,
{
    pub fn new(config: ExecutorConfig, store: S, status_ttl: Duration, runner: R, clock: C) -> Self {
        Self {
            config,
            statuses: JobStatusStore::new(store.clone(), status_ttl),
            locks: ResourceLocker::new(store),
            runner,
            clock,
        }
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    pub fn statuses(&self) -> &JobStatusStore<S> {
        &self.statuses
    }

    pub fn locks(&self) -> &ResourceLocker<S> {
        &self.locks
    }

    /// Parse and validate the ticket's chain. Touches nothing on disk.
    pub fn validate(&self, ticket: &JobTicket) -> Result<ValidatedChain, JobError> {
        let layout = &self.config.layout;
        let user_mapsets = layout.user_mapsets(&ticket.user_group, &ticket.project).map_err(
            WorkspaceError::io("list", layout.user_database.join(&ticket.user_group).join(&ticket.project)),
        )?;
        let ctx = ValidationContext {
            project: ticket.project.clone(),
            user_mapsets,
            target_mapset: ticket.target_mapset.clone(),
            download_dir: layout.download_dir(&ticket.user_id, &ticket.resource_id),
            file_dir: layout.workspace_root(&ticket.resource_id, ticket.iteration).join(crate::workspace::FILE_DIR),
        };
        let chain = ProcessChain::from_value(&ticket.process_chain)?;
        Ok(Validator::new(ticket.quota.clone()).validate(&chain, &ctx)?)
    }

    /// Validate and write the `accepted` record. Runs at submission time.
    pub async fn accept(&self, ticket: &JobTicket) -> Result<JobStatus, JobError> {
        let chain = self.validate(ticket)?;
        let status = JobStatus::accepted(
            ticket.resource_id.clone(),
            &ticket.user_id,
            ticket.iteration,
            chain.steps.len(),
            self.clock.epoch_ms(),
        );
        self.statuses.commit(&status).await?;
        tracing::info!(
            job = %ticket.resource_id,
            user = %ticket.user_id,
            kind = %ticket.kind(),
            steps = chain.steps.len(),
            "job accepted"
        );
        Ok(status)
    }

    /// Run a job to a terminal state and return the final record.
    pub async fn execute(&self, ticket: &JobTicket) -> JobStatus {
        let span = tracing::info_span!(
            "job",
            job = %ticket.resource_id,
            user = %ticket.user_id,
            iteration = ticket.iteration
        );
        self.execute_inner(ticket).instrument(span).await
    }

    async fn execute_inner(&self, ticket: &JobTicket) -> JobStatus {
        let key = ticket.status_key();
        let mut status = match self.statuses.get(&key).await {
            Ok(Some(status)) => status,
            Ok(None) => self.fresh_status(ticket),
            Err(e) => {
                tracing::warn!(error = %e, "cannot read status record, starting a fresh one");
                self.fresh_status(ticket)
            }
        };
        if status.is_terminal() {
            tracing::warn!(status = %status.status, "job already finished, skipping");
            return status;
        }
        if let Err(e) = status.transition(JobState::Running, "Processing started", self.clock.epoch_ms()) {
            tracing::error!(error = %e, "cannot start job");
            return status;
        }
        self.commit(&status).await;
        tracing::info!(kind = %ticket.kind(), "job running");

        let mut job =
            JobRun { status, locks: Vec::new(), workspace: None, creating: None, exported: Vec::new() };
        let limit = ticket.quota.job_timeout(self.config.timeout_multiplier);
        let mut result = match tokio::time::timeout(limit, self.run(ticket, &key, &mut job)).await {
            Ok(result) => result,
            Err(_) => Err(JobError::Timeout(limit)),
        };
        if result.is_ok() {
            result = self.merge(ticket, &key, &job).await;
        }

        self.cleanup(ticket, &mut job, result.is_err()).await;

        let now = self.clock.epoch_ms();
        let outcome = match &result {
            Ok(()) => job.status.transition(JobState::Finished, "Processing successfully finished", now),
            Err(e) => {
                match e {
                    JobError::Terminated => tracing::info!("job terminated"),
                    e => tracing::warn!(kind = e.kind(), error = %e, "job failed"),
                }
                job.status.fail(e.state(), e.info(), now)
            }
        };
        if let Err(e) = outcome {
            tracing::error!(error = %e, "cannot record final job state");
        }
        self.commit(&job.status).await;
        if let Err(e) = self.statuses.clear_termination(&key).await {
            tracing::warn!(error = %e, "cannot clear termination request");
        }
        tracing::info!(
            status = %job.status.status,
            steps = job.status.process_log.len(),
            elapsed_ms = (job.status.time_delta * 1000.0) as u64,
            "job done"
        );
        job.status
    }

    fn fresh_status(&self, ticket: &JobTicket) -> JobStatus {
        JobStatus::accepted(ticket.resource_id.clone(), &ticket.user_id, ticket.iteration, 0, self.clock.epoch_ms())
    }

    async fn commit(&self, status: &JobStatus) {
        if let Err(e) = self.statuses.commit(status).await {
            tracing::warn!(error = %e, status = %status.status, "cannot commit status");
        }
    }

    async fn checkpoint(&self, key: &StatusKey) -> Result<(), JobError> {
        if self.statuses.termination_requested(key).await? {
            return Err(JobError::Terminated);
        }
        Ok(())
    }

    async fn run(&self, ticket: &JobTicket, key: &StatusKey, job: &mut JobRun) -> Result<(), JobError> {
        self.checkpoint(key).await?;
        let chain = self.validate(ticket)?;
        job.status.progress.num_of_steps = chain.steps.len();

        let ttl = ticket.quota.lock_ttl();
        self.acquire_locks(ticket, &chain, ttl, &mut job.locks).await?;

        let layout = self.config.layout.clone();
        let target_dir = ticket
            .target_mapset
            .as_ref()
            .map(|m| layout.user_mapset(&ticket.user_group, &ticket.project, m));
        let workspace = {
            let (group, project) = (ticket.user_group.clone(), ticket.project.clone());
            let root = layout.workspace_root(&ticket.resource_id, ticket.iteration);
            let required = chain.required_mapsets.clone();
            let handle = tokio::task::spawn_blocking(move || {
                Workspace::create(&layout, &group, &project, root, &required, target_dir.as_deref())
            });
            let created = job.creating.insert(handle).await;
            job.creating = None;
            created.map_err(|e| JobError::Task(e.to_string()))??
        };
        let JobRun { status, locks, workspace: slot, exported, .. } = job;
        let workspace = slot.insert(workspace);

        let opts = RunOptions {
            step_timeout: ticket.quota.step_timeout(),
            best_effort: self.config.best_effort.clone(),
        };
        let mut observer = StepTracker { executor: self, key, status: &mut *status, locks: locks.as_slice(), ttl };
        run_steps(&self.runner, workspace, &chain.steps, &opts, &mut observer).await?;

        let dest = self.config.layout.storage_dir(&ticket.user_id, &ticket.resource_id);
        for export in &chain.exports {
            self.checkpoint(key).await?;
            if let Some(path) = plan(export, &dest).path {
                exported.push(path);
            }
            let resource = export_resource(&self.runner, workspace, export, &dest, opts.step_timeout).await?;
            status.exports.push(resource);
            status.timestamp = self.clock.epoch_ms();
            self.statuses.commit(status).await?;
            self.heartbeat(locks.as_slice(), ttl).await?;
        }
        Ok(())
    }

    /// Merge the workspace into the target of a persistent job.
    async fn merge(&self, ticket: &JobTicket, key: &StatusKey, job: &JobRun) -> Result<(), JobError> {
        let (Some(target), Some(workspace)) = (&ticket.target_mapset, &job.workspace) else {
            return Ok(());
        };
        self.checkpoint(key).await?;
        let ttl = ticket.quota.lock_ttl();
        self.heartbeat(&job.locks, ttl).await?;

        let target_dir = self.config.layout.user_mapset(&ticket.user_group, &ticket.project, target);
        let source = workspace.mapset_dir();
        let source_name = workspace.mapset().to_string();
        let target = target.clone();
        let keepalive = self.keep_locks_alive(job.locks.clone(), ttl);
        let merged =
            tokio::task::spawn_blocking(move || merge_mapset(&source, &source_name, &target_dir, &target)).await;
        keepalive.abort();
        merged.map_err(|e| JobError::Task(e.to_string()))??;
        Ok(())
    }

    /// Lock the target mapset and every user-area source mapset. Fails on
    /// the first lock that is already held.
    async fn acquire_locks(
        &self,
        ticket: &JobTicket,
        chain: &ValidatedChain,
        ttl: Duration,
        held: &mut Vec<String>,
    ) -> Result<(), JobError> {
        let layout = &self.config.layout;
        let (group, project) = (ticket.user_group.as_str(), ticket.project.as_str());
        let mut wanted = Vec::new();
        if let Some(target) = &ticket.target_mapset {
            wanted.push(layout.lock_id(group, project, target));
        }
        for mapset in &chain.required_mapsets {
            if ticket.target_mapset.as_ref() == Some(mapset) {
                continue;
            }
            if layout.resolve(group, project, mapset).is_some_and(|loc| loc.area == MapsetArea::User) {
                wanted.push(layout.lock_id(group, project, mapset));
            }
        }

        for id in wanted {
            let id = id.to_string();
            if !self.locks.lock(&id, ttl).await? {
                return Err(JobError::LockConflict(id));
            }
            held.push(id);
        }
        Ok(())
    }

    async fn heartbeat(&self, held: &[String], ttl: Duration) -> Result<(), JobError> {
        for id in held {
            if !self.locks.extend(id, ttl).await? {
                return Err(JobError::LockLost(id.clone()));
            }
        }
        Ok(())
    }

    /// Extend `held` every third of `ttl` until aborted.
    fn keep_locks_alive(&self, held: Vec<String>, ttl: Duration) -> JoinHandle<()> {
        let locks = self.locks.clone();
        let period = (ttl / 3).max(Duration::from_millis(100));
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                for id in &held {
                    match locks.extend(id, ttl).await {
                        Ok(true) => {}
                        Ok(false) => tracing::error!(resource = %id, "lock lost during merge"),
                        Err(e) => tracing::warn!(resource = %id, error = %e, "cannot extend lock"),
                    }
                }
            }
        })
    }

    async fn cleanup(&self, ticket: &JobTicket, job: &mut JobRun, failed: bool) {
        if let Some(creating) = job.creating.take() {
            match creating.await {
                Ok(Ok(workspace)) => job.workspace = Some(workspace),
                Ok(Err(e)) => tracing::warn!(error = %e, "workspace creation failed"),
                Err(e) => tracing::warn!(error = %e, "workspace creation task failed"),
            }
        }
        for id in job.locks.drain(..) {
            if let Err(e) = self.locks.unlock(&id).await {
                tracing::warn!(resource = %id, error = %e, "cannot release lock, it expires with its ttl");
            }
        }

        let workspace = job.workspace.take();
        let root = self.config.layout.workspace_root(&ticket.resource_id, ticket.iteration);
        let removals = if failed { std::mem::take(&mut job.exported) } else { Vec::new() };
        let result = tokio::task::spawn_blocking(move || {
            let discarded = match workspace {
                Some(ws) => ws.discard().map_err(|e| e.to_string()),
                None => remove_path(&root).map_err(|e| e.to_string()),
            };
            if let Err(e) = discarded {
                tracing::warn!(root = %root.display(), error = %e, "cannot remove workspace");
            }
            for path in &removals {
                if let Err(e) = remove_path(path) {
                    tracing::warn!(path = %path.display(), error = %e, "cleanup failed");
                }
            }
        })
        .await;
        if let Err(e) = result {
            tracing::warn!(error = %e, "cleanup task failed");
        }
    }
}

/// Records progress and enforces termination and lock expiry between steps.
struct StepTracker<'a, S, R, C> {
    executor: &'a JobExecutor<S, R, C>,
    key: &'a StatusKey,
    status: &'a mut JobStatus,
    locks: &'a [String],
    ttl: Duration,
}

#[async_trait]
impl<S, R, C> StepObserver for StepTracker<'_, S, R, C>
where
    S: CoordinationStore,
    R: ToolRunner,
    C: Clock,
{
    async fn before_step(&mut self, _index: usize, _step: &ProcessStep) -> Result<(), JobError> {
        self.executor.checkpoint(self.key).await
    }

    async fn after_step(&mut self, entry: &ProcessLogEntry) -> Result<(), JobError> {
        self.status.record_step(entry.clone(), self.executor.clock.epoch_ms());
        self.executor.statuses.commit(self.status).await?;
        self.executor.heartbeat(self.locks, self.ttl).await
    }
}

#[cfg(test)]
#[path = "executor_tests.rs"]
mod tests;
