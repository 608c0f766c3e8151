// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wiring from [`Config`] to the concrete executor, dispatcher and worker.

use crate::config::Config;
use crate::queue::Dispatcher;
use crate::worker::{Worker, WorkerOptions};
use mj_adapters::ProcessToolRunner;
use mj_core::SystemClock;
use mj_engine::JobExecutor;
use mj_store::CoordinationStore;

/// Executor with real tool processes and the system clock
pub type Executor<S> = JobExecutor<S, ProcessToolRunner, SystemClock>;

pub fn tool_runner(config: &Config) -> ProcessToolRunner {
    ProcessToolRunner::new(config.tools.grass_base.clone(), config.tools.env.clone())
}

pub fn executor<S: CoordinationStore>(config: &Config, store: S) -> Executor<S> {
    JobExecutor::new(
        config.executor_config(),
        store,
        config.store.status_ttl(),
        tool_runner(config),
        SystemClock,
    )
}

pub fn dispatcher<S: CoordinationStore>(config: &Config, store: S) -> Dispatcher<S, ProcessToolRunner, SystemClock> {
    Dispatcher::new(config.queue.policy, config.queue.queue_count, executor(config, store))
}

pub fn worker<S: CoordinationStore>(config: &Config, store: S) -> Worker<S, ProcessToolRunner, SystemClock> {
    let opts = WorkerOptions {
        concurrency: config.queue.worker_concurrency,
        max_jobs_per_user: config.queue.max_jobs_per_user,
        poll_interval: config.queue.poll_interval(),
    };
    Worker::new(executor(config, store), opts)
}
