// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::queue::{Dispatcher, QueuePolicy};
use crate::test_helpers::{executor, seeded_config, ticket, TestExecutor};
use mj_adapters::{FakeTool, FakeToolRunner};
use mj_core::JobState;
use mj_store::{MemoryStore, StatusKey};
use std::sync::atomic::{AtomicBool, Ordering};

struct Setup {
    _dir: tempfile::TempDir,
    dispatcher: Dispatcher<MemoryStore, FakeToolRunner, mj_core::SystemClock>,
    executor: TestExecutor,
}

fn setup(policy: QueuePolicy, runner: FakeToolRunner) -> Setup {
    let dir = tempfile::tempdir().unwrap();
    let config = seeded_config(dir.path());
    let executor = executor(&config, MemoryStore::new(), runner);
    let dispatcher = Dispatcher::new(policy, 1, executor.clone());
    Setup { _dir: dir, dispatcher, executor }
}

async fn submit(setup: &Setup, user: &str) -> StatusKey {
    let (ticket, _) = setup.dispatcher.submit(ticket(user, "r.info")).await.unwrap();
    ticket.status_key()
}

fn opts(concurrency: usize, max_jobs_per_user: usize) -> WorkerOptions {
    WorkerOptions { concurrency, max_jobs_per_user, poll_interval: Duration::from_millis(10) }
}

async fn state(executor: &TestExecutor, key: &StatusKey) -> JobState {
    executor.statuses().get(key).await.unwrap().unwrap().status
}

/// `r.info` blocks until the gate opens.
fn gated_runner(gate: Arc<AtomicBool>) -> FakeToolRunner {
    let runner = FakeToolRunner::new();
    runner.on(
        "r.info",
        FakeTool::exit(0).effect(move |_| {
            while !gate.load(Ordering::SeqCst) {
                std::thread::sleep(Duration::from_millis(5));
            }
        }),
    );
    runner
}

#[tokio::test]
async fn queued_jobs_run_to_completion() {
    let setup = setup(QueuePolicy::PerJob, FakeToolRunner::new());
    let first = submit(&setup, "alice").await;
    let second = submit(&setup, "bob").await;
    let mut worker = Worker::new(setup.executor.clone(), opts(4, 2));

    assert_eq!(worker.poll_once().await.unwrap(), 2);
    worker.drain().await;

    assert_eq!(state(&setup.executor, &first).await, JobState::Finished);
    assert_eq!(state(&setup.executor, &second).await, JobState::Finished);
    assert_eq!(worker.poll_once().await.unwrap(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrency_limit_bounds_running_jobs() {
    let gate = Arc::new(AtomicBool::new(false));
    let setup = setup(QueuePolicy::PerJob, gated_runner(gate.clone()));
    for user in ["a", "b", "c"] {
        submit(&setup, user).await;
    }
    let mut worker = Worker::new(setup.executor.clone(), opts(2, 2));

    assert_eq!(worker.poll_once().await.unwrap(), 2);
    assert_eq!(worker.active(), 2);
    assert_eq!(worker.poll_once().await.unwrap(), 0);

    gate.store(true, Ordering::SeqCst);
    worker.drain().await;
    assert_eq!(worker.poll_once().await.unwrap(), 1);
    worker.drain().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn per_user_limit_requeues_ticket() {
    let gate = Arc::new(AtomicBool::new(false));
    let setup = setup(QueuePolicy::PerJob, gated_runner(gate.clone()));
    let first = submit(&setup, "alice").await;
    let second = submit(&setup, "alice").await;
    let mut worker = Worker::new(setup.executor.clone(), opts(4, 1));

    assert_eq!(worker.poll_once().await.unwrap(), 1);
    assert_eq!(worker.running_for("alice"), 1);
    let store = setup.executor.statuses().coordination();
    let waiting: usize = crate::queue_lengths(store).await.unwrap().iter().map(|(_, n)| n).sum();
    assert_eq!(waiting, 1);

    gate.store(true, Ordering::SeqCst);
    worker.drain().await;
    assert_eq!(worker.running_for("alice"), 0);
    assert_eq!(worker.poll_once().await.unwrap(), 1);
    worker.drain().await;

    assert_eq!(state(&setup.executor, &first).await, JobState::Finished);
    assert_eq!(state(&setup.executor, &second).await, JobState::Finished);
}

#[tokio::test]
async fn undecodable_ticket_is_dropped() {
    let setup = setup(QueuePolicy::PerJob, FakeToolRunner::new());
    let store = setup.executor.statuses().coordination();
    store.push("job_queue_x", "not json").await.unwrap();
    store.add_member(QUEUE_REGISTRY, "job_queue_x").await.unwrap();
    let mut worker = Worker::new(setup.executor.clone(), opts(1, 1));

    assert_eq!(worker.poll_once().await.unwrap(), 0);
    assert_eq!(store.list_len("job_queue_x").await.unwrap(), 0);
}

#[tokio::test]
async fn run_stops_on_cancel() {
    let setup = setup(QueuePolicy::PerUser, FakeToolRunner::new());
    let key = submit(&setup, "alice").await;
    let worker = Worker::new(setup.executor.clone(), opts(1, 1));
    let cancel = CancellationToken::new();
    let handle = tokio::spawn(worker.run(cancel.clone()));

    let status = setup
        .executor
        .statuses()
        .poll(&key, mj_store::PollOptions { timeout: Some(Duration::from_secs(10)), ..Default::default() })
        .await
        .unwrap();
    cancel.cancel();
    handle.await.unwrap();

    assert_eq!(status.status, JobState::Finished);
}

#[tokio::test]
async fn drained_queues_leave_the_registry() {
    let setup = setup(QueuePolicy::PerJob, FakeToolRunner::new());
    submit(&setup, "alice").await;
    submit(&setup, "bob").await;
    let store = setup.executor.statuses().coordination();
    assert_eq!(store.members(QUEUE_REGISTRY).await.unwrap().len(), 2);
    let mut worker = Worker::new(setup.executor.clone(), opts(4, 2));

    assert_eq!(worker.poll_once().await.unwrap(), 2);
    worker.drain().await;
    assert_eq!(worker.poll_once().await.unwrap(), 0);

    assert!(store.members(QUEUE_REGISTRY).await.unwrap().is_empty());
    let third = submit(&setup, "carol").await;
    assert_eq!(store.members(QUEUE_REGISTRY).await.unwrap().len(), 1);
    assert_eq!(worker.poll_once().await.unwrap(), 1);
    worker.drain().await;
    assert_eq!(state(&setup.executor, &third).await, JobState::Finished);
}
