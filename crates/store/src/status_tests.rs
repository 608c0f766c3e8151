// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::MemoryStore;
use mj_core::test_support::accepted_status;
use mj_core::{ErrorInfo, JobState};

fn statuses() -> JobStatusStore<MemoryStore> {
    JobStatusStore::new(MemoryStore::new(), Duration::from_secs(600))
}

fn fast_poll(timeout_ms: u64) -> PollOptions {
    PollOptions {
        initial: Duration::from_millis(1),
        max_interval: Duration::from_millis(10),
        timeout: Some(Duration::from_millis(timeout_ms)),
    }
}

#[tokio::test]
async fn commit_then_get() {
    let store = statuses();
    let status = accepted_status("alice", "resource_id-1", 2);
    let key = StatusKey::of(&status);
    assert_eq!(store.get(&key).await.unwrap(), None);

    store.commit(&status).await.unwrap();
    assert_eq!(store.get(&key).await.unwrap(), Some(status));
}

#[tokio::test]
async fn key_layout_includes_user_resource_and_iteration() {
    let store = statuses();
    let status = accepted_status("alice", "resource_id-1", 2);
    store.commit(&status).await.unwrap();
    let raw = store.coordination().get("RESOURCE-STATUS::alice::resource_id-1::1").await.unwrap();
    assert!(raw.is_some());
}

#[tokio::test]
async fn terminal_records_are_never_overwritten() {
    let store = statuses();
    let mut status = accepted_status("alice", "r", 1);
    status.transition(JobState::Running, "running", 1).unwrap();
    status.transition(JobState::Finished, "done", 2).unwrap();
    store.commit(&status).await.unwrap();

    let mut late = accepted_status("alice", "r", 1);
    late.fail(JobState::Error, ErrorInfo { kind: "x".into(), message: "late".into() }, 3).unwrap();
    let err = store.commit(&late).await.unwrap_err();
    assert!(matches!(err, StoreError::TerminalOverwrite { state: JobState::Finished, .. }));
    assert_eq!(store.get(&StatusKey::of(&status)).await.unwrap().unwrap().message, "done");
}

#[tokio::test]
async fn poll_returns_terminal_record() {
    let store = statuses();
    let mut status = accepted_status("alice", "r", 1);
    store.commit(&status).await.unwrap();
    let key = StatusKey::of(&status);

    let writer = store.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        status.transition(JobState::Running, "running", 1).unwrap();
        writer.commit(&status).await.unwrap();
        status.transition(JobState::Finished, "done", 2).unwrap();
        writer.commit(&status).await.unwrap();
    });

    let done = store.poll(&key, fast_poll(5_000)).await.unwrap();
    assert_eq!(done.status, JobState::Finished);
}

#[tokio::test]
async fn poll_times_out_on_non_terminal_record() {
    let store = statuses();
    let status = accepted_status("alice", "r", 1);
    store.commit(&status).await.unwrap();

    let err = store.poll(&StatusKey::of(&status), fast_poll(30)).await.unwrap_err();
    assert!(matches!(err, StoreError::PollTimeout { .. }));
}

#[tokio::test]
async fn iterations_count_per_resource() {
    let store = statuses();
    let r = ResourceId::from("resource_id-1");
    assert_eq!(store.latest_iteration("alice", &r).await.unwrap(), None);
    assert_eq!(store.next_iteration("alice", &r).await.unwrap(), 1);
    assert_eq!(store.next_iteration("alice", &r).await.unwrap(), 2);
    assert_eq!(store.next_iteration("bob", &r).await.unwrap(), 1);
    assert_eq!(store.latest_iteration("alice", &r).await.unwrap(), Some(2));
}

#[tokio::test]
async fn termination_flag_round_trip() {
    let store = statuses();
    let key = StatusKey::new("alice", ResourceId::from("r"), 1);
    assert!(!store.termination_requested(&key).await.unwrap());
    store.request_termination(&key).await.unwrap();
    assert!(store.termination_requested(&key).await.unwrap());
    assert!(!store.termination_requested(&StatusKey::new("alice", ResourceId::from("r"), 2)).await.unwrap());
    store.clear_termination(&key).await.unwrap();
    assert!(!store.termination_requested(&key).await.unwrap());
}

#[test]
fn sealed_names_are_the_terminal_states() {
    use JobState::*;
    for state in [Accepted, Running, Finished, Error, Terminated] {
        assert_eq!(TERMINAL_STATES.contains(&state.to_string().as_str()), state.is_terminal(), "{state}");
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn racing_commits_never_replace_a_terminal_record() {
    for _ in 0..50 {
        let store = statuses();
        let mut running = accepted_status("alice", "r", 1);
        running.transition(JobState::Running, "step 1", 1).unwrap();
        let mut finished = running.clone();
        finished.transition(JobState::Finished, "done", 2).unwrap();

        let (a, b) = (store.clone(), store.clone());
        let late = tokio::spawn(async move { a.commit(&running).await });
        let last = tokio::spawn(async move { b.commit(&finished).await });
        let _ = late.await.unwrap();
        last.await.unwrap().unwrap();

        let stored = store.get(&StatusKey::new("alice", "r".into(), 1)).await.unwrap().unwrap();
        assert_eq!(stored.status, JobState::Finished);
    }
}
