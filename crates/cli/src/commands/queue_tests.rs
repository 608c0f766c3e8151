// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use mj_daemon::QUEUE_REGISTRY;
use mj_store::MemoryStore;

#[tokio::test]
async fn lists_registered_queues() {
    let store = MemoryStore::new();
    store.push("job_queue_alice", "{}").await.unwrap();
    store.add_member(QUEUE_REGISTRY, "job_queue_alice").await.unwrap();

    assert!(handle(&store, OutputFormat::Json).await.is_ok());
    assert!(handle(&store, OutputFormat::Text).await.is_ok());
}
