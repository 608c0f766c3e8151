// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! mj-store: coordination store access for locks, job status and queues

mod error;
mod kv;
mod lock;
mod memory;
mod redis_store;
mod status;

pub use error::StoreError;
pub use kv::CoordinationStore;
pub use lock::{ResourceLocker, LOCK_PREFIX};
pub use memory::MemoryStore;
pub use redis_store::RedisStore;
pub use status::{JobStatusStore, PollOptions, StatusKey, STATUS_PREFIX, TERMINATION_PREFIX};
