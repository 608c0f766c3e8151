// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use mj_core::{JobState, StatusDecodeError};
use thiserror::Error;

/// Errors from coordination store operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("coordination store: {0}")]
    Redis(#[from] ::redis::RedisError),
    #[error(transparent)]
    Decode(#[from] StatusDecodeError),
    #[error("failed to encode status record: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("status {key} is already {state} and cannot be overwritten")]
    TerminalOverwrite { key: String, state: JobState },
    #[error("no terminal status at {key} after {waited_ms}ms")]
    PollTimeout { key: String, waited_ms: u64 },
    #[error("key {0} does not hold an integer")]
    NotAnInteger(String),
}
