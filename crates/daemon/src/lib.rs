// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! mj-daemon: configuration, logging, job dispatch and the worker loop
//!
//! The `mjd` binary runs a [`Worker`]; the `mj` CLI submits through a
//! [`Dispatcher`] built from the same [`Config`].

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod config;
pub mod env;
pub mod logging;
pub mod queue;
pub mod setup;
pub mod worker;

#[cfg(test)]
mod test_helpers;

pub use config::{Config, ConfigError};
pub use queue::{queue_lengths, DispatchError, Dispatcher, QueuePolicy, Submission, QUEUE_PREFIX, QUEUE_REGISTRY};
pub use worker::{Worker, WorkerOptions};
