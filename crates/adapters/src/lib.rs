// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! mj-adapters: external tool execution

pub mod subprocess;
mod tool;

pub use subprocess::{run_with_timeout, SubprocessError};
pub use tool::{ProcessToolRunner, RunnerError, ToolInvocation, ToolOutput, ToolRunner};

#[cfg(any(test, feature = "test-support"))]
pub use tool::{FakeCall, FakeToolRunner, FakeTool};
