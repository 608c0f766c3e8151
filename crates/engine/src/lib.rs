// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! mj-engine: workspaces, step execution, mapset merge and the job state machine

mod error;
mod executor;
pub(crate) mod export;
pub(crate) mod files;
mod layout;
pub mod merge;
mod run;
mod ticket;
mod workspace;

#[cfg(test)]
mod test_helpers;

pub use error::{JobError, MergeError, WorkspaceError};
pub use executor::{ExecutorConfig, JobExecutor};
pub use layout::{DatabaseLayout, MapsetArea, MapsetLocation};
pub use merge::{merge_mapset, MergeReport};
pub use run::{run_steps, RunOptions, StepObserver};
pub use ticket::{JobKind, JobTicket};
pub use workspace::{Workspace, FILE_DIR, GISRC_FILE};
