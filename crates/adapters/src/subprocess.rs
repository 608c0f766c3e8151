// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Child processes with a wall-clock bound.

use std::process::{Output, Stdio};
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;

#[derive(Debug, Error)]
pub enum SubprocessError {
    #[error("failed to start {description}: {source}")]
    Spawn {
        description: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{description} did not finish within {}s", .timeout.as_secs())]
    Timeout { description: String, timeout: Duration },
}

/// Run `cmd` to completion, capturing stdout and stderr.
///
/// The child is killed when `timeout` elapses. stdin is closed.
pub async fn run_with_timeout(
    mut cmd: Command,
    timeout: Duration,
    description: &str,
) -> Result<Output, SubprocessError> {
    cmd.stdin(Stdio::null()).stdout(Stdio::piped()).stderr(Stdio::piped()).kill_on_drop(true);
    match tokio::time::timeout(timeout, cmd.output()).await {
        Ok(Ok(output)) => Ok(output),
        Ok(Err(source)) => Err(SubprocessError::Spawn { description: description.to_string(), source }),
        Err(_) => {
            tracing::warn!(description, timeout_secs = timeout.as_secs(), "subprocess timed out, killed");
            Err(SubprocessError::Timeout { description: description.to_string(), timeout })
        }
    }
}

#[cfg(test)]
#[path = "subprocess_tests.rs"]
mod tests;
