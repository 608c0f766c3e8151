// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Sequential step execution inside a workspace.

use crate::error::JobError;
use crate::workspace::Workspace;
use async_trait::async_trait;
use mj_adapters::{ToolInvocation, ToolRunner};
use mj_chain::ProcessStep;
use mj_core::ProcessLogEntry;
use std::collections::BTreeSet;
use std::time::Duration;

/// Hooks the caller gets between steps.
#[async_trait]
pub trait StepObserver: Send {
    /// Called before each step. An error stops the chain before the step runs.
    async fn before_step(&mut self, index: usize, step: &ProcessStep) -> Result<(), JobError>;

    /// Called with the log entry of every step that ran, including a failing one.
    async fn after_step(&mut self, entry: &ProcessLogEntry) -> Result<(), JobError>;
}

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub step_timeout: Duration,
    /// Modules whose non-zero exit does not stop the chain
    pub best_effort: BTreeSet<String>,
}

/// Run `steps` in order and return their log.
///
/// Stops at the first step that exits non-zero unless it is best effort.
pub async fn run_steps<R: ToolRunner>(
    runner: &R,
    workspace: &Workspace,
    steps: &[ProcessStep],
    opts: &RunOptions,
    observer: &mut dyn StepObserver,
) -> Result<Vec<ProcessLogEntry>, JobError> {
    let mut log = Vec::with_capacity(steps.len());
    for (index, step) in steps.iter().enumerate() {
        observer.before_step(index, step).await?;

        let entry = run_step(runner, workspace, step, opts.step_timeout).await?;
        tracing::info!(
            step = step.id(),
            executable = step.program(),
            return_code = entry.return_code,
            elapsed_ms = (entry.run_time * 1000.0) as u64,
            mapset_size = entry.mapset_size,
            "step finished"
        );
        observer.after_step(&entry).await?;

        let failed = entry.return_code != 0 && !opts.best_effort.contains(step.program());
        if entry.return_code != 0 && !failed {
            tracing::warn!(step = step.id(), "best-effort step failed, continuing");
        }
        let (return_code, stderr) = (entry.return_code, entry.stderr.clone());
        log.push(entry);
        if failed {
            return Err(JobError::ToolExecution {
                step: step.id().to_string(),
                executable: step.program().to_string(),
                return_code,
                stderr: stderr.trim().to_string(),
            });
        }
    }
    Ok(log)
}

async fn run_step<R: ToolRunner>(
    runner: &R,
    workspace: &Workspace,
    step: &ProcessStep,
    timeout: Duration,
) -> Result<ProcessLogEntry, JobError> {
    let invocation = ToolInvocation {
        executable: step.program().to_string(),
        args: step.args(),
        cwd: workspace.mapset_dir(),
        env: workspace.env(),
        timeout,
    };
    let output = runner.run(&invocation).await.map_err(|source| JobError::ToolRunner {
        step: step.id().to_string(),
        executable: invocation.executable.clone(),
        source,
    })?;
    Ok(ProcessLogEntry {
        id: step.id().to_string(),
        executable: invocation.executable,
        parameters: invocation.args,
        return_code: output.return_code,
        run_time: output.run_time.as_secs_f64(),
        stdout: output.stdout,
        stderr: output.stderr,
        mapset_size: workspace.size(),
    })
}

#[cfg(test)]
#[path = "run_tests.rs"]
mod tests;
