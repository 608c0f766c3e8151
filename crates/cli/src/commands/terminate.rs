// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Terminate command handler

use super::JobRef;
use anyhow::{anyhow, Result};
use clap::Args;
use mj_store::{CoordinationStore, JobStatusStore};

#[derive(Args, Debug)]
pub struct TerminateArgs {
    #[command(flatten)]
    pub job: JobRef,
}

/// Ask the executor to stop at its next checkpoint.
pub async fn handle<S: CoordinationStore>(args: TerminateArgs, statuses: &JobStatusStore<S>) -> Result<()> {
    let key = args.job.key(statuses).await?;
    let status = statuses.get(&key).await?.ok_or_else(|| anyhow!("no status recorded for {key}"))?;
    if status.is_terminal() {
        println!("{} already {}", key, status.status);
        return Ok(());
    }
    statuses.request_termination(&key).await?;
    println!("Termination requested for {key}");
    Ok(())
}
