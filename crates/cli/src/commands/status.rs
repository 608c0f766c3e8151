// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Status command handler

use super::JobRef;
use crate::output::{exit_code, print_status, OutputFormat};
use anyhow::{anyhow, Result};
use clap::Args;
use mj_core::JobStatus;
use mj_store::{CoordinationStore, JobStatusStore, PollOptions, StatusKey};
use std::process::ExitCode;
use std::time::Duration;

#[derive(Args, Debug)]
pub struct StatusArgs {
    #[command(flatten)]
    pub job: JobRef,
    /// Block until the job reaches a terminal state
    #[arg(long)]
    pub wait: bool,
    /// Give up waiting after this many seconds
    #[arg(long, requires = "wait")]
    pub timeout: Option<u64>,
}

pub async fn handle<S: CoordinationStore>(
    args: StatusArgs,
    statuses: &JobStatusStore<S>,
    format: OutputFormat,
) -> Result<ExitCode> {
    let key = args.job.key(statuses).await?;
    let status = if args.wait {
        wait(statuses, &key, args.timeout.map(Duration::from_secs)).await?
    } else {
        statuses.get(&key).await?.ok_or_else(|| anyhow!("no status recorded for {key}"))?
    };
    print_status(&status, format)?;
    Ok(if args.wait { exit_code(&status) } else { ExitCode::SUCCESS })
}

/// Poll with backoff until `key` is terminal.
pub async fn wait<S: CoordinationStore>(
    statuses: &JobStatusStore<S>,
    key: &StatusKey,
    timeout: Option<Duration>,
) -> Result<JobStatus> {
    Ok(statuses.poll(key, PollOptions { timeout, ..PollOptions::default() }).await?)
}
