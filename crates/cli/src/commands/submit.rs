// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Submit command handler

use super::status::wait;
use crate::output::{exit_code, print_status, OutputFormat};
use anyhow::{Context, Result};
use clap::Args;
use mj_core::{validate_name, ResourceId};
use mj_daemon::{setup, Config, Submission};
use mj_engine::JobTicket;
use mj_store::CoordinationStore;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Args, Debug)]
pub struct SubmitArgs {
    /// Process chain JSON file, `-` for stdin
    pub chain: PathBuf,
    /// Submitting user; selects the quota
    #[arg(long)]
    pub user: String,
    /// Group owning the writable database (default: the user)
    #[arg(long)]
    pub group: Option<String>,
    #[arg(long)]
    pub project: String,
    /// Merge results into this mapset
    #[arg(long)]
    pub target: Option<String>,
    /// Run an existing resource again as a new iteration
    #[arg(long)]
    pub resource: Option<String>,
    /// Block until the job reaches a terminal state
    #[arg(long)]
    pub wait: bool,
}

pub fn read_chain(path: &Path) -> Result<serde_json::Value> {
    let raw = if path == Path::new("-") {
        let mut raw = String::new();
        std::io::stdin().read_to_string(&mut raw).context("cannot read chain from stdin")?;
        raw
    } else {
        std::fs::read_to_string(path).with_context(|| format!("cannot read {}", path.display()))?
    };
    serde_json::from_str(&raw).context("process chain is not valid JSON")
}

pub fn ticket(args: &SubmitArgs, config: &Config, chain: serde_json::Value) -> Result<JobTicket> {
    let group = args.group.clone().unwrap_or_else(|| args.user.clone());
    for name in [&group, &args.project].into_iter().chain(args.target.as_ref()) {
        validate_name(name).with_context(|| format!("invalid name '{name}'"))?;
    }
    let mut ticket = JobTicket::new(&args.user, group, &args.project, chain).quota(config.quota.for_user(&args.user));
    if let Some(target) = &args.target {
        ticket = ticket.target_mapset(target);
    }
    if let Some(resource) = &args.resource {
        ticket = ticket.resource_id(ResourceId::from(resource.as_str()));
    }
    Ok(ticket)
}

pub async fn handle<S: CoordinationStore>(
    args: SubmitArgs,
    config: &Config,
    store: S,
    format: OutputFormat,
) -> Result<ExitCode> {
    let chain = read_chain(&args.chain)?;
    let ticket = ticket(&args, config, chain)?;
    let dispatcher = setup::dispatcher(config, store);

    let (ticket, submission) = dispatcher.submit(ticket).await?;
    let status = match submission {
        Submission::Completed(status) => status,
        Submission::Queued { queue, status } if !args.wait => {
            if format == OutputFormat::Text {
                println!("Queued {} (iteration {}) on {}", ticket.resource_id, ticket.iteration, queue);
            }
            print_status(&status, format)?;
            return Ok(ExitCode::SUCCESS);
        }
        Submission::Queued { .. } => wait(dispatcher.executor().statuses(), &ticket.status_key(), None).await?,
    };
    print_status(&status, format)?;
    Ok(exit_code(&status))
}

#[cfg(test)]
#[path = "submit_tests.rs"]
mod tests;
