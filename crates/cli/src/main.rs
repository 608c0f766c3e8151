// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! mj: submit and inspect mapset jobs

mod color;
mod commands;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{status, submit, terminate, unlock};
use mj_daemon::{logging, setup, Config};
use mj_store::{CoordinationStore, JobStatusStore, MemoryStore, RedisStore, ResourceLocker};
use output::OutputFormat;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "mj", version, about = "Mapset jobs: submit, watch and manage", styles = color::styles())]
struct Cli {
    /// Config file (default: $MJ_CONFIG, then ~/.config/mj/config.toml)
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[arg(long, short, global = true, value_enum, default_value_t)]
    output: OutputFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Validate a process chain and dispatch it
    Submit(submit::SubmitArgs),
    /// Show a job's status record
    Status(status::StatusArgs),
    /// Request cooperative termination of a job
    Terminate(terminate::TerminateArgs),
    /// Release a mapset lock held by a dead job
    Unlock(unlock::UnlockArgs),
    /// List worker queues and their backlog
    Queues,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let config = Config::load(cli.config.as_deref())?;
    let _guard = logging::init(None)?;
    if config.store.is_memory() {
        dispatch(cli.command, &config, MemoryStore::new(), cli.output).await
    } else {
        let store = RedisStore::connect(&config.store.url).await?;
        dispatch(cli.command, &config, store, cli.output).await
    }
}

async fn dispatch<S: CoordinationStore>(
    command: Command,
    config: &Config,
    store: S,
    format: OutputFormat,
) -> Result<ExitCode> {
    let statuses = JobStatusStore::new(store.clone(), config.store.status_ttl());
    match command {
        Command::Submit(args) => submit::handle(args, config, store, format).await,
        Command::Status(args) => status::handle(args, &statuses, format).await,
        Command::Terminate(args) => {
            terminate::handle(args, &statuses).await?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Unlock(args) => {
            unlock::handle(args, &ResourceLocker::new(store)).await?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Queues => {
            commands::queue::handle(&store, format).await?;
            Ok(ExitCode::SUCCESS)
        }
    }
}
