// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! mjd: mapset job worker daemon

use anyhow::{Context, Result};
use clap::Parser;
use mj_daemon::{logging, setup, Config};
use mj_store::{CoordinationStore, MemoryStore, RedisStore};
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;

#[derive(Parser)]
#[command(name = "mjd", version, about = "Run queued mapset jobs")]
struct Args {
    /// Config file (default: $MJ_CONFIG, then ~/.config/mj/config.toml)
    #[arg(long, short)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = Config::load(args.config.as_deref())?;
    let _guard = logging::init(config.paths.log_dir.as_deref()).context("cannot set up logging")?;

    if config.store.is_memory() {
        tracing::warn!("memory:// store is process local, only jobs submitted in this process are seen");
        serve(config, MemoryStore::new()).await
    } else {
        let store = RedisStore::connect(&config.store.url).await?;
        serve(config, store).await
    }
}

async fn serve<S: CoordinationStore>(config: Config, store: S) -> Result<()> {
    let cancel = CancellationToken::new();
    let worker = setup::worker(&config, store);
    let handle = tokio::spawn(worker.run(cancel.clone()));

    tokio::signal::ctrl_c().await.context("cannot listen for shutdown signal")?;
    tracing::info!("shutdown requested");
    cancel.cancel();
    handle.await.context("worker task failed")?;
    Ok(())
}
