// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Administrative lock release

use anyhow::Result;
use clap::Args;
use mj_core::MapsetLockId;
use mj_store::{CoordinationStore, ResourceLocker};

#[derive(Args, Debug)]
pub struct UnlockArgs {
    /// Mapset as group/project/mapset
    pub mapset: MapsetLockId,
}

/// Returns whether a lock was held.
pub async fn handle<S: CoordinationStore>(args: UnlockArgs, locks: &ResourceLocker<S>) -> Result<bool> {
    let id = args.mapset.to_string();
    let existed = locks.unlock(&id).await?;
    if existed {
        println!("Released lock on {id}");
    } else {
        println!("{id} was not locked");
    }
    Ok(existed)
}
