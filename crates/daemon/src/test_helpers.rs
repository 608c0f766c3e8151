// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fixtures for dispatch and worker tests.

use crate::config::{Config, PathsConfig};
use mj_adapters::FakeToolRunner;
use mj_core::test_support::quota_allowing;
use mj_core::{SystemClock, UserQuota};
use mj_engine::{JobExecutor, JobTicket};
use mj_store::MemoryStore;
use serde_json::json;
use std::fs;
use std::path::Path;

pub(crate) const PROJECT: &str = "nc";

pub(crate) type TestExecutor = JobExecutor<MemoryStore, FakeToolRunner, SystemClock>;

/// Config rooted at `root` with a global `nc/PERMANENT` carrying a region.
pub(crate) fn seeded_config(root: &Path) -> Config {
    let mut config = Config::default();
    let layout = mj_engine::DatabaseLayout::under(root);
    config.paths = PathsConfig {
        grass_database: layout.grass_database.clone(),
        user_database: layout.user_database.clone(),
        tmp_workdir: layout.tmp_workdir.clone(),
        download_cache: layout.download_cache.clone(),
        resource_storage: layout.resource_storage.clone(),
        log_dir: None,
    };
    config.store.url = "memory://".to_string();
    let permanent = layout.global_mapset(PROJECT, "PERMANENT");
    fs::create_dir_all(permanent.join("cell")).unwrap();
    fs::write(permanent.join("DEFAULT_WIND"), "north: 10\nsouth: 0\n").unwrap();
    fs::write(permanent.join("cell/elevation"), "cells").unwrap();
    config
}

pub(crate) fn quota() -> UserQuota {
    quota_allowing(&["g.region", "r.info", "r.mapcalc"])
}

pub(crate) fn executor(config: &Config, store: MemoryStore, runner: FakeToolRunner) -> TestExecutor {
    JobExecutor::new(config.executor_config(), store, config.store.status_ttl(), runner, SystemClock)
}

/// A one-step ephemeral job for `user`.
pub(crate) fn ticket(user: &str, module: &str) -> JobTicket {
    let chain = json!({"version": "1", "list": [
        {"id": 1, "module": module, "inputs": {"map": "elevation@PERMANENT"}}
    ]});
    JobTicket::new(user, user, PROJECT, chain).quota(quota())
}
