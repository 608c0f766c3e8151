// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the daemon crate.

use std::path::PathBuf;

/// Explicit config file path
pub fn config_path() -> Option<PathBuf> {
    std::env::var("MJ_CONFIG").ok().filter(|s| !s.is_empty()).map(PathBuf::from)
}

/// Resolve the default config file: XDG_CONFIG_HOME/mj/config.toml > ~/.config/mj/config.toml
pub fn default_config_path() -> Option<PathBuf> {
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        return Some(PathBuf::from(xdg).join("mj/config.toml"));
    }
    dirs::config_dir().map(|dir| dir.join("mj/config.toml"))
}

/// Resolve the data root: MJ_DATA_DIR > XDG_DATA_HOME/mj > ~/.local/share/mj
pub fn data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("MJ_DATA_DIR") {
        return PathBuf::from(dir);
    }
    if let Ok(xdg) = std::env::var("XDG_DATA_HOME") {
        return PathBuf::from(xdg).join("mj");
    }
    dirs::data_local_dir().map(|dir| dir.join("mj")).unwrap_or_else(|| PathBuf::from(".mj"))
}

/// Coordination store URL override
pub fn redis_url() -> Option<String> {
    std::env::var("MJ_REDIS_URL").ok().filter(|s| !s.is_empty())
}

/// Queue policy override (`per_job`, `per_user`, `redis`, `local`)
pub fn queue_policy() -> Option<String> {
    std::env::var("MJ_QUEUE_POLICY").ok().filter(|s| !s.is_empty())
}

/// Log filter directive, preferred over `RUST_LOG`
pub fn log_filter() -> Option<String> {
    std::env::var("MJ_LOG").ok().filter(|s| !s.is_empty())
}
