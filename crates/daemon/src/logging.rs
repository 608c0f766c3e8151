// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tracing subscriber setup for the daemon.

use crate::env;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

pub const LOG_FILE: &str = "mjd.log";

/// Keeps the background log writer alive; flushes on drop.
pub struct LogGuard {
    _file: Option<WorkerGuard>,
}

/// `MJ_LOG`, then `RUST_LOG`, then `info`.
pub fn filter() -> EnvFilter {
    if let Some(directives) = env::log_filter() {
        return EnvFilter::new(directives);
    }
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Install the global subscriber: a daily rolling file in `log_dir` when
/// given, stderr otherwise.
pub fn init(log_dir: Option<&Path>) -> std::io::Result<LogGuard> {
    let Some(dir) = log_dir else {
        let _ = tracing_subscriber::registry()
            .with(filter())
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .try_init();
        return Ok(LogGuard { _file: None });
    };

    std::fs::create_dir_all(dir)?;
    let appender = tracing_appender::rolling::daily(dir, LOG_FILE);
    let (writer, guard) = tracing_appender::non_blocking(appender);
    let _ = tracing_subscriber::registry()
        .with(filter())
        .with(tracing_subscriber::fmt::layer().with_writer(writer).with_ansi(false))
        .try_init();
    Ok(LogGuard { _file: Some(guard) })
}

#[cfg(test)]
#[path = "logging_tests.rs"]
mod tests;
