// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::color;
use clap::ValueEnum;
use mj_core::{JobState, JobStatus};
use std::fmt::Write;
use std::process::ExitCode;

#[cfg(test)]
#[path = "output_tests.rs"]
mod tests;

#[derive(Clone, Copy, Debug, Default, PartialEq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// RFC 3339 rendering of an epoch-millisecond timestamp, `-` when unset.
pub fn format_epoch_ms(epoch_ms: u64) -> String {
    if epoch_ms == 0 {
        return "-".to_string();
    }
    i64::try_from(epoch_ms)
        .ok()
        .and_then(chrono::DateTime::from_timestamp_millis)
        .map(|t| t.to_rfc3339_opts(chrono::SecondsFormat::Secs, true))
        .unwrap_or_else(|| "-".to_string())
}

/// Human readable rendering of a status record.
pub fn format_status(status: &JobStatus) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{} {} (iteration {})",
        color::header("resource"),
        status.resource_id,
        status.iteration
    );
    let _ = writeln!(out, "  status:   {}", color::state(status.status));
    let _ = writeln!(out, "  user:     {}", status.user_id);
    let _ = writeln!(out, "  accepted: {}", format_epoch_ms(status.accept_timestamp));
    let _ = writeln!(out, "  progress: {}/{}", status.progress.step, status.progress.num_of_steps);
    let _ = writeln!(out, "  elapsed:  {:.1}s", status.time_delta);
    let _ = writeln!(out, "  message:  {}", status.message);
    if let Some(exception) = &status.exception {
        let _ = writeln!(out, "  error:    {}", exception.kind);
    }
    for entry in &status.process_log {
        let _ = writeln!(
            out,
            "  {} {} {}",
            color::context(&format!("[{}]", entry.id)),
            entry.executable,
            color::context(&format!("exit={} {:.2}s", entry.return_code, entry.run_time))
        );
    }
    for export in &status.exports {
        let location = export.path.as_deref().unwrap_or("(database)");
        let _ = writeln!(out, "  export {} ({} {}) -> {}", export.name, export.kind, export.format, location);
    }
    out
}

pub fn print_status(status: &JobStatus, format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Text => print!("{}", format_status(status)),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(status)?),
    }
    Ok(())
}

/// Non-zero for jobs that ended in `error` or `terminated`.
pub fn exit_code(status: &JobStatus) -> ExitCode {
    match status.status {
        JobState::Error => ExitCode::from(2),
        JobState::Terminated => ExitCode::from(3),
        _ => ExitCode::SUCCESS,
    }
}
