// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Queue inspection

use crate::output::OutputFormat;
use anyhow::Result;
use mj_daemon::queue_lengths;
use mj_store::CoordinationStore;

pub async fn handle<S: CoordinationStore>(store: &S, format: OutputFormat) -> Result<()> {
    let queues = queue_lengths(store).await?;
    match format {
        OutputFormat::Json => {
            let entries: Vec<_> =
                queues.iter().map(|(name, pending)| serde_json::json!({"name": name, "pending": pending})).collect();
            println!("{}", serde_json::to_string_pretty(&entries)?);
        }
        OutputFormat::Text => {
            if queues.is_empty() {
                println!("No queues");
            }
            for (name, pending) in &queues {
                println!("{name}  pending={pending}");
            }
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
