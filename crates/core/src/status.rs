// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job status record and its state machine.
//!
//! The record is serialized as versioned JSON so any client can decode it.
//! A record is created `accepted`, moves to `running`, and ends in exactly one
//! terminal state that is never overwritten.

use crate::id::ResourceId;
use crate::resource::ResourceKind;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Version of the serialized [`JobStatus`] layout.
pub const STATUS_SCHEMA_VERSION: u32 = 1;

/// Lifecycle state of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Accepted,
    Running,
    Finished,
    Error,
    Terminated,
}

impl JobState {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobState::Finished | JobState::Error | JobState::Terminated)
    }

    /// Whether `self -> next` is a legal transition.
    ///
    /// `running -> running` is allowed so progress updates can be committed.
    pub fn can_transition_to(self, next: JobState) -> bool {
        match (self, next) {
            (JobState::Accepted, JobState::Running) => true,
            (JobState::Accepted, JobState::Error | JobState::Terminated) => true,
            (JobState::Running, JobState::Running) => true,
            (JobState::Running, s) => s.is_terminal(),
            _ => false,
        }
    }
}

crate::simple_display! {
    JobState {
        Accepted => "accepted",
        Running => "running",
        Finished => "finished",
        Error => "error",
        Terminated => "terminated",
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("illegal job status transition {from} -> {to}")]
pub struct TransitionError {
    pub from: JobState,
    pub to: JobState,
}

/// Step counter shown to polling clients.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    pub step: usize,
    pub num_of_steps: usize,
}

/// One executed process step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessLogEntry {
    /// Step id from the process chain
    pub id: String,
    pub executable: String,
    pub parameters: Vec<String>,
    pub return_code: i32,
    /// Wall-clock seconds
    pub run_time: f64,
    #[serde(default)]
    pub stdout: String,
    #[serde(default)]
    pub stderr: String,
    /// On-disk size of the working mapset after the step, in bytes
    pub mapset_size: u64,
}

/// Error classification attached to `error`/`terminated` records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub kind: String,
    pub message: String,
}

/// A resource written outside the workspace by an export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportedResource {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ResourceKind,
    pub format: String,
    /// Storage path, `None` for database targets
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

/// Persisted status of one job iteration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobStatus {
    pub schema_version: u32,
    pub status: JobState,
    pub resource_id: ResourceId,
    pub user_id: String,
    pub iteration: u32,
    #[serde(default)]
    pub process_log: Vec<ProcessLogEntry>,
    pub progress: Progress,
    pub message: String,
    /// Epoch milliseconds when the job was accepted
    pub accept_timestamp: u64,
    /// Epoch milliseconds of the last update
    pub timestamp: u64,
    /// Seconds between acceptance and the last update
    pub time_delta: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exception: Option<ErrorInfo>,
    #[serde(default)]
    pub exports: Vec<ExportedResource>,
}

impl JobStatus {
    /// Fresh record written synchronously at submission time.
    pub fn accepted(
        resource_id: ResourceId,
        user_id: impl Into<String>,
        iteration: u32,
        num_of_steps: usize,
        epoch_ms: u64,
    ) -> Self {
        Self {
            schema_version: STATUS_SCHEMA_VERSION,
            status: JobState::Accepted,
            resource_id,
            user_id: user_id.into(),
            iteration,
            process_log: Vec::new(),
            progress: Progress { step: 0, num_of_steps },
            message: "Resource accepted".to_string(),
            accept_timestamp: epoch_ms,
            timestamp: epoch_ms,
            time_delta: 0.0,
            exception: None,
            exports: Vec::new(),
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Move to `next`, rejecting transitions out of terminal states.
    pub fn transition(
        &mut self,
        next: JobState,
        message: impl Into<String>,
        epoch_ms: u64,
    ) -> Result<(), TransitionError> {
        if !self.status.can_transition_to(next) {
            return Err(TransitionError { from: self.status, to: next });
        }
        self.status = next;
        self.message = message.into();
        self.touch(epoch_ms);
        Ok(())
    }

    /// Append a finished step and advance the progress counter.
    pub fn record_step(&mut self, entry: ProcessLogEntry, epoch_ms: u64) {
        self.process_log.push(entry);
        self.progress.step = self.process_log.len();
        self.touch(epoch_ms);
    }

    pub fn fail(&mut self, state: JobState, error: ErrorInfo, epoch_ms: u64) -> Result<(), TransitionError> {
        self.transition(state, error.message.clone(), epoch_ms)?;
        self.exception = Some(error);
        Ok(())
    }

    fn touch(&mut self, epoch_ms: u64) {
        self.timestamp = epoch_ms;
        self.time_delta = epoch_ms.saturating_sub(self.accept_timestamp) as f64 / 1000.0;
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Decode a record, rejecting layouts newer than this build understands.
    pub fn from_json(raw: &str) -> Result<Self, StatusDecodeError> {
        let status: JobStatus = serde_json::from_str(raw)?;
        if status.schema_version > STATUS_SCHEMA_VERSION {
            return Err(StatusDecodeError::UnsupportedVersion(status.schema_version));
        }
        Ok(status)
    }
}

#[derive(Debug, Error)]
pub enum StatusDecodeError {
    #[error("malformed status record: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unsupported status schema version {0}")]
    UnsupportedVersion(u32),
}

#[cfg(test)]
#[path = "status_tests.rs"]
mod tests;
