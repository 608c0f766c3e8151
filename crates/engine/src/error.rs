// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use mj_adapters::RunnerError;
use mj_chain::ValidationError;
use mj_core::{ErrorInfo, JobState};
use mj_store::StoreError;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Errors creating or tearing down a workspace
#[derive(Debug, Error)]
pub enum WorkspaceError {
    #[error("mapset '{mapset}' of project '{project}' does not exist")]
    MissingMapset { project: String, mapset: String },
    #[error("project '{0}' has no default region")]
    MissingRegion(String),
    #[error("{action} {}: {source}", .path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl WorkspaceError {
    pub(crate) fn io(action: &'static str, path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.into();
        move |source| WorkspaceError::Io { action, path, source }
    }
}

/// Errors merging a workspace mapset into its target
#[derive(Debug, Error)]
pub enum MergeError {
    #[error("group '{0}' has no REF file")]
    MissingGroupRef(String),
    #[error("catalog {}: {source}", .path.display())]
    Catalog {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },
    #[error("{action} {}: {source}", .path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl MergeError {
    pub(crate) fn io(action: &'static str, path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.into();
        move |source| MergeError::Io { action, path, source }
    }

    pub(crate) fn catalog(path: impl Into<PathBuf>) -> impl FnOnce(rusqlite::Error) -> Self {
        let path = path.into();
        move |source| MergeError::Catalog { path, source }
    }
}

/// Why a job did not finish.
#[derive(Debug, Error)]
pub enum JobError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("mapset {0} is locked by another job")]
    LockConflict(String),
    #[error("lock on {0} was lost while the job was running")]
    LockLost(String),
    #[error("step '{step}' ({executable}) failed with exit code {return_code}: {stderr}")]
    ToolExecution { step: String, executable: String, return_code: i32, stderr: String },
    #[error("step '{step}' ({executable}) could not run: {source}")]
    ToolRunner {
        step: String,
        executable: String,
        #[source]
        source: RunnerError,
    },
    #[error("termination requested")]
    Terminated,
    #[error(transparent)]
    MergeIntegrity(#[from] MergeError),
    #[error("job exceeded its time limit of {}s", .0.as_secs())]
    Timeout(Duration),
    #[error(transparent)]
    Workspace(#[from] WorkspaceError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("export of '{name}' failed: {message}")]
    Export { name: String, message: String },
    #[error("background task failed: {0}")]
    Task(String),
}

impl JobError {
    /// Terminal state this error leaves the job in.
    pub fn state(&self) -> JobState {
        match self {
            JobError::Terminated => JobState::Terminated,
            _ => JobState::Error,
        }
    }

    /// Stable classification recorded in the status `exception`.
    pub fn kind(&self) -> &'static str {
        match self {
            JobError::Validation(_) => "ValidationError",
            JobError::LockConflict(_) | JobError::LockLost(_) => "LockConflictError",
            JobError::ToolExecution { .. } | JobError::ToolRunner { .. } => "ToolExecutionError",
            JobError::Terminated => "TerminationRequested",
            JobError::MergeIntegrity(_) => "MergeIntegrityError",
            JobError::Timeout(_) => "TimeoutError",
            JobError::Workspace(_) => "WorkspaceError",
            JobError::Store(_) => "StoreError",
            JobError::Export { .. } => "ExportError",
            JobError::Task(_) => "InternalError",
        }
    }

    pub fn info(&self) -> ErrorInfo {
        ErrorInfo { kind: self.kind().to_string(), message: self.to_string() }
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
