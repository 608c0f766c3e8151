// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Validation errors.
//!
//! The first violation aborts validation; a chain that produced any of these
//! is never executed.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("process chain is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("malformed process chain: {0}")]
    Malformed(String),

    #[error("step {step}: {reason}")]
    MalformedStep { step: String, reason: String },

    #[error("step {step}: missing required key '{key}'")]
    MissingKey { step: String, key: &'static str },

    #[error("duplicate step id '{0}'")]
    DuplicateId(String),

    #[error("process chain is empty")]
    EmptyChain,

    #[error("process chain has {count} steps, the limit is {limit}")]
    TooManySteps { count: usize, limit: u64 },

    #[error("step {step}: module '{module}' is not in the list of accessible modules")]
    ModuleNotAllowed { step: String, module: String },

    #[error("step {step}: mapset '{mapset}' of project '{project}' is not accessible")]
    DatasetNotAllowed { step: String, project: String, mapset: String },

    #[error("step {step}: invalid import descriptor: {reason}")]
    InvalidImport { step: String, reason: String },

    #[error("step {step}: invalid export descriptor: {reason}")]
    InvalidExport { step: String, reason: String },
}

impl ValidationError {
    pub(crate) fn step(step: &str, reason: impl Into<String>) -> Self {
        ValidationError::MalformedStep { step: step.to_string(), reason: reason.into() }
    }
}
