// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The unit of work handed from submission to a worker.

use mj_core::{ResourceId, UserQuota};
use mj_store::StatusKey;
use serde::{Deserialize, Serialize};

/// Whether results are merged into a shared mapset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobKind {
    /// Runs in a temporary mapset; only exports survive
    Ephemeral,
    /// Merges the temporary mapset into the target on success
    Persistent,
}

mj_core::simple_display! {
    JobKind {
        Ephemeral => "ephemeral",
        Persistent => "persistent",
    }
}

/// A submitted job, serialized onto the worker queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobTicket {
    pub resource_id: ResourceId,
    pub iteration: u32,
    pub user_id: String,
    pub user_group: String,
    pub project: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_mapset: Option<String>,
    /// Raw process chain as submitted
    pub process_chain: serde_json::Value,
    pub quota: UserQuota,
}

impl JobTicket {
    pub fn new(
        user_id: impl Into<String>,
        user_group: impl Into<String>,
        project: impl Into<String>,
        process_chain: serde_json::Value,
    ) -> Self {
        Self {
            resource_id: ResourceId::new(),
            iteration: 1,
            user_id: user_id.into(),
            user_group: user_group.into(),
            project: project.into(),
            target_mapset: None,
            process_chain,
            quota: UserQuota::default(),
        }
    }

    mj_core::setters! {
        set {
            resource_id: ResourceId,
            iteration: u32,
            quota: UserQuota,
        }
        option {
            target_mapset: String,
        }
    }

    pub fn kind(&self) -> JobKind {
        match self.target_mapset {
            Some(_) => JobKind::Persistent,
            None => JobKind::Ephemeral,
        }
    }

    pub fn status_key(&self) -> StatusKey {
        StatusKey::new(&self.user_id, self.resource_id.clone(), self.iteration)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }
}
