// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test helpers for use across crates.
//!
//! Gated behind `#[cfg(any(test, feature = "test-support"))]`.

use crate::{JobStatus, ResourceId, UserQuota};

/// Proptest strategies for core state machine types.
pub mod strategies {
    use crate::status::JobState;
    use proptest::prelude::*;

    pub fn arb_job_state() -> impl Strategy<Value = JobState> {
        prop_oneof![
            Just(JobState::Accepted),
            Just(JobState::Running),
            Just(JobState::Finished),
            Just(JobState::Error),
            Just(JobState::Terminated),
        ]
    }
}

/// Quota permitting the given modules with generous limits.
pub fn quota_allowing(modules: &[&str]) -> UserQuota {
    UserQuota {
        accessible_modules: modules.iter().map(|m| m.to_string()).collect(),
        ..UserQuota::default()
    }
}

/// An `accepted` record for `user`/`resource`, iteration 1.
pub fn accepted_status(user: &str, resource: &str, steps: usize) -> JobStatus {
    JobStatus::accepted(ResourceId::from(resource), user, 1, steps, 1_700_000_000_000)
}
