// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! mj-core: shared types for the mapset job engine

pub mod macros;

pub mod clock;
pub mod id;
pub mod mapset;
pub mod quota;
pub mod resource;
pub mod status;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use clock::{Clock, FakeClock, SystemClock};
pub use id::ResourceId;
pub use mapset::{validate_name, DatasetRef, MapsetLockId, NameError, PERMANENT};
pub use quota::{UserQuota, DEFAULT_TIMEOUT_MULTIPLIER};
pub use resource::ResourceKind;
pub use status::{
    ErrorInfo, ExportedResource, JobState, JobStatus, ProcessLogEntry, Progress,
    StatusDecodeError, TransitionError, STATUS_SCHEMA_VERSION,
};
