// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::error::StoreError;
use async_trait::async_trait;
use std::time::Duration;

/// Key-value coordination store shared by all workers.
///
/// `set_unless_sealed`, `lock`, `extend`, `unlock` and
/// `remove_member_if_empty` must each be a single atomic operation on the
/// server. Every other method is a plain command.
#[async_trait]
pub trait CoordinationStore: Clone + Send + Sync + 'static {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Set `key`, with an expiry when `ttl` is given.
    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), StoreError>;

    /// Delete `key`, returning whether it existed
    async fn del(&self, key: &str) -> Result<bool, StoreError>;

    /// Set `key` unless its current value is a JSON object whose `field`
    /// holds one of `sealed`, as one atomic step. Returns the current value
    /// when the write was refused.
    async fn set_unless_sealed(
        &self,
        key: &str,
        value: &str,
        ttl: Option<Duration>,
        field: &str,
        sealed: &[&str],
    ) -> Result<Option<String>, StoreError>;

    /// Set `key` with expiry only if it is absent. Returns whether it took effect.
    async fn lock(&self, key: &str, value: &str, ttl: Duration) -> Result<bool, StoreError>;

    /// Refresh the expiry of `key` only if it exists.
    async fn extend(&self, key: &str, ttl: Duration) -> Result<bool, StoreError>;

    /// Delete `key` only if it exists.
    async fn unlock(&self, key: &str) -> Result<bool, StoreError>;

    async fn incr(&self, key: &str) -> Result<u64, StoreError>;

    /// Append to the tail of a list
    async fn push(&self, list: &str, value: &str) -> Result<(), StoreError>;

    /// Pop from the head of a list
    async fn pop(&self, list: &str) -> Result<Option<String>, StoreError>;

    async fn list_len(&self, list: &str) -> Result<usize, StoreError>;

    async fn add_member(&self, set: &str, member: &str) -> Result<(), StoreError>;

    /// Set members in sorted order
    async fn members(&self, set: &str) -> Result<Vec<String>, StoreError>;

    /// Remove `list` from `set` if the list is empty, as one atomic step.
    /// Returns whether it was removed.
    async fn remove_member_if_empty(&self, set: &str, list: &str) -> Result<bool, StoreError>;
}

/// Expiry in whole seconds. Sub-second TTLs round up so a key never expires
/// immediately.
pub(crate) fn ttl_secs(ttl: Duration) -> u64 {
    let secs = ttl.as_secs() + u64::from(ttl.subsec_nanos() > 0);
    secs.max(1)
}
