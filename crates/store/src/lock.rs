// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Named-resource mutual exclusion with expiry.
//!
//! A lock attempt on a held resource fails immediately. There is no waiting
//! or retrying here; callers report the conflict.

use crate::error::StoreError;
use crate::kv::CoordinationStore;
use std::time::Duration;

/// Prefix separating lock keys from everything else in the store.
pub const LOCK_PREFIX: &str = "RESOURCE-LOCK::";

const LOCK_VALUE: &str = "1";

#[derive(Clone)]
pub struct ResourceLocker<S> {
    store: S,
}

impl<S: CoordinationStore> ResourceLocker<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    fn key(resource_id: &str) -> String {
        format!("{}{}", LOCK_PREFIX, resource_id)
    }

    /// Returns whether the lock was acquired.
    pub async fn lock(&self, resource_id: &str, ttl: Duration) -> Result<bool, StoreError> {
        let acquired = self.store.lock(&Self::key(resource_id), LOCK_VALUE, ttl).await?;
        tracing::debug!(resource = resource_id, acquired, ttl_secs = ttl.as_secs(), "lock");
        Ok(acquired)
    }

    /// Refresh the expiry of a held lock. Returns whether it existed.
    pub async fn extend(&self, resource_id: &str, ttl: Duration) -> Result<bool, StoreError> {
        self.store.extend(&Self::key(resource_id), ttl).await
    }

    /// Returns whether the lock existed.
    pub async fn unlock(&self, resource_id: &str) -> Result<bool, StoreError> {
        let existed = self.store.unlock(&Self::key(resource_id)).await?;
        tracing::debug!(resource = resource_id, existed, "unlock");
        Ok(existed)
    }

    /// Whether the resource is currently locked.
    pub async fn get(&self, resource_id: &str) -> Result<bool, StoreError> {
        Ok(self.store.get(&Self::key(resource_id)).await?.is_some())
    }
}

#[cfg(test)]
#[path = "lock_tests.rs"]
mod tests;
