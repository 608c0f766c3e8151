// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-process coordination store.
//!
//! Used by the `local` queue policy and by tests. Every operation runs under
//! one mutex, which gives the same atomicity as the server-side scripts.

use crate::error::StoreError;
use crate::kv::{ttl_secs, CoordinationStore};
use async_trait::async_trait;
use mj_core::{Clock, SystemClock};
use parking_lot::Mutex;
use std::collections::{BTreeSet, HashMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};

struct Entry {
    value: String,
    expires_at: Option<Instant>,
}

#[derive(Default)]
struct MemoryState {
    values: HashMap<String, Entry>,
    lists: HashMap<String, VecDeque<String>>,
    sets: HashMap<String, BTreeSet<String>>,
}

impl MemoryState {
    fn live(&mut self, key: &str, now: Instant) -> Option<&mut Entry> {
        let expired = self
            .values
            .get(key)
            .is_some_and(|e| e.expires_at.is_some_and(|at| at <= now));
        if expired {
            self.values.remove(key);
        }
        self.values.get_mut(key)
    }
}

/// Coordination store held in memory, with expiry driven by a [`Clock`].
#[derive(Clone)]
pub struct MemoryStore<C: Clock = SystemClock> {
    inner: Arc<Mutex<MemoryState>>,
    clock: C,
}

impl MemoryStore<SystemClock> {
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }
}

impl Default for MemoryStore<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> MemoryStore<C> {
    pub fn with_clock(clock: C) -> Self {
        Self { inner: Arc::new(Mutex::new(MemoryState::default())), clock }
    }

    fn expiry(&self, ttl: Duration) -> Instant {
        self.clock.now() + Duration::from_secs(ttl_secs(ttl))
    }
}

#[async_trait]
impl<C: Clock> CoordinationStore for MemoryStore<C> {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let now = self.clock.now();
        Ok(self.inner.lock().live(key, now).map(|e| e.value.clone()))
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), StoreError> {
        let expires_at = ttl.map(|ttl| self.expiry(ttl));
        self.inner
            .lock()
            .values
            .insert(key.to_string(), Entry { value: value.to_string(), expires_at });
        Ok(())
    }

    async fn del(&self, key: &str) -> Result<bool, StoreError> {
        let now = self.clock.now();
        let mut state = self.inner.lock();
        let existed = state.live(key, now).is_some();
        state.values.remove(key);
        Ok(existed)
    }

    async fn set_unless_sealed(
        &self,
        key: &str,
        value: &str,
        ttl: Option<Duration>,
        field: &str,
        sealed: &[&str],
    ) -> Result<Option<String>, StoreError> {
        let now = self.clock.now();
        let expires_at = ttl.map(|ttl| self.expiry(ttl));
        let mut state = self.inner.lock();
        if let Some(entry) = state.live(key, now) {
            let current = serde_json::from_str::<serde_json::Value>(&entry.value).ok();
            let held = current.as_ref().and_then(|v| v.get(field)).and_then(|v| v.as_str());
            if held.is_some_and(|held| sealed.contains(&held)) {
                return Ok(Some(entry.value.clone()));
            }
        }
        state.values.insert(key.to_string(), Entry { value: value.to_string(), expires_at });
        Ok(None)
    }

    async fn lock(&self, key: &str, value: &str, ttl: Duration) -> Result<bool, StoreError> {
        let now = self.clock.now();
        let expires_at = Some(self.expiry(ttl));
        let mut state = self.inner.lock();
        if state.live(key, now).is_some() {
            return Ok(false);
        }
        state.values.insert(key.to_string(), Entry { value: value.to_string(), expires_at });
        Ok(true)
    }

    async fn extend(&self, key: &str, ttl: Duration) -> Result<bool, StoreError> {
        let now = self.clock.now();
        let expires_at = Some(self.expiry(ttl));
        let mut state = self.inner.lock();
        match state.live(key, now) {
            Some(entry) => {
                entry.expires_at = expires_at;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn unlock(&self, key: &str) -> Result<bool, StoreError> {
        self.del(key).await
    }

    async fn incr(&self, key: &str) -> Result<u64, StoreError> {
        let now = self.clock.now();
        let mut state = self.inner.lock();
        let next = match state.live(key, now) {
            Some(entry) => {
                entry.value.parse::<u64>().map_err(|_| StoreError::NotAnInteger(key.to_string()))? + 1
            }
            None => 1,
        };
        let expires_at = state.values.get(key).and_then(|e| e.expires_at);
        state.values.insert(key.to_string(), Entry { value: next.to_string(), expires_at });
        Ok(next)
    }

    async fn push(&self, list: &str, value: &str) -> Result<(), StoreError> {
        self.inner.lock().lists.entry(list.to_string()).or_default().push_back(value.to_string());
        Ok(())
    }

    async fn pop(&self, list: &str) -> Result<Option<String>, StoreError> {
        Ok(self.inner.lock().lists.get_mut(list).and_then(|l| l.pop_front()))
    }

    async fn list_len(&self, list: &str) -> Result<usize, StoreError> {
        Ok(self.inner.lock().lists.get(list).map_or(0, |l| l.len()))
    }

    async fn add_member(&self, set: &str, member: &str) -> Result<(), StoreError> {
        self.inner.lock().sets.entry(set.to_string()).or_default().insert(member.to_string());
        Ok(())
    }

    async fn members(&self, set: &str) -> Result<Vec<String>, StoreError> {
        Ok(self
            .inner
            .lock()
            .sets
            .get(set)
            .map(|s| s.iter().cloned().collect())
            .unwrap_or_default())
    }

    async fn remove_member_if_empty(&self, set: &str, list: &str) -> Result<bool, StoreError> {
        let mut inner = self.inner.lock();
        if inner.lists.get(list).is_some_and(|l| !l.is_empty()) {
            return Ok(false);
        }
        inner.lists.remove(list);
        Ok(inner.sets.get_mut(set).is_some_and(|s| s.remove(list)))
    }
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;
