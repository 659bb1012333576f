// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

use std::collections::VecDeque;
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Mutex;

use crate::error::GatewayError;

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// Pluggable async cache store contract. Implementations may be
/// network-backed; callers always await these operations.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Value>, GatewayError>;
    async fn set(&self, key: &str, value: Value, ttl_seconds: u64) -> Result<(), GatewayError>;
    async fn delete(&self, key: &str) -> Result<(), GatewayError>;
}

struct Entry {
    value: Value,
    expires_at_ms: u64,
}

struct Inner {
    order: VecDeque<String>,
    entries: std::collections::HashMap<String, Entry>,
}

/// Default in-memory cache store: insertion-ordered (FIFO) eviction and
/// lazy expiry on read. This is deliberately not LRU: reading an entry
/// never refreshes its position in the eviction order.
pub struct InMemoryCacheStore {
    max_size: usize,
    inner: Mutex<Inner>,
}

impl InMemoryCacheStore {
    pub fn new(max_size: usize) -> Self {
        Self {
            max_size: max_size.max(1),
            inner: Mutex::new(Inner {
                order: VecDeque::new(),
                entries: std::collections::HashMap::new(),
            }),
        }
    }
}

impl Default for InMemoryCacheStore {
    fn default() -> Self {
        Self::new(1000)
    }
}

#[async_trait]
impl CacheStore for InMemoryCacheStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, GatewayError> {
        let mut inner = self.inner.lock().await;
        let expired = match inner.entries.get(key) {
            Some(entry) => entry.expires_at_ms <= now_ms(),
            None => return Ok(None),
        };
        if expired {
            inner.entries.remove(key);
            inner.order.retain(|k| k != key);
            return Ok(None);
        }
        Ok(inner.entries.get(key).map(|e| e.value.clone()))
    }

    async fn set(&self, key: &str, value: Value, ttl_seconds: u64) -> Result<(), GatewayError> {
        let mut inner = self.inner.lock().await;
        let expires_at_ms = now_ms() + ttl_seconds.saturating_mul(1000);
        let is_new = !inner.entries.contains_key(key);
        if is_new && inner.order.len() >= self.max_size {
            if let Some(oldest) = inner.order.pop_front() {
                inner.entries.remove(&oldest);
            }
        }
        if is_new {
            inner.order.push_back(key.to_string());
        }
        inner.entries.insert(
            key.to_string(),
            Entry {
                value,
                expires_at_ms,
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), GatewayError> {
        let mut inner = self.inner.lock().await;
        inner.entries.remove(key);
        inner.order.retain(|k| k != key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn ttl_zero_expires_immediately() {
        let store = InMemoryCacheStore::default();
        store.set("k", json!(1), 0).await.unwrap();
        // ttl=0 means expires_at == now, so it is already expired on any
        // subsequent read since `now_ms()` only advances.
        tokio::time::sleep(std::time::Duration::from_millis(2)).await;
        assert_eq!(store.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn fifo_eviction_drops_oldest() {
        let store = InMemoryCacheStore::new(2);
        store.set("a", json!(1), 60).await.unwrap();
        store.set("b", json!(2), 60).await.unwrap();
        store.set("c", json!(3), 60).await.unwrap();
        assert_eq!(store.get("a").await.unwrap(), None);
        assert_eq!(store.get("b").await.unwrap(), Some(json!(2)));
        assert_eq!(store.get("c").await.unwrap(), Some(json!(3)));
    }

    #[tokio::test]
    async fn updating_existing_key_does_not_evict() {
        let store = InMemoryCacheStore::new(2);
        store.set("a", json!(1), 60).await.unwrap();
        store.set("b", json!(2), 60).await.unwrap();
        store.set("a", json!(10), 60).await.unwrap();
        assert_eq!(store.get("a").await.unwrap(), Some(json!(10)));
        assert_eq!(store.get("b").await.unwrap(), Some(json!(2)));
    }

    #[tokio::test]
    async fn delete_removes_entry() {
        let store = InMemoryCacheStore::default();
        store.set("k", json!(1), 60).await.unwrap();
        store.delete("k").await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), None);
    }
}
