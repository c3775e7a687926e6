//! Response cache over a pluggable key/value store.
//!
//! [`ResponseCache`] memoizes whole [`SearchResponse`] values as JSON under
//! the normalized request key. The backing [`CacheStore`] only needs
//! `get` and `set` with a TTL; [`MokaCacheStore`] provides an in-process
//! implementation on [`moka`] with per-entry expiry.
//!
//! Cache faults are never errors: a missing or undecodable entry is a
//! miss, and a response that fails to serialize is simply not stored.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use moka::future::Cache;
use moka::Expiry;

use crate::types::SearchResponse;

/// Minimal key/value store with per-entry TTL.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> Option<String>;
    async fn set(&self, key: &str, value: String, ttl: Duration);
}

/// Stored value plus the TTL it was written with.
#[derive(Clone)]
struct Entry {
    value: String,
    ttl: Duration,
}

struct EntryExpiry;

impl Expiry<String, Entry> for EntryExpiry {
    fn expire_after_create(
        &self,
        _key: &String,
        entry: &Entry,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(entry.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        entry: &Entry,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(entry.ttl)
    }
}

/// In-process [`CacheStore`] backed by a bounded moka cache.
#[derive(Clone)]
pub struct MokaCacheStore {
    inner: Cache<String, Entry>,
}

impl MokaCacheStore {
    pub fn new(max_entries: u64) -> Self {
        let inner = Cache::builder()
            .max_capacity(max_entries)
            .expire_after(EntryExpiry)
            .build();
        Self { inner }
    }
}

#[async_trait]
impl CacheStore for MokaCacheStore {
    async fn get(&self, key: &str) -> Option<String> {
        self.inner.get(key).await.map(|entry| entry.value)
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) {
        self.inner.insert(key.to_owned(), Entry { value, ttl }).await;
    }
}

/// Cache-or-compute memoization of search responses.
#[derive(Clone)]
pub struct ResponseCache {
    store: Arc<dyn CacheStore>,
    ttl: Duration,
}

impl ResponseCache {
    pub fn new(store: Arc<dyn CacheStore>, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    /// Look up a cached response. Undecodable entries count as a miss.
    pub async fn get(&self, key: &str) -> Option<SearchResponse> {
        let raw = self.store.get(key).await?;
        match serde_json::from_str(&raw) {
            Ok(response) => Some(response),
            Err(err) => {
                tracing::warn!(error = %err, "discarding undecodable cached response");
                None
            }
        }
    }

    /// Store a response under `key` with the configured TTL.
    pub async fn put(&self, key: &str, response: &SearchResponse) {
        match serde_json::to_string(response) {
            Ok(raw) => self.store.set(key, raw, self.ttl).await,
            Err(err) => tracing::warn!(error = %err, "skipping cache write"),
        }
    }
}
