use super::{CacheBackend, CacheError};
use async_trait::async_trait;
use moka::Expiry;
use moka::sync::Cache as MokaCache;
use std::time::{Duration, Instant};

#[derive(Clone)]
struct Entry {
    value: String,
    ttl: Duration,
}

/// Expires each entry after the TTL it was written with.
struct PerEntryTtl;

impl Expiry<String, Entry> for PerEntryTtl {
    fn expire_after_create(&self, _key: &String, entry: &Entry, _created_at: Instant) -> Option<Duration> {
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

/// Process-local cache for single-instance deployments.
pub struct MemoryCache {
    cache: MokaCache<String, Entry>,
}

impl MemoryCache {
    pub fn new(max_capacity: u64) -> Self {
        let cache = MokaCache::builder()
            .max_capacity(max_capacity)
            .expire_after(PerEntryTtl)
            .build();
        MemoryCache { cache }
    }
}

#[async_trait]
impl CacheBackend for MemoryCache {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        Ok(self.cache.get(key).map(|entry| entry.value))
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError> {
        self.cache.insert(key.to_string(), Entry { value, ttl });
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, CacheError> {
        Ok(self.cache.remove(key).is_some())
    }

    async fn exists(&self, key: &str) -> Result<bool, CacheError> {
        Ok(self.cache.contains_key(key))
    }

    async fn ping(&self) -> Result<bool, CacheError> {
        Ok(true)
    }
}
