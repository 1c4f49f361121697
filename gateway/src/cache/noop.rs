use super::{CacheBackend, CacheError};
use async_trait::async_trait;
use std::time::Duration;

/// Always misses, accepts every write.
#[derive(Debug, Clone, Copy)]
pub struct NoOpCache;

#[async_trait]
impl CacheBackend for NoOpCache {
    fn name(&self) -> &'static str {
        "noop"
    }

    fn is_enabled(&self) -> bool {
        false
    }

    async fn get(&self, _key: &str) -> Result<Option<String>, CacheError> {
        Ok(None)
    }

    async fn set(&self, _key: &str, _value: String, _ttl: Duration) -> Result<(), CacheError> {
        Ok(())
    }

    async fn delete(&self, _key: &str) -> Result<bool, CacheError> {
        Ok(false)
    }

    async fn exists(&self, _key: &str) -> Result<bool, CacheError> {
        Ok(false)
    }

    async fn ping(&self) -> Result<bool, CacheError> {
        Ok(true)
    }
}
