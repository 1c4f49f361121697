//! Optional response cache.
//!
//! Every operation is best effort: a backend failure is logged, counted and
//! then treated as a miss (reads) or a no-op (writes). Callers never see a
//! cache error.

mod keys;
mod memory;
mod noop;
mod redis;

pub use keys::build_key;
pub use memory::MemoryCache;
pub use noop::NoOpCache;
pub use self::redis::RedisCache;

use crate::config::CacheConfig;
use crate::metrics_defs::{CACHE_ERROR, CACHE_HIT, CACHE_MISS};
use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use shared::counter;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("cache connection failed: {0}")]
    Connection(String),

    #[error("cache backend error: {0}")]
    Backend(String),

    #[error("cache {0} timed out")]
    Timeout(&'static str),

    #[error("cache serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// A key/value store holding JSON text with a per-entry lifetime.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    fn name(&self) -> &'static str;

    fn is_enabled(&self) -> bool {
        true
    }

    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError>;

    /// Returns whether a key was removed.
    async fn delete(&self, key: &str) -> Result<bool, CacheError>;

    async fn exists(&self, key: &str) -> Result<bool, CacheError>;

    async fn ping(&self) -> Result<bool, CacheError>;
}

#[derive(Clone)]
pub struct Cache {
    backend: Arc<dyn CacheBackend>,
}

impl Cache {
    /// Builds the configured backend.
    ///
    /// An unreachable Redis does not fail startup; the gateway runs uncached.
    pub async fn from_config(config: &CacheConfig) -> Self {
        match config {
            CacheConfig::Disabled => {
                tracing::info!("Response cache disabled by configuration");
                Self::disabled()
            }
            CacheConfig::Memory { max_capacity } => {
                tracing::info!(max_capacity, "In-memory response cache initialized");
                Self::memory(*max_capacity)
            }
            CacheConfig::Redis {
                url,
                connect_timeout_secs,
                op_timeout_secs,
            } => {
                let connected = RedisCache::connect(
                    url,
                    Duration::from_secs(*connect_timeout_secs),
                    Duration::from_secs(*op_timeout_secs),
                )
                .await;
                match connected {
                    Ok(backend) => {
                        tracing::info!("Redis response cache initialized");
                        Self::with_backend(Arc::new(backend))
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "Redis unavailable, response cache disabled");
                        Self::disabled()
                    }
                }
            }
        }
    }

    pub fn memory(max_capacity: u64) -> Self {
        Self::with_backend(Arc::new(MemoryCache::new(max_capacity)))
    }

    pub fn disabled() -> Self {
        Self::with_backend(Arc::new(NoOpCache))
    }

    pub fn with_backend(backend: Arc<dyn CacheBackend>) -> Self {
        Cache { backend }
    }

    pub fn provider_name(&self) -> &'static str {
        self.backend.name()
    }

    pub fn is_enabled(&self) -> bool {
        self.backend.is_enabled()
    }

    /// Reads and decodes a cached value. Undecodable entries count as misses.
    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let backend = self.backend.name();
        match self.backend.get(key).await {
            Ok(Some(text)) => match serde_json::from_str(&text) {
                Ok(value) => {
                    counter!(CACHE_HIT, "backend" => backend).increment(1);
                    tracing::debug!(key, "Cache hit");
                    Some(value)
                }
                Err(e) => {
                    self.record_error("decode", key, &CacheError::Serialization(e));
                    None
                }
            },
            Ok(None) => {
                counter!(CACHE_MISS, "backend" => backend).increment(1);
                None
            }
            Err(e) => {
                self.record_error("get", key, &e);
                None
            }
        }
    }

    /// Stores a value; returns whether the write succeeded.
    pub async fn set_json<T: Serialize + ?Sized>(&self, key: &str, value: &T, ttl: Duration) -> bool {
        let text = match serde_json::to_string(value) {
            Ok(text) => text,
            Err(e) => {
                self.record_error("encode", key, &CacheError::Serialization(e));
                return false;
            }
        };
        match self.backend.set(key, text, ttl).await {
            Ok(()) => true,
            Err(e) => {
                self.record_error("set", key, &e);
                false
            }
        }
    }

    pub async fn delete(&self, key: &str) -> bool {
        self.backend.delete(key).await.unwrap_or_else(|e| {
            self.record_error("delete", key, &e);
            false
        })
    }

    pub async fn exists(&self, key: &str) -> bool {
        self.backend.exists(key).await.unwrap_or_else(|e| {
            self.record_error("exists", key, &e);
            false
        })
    }

    pub async fn health_check(&self) -> bool {
        self.backend.ping().await.unwrap_or_else(|e| {
            tracing::warn!(backend = self.backend.name(), error = %e, "Cache health check failed");
            false
        })
    }

    fn record_error(&self, operation: &'static str, key: &str, error: &CacheError) {
        let backend = self.backend.name();
        counter!(CACHE_ERROR, "backend" => backend, "operation" => operation).increment(1);
        tracing::warn!(backend, operation, key, error = %error, "Cache operation failed");
    }
}
