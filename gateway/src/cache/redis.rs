use super::{CacheBackend, CacheError};
use async_trait::async_trait;
use redis::FromRedisValue;
use redis::aio::ConnectionManager;
use std::time::Duration;
use tokio::time::timeout;
use url::Url;

/// Shared cache for multi-instance deployments.
#[derive(Clone)]
pub struct RedisCache {
    connection_manager: ConnectionManager,
    op_timeout: Duration,
}

impl std::fmt::Debug for RedisCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisCache")
            .field("op_timeout", &self.op_timeout)
            .finish()
    }
}

impl RedisCache {
    pub async fn connect(
        url: &str,
        connect_timeout: Duration,
        op_timeout: Duration,
    ) -> Result<Self, CacheError> {
        let client = redis::Client::open(url)
            .map_err(|e| CacheError::Connection(format!("invalid Redis URL: {e}")))?;

        let connection_manager = timeout(connect_timeout, ConnectionManager::new(client))
            .await
            .map_err(|_| CacheError::Timeout("connect"))?
            .map_err(|e| CacheError::Connection(e.to_string()))?;

        let cache = RedisCache {
            connection_manager,
            op_timeout,
        };
        if !cache.ping().await? {
            return Err(CacheError::Connection("unexpected PING reply".into()));
        }

        tracing::debug!(url = %redact_url(url), "Redis cache connected");
        Ok(cache)
    }

    async fn run<T: FromRedisValue>(&self, op: &'static str, cmd: &redis::Cmd) -> Result<T, CacheError> {
        let mut conn = self.connection_manager.clone();
        timeout(self.op_timeout, cmd.query_async(&mut conn))
            .await
            .map_err(|_| CacheError::Timeout(op))?
            .map_err(|e| CacheError::Backend(format!("Redis {op} failed: {e}")))
    }
}

#[async_trait]
impl CacheBackend for RedisCache {
    fn name(&self) -> &'static str {
        "redis"
    }

    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        self.run("GET", redis::cmd("GET").arg(key)).await
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError> {
        let ttl_seconds = ttl.as_secs().max(1);
        self.run("SETEX", redis::cmd("SETEX").arg(key).arg(ttl_seconds).arg(value))
            .await
    }

    async fn delete(&self, key: &str) -> Result<bool, CacheError> {
        let removed: i64 = self.run("DEL", redis::cmd("DEL").arg(key)).await?;
        Ok(removed > 0)
    }

    async fn exists(&self, key: &str) -> Result<bool, CacheError> {
        let count: i64 = self.run("EXISTS", redis::cmd("EXISTS").arg(key)).await?;
        Ok(count > 0)
    }

    async fn ping(&self) -> Result<bool, CacheError> {
        let reply: String = self.run("PING", &redis::cmd("PING")).await?;
        Ok(reply == "PONG")
    }
}

/// Hides the password when logging a Redis URL.
fn redact_url(url: &str) -> String {
    match Url::parse(url) {
        Ok(mut parsed) => {
            if parsed.password().is_some() {
                let _ = parsed.set_password(Some("***"));
            }
            parsed.to_string()
        }
        Err(_) => "<unparseable>".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redact_url() {
        assert_eq!(
            redact_url("redis://:secret@localhost:6379/0"),
            "redis://:***@localhost:6379/0"
        );
        assert_eq!(
            redact_url("redis://localhost:6379/0"),
            "redis://localhost:6379/0"
        );
        assert_eq!(redact_url("::"), "<unparseable>");
    }

    #[tokio::test]
    async fn test_connect_refused() {
        let result = RedisCache::connect(
            "redis://127.0.0.1:1/0",
            Duration::from_secs(1),
            Duration::from_secs(1),
        )
        .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_invalid_url() {
        let result =
            RedisCache::connect("not a url", Duration::from_secs(1), Duration::from_secs(1)).await;
        assert!(matches!(result, Err(CacheError::Connection(_))));
    }
}
