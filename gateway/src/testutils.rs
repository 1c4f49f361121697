use crate::cache::{Cache, CacheBackend, CacheError};
use crate::config::Config;
use crate::state::AppState;
use async_trait::async_trait;
use axum::body::to_bytes;
use axum::response::Response;
use serde_json::Value;
use std::time::Duration;
use url::Url;

/// Config whose upstream bases all point at `server_uri`, with a 1s timeout.
pub fn test_config(server_uri: &str) -> Config {
    let mut config = Config::default();
    config.upstream.pncp_api_base = Url::parse(&format!("{server_uri}/api/pncp")).unwrap();
    config.upstream.consulta_api_base = Url::parse(&format!("{server_uri}/api/consulta")).unwrap();
    config.upstream.timeout_secs = 1;
    config
}

pub fn test_state(server_uri: &str) -> AppState {
    test_state_with(server_uri, |_| {})
}

pub fn test_state_with(server_uri: &str, customize: impl FnOnce(&mut Config)) -> AppState {
    let mut config = test_config(server_uri);
    customize(&mut config);
    AppState::new(config, Cache::memory(1_000)).unwrap()
}

pub async fn body_json(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// Backend on which every operation fails.
pub struct FailingBackend;

#[async_trait]
impl CacheBackend for FailingBackend {
    fn name(&self) -> &'static str {
        "failing"
    }

    async fn get(&self, _key: &str) -> Result<Option<String>, CacheError> {
        Err(CacheError::Backend("get refused".into()))
    }

    async fn set(&self, _key: &str, _value: String, _ttl: Duration) -> Result<(), CacheError> {
        Err(CacheError::Timeout("set"))
    }

    async fn delete(&self, _key: &str) -> Result<bool, CacheError> {
        Err(CacheError::Connection("gone".into()))
    }

    async fn exists(&self, _key: &str) -> Result<bool, CacheError> {
        Err(CacheError::Backend("exists refused".into()))
    }

    async fn ping(&self) -> Result<bool, CacheError> {
        Err(CacheError::Connection("gone".into()))
    }
}
