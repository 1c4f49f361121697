use crate::cache::Cache;
use crate::config::Config;
use crate::errors::Result;
use crate::upstream::UpstreamClient;
use std::sync::Arc;

/// Shared by every request handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub upstream: UpstreamClient,
    pub cache: Cache,
}

impl AppState {
    pub fn new(config: Config, cache: Cache) -> Result<Self> {
        let upstream = UpstreamClient::new(config.upstream.timeout())?;
        Ok(AppState {
            config: Arc::new(config),
            upstream,
            cache,
        })
    }
}
