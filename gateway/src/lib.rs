use crate::cache::Cache;
use crate::config::Config;
use crate::errors::GatewayError;
use crate::state::AppState;
use shared::admin::admin_router;
use shared::http::run_http_service;

pub mod api;
pub mod cache;
pub mod config;
pub mod errors;
mod fallback;
pub mod identifier;
pub mod metrics_defs;
pub mod params;
pub mod proxy;
pub mod state;
pub mod stats;
pub mod tenders;
#[cfg(test)]
mod testutils;
pub mod upstream;

/// Serves the public API and the admin probes until either listener fails.
pub async fn run(config: Config) -> Result<(), GatewayError> {
    config.validate()?;

    let cache = Cache::from_config(&config.cache).await;
    let healthy = cache.health_check().await;
    tracing::info!(backend = cache.provider_name(), healthy, "Response cache ready");

    let listener = config.listener.clone();
    let admin_listener = config.admin_listener.clone();
    let state = AppState::new(config, cache)?;

    let api_task = run_http_service(&listener.host, listener.port, api::router(state));
    let admin_task = run_http_service(&admin_listener.host, admin_listener.port, admin_router());

    tokio::try_join!(api_task, admin_task)?;
    Ok(())
}
