use crate::config::{LogFormat, LoggingConfig, MetricsConfig};
use metrics_exporter_statsd::StatsdBuilder;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

const DEFAULT_LOG_LEVEL: &str = "info";

#[derive(thiserror::Error, Debug)]
pub enum TelemetryError {
    #[error("could not build statsd recorder: {0}")]
    Statsd(#[from] metrics_exporter_statsd::StatsdError),
    #[error("could not install metrics recorder: {0}")]
    Recorder(String),
}

/// Installs the global tracing subscriber and, when a DSN is configured, the
/// Sentry client. The returned guard must live as long as the process.
pub fn init_logging(config: Option<&LoggingConfig>) -> Option<sentry::ClientInitGuard> {
    let level = config
        .and_then(|c| c.level.as_deref())
        .unwrap_or(DEFAULT_LOG_LEVEL);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let json = config.map(|c| c.format) == Some(LogFormat::Json);

    let mut dsn_error = None;
    let sentry_guard = config
        .and_then(|c| c.sentry_dsn.as_deref())
        .and_then(|dsn| match dsn.parse::<sentry::types::Dsn>() {
            Ok(dsn) => Some(sentry::init(sentry::ClientOptions {
                dsn: Some(dsn),
                release: sentry::release_name!(),
                ..Default::default()
            })),
            Err(e) => {
                dsn_error = Some(e.to_string());
                None
            }
        });

    tracing_subscriber::registry()
        .with(filter)
        .with(json.then(|| fmt::layer().json()))
        .with((!json).then(fmt::layer))
        .with(sentry_guard.as_ref().map(|_| sentry::integrations::tracing::layer()))
        .init();

    if let Some(error) = dsn_error {
        tracing::warn!(error, "Invalid Sentry DSN, error reporting disabled");
    }
    sentry_guard
}

/// Sends metrics to statsd when configured; otherwise every metric is a no-op.
pub fn init_metrics(config: Option<&MetricsConfig>) -> Result<(), TelemetryError> {
    let Some(config) = config else {
        tracing::debug!("No metrics configured");
        return Ok(());
    };

    let recorder = StatsdBuilder::from(config.statsd_host.clone(), config.statsd_port)
        .build(Some(&config.prefix))?;
    metrics::set_global_recorder(recorder).map_err(|e| TelemetryError::Recorder(e.to_string()))?;
    shared::metrics_defs::describe_all(gateway::metrics_defs::ALL_METRICS);

    tracing::info!(
        host = %config.statsd_host,
        port = config.statsd_port,
        "Statsd metrics enabled"
    );
    Ok(())
}
