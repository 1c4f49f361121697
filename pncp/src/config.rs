use gateway::config::Config as GatewayConfig;
use serde::Deserialize;
use std::fs::File;

#[derive(Deserialize, Debug)]
pub struct MetricsConfig {
    pub statsd_host: String,
    pub statsd_port: u16,
    #[serde(default = "default_metrics_prefix")]
    pub prefix: String,
}

fn default_metrics_prefix() -> String {
    "pncp".into()
}

#[derive(Deserialize, Debug, Default, Clone, Copy, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Deserialize, Debug, Default)]
pub struct LoggingConfig {
    pub sentry_dsn: Option<String>,
    /// Filter directive used when RUST_LOG is unset, e.g. "info" or "gateway=debug,info"
    pub level: Option<String>,
    #[serde(default)]
    pub format: LogFormat,
}

#[derive(Deserialize, Debug)]
pub struct CommonConfig {
    pub metrics: Option<MetricsConfig>,
    pub logging: Option<LoggingConfig>,
}

#[derive(Deserialize, Debug)]
pub struct Config {
    #[serde(flatten)]
    pub common: CommonConfig,
    pub gateway: GatewayConfig,
}

impl Config {
    pub fn from_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let file = File::open(path)?;
        let data = serde_yaml::from_reader(file)?;

        Ok(data)
    }
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("could not load config from file: {0}")]
    LoadError(#[from] std::io::Error),
    #[error("could not parse config: {0}")]
    ParseError(#[from] serde_yaml::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use gateway::config::CacheConfig;
    use std::io::Write;
    use std::path::Path;

    fn write_tmp_file(s: &str) -> tempfile::NamedTempFile {
        let mut tmp = tempfile::NamedTempFile::new().expect("create temp file");
        write!(tmp, "{}", s).expect("write yaml");

        tmp
    }

    #[test]
    fn full_config() {
        let yaml = r#"
            metrics:
                statsd_host: 127.0.0.1
                statsd_port: 8125
            logging:
                sentry_dsn: https://key@sentry.example.com/1
                level: debug
                format: json
            gateway:
                listener:
                    host: 0.0.0.0
                    port: 8000
                upstream:
                    timeout_secs: 15
                cache:
                    type: redis
                    url: redis://localhost:6379/0
            "#;
        let tmp = write_tmp_file(yaml);
        let config = Config::from_file(tmp.path()).expect("load config");

        let metrics = config.common.metrics.expect("metrics config");
        assert_eq!(metrics.statsd_port, 8125);
        assert_eq!(metrics.prefix, "pncp");

        let logging = config.common.logging.expect("logging config");
        assert_eq!(logging.format, LogFormat::Json);
        assert_eq!(logging.level.as_deref(), Some("debug"));

        assert_eq!(config.gateway.upstream.timeout_secs, 15);
        assert!(matches!(config.gateway.cache, CacheConfig::Redis { .. }));
        assert!(config.gateway.validate().is_ok());
    }

    #[test]
    fn minimal_config() {
        let tmp = write_tmp_file("gateway: {}\n");
        let config = Config::from_file(tmp.path()).expect("load config");
        assert!(config.common.metrics.is_none());
        assert!(config.common.logging.is_none());
        assert_eq!(config.gateway.listener.port, 8000);
    }

    #[test]
    fn example_config() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../example_config.yaml");
        let config = Config::from_file(&path).expect("load example config");
        assert!(config.gateway.validate().is_ok());
        assert_eq!(
            config.gateway.cache,
            CacheConfig::Memory {
                max_capacity: 10000
            }
        );
    }

    #[test]
    fn missing_gateway_section() {
        let tmp = write_tmp_file("metrics: {statsd_host: localhost, statsd_port: 8125}\n");
        assert!(matches!(
            Config::from_file(tmp.path()),
            Err(ConfigError::ParseError(_))
        ));
    }

    #[test]
    fn missing_file() {
        assert!(matches!(
            Config::from_file(Path::new("/nonexistent/pncp.yaml")),
            Err(ConfigError::LoadError(_))
        ));
    }
}
