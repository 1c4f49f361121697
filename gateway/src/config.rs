use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use url::Url;

#[derive(Error, Debug, PartialEq)]
pub enum ValidationError {
    #[error("Port cannot be 0")]
    InvalidPort,

    #[error("Upstream timeout cannot be 0")]
    InvalidTimeout,

    #[error("TTL for {0} cannot be 0")]
    InvalidTtl(&'static str),

    #[error("Memory cache capacity cannot be 0")]
    InvalidCapacity,

    #[error("Redis URL must use the redis:// or rediss:// scheme: {0}")]
    InvalidRedisUrl(String),
}

/// Gateway configuration
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Config {
    /// Listener for the public API
    #[serde(default = "Listener::default_api")]
    pub listener: Listener,
    /// Listener for the health and readiness probes
    #[serde(default = "Listener::default_admin")]
    pub admin_listener: Listener,
    #[serde(default)]
    pub upstream: UpstreamConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub ttl: TtlConfig,
    #[serde(default)]
    pub stats: StatsConfig,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            listener: Listener::default_api(),
            admin_listener: Listener::default_admin(),
            upstream: UpstreamConfig::default(),
            cache: CacheConfig::default(),
            ttl: TtlConfig::default(),
            stats: StatsConfig::default(),
        }
    }
}

impl Config {
    /// Validates the gateway configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.listener.validate()?;
        self.admin_listener.validate()?;

        if self.upstream.timeout_secs == 0 {
            return Err(ValidationError::InvalidTimeout);
        }

        if self.ttl.list_secs == 0 {
            return Err(ValidationError::InvalidTtl("list"));
        }
        if self.ttl.stats_secs == 0 {
            return Err(ValidationError::InvalidTtl("stats"));
        }

        self.cache.validate()
    }
}

/// Network listener configuration
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Listener {
    /// Host address to bind to (e.g., "0.0.0.0" or "127.0.0.1")
    pub host: String,
    /// Port number to listen on
    pub port: u16,
}

impl Listener {
    fn default_api() -> Self {
        Listener {
            host: "0.0.0.0".into(),
            port: 8000,
        }
    }

    fn default_admin() -> Self {
        Listener {
            host: "127.0.0.1".into(),
            port: 8001,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.port == 0 {
            return Err(ValidationError::InvalidPort);
        }
        Ok(())
    }
}

/// Where the public procurement API lives
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Base of the PNCP integration API
    pub pncp_api_base: Url,
    /// Base of the PNCP query ("consulta") API
    pub consulta_api_base: Url,
    /// Base of the human-facing portal pages for a tender
    pub portal_base: Url,
    /// Timeout applied to every upstream request, connection included
    pub timeout_secs: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        UpstreamConfig {
            pncp_api_base: Url::parse("https://pncp.gov.br/api/pncp").expect("valid default URL"),
            consulta_api_base: Url::parse("https://pncp.gov.br/api/consulta")
                .expect("valid default URL"),
            portal_base: Url::parse("https://pncp.gov.br/app/editais").expect("valid default URL"),
            timeout_secs: 30,
        }
    }
}

impl UpstreamConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_max_capacity() -> u64 {
    10_000
}

fn default_connect_timeout_secs() -> u64 {
    5
}

fn default_op_timeout_secs() -> u64 {
    5
}

/// Response cache backend
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum CacheConfig {
    Disabled,
    Memory {
        #[serde(default = "default_max_capacity")]
        max_capacity: u64,
    },
    Redis {
        /// e.g. redis://:password@localhost:6379/0
        url: String,
        #[serde(default = "default_connect_timeout_secs")]
        connect_timeout_secs: u64,
        #[serde(default = "default_op_timeout_secs")]
        op_timeout_secs: u64,
    },
}

impl Default for CacheConfig {
    fn default() -> Self {
        CacheConfig::Memory {
            max_capacity: default_max_capacity(),
        }
    }
}

impl CacheConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        match self {
            CacheConfig::Disabled => Ok(()),
            CacheConfig::Memory { max_capacity } => match *max_capacity {
                0 => Err(ValidationError::InvalidCapacity),
                _ => Ok(()),
            },
            CacheConfig::Redis {
                url,
                connect_timeout_secs,
                op_timeout_secs,
            } => {
                if !(url.starts_with("redis://") || url.starts_with("rediss://")) {
                    return Err(ValidationError::InvalidRedisUrl(url.clone()));
                }
                if *connect_timeout_secs == 0 || *op_timeout_secs == 0 {
                    return Err(ValidationError::InvalidTimeout);
                }
                Ok(())
            }
        }
    }
}

/// Cache lifetimes for the two classes of cached responses
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct TtlConfig {
    /// Frequently changing list data (open tenders)
    pub list_secs: u64,
    /// Aggregated statistics
    pub stats_secs: u64,
}

impl Default for TtlConfig {
    fn default() -> Self {
        TtlConfig {
            list_secs: 600,
            stats_secs: 900,
        }
    }
}

impl TtlConfig {
    pub fn list(&self) -> Duration {
        Duration::from_secs(self.list_secs)
    }

    pub fn stats(&self) -> Duration {
        Duration::from_secs(self.stats_secs)
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct StatsConfig {
    /// Whether placeholder statistics served after an upstream failure are cached
    pub cache_fallback: bool,
}

impl Default for StatsConfig {
    fn default() -> Self {
        StatsConfig {
            cache_fallback: true,
        }
    }
}
