//! Configuration types for the exporter.

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::Deserialize;
use std::net::SocketAddr;
use std::time::Duration;

use crate::ExportError;

// ============================================================================
// Default configuration constants
// ============================================================================

/// Default QUIC ingestion port.
pub const DEFAULT_QUIC_PORT: u16 = 7843;

/// Default HTTP query API port.
pub const DEFAULT_HTTP_PORT: u16 = 8080;

/// Default HTTP read timeout in seconds.
pub const DEFAULT_READ_TIMEOUT_SECS: u64 = 10;

/// Default HTTP write timeout in seconds.
pub const DEFAULT_WRITE_TIMEOUT_SECS: u64 = 10;

/// Default maximum number of samples held in memory.
pub const DEFAULT_MAX_SIZE: usize = 10_000;

/// Default maximum sample age in seconds (24 hours).
pub const DEFAULT_EXPIRE_TIME_SECS: u64 = 24 * 60 * 60;

/// Default expiry sweep interval in seconds (5 minutes).
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 5 * 60;

/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Default configuration file name.
pub const DEFAULT_CONFIG_FILE: &str = "kon-export.toml";

/// Prefix for environment variable overrides.
///
/// Nested keys are separated by a double underscore, e.g.
/// `KON_EXPORT_STORAGE__MAX_SIZE=500`.
pub const ENV_PREFIX: &str = "KON_EXPORT_";

/// Exporter configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Listener configuration.
    pub server: ServerConfig,
    /// In-memory store configuration.
    pub storage: StorageConfig,
    /// Logging configuration.
    pub log: LogConfig,
}

impl ExportConfig {
    /// Load configuration from files and environment.
    ///
    /// Configuration is loaded in order (later sources override earlier):
    /// 1. Default values
    /// 2. `kon-export.toml` in current directory
    /// 3. Environment variables prefixed with `KON_EXPORT_`
    pub fn load() -> Result<Self, ExportError> {
        Self::load_from(DEFAULT_CONFIG_FILE)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &str) -> Result<Self, ExportError> {
        Self::from_figment(
            Figment::new()
                .merge(Toml::file(path))
                .merge(Env::prefixed(ENV_PREFIX).split("__")),
        )
    }

    /// Extract and validate configuration from a prepared figment.
    pub fn from_figment(figment: Figment) -> Result<Self, ExportError> {
        let config: Self = figment
            .extract()
            .map_err(|e| ExportError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check bounds that cannot be expressed in the types.
    pub fn validate(&self) -> Result<(), ExportError> {
        if self.storage.max_size == 0 {
            return Err(ExportError::Config(
                "storage.max_size must be greater than zero".into(),
            ));
        }
        if self.storage.expire_time_secs == 0 {
            return Err(ExportError::Config(
                "storage.expire_time_secs must be greater than zero".into(),
            ));
        }
        if self.storage.sweep_interval_secs == 0 {
            return Err(ExportError::Config(
                "storage.sweep_interval_secs must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// QUIC ingestion address (default: 0.0.0.0:7843).
    pub quic_addr: SocketAddr,
    /// HTTP query API address (default: 0.0.0.0:8080).
    pub http_addr: SocketAddr,
    /// HTTP read timeout in seconds.
    pub read_timeout_secs: u64,
    /// HTTP write timeout in seconds.
    pub write_timeout_secs: u64,
}

impl ServerConfig {
    /// Upper bound on handling a single HTTP request.
    ///
    /// Covers both reading the request and writing the response.
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(
            self.read_timeout_secs
                .saturating_add(self.write_timeout_secs),
        )
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            quic_addr: SocketAddr::from(([0, 0, 0, 0], DEFAULT_QUIC_PORT)),
            http_addr: SocketAddr::from(([0, 0, 0, 0], DEFAULT_HTTP_PORT)),
            read_timeout_secs: DEFAULT_READ_TIMEOUT_SECS,
            write_timeout_secs: DEFAULT_WRITE_TIMEOUT_SECS,
        }
    }
}

/// In-memory store configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Maximum number of samples retained; oldest are dropped first.
    pub max_size: usize,
    /// Samples older than this many seconds are removed by the sweeper.
    pub expire_time_secs: u64,
    /// Seconds between expiry sweeps.
    pub sweep_interval_secs: u64,
}

impl StorageConfig {
    /// Maximum sample age.
    #[must_use]
    pub const fn expire_time(&self) -> Duration {
        Duration::from_secs(self.expire_time_secs)
    }

    /// Interval between expiry sweeps.
    #[must_use]
    pub const fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            max_size: DEFAULT_MAX_SIZE,
            expire_time_secs: DEFAULT_EXPIRE_TIME_SECS,
            sweep_interval_secs: DEFAULT_SWEEP_INTERVAL_SECS,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Level for the exporter's own targets when `RUST_LOG` is unset.
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: DEFAULT_LOG_LEVEL.to_owned(),
        }
    }
}
