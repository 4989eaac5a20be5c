//! Application configuration with layered loading.
//!
//! # Configuration Hierarchy
//!
//! Configuration is loaded in this order (later overrides earlier):
//!
//! 1. **Compiled defaults**: struct `Default` implementations and serde defaults
//! 2. **Config file**: TOML file named by the `CONCORD_CONFIG` env var
//! 3. **Environment variables**: `CONCORD__SECTION__FIELD` overrides single fields
//!
//! # Configuration Sections
//!
//! - [`EndpointConfig`]: beacon node endpoints, in priority order
//! - [`HealthCheckConfig`]: probe interval, probe timeout and sync-lag tolerance
//! - [`RoutingConfig`]: call timeout, fan-out, corroboration and per-operation overrides
//! - [`LoggingConfig`]: log level and format
//!
//! # Example
//!
//! ```toml
//! [[endpoints]]
//! name = "lighthouse"
//! address = "http://localhost:5052"
//!
//! [[endpoints]]
//! address = "http://localhost:3500"
//! timeout_seconds = 5
//!
//! [health_check]
//! interval_seconds = 12
//!
//! [routing]
//! fan_out = "parallel"
//!
//! [routing.corroboration]
//! mode = "majority"
//!
//! [routing.overrides.attestation_data]
//! corroboration = "strict"
//! ```

use crate::upstream::{health::HealthConfig, policy::RoutingConfig};
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::{collections::HashSet, path::Path, time::Duration};

/// A beacon node endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointConfig {
    /// Name used in logs and errors. Defaults to the address.
    #[serde(default)]
    pub name: Option<String>,

    /// Base URL of the node's REST API.
    pub address: String,

    /// Transport timeout for requests to this endpoint. Defaults to `10`.
    #[serde(default = "default_endpoint_timeout_seconds")]
    pub timeout_seconds: u64,
}

fn default_endpoint_timeout_seconds() -> u64 {
    10
}

impl EndpointConfig {
    #[must_use]
    pub fn new(address: impl Into<String>) -> Self {
        Self { name: None, address: address.into(), timeout_seconds: default_endpoint_timeout_seconds() }
    }

    /// The configured name, or the address when none is set.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.address)
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthCheckConfig {
    /// Seconds between full refresh cycles. Defaults to `30`.
    #[serde(default = "default_interval_seconds")]
    pub interval_seconds: u64,

    /// Upper bound on a single sync-status probe. Defaults to `2000`.
    #[serde(default = "default_probe_timeout_ms")]
    pub probe_timeout_ms: u64,

    /// Largest sync distance still considered active. Defaults to `1`.
    #[serde(default = "default_max_sync_lag_slots")]
    pub max_sync_lag_slots: u64,
}

fn default_interval_seconds() -> u64 {
    30
}

fn default_probe_timeout_ms() -> u64 {
    2000
}

fn default_max_sync_lag_slots() -> u64 {
    1
}

impl Default for HealthCheckConfig {
    fn default() -> Self {
        Self {
            interval_seconds: default_interval_seconds(),
            probe_timeout_ms: default_probe_timeout_ms(),
            max_sync_lag_slots: default_max_sync_lag_slots(),
        }
    }
}

impl HealthCheckConfig {
    #[must_use]
    pub fn to_health_config(&self) -> HealthConfig {
        HealthConfig {
            interval: Duration::from_secs(self.interval_seconds),
            probe_timeout: Duration::from_millis(self.probe_timeout_ms),
            max_sync_lag_slots: self.max_sync_lag_slots,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default level when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// `pretty` or `json`.
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: default_log_level(), format: default_log_format() }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Endpoints in priority order.
    #[serde(default)]
    pub endpoints: Vec<EndpointConfig>,

    #[serde(default)]
    pub health_check: HealthCheckConfig,

    #[serde(default)]
    pub routing: RoutingConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Loads configuration from a TOML file with environment variable overrides.
    ///
    /// A missing file is not an error. Use `__` as the separator for nested fields,
    /// e.g. `CONCORD__ROUTING__CALL_TIMEOUT_MS=2000`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read, parsed, or deserialized.
    pub fn from_file<P: AsRef<Path>>(config_path: P) -> Result<Self, ConfigError> {
        let config_builder = Config::builder()
            .set_default("health_check.interval_seconds", default_interval_seconds())?
            .set_default("health_check.probe_timeout_ms", default_probe_timeout_ms())?
            .set_default("health_check.max_sync_lag_slots", default_max_sync_lag_slots())?
            .set_default("logging.level", default_log_level())?
            .set_default("logging.format", default_log_format())?
            .add_source(File::with_name(&config_path.as_ref().to_string_lossy()).required(false))
            .add_source(Environment::with_prefix("CONCORD").separator("__"))
            .build()?;

        config_builder.try_deserialize()
    }

    /// Loads configuration from `config/concord.toml`, or the path in `CONCORD_CONFIG`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the configuration cannot be loaded or parsed.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path =
            std::env::var("CONCORD_CONFIG").unwrap_or_else(|_| "config/concord.toml".to_string());
        Self::from_file(&config_path)
    }

    /// Validates the configuration for correctness and consistency.
    ///
    /// # Errors
    ///
    /// Returns a descriptive error string for the first problem found.
    pub fn validate(&self) -> Result<(), String> {
        if self.endpoints.is_empty() {
            return Err("No beacon node endpoints configured".to_string());
        }

        let mut names = HashSet::new();
        for endpoint in &self.endpoints {
            if endpoint.address.is_empty() {
                return Err(format!("Empty address for endpoint: {}", endpoint.display_name()));
            }
            if !endpoint.address.starts_with("http://") && !endpoint.address.starts_with("https://")
            {
                return Err(format!(
                    "Invalid address for endpoint {}: {}",
                    endpoint.display_name(),
                    endpoint.address
                ));
            }
            if endpoint.timeout_seconds == 0 {
                return Err(format!(
                    "Timeout for endpoint {} must be greater than 0",
                    endpoint.display_name()
                ));
            }
            if !names.insert(endpoint.display_name()) {
                return Err(format!("Duplicate endpoint name: {}", endpoint.display_name()));
            }
        }

        if self.health_check.interval_seconds == 0 {
            return Err("Health check interval must be greater than 0".to_string());
        }
        if self.health_check.probe_timeout_ms == 0 {
            return Err("Probe timeout must be greater than 0".to_string());
        }

        self.routing.validate()?;

        if !["json", "pretty"].contains(&self.logging.format.as_str()) {
            return Err("Logging format must be 'json' or 'pretty'".to_string());
        }

        Ok(())
    }
}
