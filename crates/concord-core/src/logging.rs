//! Global `tracing` subscriber setup.

use crate::config::LoggingConfig;
use thiserror::Error;
use tracing_subscriber::{
    filter::ParseError, layer::SubscriberExt, util::SubscriberInitExt, util::TryInitError,
    EnvFilter,
};

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("Invalid log filter: {0}")]
    Filter(#[from] ParseError),

    #[error("Failed to install subscriber: {0}")]
    Init(#[from] TryInitError),
}

/// Builds the filter: `RUST_LOG` when set, otherwise `warn` for dependencies and
/// the configured level for this crate.
///
/// # Errors
///
/// Returns [`LoggingError::Filter`] if the configured level is not a valid directive.
pub fn env_filter(config: &LoggingConfig) -> Result<EnvFilter, LoggingError> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    Ok(EnvFilter::try_new(format!("warn,concord_core={}", config.level))?)
}

/// Installs the global subscriber in `pretty` or `json` format.
///
/// # Errors
///
/// Returns an error if the level is invalid or a global subscriber is already set.
pub fn init_logging(config: &LoggingConfig) -> Result<(), LoggingError> {
    let registry = tracing_subscriber::registry().with(env_filter(config)?);

    if config.format == "json" {
        registry.with(tracing_subscriber::fmt::layer().json()).try_init()?;
    } else {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .pretty()
            .with_file(true)
            .with_line_number(true)
            .with_target(false);
        registry.with(fmt_layer).try_init()?;
    }
    Ok(())
}
