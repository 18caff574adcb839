//! Log subscriber setup
//!
//! Strategy spans (`auth.jwt`) and events go through `tracing`; this module
//! installs the subscriber that prints them. Output goes to stderr so that
//! stdout stays free for command output.
//!
//! `RUST_LOG` takes precedence over the configured level.

use crate::config::{LogFormat, LoggingConfig};
use thiserror::Error;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::EnvFilter;

/// Subscriber initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Invalid log filter '{0}'")]
    InvalidFilter(String),

    #[error("Failed to set global subscriber (may already be initialized): {0}")]
    AlreadyInitialized(String),
}

/// Build the level filter, preferring `RUST_LOG`
pub fn env_filter(config: &LoggingConfig) -> Result<EnvFilter, TelemetryError> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(&config.level)
            .map_err(|_| TelemetryError::InvalidFilter(config.level.clone())),
    }
}

/// Install the global subscriber
pub fn init_subscriber(config: &LoggingConfig) -> Result<(), TelemetryError> {
    let filter = env_filter(config)?;

    let result = match config.format {
        LogFormat::Json => {
            let fmt_layer = tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(true)
                .with_target(true)
                .with_writer(std::io::stderr);
            tracing::subscriber::set_global_default(
                tracing_subscriber::registry().with(filter).with(fmt_layer),
            )
        }
        LogFormat::Pretty => {
            let fmt_layer = tracing_subscriber::fmt::layer()
                .pretty()
                .with_target(true)
                .with_writer(std::io::stderr);
            tracing::subscriber::set_global_default(
                tracing_subscriber::registry().with(filter).with(fmt_layer),
            )
        }
    };

    result.map_err(|e| TelemetryError::AlreadyInitialized(e.to_string()))
}
