//! Configuration module for bearer-strategy
//!
//! Handles loading and parsing of YAML configuration files with support for
//! environment variable expansion and validation.
//!
//! # Example
//!
//! ```yaml
//! strategy:
//!   secret: "${JWT_SECRET}"
//!   header: "authorization"
//!   query: "accessToken"
//!   expire_field: "tokenExpiresAt"
//!   allowed_scopes: ["user"]
//! logging:
//!   level: "debug"
//!   format: "pretty"
//! ```

use jsonwebtoken::Algorithm;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

mod loader;

pub use loader::ConfigLoader;

/// Validate that a URL starts with http:// or https://
fn is_valid_http_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

/// Configuration errors
///
/// Raised when a strategy is built, never while authenticating.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),

    #[error("A secret or secret resolver must be configured")]
    MissingSecret,

    #[error("Secret cannot be empty")]
    EmptySecret,
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub strategy: StrategyConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        ConfigLoader::load(path)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.strategy.validate()?;
        self.logging.validate()
    }
}

/// Strategy configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyConfig {
    pub secret: SecretConfig,
    #[serde(default)]
    pub header: Option<String>,
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default)]
    pub expire_field: Option<String>,
    #[serde(default)]
    pub allowed_scopes: Option<Vec<String>>,
    /// Hex SHA-256 digests of revoked tokens
    #[serde(default)]
    pub revoked_token_digests: Vec<String>,
    #[serde(default = "default_algorithm")]
    pub algorithm: String,
}

fn default_algorithm() -> String {
    "HS256".to_string()
}

impl StrategyConfig {
    /// Config with a static secret and every other option at its default
    pub fn with_static_secret(secret: &str) -> Self {
        Self {
            secret: SecretConfig::Static(secret.to_string()),
            header: None,
            query: None,
            expire_field: None,
            allowed_scopes: None,
            revoked_token_digests: Vec::new(),
            algorithm: default_algorithm(),
        }
    }

    /// Parsed signing algorithm; only the HMAC family is accepted
    pub fn algorithm(&self) -> Result<Algorithm, ConfigError> {
        let algorithm = Algorithm::from_str(&self.algorithm).map_err(|_| {
            ConfigError::ValidationError(format!("Unknown algorithm '{}'", self.algorithm))
        })?;

        match algorithm {
            Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512 => Ok(algorithm),
            other => Err(ConfigError::ValidationError(format!(
                "Invalid algorithm '{:?}': must be 'HS256', 'HS384' or 'HS512'",
                other
            ))),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        match &self.secret {
            SecretConfig::Static(secret) if secret.is_empty() => {
                return Err(ConfigError::EmptySecret)
            }
            SecretConfig::Env { env } if env.trim().is_empty() => {
                return Err(ConfigError::ValidationError(
                    "Secret environment variable name cannot be empty".into(),
                ))
            }
            SecretConfig::Remote { url, .. } if !is_valid_http_url(url) => {
                return Err(ConfigError::ValidationError(
                    "Invalid secret URL: must start with http:// or https://".into(),
                ))
            }
            SecretConfig::Remote {
                timeout_seconds: 0, ..
            } => {
                return Err(ConfigError::ValidationError(
                    "Secret fetch timeout must be greater than zero".into(),
                ))
            }
            _ => {}
        }

        if self.header.as_deref().is_some_and(|h| h.trim().is_empty()) {
            return Err(ConfigError::ValidationError(
                "Header name cannot be empty".into(),
            ));
        }

        if self.query.as_deref().is_some_and(|q| q.trim().is_empty()) {
            return Err(ConfigError::ValidationError(
                "Query parameter name cannot be empty".into(),
            ));
        }

        if self
            .expire_field
            .as_deref()
            .is_some_and(|f| f.trim().is_empty())
        {
            return Err(ConfigError::ValidationError(
                "Expire field cannot be empty".into(),
            ));
        }

        self.algorithm()?;

        Ok(())
    }
}

/// Where the verification secret comes from
///
/// ```yaml
/// secret: "plain-secret"
/// # or
/// secret: { env: "JWT_SECRET" }
/// # or
/// secret: { url: "https://vault.internal/jwt-secret", timeout_seconds: 5 }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SecretConfig {
    Static(String),
    Env {
        env: String,
    },
    Remote {
        url: String,
        #[serde(default = "default_secret_timeout")]
        timeout_seconds: u64,
    },
}

fn default_secret_timeout() -> u64 {
    5
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Json,
    Pretty,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset. Default: "info"
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl LoggingConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
            _ => Err(ConfigError::ValidationError(format!(
                "Invalid log level '{}': must be 'trace', 'debug', 'info', 'warn', or 'error'",
                self.level
            ))),
        }
    }
}
