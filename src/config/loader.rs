//! Configuration loader with environment variable expansion

use super::{Config, ConfigError};
use regex_lite::{Captures, Regex};
use std::path::Path;

/// `${VAR}` or `${VAR:-default}`
const ENV_VAR_PATTERN: &str = r"\$\{([A-Za-z_][A-Za-z0-9_]*)(?::-([^}]*))?\}";

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from a file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
        let path = path.as_ref();
        tracing::debug!(path = %path.display(), "loading configuration");
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Parse configuration from YAML text
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Config, ConfigError> {
        let expanded = Self::expand_env_vars(content)?;
        let config: Config = serde_yaml::from_str(&expanded)?;
        config.validate()?;
        Ok(config)
    }

    /// Expand `${VAR}` and `${VAR:-default}`.
    ///
    /// Unset variables without a default are left as written.
    fn expand_env_vars(content: &str) -> Result<String, ConfigError> {
        let re = Regex::new(ENV_VAR_PATTERN)
            .map_err(|e| ConfigError::ValidationError(format!("env pattern: {}", e)))?;

        let expanded = re.replace_all(content, |cap: &Captures<'_>| {
            match (std::env::var(&cap[1]), cap.get(2)) {
                (Ok(value), _) => value,
                (Err(_), Some(default)) => default.as_str().to_string(),
                (Err(_), None) => cap[0].to_string(),
            }
        });

        Ok(expanded.into_owned())
    }
}
