//! Verification secret resolution
//!
//! A strategy holds either a static secret or a resolver that is awaited
//! once per request. Resolvers may reach out to remote stores.
//!
//! # Example
//!
//! ```
//! use bearer_strategy::auth::{secret_fn, AuthError, SecretSource};
//!
//! let fixed = SecretSource::from("so-secret");
//! let dynamic = SecretSource::resolver(secret_fn(|ctx| async move {
//!     let tenant = ctx.request.header("x-tenant").unwrap_or("default").to_string();
//!     Ok::<_, AuthError>(format!("secret-for-{tenant}"))
//! }));
//! ```

use super::{AuthContext, AuthError};
use crate::config::ConfigError;
use async_trait::async_trait;
use serde::Deserialize;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Default timeout for remote secret fetches (5 seconds)
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(5);

/// Produces the verification secret for a request
#[async_trait]
pub trait SecretResolver: Send + Sync {
    async fn resolve(&self, ctx: &AuthContext) -> Result<String, AuthError>;
}

/// Static secret or dynamic resolver
#[derive(Clone)]
pub enum SecretSource {
    Static(String),
    Resolver(Arc<dyn SecretResolver>),
}

impl SecretSource {
    pub fn resolver<R>(resolver: R) -> Self
    where
        R: SecretResolver + 'static,
    {
        SecretSource::Resolver(Arc::new(resolver))
    }

    /// Produce the secret for this request
    pub async fn resolve(&self, ctx: &AuthContext) -> Result<String, AuthError> {
        match self {
            SecretSource::Static(secret) => Ok(secret.clone()),
            SecretSource::Resolver(resolver) => resolver.resolve(ctx).await,
        }
    }

    /// Construction-time check; a static secret must not be empty
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        match self {
            SecretSource::Static(secret) if secret.is_empty() => Err(ConfigError::EmptySecret),
            _ => Ok(()),
        }
    }
}

impl From<&str> for SecretSource {
    fn from(secret: &str) -> Self {
        SecretSource::Static(secret.to_string())
    }
}

impl From<String> for SecretSource {
    fn from(secret: String) -> Self {
        SecretSource::Static(secret)
    }
}

impl fmt::Debug for SecretSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SecretSource::Static(_) => f.write_str("SecretSource::Static(<redacted>)"),
            SecretSource::Resolver(_) => f.write_str("SecretSource::Resolver(..)"),
        }
    }
}

/// Resolver backed by a closure, see [`secret_fn`]
pub struct FnSecretResolver<F> {
    f: F,
}

/// Wrap a closure as a [`SecretResolver`]. The closure receives its own
/// copy of the context.
pub fn secret_fn<F, Fut>(f: F) -> FnSecretResolver<F>
where
    F: Fn(AuthContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<String, AuthError>> + Send + 'static,
{
    FnSecretResolver { f }
}

#[async_trait]
impl<F, Fut> SecretResolver for FnSecretResolver<F>
where
    F: Fn(AuthContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<String, AuthError>> + Send + 'static,
{
    async fn resolve(&self, ctx: &AuthContext) -> Result<String, AuthError> {
        (self.f)(ctx.clone()).await
    }
}

/// Reads the secret from an environment variable on every call
#[derive(Debug, Clone)]
pub struct EnvSecretResolver {
    var: String,
}

impl EnvSecretResolver {
    pub fn new(var: &str) -> Self {
        Self {
            var: var.to_string(),
        }
    }
}

#[async_trait]
impl SecretResolver for EnvSecretResolver {
    async fn resolve(&self, _ctx: &AuthContext) -> Result<String, AuthError> {
        match std::env::var(&self.var) {
            Ok(secret) if !secret.is_empty() => Ok(secret),
            Ok(_) => Err(AuthError::SecretUnavailable(format!(
                "environment variable {} is empty",
                self.var
            ))),
            Err(_) => Err(AuthError::SecretUnavailable(format!(
                "environment variable {} is not set",
                self.var
            ))),
        }
    }
}

/// JSON body accepted from a secret store
#[derive(Debug, Deserialize)]
struct SecretResponse {
    secret: String,
}

/// Fetches the secret from a remote store with `GET <url>`
///
/// The response body is either `{"secret": "..."}` or the bare secret as
/// plain text. Nothing is cached: every request sees the store's current
/// value.
pub struct HttpSecretResolver {
    url: String,
    client: reqwest::Client,
}

impl HttpSecretResolver {
    /// Create a resolver with the default 5 second timeout
    pub fn new(url: &str) -> Result<Self, ConfigError> {
        Self::with_timeout(url, DEFAULT_FETCH_TIMEOUT)
    }

    pub fn with_timeout(url: &str, timeout: Duration) -> Result<Self, ConfigError> {
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(ConfigError::ValidationError(format!(
                "Invalid secret store URL '{}': must start with http:// or https://",
                url
            )));
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ConfigError::ValidationError(format!("HTTP client: {}", e)))?;

        Ok(Self {
            url: url.to_string(),
            client,
        })
    }
}

#[async_trait]
impl SecretResolver for HttpSecretResolver {
    async fn resolve(&self, _ctx: &AuthContext) -> Result<String, AuthError> {
        let response = self.client.get(&self.url).send().await.map_err(|e| {
            tracing::warn!(error = %e, "secret store request failed");
            AuthError::SecretUnavailable(e.to_string())
        })?;

        if !response.status().is_success() {
            tracing::warn!(status = %response.status(), "secret store returned an error");
            return Err(AuthError::SecretUnavailable(format!(
                "HTTP {}: {}",
                response.status(),
                response.status().canonical_reason().unwrap_or("Unknown")
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| AuthError::SecretUnavailable(e.to_string()))?;

        let secret = match serde_json::from_str::<SecretResponse>(&body) {
            Ok(parsed) => parsed.secret,
            Err(_) => body.trim().to_string(),
        };

        if secret.is_empty() {
            return Err(AuthError::SecretUnavailable(
                "secret store returned an empty secret".into(),
            ));
        }

        Ok(secret)
    }
}

impl fmt::Debug for HttpSecretResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpSecretResolver")
            .field("url", &self.url)
            .finish_non_exhaustive()
    }
}
