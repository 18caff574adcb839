//! JWT bearer strategy
//!
//! # Example
//!
//! ```
//! use bearer_strategy::auth::{AuthContext, AuthOutcome, AuthRequest, JwtStrategy, Strategy};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let strategy = JwtStrategy::builder()
//!     .with_secret("i-am-very-secret")
//!     .with_header("authorization")
//!     .with_query("accessToken")
//!     .with_expire_field("tokenExpiresAt")
//!     .with_allowed_scopes(["user"])
//!     .build()?;
//!
//! let ctx = AuthContext::new(AuthRequest::from_uri("GET", "/home"));
//! assert_eq!(strategy.authenticate(&ctx, "user").await?, AuthOutcome::Anonymous);
//! # Ok(())
//! # }
//! ```

use super::decoder::{check_expiry, TokenDecoder};
use super::locator::{TokenExtractor, TokenLocator};
use super::processor::{is_rejection, ClaimsProcessor};
use super::revocation::{RevocationCheck, RevocationList};
use super::scope::ScopeGate;
use super::secret::{EnvSecretResolver, HttpSecretResolver, SecretResolver, SecretSource};
use super::{span, AuthContext, AuthError, AuthOutcome, Strategy};
use crate::config::{ConfigError, SecretConfig, StrategyConfig};
use async_trait::async_trait;
use jsonwebtoken::Algorithm;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::Instrument;

/// Name reported by [`Strategy::name`]
pub const STRATEGY_NAME: &str = "jwt";

/// Bearer-token strategy
///
/// Immutable once built and shareable across tasks; all per-request data
/// lives in the `authenticate` future.
pub struct JwtStrategy {
    secret: SecretSource,
    locator: TokenLocator,
    decoder: TokenDecoder,
    expire_field: Option<String>,
    revocation: Option<Arc<dyn RevocationCheck>>,
    scopes: ScopeGate,
    processor: Option<Arc<dyn ClaimsProcessor>>,
}

/// Builder for JwtStrategy
#[derive(Default)]
pub struct JwtStrategyBuilder {
    secret: Option<SecretSource>,
    extractor: Option<Arc<dyn TokenExtractor>>,
    header: Option<String>,
    query: Option<String>,
    expire_field: Option<String>,
    algorithm: Option<Algorithm>,
    revocation: Option<Arc<dyn RevocationCheck>>,
    allowed_scopes: Option<Vec<String>>,
    processor: Option<Arc<dyn ClaimsProcessor>>,
}

impl JwtStrategyBuilder {
    /// Use a static secret
    pub fn with_secret(mut self, secret: impl Into<String>) -> Self {
        self.secret = Some(SecretSource::Static(secret.into()));
        self
    }

    /// Resolve the secret per request
    pub fn with_secret_resolver(mut self, resolver: impl SecretResolver + 'static) -> Self {
        self.secret = Some(SecretSource::resolver(resolver));
        self
    }

    pub fn with_secret_source(mut self, source: SecretSource) -> Self {
        self.secret = Some(source);
        self
    }

    /// Replace header and query lookup with a custom extractor
    pub fn with_token_extractor(mut self, extractor: impl TokenExtractor + 'static) -> Self {
        self.extractor = Some(Arc::new(extractor));
        self
    }

    /// Read `Bearer <token>` from this header
    pub fn with_header(mut self, name: &str) -> Self {
        self.header = Some(name.to_ascii_lowercase());
        self
    }

    /// Read the token from this query parameter
    pub fn with_query(mut self, name: &str) -> Self {
        self.query = Some(name.to_string());
        self
    }

    /// Reject tokens whose `field` claim is at or before now
    pub fn with_expire_field(mut self, field: &str) -> Self {
        self.expire_field = Some(field.to_string());
        self
    }

    /// HMAC algorithm tokens must be signed with (default HS256)
    pub fn with_algorithm(mut self, algorithm: Algorithm) -> Self {
        self.algorithm = Some(algorithm);
        self
    }

    pub fn with_revocation_check(mut self, check: impl RevocationCheck + 'static) -> Self {
        self.revocation = Some(Arc::new(check));
        self
    }

    /// Only serve these scopes; others get [`AuthOutcome::Anonymous`]
    pub fn with_allowed_scopes<I, S>(mut self, scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_scopes = Some(scopes.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_claims_processor(mut self, processor: impl ClaimsProcessor + 'static) -> Self {
        self.processor = Some(Arc::new(processor));
        self
    }

    /// Build the strategy, validating the configuration
    pub fn build(self) -> Result<JwtStrategy, ConfigError> {
        let secret = self.secret.ok_or(ConfigError::MissingSecret)?;
        secret.validate()?;

        if self.header.as_deref().is_some_and(str::is_empty) {
            return Err(ConfigError::ValidationError(
                "Header name cannot be empty".into(),
            ));
        }
        if self.query.as_deref().is_some_and(str::is_empty) {
            return Err(ConfigError::ValidationError(
                "Query parameter name cannot be empty".into(),
            ));
        }
        if self.expire_field.as_deref().is_some_and(str::is_empty) {
            return Err(ConfigError::ValidationError(
                "Expire field cannot be empty".into(),
            ));
        }

        let decoder = TokenDecoder::new(self.algorithm.unwrap_or(Algorithm::HS256))?;
        let scopes = match self.allowed_scopes {
            Some(scopes) => ScopeGate::restricted(scopes),
            None => ScopeGate::allow_all(),
        };

        Ok(JwtStrategy {
            secret,
            locator: TokenLocator::new(self.extractor, self.header, self.query),
            decoder,
            expire_field: self.expire_field,
            revocation: self.revocation,
            scopes,
            processor: self.processor,
        })
    }
}

impl JwtStrategy {
    /// Create a new builder for JwtStrategy
    pub fn builder() -> JwtStrategyBuilder {
        JwtStrategyBuilder::default()
    }

    /// Build a strategy from a configuration file section.
    ///
    /// Hooks that only exist in code (extractor, processor, custom
    /// revocation) can be added on the returned builder.
    pub fn builder_from_config(config: &StrategyConfig) -> Result<JwtStrategyBuilder, ConfigError> {
        config.validate()?;

        let mut builder = Self::builder().with_algorithm(config.algorithm()?);

        builder = match &config.secret {
            SecretConfig::Static(secret) => builder.with_secret(secret.clone()),
            SecretConfig::Env { env } => builder.with_secret_resolver(EnvSecretResolver::new(env)),
            SecretConfig::Remote {
                url,
                timeout_seconds,
            } => builder.with_secret_resolver(HttpSecretResolver::with_timeout(
                url,
                Duration::from_secs(*timeout_seconds),
            )?),
        };

        if let Some(header) = &config.header {
            builder = builder.with_header(header);
        }
        if let Some(query) = &config.query {
            builder = builder.with_query(query);
        }
        if let Some(field) = &config.expire_field {
            builder = builder.with_expire_field(field);
        }
        if let Some(scopes) = &config.allowed_scopes {
            builder = builder.with_allowed_scopes(scopes.iter().cloned());
        }
        let revoked = RevocationList::from_digests(&config.revoked_token_digests)?;
        if !revoked.is_empty() {
            tracing::debug!(revoked = revoked.len(), "loaded revoked token digests");
            builder = builder.with_revocation_check(revoked);
        }

        Ok(builder)
    }

    pub fn from_config(config: &StrategyConfig) -> Result<Self, ConfigError> {
        Self::builder_from_config(config)?.build()
    }

    pub fn locator(&self) -> &TokenLocator {
        &self.locator
    }

    pub fn scopes(&self) -> &ScopeGate {
        &self.scopes
    }

    pub fn algorithm(&self) -> Algorithm {
        self.decoder.algorithm()
    }

    async fn run_pipeline(&self, ctx: &AuthContext, scope: &str) -> Result<AuthOutcome, AuthError> {
        let Some(token) = self.locator.locate(&ctx.request).await? else {
            tracing::debug!("no token offered");
            return Ok(AuthOutcome::Anonymous);
        };

        if !self.scopes.is_allowed(scope) {
            tracing::debug!("scope not in allow-list");
            return Ok(AuthOutcome::Anonymous);
        }

        let secret = self.secret.resolve(ctx).await?;
        let claims = self.decoder.decode(&token, &secret)?;

        if let Some(field) = &self.expire_field {
            check_expiry(&claims, field, chrono::Utc::now())?;
        }

        if let Some(revocation) = &self.revocation {
            if revocation.is_revoked(&token, ctx).await? {
                return Err(AuthError::TokenRevoked);
            }
        }

        let identity = match &self.processor {
            Some(processor) => {
                let identity = processor.process(ctx, claims).await?;
                if is_rejection(&identity) {
                    return Err(AuthError::ProcessorRejected);
                }
                identity
            }
            None => Value::Object(claims),
        };

        Ok(AuthOutcome::Authenticated(identity))
    }
}

#[async_trait]
impl Strategy for JwtStrategy {
    fn name(&self) -> &str {
        STRATEGY_NAME
    }

    async fn authenticate(&self, ctx: &AuthContext, scope: &str) -> Result<AuthOutcome, AuthError> {
        let attributes = span::extract_auth_attributes(STRATEGY_NAME, &self.locator, &ctx.request);
        let auth_span = span::strategy_span(&attributes, scope);

        let result = self
            .run_pipeline(ctx, scope)
            .instrument(auth_span.clone())
            .await;

        auth_span.in_scope(|| match &result {
            Ok(AuthOutcome::Authenticated(_)) => {
                span::record_outcome(&auth_span, "authenticated");
                tracing::info!("JWT authentication successful");
            }
            Ok(AuthOutcome::Anonymous) => span::record_outcome(&auth_span, "anonymous"),
            Err(e) => {
                span::record_outcome(&auth_span, e.reason());
                tracing::debug!(reason = e.reason(), "JWT authentication failed");
            }
        });

        result
    }
}

impl fmt::Debug for JwtStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtStrategy")
            .field("secret", &self.secret)
            .field("locator", &self.locator)
            .field("algorithm", &self.decoder.algorithm())
            .field("expire_field", &self.expire_field)
            .field("revocation", &self.revocation.is_some())
            .field("scopes", &self.scopes)
            .field("processor", &self.processor.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_requires_secret() {
        let result = JwtStrategy::builder().build();
        assert!(matches!(result, Err(ConfigError::MissingSecret)));
    }

    #[test]
    fn test_build_rejects_empty_secret() {
        let result = JwtStrategy::builder().with_secret("").build();
        assert!(matches!(result, Err(ConfigError::EmptySecret)));
    }

    #[test]
    fn test_build_rejects_empty_names() {
        assert!(JwtStrategy::builder()
            .with_secret("s")
            .with_header("")
            .build()
            .is_err());
        assert!(JwtStrategy::builder()
            .with_secret("s")
            .with_query("")
            .build()
            .is_err());
    }

    #[test]
    fn test_build_rejects_asymmetric_algorithm() {
        let result = JwtStrategy::builder()
            .with_secret("s")
            .with_algorithm(Algorithm::RS256)
            .build();
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_defaults() {
        let strategy = JwtStrategy::builder().with_secret("s").build().unwrap();
        assert_eq!(strategy.name(), "jwt");
        assert_eq!(strategy.locator().header_name(), Some("authorization"));
        assert!(!strategy.scopes().is_restricted());
        assert_eq!(strategy.algorithm(), Algorithm::HS256);
    }

    #[test]
    fn test_query_only_disables_default_header() {
        let strategy = JwtStrategy::builder()
            .with_secret("s")
            .with_query("accessToken")
            .build()
            .unwrap();
        assert_eq!(strategy.locator().header_name(), None);
        assert_eq!(strategy.locator().query_name(), Some("accessToken"));
    }

    #[test]
    fn test_debug_hides_secret() {
        let strategy = JwtStrategy::builder().with_secret("hunter2").build().unwrap();
        assert!(!format!("{:?}", strategy).contains("hunter2"));
    }

    #[test]
    fn test_strategy_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<JwtStrategy>();
    }
}
