//! Authentication module
//!
//! Bearer-token authentication strategy. A request flows through a fixed
//! pipeline:
//!
//! ```text
//! locate token -> scope gate -> resolve secret -> decode -> expiry
//!              -> revocation -> claims processor
//! ```
//!
//! Missing tokens and disallowed scopes end in [`AuthOutcome::Anonymous`];
//! every other failure is an [`AuthError`].

use async_trait::async_trait;
use percent_encoding::percent_decode_str;
use std::collections::HashMap;
use thiserror::Error;

pub mod decoder;
pub mod locator;
pub mod processor;
pub mod revocation;
pub mod scope;
pub mod secret;
pub mod span;
pub mod strategy;

pub use decoder::TokenDecoder;
pub use locator::{extractor_fn, TokenExtractor, TokenLocator};
pub use processor::{processor_fn, ClaimsProcessor};
pub use revocation::{revocation_fn, RevocationCheck, RevocationList};
pub use scope::ScopeGate;
pub use secret::{secret_fn, EnvSecretResolver, HttpSecretResolver, SecretResolver, SecretSource};
pub use strategy::{JwtStrategy, JwtStrategyBuilder, STRATEGY_NAME};

/// Decoded token payload
pub type Claims = serde_json::Map<String, serde_json::Value>;

/// Authentication errors
///
/// Every variant means "credentials were offered but rejected"; callers
/// usually answer with 401.
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("bad authentication header")]
    MalformedHeader,

    #[error("could not decode token")]
    InvalidToken,

    #[error("token expired")]
    TokenExpired,

    #[error("token has been revoked")]
    TokenRevoked,

    #[error("processor rejected token")]
    ProcessorRejected,

    #[error("secret unavailable: {0}")]
    SecretUnavailable(String),

    #[error("token extraction failed: {0}")]
    Extractor(String),

    #[error("revocation check failed: {0}")]
    RevocationCheck(String),

    #[error("claims processing failed: {0}")]
    Processor(String),
}

impl AuthError {
    /// Short machine-readable reason, safe to put in logs and metrics labels
    pub fn reason(&self) -> &'static str {
        match self {
            AuthError::MalformedHeader => "malformed_header",
            AuthError::InvalidToken => "invalid_token",
            AuthError::TokenExpired => "token_expired",
            AuthError::TokenRevoked => "token_revoked",
            AuthError::ProcessorRejected => "processor_rejected",
            AuthError::SecretUnavailable(_) => "secret_unavailable",
            AuthError::Extractor(_) => "extractor_failed",
            AuthError::RevocationCheck(_) => "revocation_check_failed",
            AuthError::Processor(_) => "processor_failed",
        }
    }
}

/// Result of a successful pipeline run
#[derive(Debug, Clone, PartialEq)]
pub enum AuthOutcome {
    /// No token was offered, or the requested scope is not allowed
    Anonymous,
    /// Decoded claims, or whatever the claims processor returned
    Authenticated(serde_json::Value),
}

impl AuthOutcome {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, AuthOutcome::Authenticated(_))
    }

    /// Borrow the identity, if any
    pub fn identity(&self) -> Option<&serde_json::Value> {
        match self {
            AuthOutcome::Authenticated(identity) => Some(identity),
            AuthOutcome::Anonymous => None,
        }
    }

    pub fn into_identity(self) -> Option<serde_json::Value> {
        match self {
            AuthOutcome::Authenticated(identity) => Some(identity),
            AuthOutcome::Anonymous => None,
        }
    }
}

/// The parts of an inbound request the strategy looks at
///
/// Header names are stored lowercased; lookups are case-insensitive.
#[derive(Debug, Clone, Default)]
pub struct AuthRequest {
    pub headers: HashMap<String, String>,
    pub query: HashMap<String, String>,
    pub method: String,
    pub path: String,
}

impl AuthRequest {
    /// Build a request from a method and a path with optional query string
    ///
    /// ```
    /// use bearer_strategy::auth::AuthRequest;
    ///
    /// let request = AuthRequest::from_uri("GET", "/files?access_token=abc%2Bdef");
    /// assert_eq!(request.path, "/files");
    /// assert_eq!(request.query_param("access_token"), Some("abc+def"));
    /// ```
    pub fn from_uri(method: &str, uri: &str) -> Self {
        let (path, query) = match uri.split_once('?') {
            Some((path, query)) => (path, parse_query(query)),
            None => (uri, HashMap::new()),
        };

        Self {
            headers: HashMap::new(),
            query,
            method: method.to_string(),
            path: path.to_string(),
        }
    }

    #[must_use]
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers
            .insert(name.to_ascii_lowercase(), value.to_string());
        self
    }

    #[must_use]
    pub fn with_query_param(mut self, name: &str, value: &str) -> Self {
        self.query.insert(name.to_string(), value.to_string());
        self
    }

    /// Get header value by name (case-insensitive)
    pub fn header(&self, name: &str) -> Option<&str> {
        if let Some(value) = self.headers.get(name) {
            return Some(value.as_str());
        }
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query.get(name).map(String::as_str)
    }
}

/// Parse an `application/x-www-form-urlencoded` query string.
/// The first occurrence of a repeated key wins.
fn parse_query(query: &str) -> HashMap<String, String> {
    let mut params = HashMap::new();
    for pair in query.split('&').filter(|p| !p.is_empty()) {
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        params
            .entry(decode_component(key))
            .or_insert_with(|| decode_component(value));
    }
    params
}

fn decode_component(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    percent_decode_str(&spaced).decode_utf8_lossy().into_owned()
}

/// Per-request context handed to every hook
///
/// `attributes` is opaque to the strategy; applications use it to pass
/// request-scoped data (tenant, client address, ...) to their hooks.
#[derive(Debug, Clone, Default)]
pub struct AuthContext {
    pub request: AuthRequest,
    pub attributes: HashMap<String, serde_json::Value>,
}

impl AuthContext {
    pub fn new(request: AuthRequest) -> Self {
        Self {
            request,
            attributes: HashMap::new(),
        }
    }

    #[must_use]
    pub fn with_attribute(mut self, key: &str, value: serde_json::Value) -> Self {
        self.attributes.insert(key.to_string(), value);
        self
    }
}

/// Authentication strategy invoked once per request
#[async_trait]
pub trait Strategy: Send + Sync {
    /// Strategy name, used by routing layers that hold several strategies
    fn name(&self) -> &str;

    /// Authenticate a request for the given scope
    async fn authenticate(&self, ctx: &AuthContext, scope: &str)
        -> Result<AuthOutcome, AuthError>;
}
