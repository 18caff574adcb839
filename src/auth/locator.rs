//! Token discovery
//!
//! Source order: custom extractor, then header, then query parameter.
//! When none of them is configured the `authorization` header is used.

use super::{AuthError, AuthRequest};
use async_trait::async_trait;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// Header consulted when no token source is configured
pub const DEFAULT_HEADER: &str = "authorization";

/// Custom token extraction, overriding header and query lookup
#[async_trait]
pub trait TokenExtractor: Send + Sync {
    /// Return the raw token, or `None` when the request carries none
    async fn extract(&self, request: &AuthRequest) -> Result<Option<String>, AuthError>;
}

/// Extractor backed by a closure, see [`extractor_fn`]
pub struct FnExtractor<F> {
    f: F,
}

/// Wrap a closure as a [`TokenExtractor`]
///
/// The closure receives its own copy of the request.
///
/// ```
/// use bearer_strategy::auth::{extractor_fn, AuthError};
///
/// let extractor = extractor_fn(|request| async move {
///     Ok::<_, AuthError>(request.header("x-api-token").map(str::to_string))
/// });
/// ```
pub fn extractor_fn<F, Fut>(f: F) -> FnExtractor<F>
where
    F: Fn(AuthRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Option<String>, AuthError>> + Send + 'static,
{
    FnExtractor { f }
}

#[async_trait]
impl<F, Fut> TokenExtractor for FnExtractor<F>
where
    F: Fn(AuthRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Option<String>, AuthError>> + Send + 'static,
{
    async fn extract(&self, request: &AuthRequest) -> Result<Option<String>, AuthError> {
        (self.f)(request.clone()).await
    }
}

/// Finds the raw token on a request
#[derive(Clone)]
pub struct TokenLocator {
    extractor: Option<Arc<dyn TokenExtractor>>,
    header: Option<String>,
    query: Option<String>,
}

impl TokenLocator {
    /// Create a locator; falls back to the `authorization` header when
    /// no source is given.
    pub fn new(
        extractor: Option<Arc<dyn TokenExtractor>>,
        header: Option<String>,
        query: Option<String>,
    ) -> Self {
        let header = match (&extractor, header, &query) {
            (None, None, None) => Some(DEFAULT_HEADER.to_string()),
            (_, header, _) => header,
        };

        Self {
            extractor,
            header,
            query,
        }
    }

    pub fn header_name(&self) -> Option<&str> {
        self.header.as_deref()
    }

    pub fn query_name(&self) -> Option<&str> {
        self.query.as_deref()
    }

    /// Label of the configured sources, recorded on spans
    pub fn source_label(&self) -> &'static str {
        if self.extractor.is_some() {
            return "extractor";
        }
        match (&self.header, &self.query) {
            (Some(_), Some(_)) => "header+query",
            (Some(_), None) => "header",
            (None, Some(_)) => "query",
            (None, None) => "none",
        }
    }

    /// Whether the request carries something that looks like a token.
    ///
    /// Returns `None` when a custom extractor is configured, since only
    /// running it can tell.
    pub fn token_offered(&self, request: &AuthRequest) -> Option<bool> {
        if self.extractor.is_some() {
            return None;
        }
        let in_header = self
            .header
            .as_deref()
            .is_some_and(|name| request.header(name).is_some_and(|v| !v.is_empty()));
        let in_query = self
            .query
            .as_deref()
            .is_some_and(|name| request.query_param(name).is_some_and(|v| !v.is_empty()));
        Some(in_header || in_query)
    }

    /// Locate the raw token.
    ///
    /// An empty header or query value counts as absent. A non-empty but
    /// malformed header is an error, not an absent token.
    pub async fn locate(&self, request: &AuthRequest) -> Result<Option<String>, AuthError> {
        if let Some(extractor) = &self.extractor {
            let token = extractor.extract(request).await?;
            return Ok(token.filter(|t| !t.is_empty()));
        }

        if let Some(value) = self
            .header
            .as_deref()
            .and_then(|name| request.header(name))
            .filter(|v| !v.is_empty())
        {
            return parse_bearer_header(value).map(Some);
        }

        let token = self
            .query
            .as_deref()
            .and_then(|name| request.query_param(name))
            .filter(|t| !t.is_empty())
            .map(str::to_string);

        Ok(token)
    }
}

impl fmt::Debug for TokenLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenLocator")
            .field("extractor", &self.extractor.is_some())
            .field("header", &self.header)
            .field("query", &self.query)
            .finish()
    }
}

/// Parse `Bearer <token>`; the scheme is case-insensitive and the value
/// must have exactly two whitespace-separated parts.
///
/// Runs of spaces, tabs and surrounding whitespace are tolerated on
/// purpose (`"Bearer  tok"` and `"Bearer tok "` both yield `tok`); only
/// the part count and the scheme are enforced.
pub fn parse_bearer_header(value: &str) -> Result<String, AuthError> {
    let mut parts = value.split_whitespace();
    match (parts.next(), parts.next(), parts.next()) {
        (Some(scheme), Some(token), None) if scheme.eq_ignore_ascii_case("bearer") => {
            Ok(token.to_string())
        }
        _ => Err(AuthError::MalformedHeader),
    }
}
