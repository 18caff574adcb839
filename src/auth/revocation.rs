//! Token revocation
//!
//! The check is keyed on the raw token string and runs once the token has
//! been decoded and its expiry accepted.

use super::{AuthContext, AuthError};
use crate::config::ConfigError;
use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::future::Future;

/// External revocation state (blocklist, logout store, ...)
#[async_trait]
pub trait RevocationCheck: Send + Sync {
    /// `true` rejects the token
    async fn is_revoked(&self, token: &str, ctx: &AuthContext) -> Result<bool, AuthError>;
}

/// Revocation predicate backed by a closure, see [`revocation_fn`]
pub struct FnRevocationCheck<F> {
    f: F,
}

/// Wrap a closure as a [`RevocationCheck`]
///
/// ```
/// use bearer_strategy::auth::{revocation_fn, AuthError};
///
/// let check = revocation_fn(|token, _ctx| async move {
///     Ok::<_, AuthError>(token.starts_with("legacy."))
/// });
/// ```
pub fn revocation_fn<F, Fut>(f: F) -> FnRevocationCheck<F>
where
    F: Fn(String, AuthContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<bool, AuthError>> + Send + 'static,
{
    FnRevocationCheck { f }
}

#[async_trait]
impl<F, Fut> RevocationCheck for FnRevocationCheck<F>
where
    F: Fn(String, AuthContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<bool, AuthError>> + Send + 'static,
{
    async fn is_revoked(&self, token: &str, ctx: &AuthContext) -> Result<bool, AuthError> {
        (self.f)(token.to_string(), ctx.clone()).await
    }
}

/// Fixed deny-list of revoked tokens, stored as hex SHA-256 digests so
/// configuration never has to hold the tokens themselves.
#[derive(Debug, Clone, Default)]
pub struct RevocationList {
    digests: HashSet<String>,
}

impl RevocationList {
    /// Build from raw tokens
    pub fn from_tokens<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            digests: tokens
                .into_iter()
                .map(|t| token_digest(t.as_ref()))
                .collect(),
        }
    }

    /// Build from hex-encoded SHA-256 digests
    pub fn from_digests<I, S>(digests: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = HashSet::new();
        for digest in digests {
            let digest = digest.as_ref().trim().to_ascii_lowercase();
            match hex::decode(&digest) {
                Ok(bytes) if bytes.len() == 32 => {
                    set.insert(digest);
                }
                _ => {
                    return Err(ConfigError::ValidationError(format!(
                        "Invalid revoked token digest '{}': expected 64 hex characters",
                        digest
                    )))
                }
            }
        }
        Ok(Self { digests: set })
    }

    pub fn contains(&self, token: &str) -> bool {
        self.digests.contains(&token_digest(token))
    }

    pub fn len(&self) -> usize {
        self.digests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.digests.is_empty()
    }
}

#[async_trait]
impl RevocationCheck for RevocationList {
    async fn is_revoked(&self, token: &str, _ctx: &AuthContext) -> Result<bool, AuthError> {
        Ok(self.contains(token))
    }
}

/// Hex SHA-256 of a raw token, the key used by [`RevocationList`]
pub fn token_digest(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}
