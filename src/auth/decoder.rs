//! Token decoding and expiry checks
//!
//! Signature verification and payload parsing are delegated to
//! `jsonwebtoken`. The codec's own registered-claim validation is switched
//! off so the payload comes back verbatim; expiry is checked separately
//! against a configurable claim.

use super::{AuthError, Claims};
use crate::config::ConfigError;
use chrono::{DateTime, NaiveDate, Utc};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde_json::Value;

/// Verifies and decodes HMAC-signed JWTs
#[derive(Debug, Clone)]
pub struct TokenDecoder {
    algorithm: Algorithm,
    validation: Validation,
}

impl TokenDecoder {
    /// Create a decoder for one HMAC algorithm (HS256, HS384 or HS512)
    pub fn new(algorithm: Algorithm) -> Result<Self, ConfigError> {
        if !matches!(
            algorithm,
            Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512
        ) {
            return Err(ConfigError::ValidationError(format!(
                "Unsupported algorithm {:?}: only HS256, HS384 and HS512 are accepted",
                algorithm
            )));
        }

        Ok(Self::with_algorithm(algorithm))
    }

    pub fn hs256() -> Self {
        Self::with_algorithm(Algorithm::HS256)
    }

    fn with_algorithm(algorithm: Algorithm) -> Self {
        let mut validation = Validation::new(algorithm);
        validation.required_spec_claims.clear();
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.validate_aud = false;

        Self {
            algorithm,
            validation,
        }
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    /// Verify the signature and return the payload.
    ///
    /// Every codec failure maps to [`AuthError::InvalidToken`].
    pub fn decode(&self, token: &str, secret: &str) -> Result<Claims, AuthError> {
        let key = DecodingKey::from_secret(secret.as_bytes());

        let data = decode::<Claims>(token, &key, &self.validation).map_err(|e| {
            tracing::debug!(error = %e, "token decode failed");
            AuthError::InvalidToken
        })?;

        Ok(data.claims)
    }
}

impl Default for TokenDecoder {
    fn default() -> Self {
        Self::hs256()
    }
}

/// Fail with [`AuthError::TokenExpired`] unless `claims[field]` parses to a
/// time strictly after `now`. A missing or unparseable field counts as
/// expired.
pub fn check_expiry(claims: &Claims, field: &str, now: DateTime<Utc>) -> Result<(), AuthError> {
    let expires_at = claims.get(field).and_then(parse_timestamp);

    match expires_at {
        Some(expires_at) if expires_at > now => Ok(()),
        Some(_) => Err(AuthError::TokenExpired),
        None => {
            tracing::debug!(field, "expiry claim missing or unparseable");
            Err(AuthError::TokenExpired)
        }
    }
}

/// Parse a claim value as a point in time.
///
/// Strings may be RFC 3339, RFC 2822 or a bare `YYYY-MM-DD` date (midnight
/// UTC). Numbers are Unix seconds, as in the JWT `exp` claim.
pub fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => parse_timestamp_str(s.trim()),
        Value::Number(n) => {
            if let Some(secs) = n.as_i64() {
                DateTime::from_timestamp(secs, 0)
            } else {
                let secs = n.as_f64()?;
                if !secs.is_finite() {
                    return None;
                }
                let whole = secs.floor();
                let nanos = ((secs - whole) * 1e9) as u32;
                DateTime::from_timestamp(whole as i64, nanos)
            }
        }
        _ => None,
    }
}

fn parse_timestamp_str(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}
