//! Authentication span helpers
//!
//! Spans and attributes carry no PII: the token, secret and claim values
//! are never recorded, only which source was consulted and whether
//! something token-shaped was present.

use super::{AuthRequest, TokenLocator};
use std::collections::HashMap;
use tracing::Span;

/// Create the span wrapping one `authenticate` call from the attributes
/// built by [`extract_auth_attributes`]
pub fn strategy_span(attributes: &HashMap<String, String>, scope: &str) -> Span {
    let attr = |key: &str| attributes.get(key).map(String::as_str).unwrap_or("");

    tracing::info_span!(
        "auth.jwt",
        auth.method = %attr("auth.method"),
        auth.token_source = %attr("auth.token_source"),
        auth.token_present = %attr("auth.token_present"),
        auth.scope = %scope,
        auth.outcome = tracing::field::Empty,
    )
}

/// Record how the call ended on `span` (`authenticated`, `anonymous`, or
/// the error reason)
pub fn record_outcome(span: &Span, outcome: &str) {
    span.record("auth.outcome", outcome);
}

/// Authentication attributes safe for tracing
pub fn extract_auth_attributes(
    method: &str,
    locator: &TokenLocator,
    request: &AuthRequest,
) -> HashMap<String, String> {
    let mut attributes = HashMap::new();

    attributes.insert("auth.method".to_string(), method.to_string());
    attributes.insert(
        "auth.token_source".to_string(),
        locator.source_label().to_string(),
    );

    // Only presence; an extractor can't be asked without running it
    let token_present = match locator.token_offered(request) {
        Some(present) => present.to_string(),
        None => "unknown".to_string(),
    };
    attributes.insert("auth.token_present".to_string(), token_present);

    attributes
}
