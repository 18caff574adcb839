//! Scope allow-list

use std::collections::HashSet;

/// Restricts which requested scopes the strategy will serve.
///
/// Without an allow-list every scope passes. Matching is exact and
/// case-sensitive.
#[derive(Debug, Clone, Default)]
pub struct ScopeGate {
    allowed: Option<HashSet<String>>,
}

impl ScopeGate {
    pub fn allow_all() -> Self {
        Self { allowed: None }
    }

    pub fn restricted<I, S>(scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            allowed: Some(scopes.into_iter().map(Into::into).collect()),
        }
    }

    pub fn is_restricted(&self) -> bool {
        self.allowed.is_some()
    }

    pub fn is_allowed(&self, scope: &str) -> bool {
        match &self.allowed {
            None => true,
            Some(allowed) => allowed.contains(scope),
        }
    }
}
