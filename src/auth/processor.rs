//! Claims post-processing
//!
//! Maps decoded claims to an application identity, e.g. loading the user
//! row for `claims["sub"]`. The processor's return value replaces the
//! claims; `null` or `false` rejects the token.

use super::{AuthContext, AuthError, Claims};
use async_trait::async_trait;
use serde_json::Value;
use std::future::Future;

#[async_trait]
pub trait ClaimsProcessor: Send + Sync {
    async fn process(&self, ctx: &AuthContext, claims: Claims) -> Result<Value, AuthError>;
}

/// Processor backed by a closure, see [`processor_fn`]
pub struct FnClaimsProcessor<F> {
    f: F,
}

/// Wrap a closure as a [`ClaimsProcessor`]
///
/// ```
/// use bearer_strategy::auth::{processor_fn, AuthError};
/// use serde_json::{json, Value};
///
/// let processor = processor_fn(|_ctx, mut claims| async move {
///     claims.insert("userFromDb".into(), json!("my_user_from_db"));
///     Ok::<_, AuthError>(Value::Object(claims))
/// });
/// ```
pub fn processor_fn<F, Fut>(f: F) -> FnClaimsProcessor<F>
where
    F: Fn(AuthContext, Claims) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value, AuthError>> + Send + 'static,
{
    FnClaimsProcessor { f }
}

#[async_trait]
impl<F, Fut> ClaimsProcessor for FnClaimsProcessor<F>
where
    F: Fn(AuthContext, Claims) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value, AuthError>> + Send + 'static,
{
    async fn process(&self, ctx: &AuthContext, claims: Claims) -> Result<Value, AuthError> {
        (self.f)(ctx.clone(), claims).await
    }
}

/// `null` and `false` mean the processor refused the token
pub(crate) fn is_rejection(identity: &Value) -> bool {
    matches!(identity, Value::Null | Value::Bool(false))
}
