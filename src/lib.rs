//! Bearer Strategy Library
//!
//! Pluggable bearer-token (JWT) authentication strategy.
//!
//! # Features
//!
//! - **Token Location**: `Authorization: Bearer` header, query parameter, or a custom extractor
//! - **Scopes**: Optional allow-list; other scopes are served anonymously
//! - **Secrets**: Static, per-request resolver, environment variable, or HTTP fetch
//! - **Expiry**: Optional timestamp claim checked on every request
//! - **Revocation**: Digest deny-list or custom check
//! - **Claims Processing**: Map decoded claims to an application identity
//!
//! # Example
//!
//! ```no_run
//! use bearer_strategy::auth::{AuthContext, AuthRequest, JwtStrategy, Strategy};
//! use bearer_strategy::config::Config;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("strategy.yaml")?;
//!     let strategy = JwtStrategy::from_config(&config.strategy)?;
//!
//!     let request = AuthRequest::from_uri("GET", "/home?accessToken=eyJ...");
//!     let outcome = strategy.authenticate(&AuthContext::new(request), "user").await?;
//!     println!("{:?}", outcome.identity());
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod config;
pub mod telemetry;

// Re-export commonly used types
pub use auth::{AuthError, AuthOutcome, JwtStrategy, Strategy};
pub use config::Config;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
