//! Payment gateway OAuth core shared across MPAuth crates.
//!
//! # Feature Tiers
//!
//! Enable cargo features to opt into the tiers you need:
//! - `foundation`: PKCE generation, token types, error taxonomy
//! - `runtime` (default): state signing, token stores, gateway client,
//!   lifecycle manager and OAuth service
//! - `test-utils`: mock token endpoint and fixtures for downstream tests

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::complexity, clippy::suspicious)]

#[cfg(feature = "foundation")]
pub mod auth;

// Testing utilities
// ---------------------------------------------------------------
#[cfg(all(feature = "runtime", any(test, feature = "test-utils")))]
pub mod testing;

#[cfg(feature = "foundation")]
pub use auth::{AuthError, AuthResult, TokenRecord};
#[cfg(feature = "runtime")]
pub use auth::{AccessTokenProvider, OAuthService, TokenLifecycleManager, TokenStore};
