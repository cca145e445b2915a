//! # MPAuth Infrastructure
//!
//! Impure adapters around the auth core in `mpauth-common`.
//!
//! This crate contains:
//! - Configuration loading (environment, JSON/TOML files)
//! - SQLite token store (r2d2 pool, `spawn_blocking`)
//! - HTTP client and the payment gateway REST client
//! - Tracing subscriber initialisation
//! - Error conversions into `GatewayError`
//!
//! ## Architecture
//! - Implements traits defined in `mpauth-common`
//! - Depends on `mpauth-domain` and `mpauth-common`
//! - Contains all "impure" code (I/O, network, filesystem)

pub mod bootstrap;
pub mod config;
pub mod database;
pub mod errors;
pub mod http;
pub mod observability;
pub mod payments;

// Re-export commonly used items
pub use bootstrap::{Gateway, GatewayOAuthService, GatewayTokenManager};
pub use database::{SqlitePoolConfig, SqliteTokenStore};
pub use errors::InfraError;
pub use http::{HttpClient, HttpClientBuilder};
pub use observability::{init_tracing, LogFormat};
pub use payments::PaymentClient;
