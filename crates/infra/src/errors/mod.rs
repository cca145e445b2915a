//! Infrastructure error conversions
//!
//! Errors from SQLite, the connection pool, HTTP and the auth core all
//! funnel into [`GatewayError`](mpauth_domain::GatewayError) through the
//! [`InfraError`] newtype.

pub mod conversions;

pub use conversions::{map_join_error, InfraError};
