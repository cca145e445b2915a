//! Payment gateway REST client
//!
//! Every call resolves a valid access token for the merchant first, so an
//! expired token is refreshed transparently before the request goes out.

pub mod client;

pub use client::PaymentClient;
