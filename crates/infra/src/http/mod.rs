//! Shared HTTP client for gateway REST calls

pub mod client;

pub use client::{HttpClient, HttpClientBuilder};
