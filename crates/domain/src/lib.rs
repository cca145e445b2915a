//! # MPAuth Domain
//!
//! Domain types shared by the payment gateway integration crates.
//!
//! This crate contains:
//! - Gateway error types and Result definitions
//! - Configuration structures
//! - Gateway endpoint constants
//! - Payment request/response models
//!
//! ## Architecture
//! - No dependencies on other MPAuth crates
//! - Only external dependencies allowed
//! - Pure domain models and data structures

pub mod config;
pub mod constants;
pub mod errors;
pub mod types;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;
