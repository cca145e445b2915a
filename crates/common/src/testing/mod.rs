//! Testing utilities and helpers
//!
//! - **[`mocks`]**: Mock implementations of the auth traits
//! - **[`fixtures`]**: Token record fixtures

pub mod fixtures;
pub mod mocks;

pub use fixtures::token_record;
pub use mocks::MockTokenEndpoint;
