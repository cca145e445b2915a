//! Database implementations

pub mod pool;
pub mod token_store;

pub use pool::*;
pub use token_store::*;
