//! In-memory token store
//!
//! Process-local; records are lost on restart. Durable backends live in the
//! infrastructure crate and implement the same [`TokenStore`] trait.

use async_trait::async_trait;
use dashmap::DashMap;

use super::error::AuthError;
use super::traits::TokenStore;
use super::types::TokenRecord;

/// Process-local token store keyed by user id
#[derive(Debug, Default)]
pub struct InMemoryTokenStore {
    records: DashMap<String, TokenRecord>,
}

impl InMemoryTokenStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of users with a stored record
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// `true` when no user has a stored record
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl TokenStore for InMemoryTokenStore {
    async fn get(&self, user_id: &str) -> Result<Option<TokenRecord>, AuthError> {
        Ok(self.records.get(user_id).map(|entry| entry.value().clone()))
    }

    async fn put(&self, user_id: &str, record: TokenRecord) -> Result<(), AuthError> {
        self.records.insert(user_id.to_string(), record);
        Ok(())
    }

    async fn remove(&self, user_id: &str) -> Result<(), AuthError> {
        self.records.remove(user_id);
        Ok(())
    }
}
