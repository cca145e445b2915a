//! Mock implementations of the auth traits
//!
//! Provides a scriptable token endpoint for exercising the lifecycle manager
//! without a gateway.

// Allow missing error/panic docs for test mocks - they are designed to be simple
// and errors are clearly indicated by their return types
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::auth::{AuthError, ClientCredentials, TokenEndpoint, TokenResponse};

/// Scriptable [`TokenEndpoint`]
///
/// Clones share state, so a test can keep a handle for assertions after
/// moving the mock into a manager.
#[derive(Debug, Clone, Default)]
pub struct MockTokenEndpoint {
    refresh_calls: Arc<AtomicUsize>,
    exchange_calls: Arc<AtomicUsize>,
    refresh_response: Arc<Mutex<Option<TokenResponse>>>,
    exchange_response: Arc<Mutex<Option<TokenResponse>>>,
    failure: Arc<Mutex<Option<AuthError>>>,
    delay: Arc<Mutex<Option<Duration>>>,
    last_refresh_token: Arc<Mutex<Option<String>>>,
    last_credentials: Arc<Mutex<Option<ClientCredentials>>>,
}

impl MockTokenEndpoint {
    /// Create a new mock endpoint with default responses.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configure the response returned by `refresh`.
    pub fn set_refresh_response(&self, response: TokenResponse) {
        *self.refresh_response.lock() = Some(response);
    }

    /// Configure the response returned by `exchange_code`.
    pub fn set_exchange_response(&self, response: TokenResponse) {
        *self.exchange_response.lock() = Some(response);
    }

    /// Make every call fail with `error` until cleared with `None`.
    pub fn set_failure(&self, error: Option<AuthError>) {
        *self.failure.lock() = error;
    }

    /// Sleep this long before answering.
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock() = Some(delay);
    }

    #[must_use]
    pub fn refresh_calls(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn exchange_calls(&self) -> usize {
        self.exchange_calls.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn last_refresh_token(&self) -> Option<String> {
        self.last_refresh_token.lock().clone()
    }

    #[must_use]
    pub fn last_credentials(&self) -> Option<ClientCredentials> {
        self.last_credentials.lock().clone()
    }

    async fn respond(
        &self,
        configured: Option<TokenResponse>,
        prefix: &str,
    ) -> Result<TokenResponse, AuthError> {
        let delay = *self.delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let failure = self.failure.lock().clone();
        if let Some(error) = failure {
            return Err(error);
        }

        Ok(configured.unwrap_or_else(|| TokenResponse {
            access_token: Some(format!("{prefix}_access_token")),
            token_type: Some("Bearer".to_string()),
            expires_in: 3600,
            scope: Some("offline_access read write".to_string()),
            refresh_token: Some(format!("{prefix}_refresh_token")),
            user_id: Some(1001),
        }))
    }
}

#[async_trait]
impl TokenEndpoint for MockTokenEndpoint {
    fn authorization_url(
        &self,
        client_id: &str,
        redirect_uri: &str,
        state: &str,
        code_challenge: &str,
    ) -> String {
        format!(
            "https://mock.gateway/authorization?client_id={client_id}&state={state}\
             &redirect_uri={redirect_uri}&code_challenge={code_challenge}"
        )
    }

    async fn exchange_code(
        &self,
        credentials: &ClientCredentials,
        _code: &str,
        _redirect_uri: &str,
        _code_verifier: &str,
    ) -> Result<TokenResponse, AuthError> {
        self.exchange_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_credentials.lock() = Some(credentials.clone());
        let configured = self.exchange_response.lock().clone();
        self.respond(configured, "exchanged").await
    }

    async fn refresh(
        &self,
        credentials: &ClientCredentials,
        refresh_token: &str,
    ) -> Result<TokenResponse, AuthError> {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_refresh_token.lock() = Some(refresh_token.to_string());
        *self.last_credentials.lock() = Some(credentials.clone());
        let configured = self.refresh_response.lock().clone();
        self.respond(configured, "refreshed").await
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for testing::mocks.
    use super::*;

    #[tokio::test]
    async fn test_mock_counts_refresh_calls() {
        let endpoint = MockTokenEndpoint::new();
        let creds = ClientCredentials::new("id", "secret");

        let response = endpoint.refresh(&creds, "old").await.unwrap();
        assert_eq!(response.access_token.as_deref(), Some("refreshed_access_token"));
        assert_eq!(endpoint.refresh_calls(), 1);
        assert_eq!(endpoint.last_refresh_token().as_deref(), Some("old"));

        endpoint.set_failure(Some(AuthError::unauthorized("revoked")));
        assert!(endpoint.refresh(&creds, "old").await.is_err());
        assert_eq!(endpoint.refresh_calls(), 2);
    }
}
