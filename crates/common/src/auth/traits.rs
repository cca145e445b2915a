//! Traits for the OAuth token lifecycle
//!
//! These traits are the seams of the auth core: the lifecycle manager
//! depends only on them, never on a concrete HTTP client, store or
//! configuration backend.

use async_trait::async_trait;

use super::error::AuthError;
use super::types::{ClientCredentials, TokenRecord, TokenResponse};

/// The gateway's OAuth endpoints
#[async_trait]
pub trait TokenEndpoint: Send + Sync {
    /// Build the URL the user is redirected to in order to grant access
    fn authorization_url(
        &self,
        client_id: &str,
        redirect_uri: &str,
        state: &str,
        code_challenge: &str,
    ) -> String;

    /// Exchange an authorization code (plus its PKCE verifier) for tokens
    ///
    /// # Errors
    /// `Remote` on a non-success status, empty body or transport failure;
    /// `Decode` when a success body cannot be parsed.
    async fn exchange_code(
        &self,
        credentials: &ClientCredentials,
        code: &str,
        redirect_uri: &str,
        code_verifier: &str,
    ) -> Result<TokenResponse, AuthError>;

    /// Mint a new access token from a refresh token
    ///
    /// # Errors
    /// Same failure modes as [`TokenEndpoint::exchange_code`].
    async fn refresh(
        &self,
        credentials: &ClientCredentials,
        refresh_token: &str,
    ) -> Result<TokenResponse, AuthError>;
}

/// Keyed persistence of the latest token record per user
///
/// A missing record is `Ok(None)`, never an error.
#[async_trait]
pub trait TokenStore: Send + Sync {
    async fn get(&self, user_id: &str) -> Result<Option<TokenRecord>, AuthError>;

    /// Insert or replace the record for `user_id`
    async fn put(&self, user_id: &str, record: TokenRecord) -> Result<(), AuthError>;

    /// Drop the record for `user_id`; succeeds when nothing was stored
    async fn remove(&self, user_id: &str) -> Result<(), AuthError>;
}

/// Storage for pending authorization attempts (state -> code verifier)
pub trait VerifierStore: Send + Sync {
    /// Associate `verifier` with `state`, overwriting silently
    fn save(&self, state: &str, verifier: &str);

    /// Non-destructive lookup
    fn get(&self, state: &str) -> Option<String>;

    fn remove(&self, state: &str);
}

/// Source of the application's client credentials
///
/// Consulted on every exchange and refresh so rotated credentials take
/// effect without a restart.
pub trait CredentialSource: Send + Sync {
    /// # Errors
    /// Returns `AuthError::Config` if either value is absent or empty.
    fn client_credentials(&self) -> Result<ClientCredentials, AuthError>;
}

/// Capability to obtain a currently valid access token for a user
#[async_trait]
pub trait AccessTokenProvider: Send + Sync {
    async fn access_token(&self, user_id: &str) -> Result<String, AuthError>;
}
