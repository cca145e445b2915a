//! High-level OAuth service orchestrator
//!
//! Combines the state token service and the token lifecycle manager into
//! the two halves of the authorization handshake plus access token lookup.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use super::error::AuthError;
use super::pkce::PkcePair;
use super::state::{InMemoryVerifierStore, StateTokenService};
use super::token_manager::TokenLifecycleManager;
use super::traits::{
    AccessTokenProvider, CredentialSource, TokenEndpoint, TokenStore, VerifierStore,
};
use super::types::{AuthorizationRequest, TokenRecord};

/// OAuth + PKCE flow for many users against one gateway application
pub struct OAuthService<E, S, C, V = InMemoryVerifierStore>
where
    E: TokenEndpoint + ?Sized,
    S: TokenStore + ?Sized,
    C: CredentialSource + ?Sized,
    V: VerifierStore,
{
    states: StateTokenService<V>,
    tokens: Arc<TokenLifecycleManager<E, S, C>>,
}

impl<E, S, C, V> OAuthService<E, S, C, V>
where
    E: TokenEndpoint + ?Sized,
    S: TokenStore + ?Sized,
    C: CredentialSource + ?Sized,
    V: VerifierStore,
{
    /// Combine a state service with a lifecycle manager
    #[must_use]
    pub fn new(states: StateTokenService<V>, tokens: Arc<TokenLifecycleManager<E, S, C>>) -> Self {
        Self { states, tokens }
    }

    /// Underlying lifecycle manager
    #[must_use]
    pub fn token_manager(&self) -> &Arc<TokenLifecycleManager<E, S, C>> {
        &self.tokens
    }

    /// State token service holding pending attempts
    #[must_use]
    pub fn states(&self) -> &StateTokenService<V> {
        &self.states
    }

    /// Begin an authorization attempt
    ///
    /// Generates a PKCE pair and a signed state, remembers the verifier under
    /// that state and returns the URL to redirect the user to.
    ///
    /// # Errors
    /// Returns `AuthError::Config` if client credentials are missing.
    pub fn start_authorization(
        &self,
        redirect_uri: &str,
    ) -> Result<AuthorizationRequest, AuthError> {
        let credentials = self.tokens.client_credentials()?;
        let pkce = PkcePair::generate();
        let state = self.states.generate_signed_state();

        self.states.save(&state, &pkce.code_verifier);

        let url = self.tokens.build_authorization_url(
            &credentials.client_id,
            redirect_uri,
            &state,
            &pkce.code_challenge,
        );
        info!(client_id = %credentials.client_id, "authorization started");

        Ok(AuthorizationRequest { url, state })
    }

    /// Finish an authorization attempt from the gateway callback
    ///
    /// The attempt is consumed only after the exchanged tokens have been
    /// stored, so a transient gateway failure can be retried with the same
    /// callback.
    ///
    /// # Errors
    /// - `AuthError::Unauthorized` for a forged, unknown or expired state
    /// - anything [`TokenLifecycleManager::authorize_user`] returns
    pub async fn complete_authorization(
        &self,
        user_id: &str,
        code: &str,
        state: &str,
        redirect_uri: &str,
    ) -> Result<TokenRecord, AuthError> {
        if !self.states.validate_signed_state(state) {
            warn!(user_id = %user_id, "rejected callback with invalid state signature");
            return Err(AuthError::unauthorized("invalid state"));
        }

        let verifier = self
            .states
            .get(state)
            .ok_or_else(|| AuthError::unauthorized("unknown or expired authorization attempt"))?;

        let record = self.tokens.authorize_user(user_id, code, redirect_uri, &verifier).await?;
        self.states.remove(state);
        Ok(record)
    }

    /// # Errors
    /// See [`TokenLifecycleManager::get_valid_access_token`].
    pub async fn get_access_token(&self, user_id: &str) -> Result<String, AuthError> {
        self.tokens.get_valid_access_token(user_id).await
    }
}

#[async_trait]
impl<E, S, C, V> AccessTokenProvider for OAuthService<E, S, C, V>
where
    E: TokenEndpoint + ?Sized,
    S: TokenStore + ?Sized,
    C: CredentialSource + ?Sized,
    V: VerifierStore,
{
    async fn access_token(&self, user_id: &str) -> Result<String, AuthError> {
        self.get_access_token(user_id).await
    }
}

impl<E, S, C, V> std::fmt::Debug for OAuthService<E, S, C, V>
where
    E: TokenEndpoint + ?Sized,
    S: TokenStore + ?Sized,
    C: CredentialSource + ?Sized,
    V: VerifierStore,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthService")
            .field("states", &self.states)
            .field("tokens", &self.tokens)
            .finish()
    }
}
