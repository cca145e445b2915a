//! Token lifecycle manager
//!
//! The single authority for producing a currently valid access token for a
//! user:
//! - Authorization URL construction and code exchange
//! - Proactive refresh inside a configurable skew (default 5 min)
//! - At most one in-flight refresh per user
//! - Bounded timeout on every gateway call
//!
//! # Refresh gate
//!
//! Each user has a `tokio::sync::Mutex` held across re-check, remote refresh
//! and store update. Callers that queued behind a refresh re-read the store
//! once they get the gate: if the leader succeeded they return its token, if
//! it failed they receive the same error instead of replaying the refresh
//! token. Callers that arrive after a failure start a new attempt.
//!
//! `authorize_user` and `sign_out` write through the same gate, so a refresh
//! in flight can never resurrect or overwrite what they stored. A gate is
//! dropped from the map once no caller holds it.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::error::AuthError;
use super::traits::{AccessTokenProvider, CredentialSource, TokenEndpoint, TokenStore};
use super::types::{ClientCredentials, TokenRecord};

/// Refresh this long before expiry by default
pub const DEFAULT_REFRESH_SKEW: Duration = Duration::from_secs(300);

/// Upper bound for a single exchange or refresh call
pub const DEFAULT_REMOTE_TIMEOUT: Duration = Duration::from_secs(30);

/// Lifecycle tuning
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenManagerConfig {
    /// Refresh once fewer than this many seconds of lifetime remain
    pub refresh_skew: Duration,
    /// Upper bound for each exchange or refresh call
    pub remote_timeout: Duration,
}

impl Default for TokenManagerConfig {
    fn default() -> Self {
        Self { refresh_skew: DEFAULT_REFRESH_SKEW, remote_timeout: DEFAULT_REMOTE_TIMEOUT }
    }
}

#[derive(Debug)]
struct RefreshFailure {
    at: Instant,
    error: AuthError,
}

/// Per-user refresh state guarded by the gate mutex
#[derive(Debug, Default)]
struct RefreshGate {
    last_failure: Option<RefreshFailure>,
}

/// Orchestrates exchange, storage and refresh of per-user tokens
pub struct TokenLifecycleManager<E, S, C>
where
    E: TokenEndpoint + ?Sized,
    S: TokenStore + ?Sized,
    C: CredentialSource + ?Sized,
{
    endpoint: Arc<E>,
    store: Arc<S>,
    credentials: Arc<C>,
    gates: DashMap<String, Arc<Mutex<RefreshGate>>>,
    refresh_skew: chrono::Duration,
    remote_timeout: Duration,
}

impl<E, S, C> TokenLifecycleManager<E, S, C>
where
    E: TokenEndpoint + ?Sized,
    S: TokenStore + ?Sized,
    C: CredentialSource + ?Sized,
{
    /// Create a manager with the default 5 minute skew and 30 second timeout
    #[must_use]
    pub fn new(endpoint: Arc<E>, store: Arc<S>, credentials: Arc<C>) -> Self {
        Self::with_config(endpoint, store, credentials, TokenManagerConfig::default())
    }

    /// Create a manager with explicit tuning
    ///
    /// A skew too large for the clock is clamped to the maximum, which makes
    /// every stored token count as stale.
    #[must_use]
    pub fn with_config(
        endpoint: Arc<E>,
        store: Arc<S>,
        credentials: Arc<C>,
        config: TokenManagerConfig,
    ) -> Self {
        let refresh_skew = chrono::Duration::from_std(config.refresh_skew).unwrap_or_else(|_| {
            warn!(
                refresh_skew_seconds = config.refresh_skew.as_secs(),
                "refresh skew out of range; every token will be refreshed on use"
            );
            chrono::Duration::MAX
        });

        Self {
            endpoint,
            store,
            credentials,
            gates: DashMap::new(),
            refresh_skew,
            remote_timeout: config.remote_timeout,
        }
    }

    /// Backing token store
    #[must_use]
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Current application credentials, read from the source on each call
    ///
    /// # Errors
    /// Returns `AuthError::Config` if credentials are missing.
    pub fn client_credentials(&self) -> Result<ClientCredentials, AuthError> {
        self.credentials.client_credentials()
    }

    /// URL the user is sent to in order to grant access
    #[must_use]
    pub fn build_authorization_url(
        &self,
        client_id: &str,
        redirect_uri: &str,
        state: &str,
        code_challenge: &str,
    ) -> String {
        self.endpoint.authorization_url(client_id, redirect_uri, state, code_challenge)
    }

    /// Exchange an authorization code for a token record
    ///
    /// The record is stamped with the local time at which the response was
    /// accepted. Nothing is persisted.
    ///
    /// # Errors
    /// - `AuthError::Remote` on non-success status, empty body or timeout
    /// - `AuthError::Decode` when the body cannot be parsed
    /// - `AuthError::Unauthorized` when the response carries no access token
    pub async fn exchange_code_for_token(
        &self,
        credentials: &ClientCredentials,
        code: &str,
        redirect_uri: &str,
        code_verifier: &str,
    ) -> Result<TokenRecord, AuthError> {
        let response = self
            .bounded(self.endpoint.exchange_code(credentials, code, redirect_uri, code_verifier))
            .await?;
        TokenRecord::from_response(response, Utc::now())
    }

    /// Mint a new token record from a refresh token. Nothing is persisted.
    ///
    /// # Errors
    /// Same as [`Self::exchange_code_for_token`].
    pub async fn refresh_access_token(
        &self,
        credentials: &ClientCredentials,
        refresh_token: &str,
    ) -> Result<TokenRecord, AuthError> {
        let response = self.bounded(self.endpoint.refresh(credentials, refresh_token)).await?;
        TokenRecord::from_response(response, Utc::now())
    }

    /// Exchange a code with the configured credentials and store the result
    /// for `user_id`
    ///
    /// # Errors
    /// `AuthError::Config` if credentials are missing, otherwise as
    /// [`Self::exchange_code_for_token`] plus store failures.
    pub async fn authorize_user(
        &self,
        user_id: &str,
        code: &str,
        redirect_uri: &str,
        code_verifier: &str,
    ) -> Result<TokenRecord, AuthError> {
        let credentials = self.credentials.client_credentials()?;
        let record =
            self.exchange_code_for_token(&credentials, code, redirect_uri, code_verifier).await?;

        let gate = self.gate(user_id);
        let stored = {
            let mut guard = gate.lock().await;
            guard.last_failure = None;
            self.store.put(user_id, record.clone()).await
        };
        self.release_gate(user_id, gate);
        stored?;

        info!(user_id = %user_id, expires_in = record.expires_in, "user authorized");
        Ok(record)
    }

    /// Return a currently valid access token for `user_id`, refreshing it
    /// first when it is inside the skew window
    ///
    /// # Errors
    /// - `AuthError::Unauthorized` when no usable token material is stored
    /// - `AuthError::Config` when a refresh is needed but credentials are
    ///   missing
    /// - any refresh failure, unchanged; the stale token is never returned
    pub async fn get_valid_access_token(&self, user_id: &str) -> Result<String, AuthError> {
        let record = self.load_usable(user_id).await?;

        if record.is_fresh(Utc::now(), self.refresh_skew) {
            debug!(user_id = %user_id, "using cached access token");
            return Ok(record.access_token);
        }

        self.refresh_for_user(user_id).await
    }

    /// Forget everything stored for `user_id`
    ///
    /// Waits for a refresh in flight for the same user to finish first.
    ///
    /// # Errors
    /// Returns store failures.
    pub async fn sign_out(&self, user_id: &str) -> Result<(), AuthError> {
        let gate = self.gate(user_id);
        let removed = {
            let mut guard = gate.lock().await;
            guard.last_failure = None;
            self.store.remove(user_id).await
        };
        self.release_gate(user_id, gate);
        removed?;

        info!(user_id = %user_id, "user tokens removed");
        Ok(())
    }

    async fn refresh_for_user(&self, user_id: &str) -> Result<String, AuthError> {
        let waiting_since = Instant::now();
        let gate = self.gate(user_id);
        let result = {
            let mut guard = gate.lock().await;
            self.refresh_under_gate(user_id, &mut guard, waiting_since).await
        };
        self.release_gate(user_id, gate);
        result
    }

    async fn refresh_under_gate(
        &self,
        user_id: &str,
        gate: &mut RefreshGate,
        waiting_since: Instant,
    ) -> Result<String, AuthError> {
        // Another caller may have refreshed while we waited.
        let record = self.load_usable(user_id).await?;
        if record.is_fresh(Utc::now(), self.refresh_skew) {
            debug!(user_id = %user_id, "token refreshed by a concurrent caller");
            return Ok(record.access_token);
        }

        if let Some(failure) = &gate.last_failure {
            if failure.at >= waiting_since {
                debug!(user_id = %user_id, "sharing concurrent refresh failure");
                return Err(failure.error.clone());
            }
        }

        match self.refresh_and_store(user_id, &record).await {
            Ok(refreshed) => {
                gate.last_failure = None;
                Ok(refreshed.access_token)
            }
            Err(error) => {
                warn!(user_id = %user_id, error = %error, "token refresh failed");
                gate.last_failure = Some(RefreshFailure { at: Instant::now(), error: error.clone() });
                Err(error)
            }
        }
    }

    async fn refresh_and_store(
        &self,
        user_id: &str,
        current: &TokenRecord,
    ) -> Result<TokenRecord, AuthError> {
        let credentials = self.credentials.client_credentials()?;
        let refresh_token = current
            .usable_refresh_token()
            .ok_or_else(|| AuthError::unauthorized("refresh token missing"))?;

        debug!(user_id = %user_id, "refreshing access token");
        let refreshed = self
            .refresh_access_token(&credentials, refresh_token)
            .await?
            .carry_forward(current);

        self.store.put(user_id, refreshed.clone()).await?;
        info!(user_id = %user_id, expires_in = refreshed.expires_in, "access token refreshed");
        Ok(refreshed)
    }

    async fn load_usable(&self, user_id: &str) -> Result<TokenRecord, AuthError> {
        let record = self
            .store
            .get(user_id)
            .await?
            .ok_or_else(|| AuthError::unauthorized("no tokens for user"))?;

        if record.usable_refresh_token().is_none() {
            return Err(AuthError::unauthorized("refresh token missing"));
        }
        if record.access_token.is_empty() {
            return Err(AuthError::unauthorized("access token missing"));
        }
        Ok(record)
    }

    fn gate(&self, user_id: &str) -> Arc<Mutex<RefreshGate>> {
        self.gates.entry(user_id.to_string()).or_default().value().clone()
    }

    /// Drop the caller's handle and forget the gate if nobody else holds it.
    ///
    /// Waiters keep their own handle, so a shared failure stays visible to
    /// them; the map shard lock serialises this against `gate`.
    fn release_gate(&self, user_id: &str, gate: Arc<Mutex<RefreshGate>>) {
        drop(gate);
        self.gates.remove_if(user_id, |_, gate| Arc::strong_count(gate) == 1);
    }

    async fn bounded<T>(
        &self,
        call: impl std::future::Future<Output = Result<T, AuthError>>,
    ) -> Result<T, AuthError> {
        tokio::time::timeout(self.remote_timeout, call).await.map_err(|_| AuthError::Remote {
            status: None,
            body: format!("gateway call timed out after {:?}", self.remote_timeout),
        })?
    }
}

#[async_trait]
impl<E, S, C> AccessTokenProvider for TokenLifecycleManager<E, S, C>
where
    E: TokenEndpoint + ?Sized,
    S: TokenStore + ?Sized,
    C: CredentialSource + ?Sized,
{
    async fn access_token(&self, user_id: &str) -> Result<String, AuthError> {
        self.get_valid_access_token(user_id).await
    }
}

impl<E, S, C> std::fmt::Debug for TokenLifecycleManager<E, S, C>
where
    E: TokenEndpoint + ?Sized,
    S: TokenStore + ?Sized,
    C: CredentialSource + ?Sized,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenLifecycleManager")
            .field("refresh_skew_seconds", &self.refresh_skew.num_seconds())
            .field("remote_timeout", &self.remote_timeout)
            .field("tracked_users", &self.gates.len())
            .finish_non_exhaustive()
    }
}
