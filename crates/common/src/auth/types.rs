//! OAuth token types for the payment gateway
//!
//! `TokenResponse` is the wire shape returned by the gateway's token
//! endpoint; `TokenRecord` is what gets stored per user once a response has
//! been accepted and stamped with the local acquisition time.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::error::AuthError;

/// Token response from the gateway's `/oauth/token` endpoint
///
/// Every field is optional on the wire; validation happens when converting
/// into a [`TokenRecord`].
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenResponse {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub expires_in: i64,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Gateway-side identifier of the merchant that granted access
    #[serde(default)]
    pub user_id: Option<i64>,
}

/// Latest token pair for one user
///
/// Exactly one record is live per user; a refresh replaces it wholesale.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenRecord {
    /// Bearer token sent with payment calls
    pub access_token: String,
    /// `None` when the gateway never issued one; an empty string is treated
    /// the same way by the lifecycle manager.
    pub refresh_token: Option<String>,
    pub token_type: String,
    /// Access token lifetime in seconds, relative to `obtained_at`
    pub expires_in: i64,
    /// Granted scopes, space separated
    pub scope: Option<String>,
    /// Gateway-side merchant id from the last response that carried one
    pub remote_user_id: Option<i64>,
    /// Local wall-clock time at which the response was accepted
    pub obtained_at: DateTime<Utc>,
}

impl TokenRecord {
    /// Accept a token response at `obtained_at`.
    ///
    /// # Errors
    /// Returns `AuthError::Unauthorized` if the response carries no access
    /// token.
    pub fn from_response(
        response: TokenResponse,
        obtained_at: DateTime<Utc>,
    ) -> Result<Self, AuthError> {
        let access_token = response
            .access_token
            .filter(|token| !token.is_empty())
            .ok_or_else(|| AuthError::unauthorized("gateway returned no access token"))?;

        Ok(Self {
            access_token,
            refresh_token: response.refresh_token,
            token_type: response.token_type.unwrap_or_else(|| "Bearer".to_string()),
            expires_in: response.expires_in,
            scope: response.scope,
            remote_user_id: response.user_id,
            obtained_at,
        })
    }

    /// `obtained_at + expires_in`, or `None` when that is not representable.
    #[must_use]
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        Duration::try_seconds(self.expires_in)
            .and_then(|lifetime| self.obtained_at.checked_add_signed(lifetime))
    }

    /// `true` while `now < obtained_at + expires_in - skew`.
    ///
    /// A lifetime or skew that overflows the clock counts as stale.
    #[must_use]
    pub fn is_fresh(&self, now: DateTime<Utc>, skew: Duration) -> bool {
        self.expires_at()
            .and_then(|expires_at| expires_at.checked_sub_signed(skew))
            .is_some_and(|deadline| now < deadline)
    }

    /// Refresh token, if present and non-empty.
    #[must_use]
    pub fn usable_refresh_token(&self) -> Option<&str> {
        self.refresh_token.as_deref().filter(|token| !token.is_empty())
    }

    /// Fill fields the gateway may omit on refresh from the record being
    /// replaced.
    #[must_use]
    pub fn carry_forward(mut self, previous: &Self) -> Self {
        if self.usable_refresh_token().is_none() {
            self.refresh_token.clone_from(&previous.refresh_token);
        }
        if self.remote_user_id.is_none() {
            self.remote_user_id = previous.remote_user_id;
        }
        self
    }
}

impl fmt::Debug for TokenRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenRecord")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
            .field("token_type", &self.token_type)
            .field("expires_in", &self.expires_in)
            .field("scope", &self.scope)
            .field("remote_user_id", &self.remote_user_id)
            .field("obtained_at", &self.obtained_at)
            .finish()
    }
}

/// Application credentials issued by the gateway
#[derive(Clone, PartialEq, Eq)]
pub struct ClientCredentials {
    /// Application id
    pub client_id: String,
    /// Application secret; never logged
    pub client_secret: String,
}

impl ClientCredentials {
    /// Pair a client id with its secret
    #[must_use]
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self { client_id: client_id.into(), client_secret: client_secret.into() }
    }
}

impl fmt::Debug for ClientCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

/// Production REST API base
pub const DEFAULT_API_BASE_URL: &str = "https://api.mercadopago.com";
/// Production authorization page host
pub const DEFAULT_AUTH_BASE_URL: &str = "https://auth.mercadopago.com";

/// Where the gateway serves its OAuth endpoints
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayEndpoints {
    /// REST API base; the token endpoint lives here
    pub api_base_url: String,
    /// Host of the user-facing authorization page
    pub auth_base_url: String,
}

impl GatewayEndpoints {
    /// Endpoints rooted at the given hosts
    #[must_use]
    pub fn new(api_base_url: impl Into<String>, auth_base_url: impl Into<String>) -> Self {
        Self { api_base_url: api_base_url.into(), auth_base_url: auth_base_url.into() }
    }

    /// Full URL of the token endpoint
    #[must_use]
    pub fn token_url(&self) -> String {
        format!("{}/oauth/token", self.api_base_url.trim_end_matches('/'))
    }

    /// Full URL of the authorization page, without query
    #[must_use]
    pub fn authorization_url(&self) -> String {
        format!("{}/authorization", self.auth_base_url.trim_end_matches('/'))
    }
}

impl Default for GatewayEndpoints {
    fn default() -> Self {
        Self::new(DEFAULT_API_BASE_URL, DEFAULT_AUTH_BASE_URL)
    }
}

/// Result of starting an authorization handshake
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationRequest {
    /// URL to redirect the user to
    pub url: String,
    /// Signed state the callback must echo back
    pub state: String,
}
