//! Configuration structures
//!
//! Every section except the signing key has defaults, so a minimal file only
//! needs `state_signing_key`. Client credentials are optional here because
//! they may be supplied at call time from a rotating source instead.

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_API_BASE_URL, DEFAULT_AUTH_BASE_URL, DEFAULT_HTTP_TIMEOUT_SECS,
    DEFAULT_REFRESH_SKEW_SECS, DEFAULT_REMOTE_TIMEOUT_SECS, DEFAULT_STATE_MAX_CAPACITY,
    DEFAULT_STATE_TTL_SECS,
};
use crate::errors::{GatewayError, Result};

/// Root configuration for the gateway integration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GatewayConfig {
    #[serde(default)]
    pub credentials: CredentialsConfig,
    pub state_signing_key: String,
    #[serde(default)]
    pub endpoints: EndpointsConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub tokens: TokenConfig,
    #[serde(default)]
    pub state: StateConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

impl GatewayConfig {
    /// Fail fast on settings that would only surface later as auth failures.
    ///
    /// # Errors
    /// Returns `GatewayError::Config` if the signing key is empty or a
    /// base URL is blank.
    pub fn validate(&self) -> Result<()> {
        if self.state_signing_key.trim().is_empty() {
            return Err(GatewayError::Config("state signing key is not configured".into()));
        }
        if self.endpoints.api_base_url.trim().is_empty()
            || self.endpoints.auth_base_url.trim().is_empty()
        {
            return Err(GatewayError::Config("gateway base URLs must not be empty".into()));
        }
        Ok(())
    }
}

/// Application credentials issued by the gateway
#[derive(Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CredentialsConfig {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
}

impl std::fmt::Debug for CredentialsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialsConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &self.client_secret.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EndpointsConfig {
    pub api_base_url: String,
    pub auth_base_url: String,
}

impl Default for EndpointsConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            auth_base_url: DEFAULT_AUTH_BASE_URL.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HttpConfig {
    pub timeout_seconds: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self { timeout_seconds: DEFAULT_HTTP_TIMEOUT_SECS }
    }
}

/// Token lifecycle tuning
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenConfig {
    /// Seconds before expiry at which a cached token is refreshed
    pub refresh_skew_seconds: u64,
    /// Upper bound for a single exchange/refresh call
    pub remote_timeout_seconds: u64,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            refresh_skew_seconds: DEFAULT_REFRESH_SKEW_SECS,
            remote_timeout_seconds: DEFAULT_REMOTE_TIMEOUT_SECS,
        }
    }
}

/// Pending authorization attempts
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StateConfig {
    pub ttl_seconds: u64,
    pub max_capacity: u64,
}

impl Default for StateConfig {
    fn default() -> Self {
        Self { ttl_seconds: DEFAULT_STATE_TTL_SECS, max_capacity: DEFAULT_STATE_MAX_CAPACITY }
    }
}

/// Durable token storage; `None` keeps tokens in memory only
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct StorageConfig {
    pub database_path: Option<String>,
}
