//! Client credential sources
//!
//! The lifecycle manager asks for credentials on every exchange and refresh,
//! so whichever source is plugged in decides how rotation works.

use std::sync::Arc;

use parking_lot::RwLock;

use super::error::AuthError;
use super::traits::CredentialSource;
use super::types::ClientCredentials;

/// Default variable holding the client id
pub const CLIENT_ID_ENV: &str = "MERCADOPAGO_CLIENT_ID";
/// Default variable holding the client secret
pub const CLIENT_SECRET_ENV: &str = "MERCADOPAGO_CLIENT_SECRET";

fn require(value: Option<String>, name: &str) -> Result<String, AuthError> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| AuthError::config(format!("{name} is not configured")))
}

/// Reads credentials from environment variables at call time
#[derive(Debug, Clone)]
pub struct EnvCredentialSource {
    client_id_var: String,
    client_secret_var: String,
}

impl EnvCredentialSource {
    /// Read from custom variable names
    #[must_use]
    pub fn new(client_id_var: impl Into<String>, client_secret_var: impl Into<String>) -> Self {
        Self { client_id_var: client_id_var.into(), client_secret_var: client_secret_var.into() }
    }
}

impl Default for EnvCredentialSource {
    fn default() -> Self {
        Self::new(CLIENT_ID_ENV, CLIENT_SECRET_ENV)
    }
}

impl CredentialSource for EnvCredentialSource {
    fn client_credentials(&self) -> Result<ClientCredentials, AuthError> {
        let client_id = require(std::env::var(&self.client_id_var).ok(), &self.client_id_var)?;
        let client_secret =
            require(std::env::var(&self.client_secret_var).ok(), &self.client_secret_var)?;
        Ok(ClientCredentials { client_id, client_secret })
    }
}

/// In-process credentials that can be swapped at runtime
///
/// Clones share the same slot, so a rotation through any handle is seen by
/// every manager holding one.
#[derive(Debug, Clone, Default)]
pub struct SharedCredentials {
    inner: Arc<RwLock<Option<ClientCredentials>>>,
}

impl SharedCredentials {
    /// Start with `credentials` configured
    #[must_use]
    pub fn new(credentials: ClientCredentials) -> Self {
        Self { inner: Arc::new(RwLock::new(Some(credentials))) }
    }

    /// Replace the credentials seen by every clone
    pub fn rotate(&self, credentials: ClientCredentials) {
        tracing::info!(client_id = %credentials.client_id, "client credentials rotated");
        *self.inner.write() = Some(credentials);
    }

    /// Unset the credentials; later reads fail with a config error
    pub fn clear(&self) {
        *self.inner.write() = None;
    }
}

impl CredentialSource for SharedCredentials {
    fn client_credentials(&self) -> Result<ClientCredentials, AuthError> {
        let guard = self.inner.read();
        let credentials =
            guard.as_ref().ok_or_else(|| AuthError::config("client credentials are not configured"))?;
        require(Some(credentials.client_id.clone()), "client id")?;
        require(Some(credentials.client_secret.clone()), "client secret")?;
        Ok(credentials.clone())
    }
}
