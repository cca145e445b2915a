//! Error taxonomy for the OAuth token lifecycle

use thiserror::Error;

/// Failures surfaced by the auth core.
///
/// `Clone` so that a failed refresh can be handed to every caller that was
/// waiting on the same per-user refresh gate.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AuthError {
    /// Required credential or secret is missing. Not retried.
    #[error("configuration error: {0}")]
    Config(String),

    /// No usable token material for the user.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Non-success status, empty body, transport failure or timeout.
    ///
    /// `status` is `None` when no HTTP response was received.
    #[error("gateway request failed (status {status:?}): {body}")]
    Remote { status: Option<u16>, body: String },

    /// A success response that does not match the expected shape.
    #[error("failed to decode gateway response: {message}")]
    Decode { message: String, body: String },

    /// Token or verifier backend failure.
    #[error("storage error: {0}")]
    Storage(String),
}

impl AuthError {
    /// Shorthand for [`AuthError::Unauthorized`]
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized(message.into())
    }

    /// Shorthand for [`AuthError::Config`]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Decode failures are protocol violations by the gateway, so they count
    /// as remote failures too.
    #[must_use]
    pub fn is_remote(&self) -> bool {
        matches!(self, Self::Remote { .. } | Self::Decode { .. })
    }

    /// `true` for [`AuthError::Unauthorized`]
    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized(_))
    }
}

/// Result alias for auth operations
pub type AuthResult<T> = Result<T, AuthError>;
