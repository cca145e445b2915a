//! Error types used throughout the application

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for gateway operations
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum GatewayError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Network error: {0}")]
    Network(String),

    /// The gateway answered with a non-success status (or an empty body).
    #[error("Gateway returned {status}: {body}")]
    Remote { status: u16, body: String },

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl GatewayError {
    /// True when the failure originated at (or on the way to) the gateway.
    pub fn is_remote(&self) -> bool {
        matches!(self, Self::Remote { .. } | Self::Network(_) | Self::Decode(_))
    }
}

/// Result type alias for gateway operations
pub type Result<T> = std::result::Result<T, GatewayError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_error_serializes_with_type_tag() {
        let err = GatewayError::Remote { status: 400, body: "bad".into() };
        let json = serde_json::to_value(&err).unwrap();

        assert_eq!(json["type"], "Remote");
        assert_eq!(json["message"]["status"], 400);
        assert_eq!(json["message"]["body"], "bad");
    }

    #[test]
    fn display_includes_status_and_body() {
        let err = GatewayError::Remote { status: 503, body: "down".into() };
        assert_eq!(err.to_string(), "Gateway returned 503: down");
        assert!(err.is_remote());
        assert!(!GatewayError::Config("x".into()).is_remote());
    }
}
