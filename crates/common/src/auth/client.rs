//! HTTP client for the gateway's OAuth endpoints
//!
//! Handles the two token grants the gateway supports:
//! - Authorization code exchange (with PKCE verifier)
//! - Token refresh
//!
//! Both are JSON POSTs to the same token endpoint. No retries are attempted;
//! retry policy belongs to the caller.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

use super::error::AuthError;
use super::traits::TokenEndpoint;
use super::types::{ClientCredentials, GatewayEndpoints, TokenResponse};

/// Default request timeout for token calls
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Body of a token request; the variant becomes the `grant_type` field
#[derive(Debug, Serialize)]
#[serde(tag = "grant_type", rename_all = "snake_case")]
enum TokenRequest<'a> {
    AuthorizationCode {
        client_id: &'a str,
        client_secret: &'a str,
        code: &'a str,
        redirect_uri: &'a str,
        code_verifier: &'a str,
    },
    RefreshToken {
        client_id: &'a str,
        client_secret: &'a str,
        refresh_token: &'a str,
    },
}

impl TokenRequest<'_> {
    fn grant_type(&self) -> &'static str {
        match self {
            Self::AuthorizationCode { .. } => "authorization_code",
            Self::RefreshToken { .. } => "refresh_token",
        }
    }
}

/// OAuth client for the payment gateway
#[derive(Debug, Clone)]
pub struct GatewayOAuthClient {
    endpoints: GatewayEndpoints,
    client: Client,
}

impl GatewayOAuthClient {
    /// Create a client with its own connection pool
    ///
    /// Set `MPAUTH_DISABLE_PROXY` to bypass system proxy settings.
    ///
    /// # Errors
    /// Returns `AuthError::Config` if the HTTP client cannot be built.
    pub fn new(endpoints: GatewayEndpoints, timeout: Duration) -> Result<Self, AuthError> {
        let builder = Client::builder().timeout(timeout);
        let builder = if std::env::var_os("MPAUTH_DISABLE_PROXY").is_some() {
            builder.no_proxy()
        } else {
            builder
        };
        let client = builder
            .build()
            .map_err(|e| AuthError::config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { endpoints, client })
    }

    /// Reuse an existing `reqwest::Client`
    #[must_use]
    pub fn with_client(endpoints: GatewayEndpoints, client: Client) -> Self {
        Self { endpoints, client }
    }

    /// Endpoints this client talks to
    #[must_use]
    pub fn endpoints(&self) -> &GatewayEndpoints {
        &self.endpoints
    }

    async fn post_token_request(
        &self,
        request: &TokenRequest<'_>,
    ) -> Result<TokenResponse, AuthError> {
        let url = self.endpoints.token_url();
        tracing::debug!(grant_type = request.grant_type(), url = %url, "posting token request");

        let response = self.client.post(&url).json(request).send().await.map_err(transport_error)?;

        let status = response.status();
        let body = response.text().await.map_err(transport_error)?;

        if !status.is_success() {
            tracing::warn!(
                grant_type = request.grant_type(),
                status = status.as_u16(),
                "token endpoint returned an error"
            );
            return Err(AuthError::Remote { status: Some(status.as_u16()), body });
        }

        if body.trim().is_empty() {
            return Err(AuthError::Remote { status: Some(status.as_u16()), body });
        }

        serde_json::from_str(&body)
            .map_err(|e| AuthError::Decode { message: e.to_string(), body })
    }
}

fn transport_error(err: reqwest::Error) -> AuthError {
    AuthError::Remote { status: err.status().map(|s| s.as_u16()), body: err.to_string() }
}

#[async_trait]
impl TokenEndpoint for GatewayOAuthClient {
    fn authorization_url(
        &self,
        client_id: &str,
        redirect_uri: &str,
        state: &str,
        code_challenge: &str,
    ) -> String {
        let params = [
            ("client_id", client_id),
            ("response_type", "code"),
            ("platform_id", "mp"),
            ("state", state),
            ("redirect_uri", redirect_uri),
            ("code_challenge", code_challenge),
            ("code_challenge_method", "S256"),
        ];

        let query_string = params
            .iter()
            .map(|(k, v)| format!("{k}={}", urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&");

        format!("{}?{}", self.endpoints.authorization_url(), query_string)
    }

    async fn exchange_code(
        &self,
        credentials: &ClientCredentials,
        code: &str,
        redirect_uri: &str,
        code_verifier: &str,
    ) -> Result<TokenResponse, AuthError> {
        self.post_token_request(&TokenRequest::AuthorizationCode {
            client_id: &credentials.client_id,
            client_secret: &credentials.client_secret,
            code,
            redirect_uri,
            code_verifier,
        })
        .await
    }

    async fn refresh(
        &self,
        credentials: &ClientCredentials,
        refresh_token: &str,
    ) -> Result<TokenResponse, AuthError> {
        self.post_token_request(&TokenRequest::RefreshToken {
            client_id: &credentials.client_id,
            client_secret: &credentials.client_secret,
            refresh_token,
        })
        .await
    }
}
