//! OAuth 2.0 + PKCE token lifecycle for the payment gateway
//!
//! Issues and refreshes access tokens on behalf of many merchants that have
//! granted this application access through the gateway's authorization
//! page.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │  OAuthService   │  Handshake orchestrator
//! └────────┬────────┘
//!          │
//!          ├──► StateTokenService        (signed state + verifier by state)
//!          │         │
//!          │         └──► VerifierStore  (TTL-bounded)
//!          │
//!          └──► TokenLifecycleManager    (exchange, refresh, single-flight)
//!                    │
//!                    ├──► TokenEndpoint     (GatewayOAuthClient)
//!                    ├──► TokenStore        (in-memory / durable)
//!                    └──► CredentialSource  (read on every call)
//! ```
//!
//! # Usage Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use mpauth_common::auth::{
//!     EnvCredentialSource, GatewayEndpoints, GatewayOAuthClient, InMemoryTokenStore,
//!     OAuthService, StateTokenService, TokenLifecycleManager, DEFAULT_HTTP_TIMEOUT,
//! };
//!
//! # async fn example() -> Result<(), mpauth_common::auth::AuthError> {
//! let client = GatewayOAuthClient::new(GatewayEndpoints::default(), DEFAULT_HTTP_TIMEOUT)?;
//! let manager = TokenLifecycleManager::new(
//!     Arc::new(client),
//!     Arc::new(InMemoryTokenStore::new()),
//!     Arc::new(EnvCredentialSource::default()),
//! );
//! let service = OAuthService::new(
//!     StateTokenService::in_memory("state-signing-key")?,
//!     Arc::new(manager),
//! );
//!
//! let request = service.start_authorization("https://shop.example/oauth/callback")?;
//! // redirect the merchant to request.url, then on callback:
//! service
//!     .complete_authorization("merchant-42", "TG-code", &request.state, "https://shop.example/oauth/callback")
//!     .await?;
//!
//! let access_token = service.get_access_token("merchant-42").await?;
//! # let _ = access_token;
//! # Ok(())
//! # }
//! ```
//!
//! # Module Organization
//!
//! - **[`pkce`]**: verifier/challenge generation
//! - **[`state`]**: signed state values and pending attempts
//! - **[`client`]**: HTTP client for the token endpoint
//! - **[`token_manager`]**: per-user token lifecycle
//! - **[`service`]**: handshake orchestrator
//! - **[`store`]**, **[`credentials`]**: default trait implementations

#[cfg(feature = "runtime")]
pub mod client;
#[cfg(feature = "runtime")]
pub mod credentials;
pub mod error;
pub mod pkce;
#[cfg(feature = "runtime")]
pub mod service;
#[cfg(feature = "runtime")]
pub mod state;
#[cfg(feature = "runtime")]
pub mod store;
#[cfg(feature = "runtime")]
pub mod token_manager;
#[cfg(feature = "runtime")]
pub mod traits;
pub mod types;

#[cfg(feature = "runtime")]
pub use client::{GatewayOAuthClient, DEFAULT_HTTP_TIMEOUT};
#[cfg(feature = "runtime")]
pub use credentials::{EnvCredentialSource, SharedCredentials};
pub use error::{AuthError, AuthResult};
pub use pkce::{generate_code_challenge, generate_code_verifier, PkcePair, DEFAULT_VERIFIER_LENGTH};
#[cfg(feature = "runtime")]
pub use service::OAuthService;
#[cfg(feature = "runtime")]
pub use state::{InMemoryVerifierStore, StateTokenService, VerifierStoreConfig};
#[cfg(feature = "runtime")]
pub use store::InMemoryTokenStore;
#[cfg(feature = "runtime")]
pub use token_manager::{TokenLifecycleManager, TokenManagerConfig};
#[cfg(feature = "runtime")]
pub use traits::{AccessTokenProvider, CredentialSource, TokenEndpoint, TokenStore, VerifierStore};
pub use types::{
    AuthorizationRequest, ClientCredentials, GatewayEndpoints, TokenRecord, TokenResponse,
};
