//! Wiring of the auth core and payment client from a [`GatewayConfig`]
//!
//! Token storage is SQLite when `storage.database_path` is set and
//! in-memory otherwise. Client credentials come from the configuration when
//! both values are present (rotatable through [`Gateway::credentials`]) and
//! from the `MERCADOPAGO_CLIENT_*` environment variables otherwise, read at
//! every exchange and refresh.

use std::sync::Arc;
use std::time::Duration;

use mpauth_common::auth::{
    ClientCredentials, CredentialSource, EnvCredentialSource, GatewayEndpoints, GatewayOAuthClient,
    InMemoryTokenStore, InMemoryVerifierStore, OAuthService, SharedCredentials,
    StateTokenService, TokenLifecycleManager, TokenManagerConfig, TokenStore,
    VerifierStoreConfig,
};
use mpauth_domain::{GatewayConfig, Result as DomainResult};
use tracing::info;

use crate::database::SqliteTokenStore;
use crate::errors::InfraError;
use crate::http::HttpClient;
use crate::payments::PaymentClient;

/// Lifecycle manager wired with the gateway client and dynamic store
pub type GatewayTokenManager =
    TokenLifecycleManager<GatewayOAuthClient, dyn TokenStore, dyn CredentialSource>;

/// OAuth service wired the same way as [`GatewayTokenManager`]
pub type GatewayOAuthService =
    OAuthService<GatewayOAuthClient, dyn TokenStore, dyn CredentialSource>;

/// Fully wired gateway integration
#[derive(Debug)]
pub struct Gateway {
    oauth: Arc<GatewayOAuthService>,
    payments: PaymentClient<GatewayOAuthService>,
    credentials: Option<SharedCredentials>,
}

impl Gateway {
    /// Build everything from configuration with a default HTTP client.
    ///
    /// # Errors
    /// Returns `GatewayError::Config` for invalid configuration and
    /// `GatewayError::Database` if the token database cannot be opened.
    pub fn from_config(config: &GatewayConfig) -> DomainResult<Self> {
        let http = HttpClient::builder()
            .timeout(Duration::from_secs(config.http.timeout_seconds))
            .build()?;
        Self::with_http_client(config, http)
    }

    /// Build everything from configuration, sharing `http` between the token
    /// endpoint client and the payment client.
    pub fn with_http_client(config: &GatewayConfig, http: HttpClient) -> DomainResult<Self> {
        config.validate()?;

        let endpoints = GatewayEndpoints::new(
            config.endpoints.api_base_url.clone(),
            config.endpoints.auth_base_url.clone(),
        );
        let endpoint = Arc::new(GatewayOAuthClient::with_client(endpoints, http.inner().clone()));

        let store: Arc<dyn TokenStore> = match &config.storage.database_path {
            Some(path) => {
                info!(db_path = %path, "using SQLite token store");
                Arc::new(SqliteTokenStore::open(path)?)
            }
            None => {
                info!("using in-memory token store");
                Arc::new(InMemoryTokenStore::new())
            }
        };

        let shared = match (&config.credentials.client_id, &config.credentials.client_secret) {
            (Some(id), Some(secret)) => {
                Some(SharedCredentials::new(ClientCredentials::new(id.clone(), secret.clone())))
            }
            _ => None,
        };
        let credentials: Arc<dyn CredentialSource> = match &shared {
            Some(shared) => Arc::new(shared.clone()),
            None => Arc::new(EnvCredentialSource::default()),
        };

        let manager: Arc<GatewayTokenManager> = Arc::new(TokenLifecycleManager::with_config(
            endpoint,
            store,
            credentials,
            TokenManagerConfig {
                refresh_skew: Duration::from_secs(config.tokens.refresh_skew_seconds),
                remote_timeout: Duration::from_secs(config.tokens.remote_timeout_seconds),
            },
        ));

        let verifiers = InMemoryVerifierStore::new(&VerifierStoreConfig {
            ttl: Duration::from_secs(config.state.ttl_seconds),
            max_capacity: config.state.max_capacity,
        });
        let states = StateTokenService::new(&config.state_signing_key, Arc::new(verifiers))
            .map_err(InfraError::from)?;

        let oauth = Arc::new(OAuthService::new(states, manager));
        let payments =
            PaymentClient::new(http, config.endpoints.api_base_url.clone(), Arc::clone(&oauth));

        Ok(Self { oauth, payments, credentials: shared })
    }

    /// Authorization handshake and token lifecycle
    pub fn oauth(&self) -> &Arc<GatewayOAuthService> {
        &self.oauth
    }

    /// Payment client authorised through this gateway's tokens
    pub fn payments(&self) -> &PaymentClient<GatewayOAuthService> {
        &self.payments
    }

    /// Rotation handle, present when credentials came from configuration.
    pub fn credentials(&self) -> Option<&SharedCredentials> {
        self.credentials.as_ref()
    }

    /// Token store backing the lifecycle manager
    pub fn token_store(&self) -> &Arc<dyn TokenStore> {
        self.oauth.token_manager().store()
    }
}

#[cfg(test)]
mod tests {
    use mpauth_domain::{CredentialsConfig, GatewayError, StorageConfig};
    use tempfile::TempDir;

    use super::*;

    fn config() -> GatewayConfig {
        GatewayConfig {
            credentials: CredentialsConfig {
                client_id: Some("app-1".into()),
                client_secret: Some("secret-1".into()),
            },
            state_signing_key: "signing-key".into(),
            endpoints: Default::default(),
            http: Default::default(),
            tokens: Default::default(),
            state: Default::default(),
            storage: StorageConfig::default(),
        }
    }

    #[test]
    fn configured_credentials_are_rotatable() {
        let gateway = Gateway::from_config(&config()).unwrap();

        let handle = gateway.credentials().expect("shared credentials");
        handle.rotate(ClientCredentials::new("app-2", "secret-2"));

        let current = gateway.oauth().token_manager().client_credentials().unwrap();
        assert_eq!(current.client_id, "app-2");
    }

    #[test]
    fn missing_credentials_fall_back_to_environment_source() {
        let mut config = config();
        config.credentials = CredentialsConfig::default();

        let gateway = Gateway::from_config(&config).unwrap();
        assert!(gateway.credentials().is_none());
    }

    #[test]
    fn empty_signing_key_is_rejected() {
        let mut config = config();
        config.state_signing_key = String::new();

        assert!(matches!(Gateway::from_config(&config), Err(GatewayError::Config(_))));
    }

    #[test]
    fn authorization_url_uses_configured_hosts() {
        let mut config = config();
        config.endpoints.auth_base_url = "https://auth.example.test".into();

        let gateway = Gateway::from_config(&config).unwrap();
        let request = gateway.oauth().start_authorization("https://shop.example/cb").unwrap();

        assert!(request.url.starts_with("https://auth.example.test/authorization?client_id=app-1"));
    }

    #[tokio::test]
    async fn database_path_selects_sqlite_store() {
        let dir = TempDir::new().unwrap();
        let mut config = config();
        config.storage.database_path =
            Some(dir.path().join("tokens.db").to_string_lossy().into_owned());

        let gateway = Gateway::from_config(&config).unwrap();
        assert!(gateway.token_store().get("nobody").await.unwrap().is_none());
        assert!(dir.path().join("tokens.db").exists());
    }
}
