#![allow(dead_code)]

use std::path::PathBuf;

use chrono::Utc;
use mpauth_common::auth::TokenRecord;
use mpauth_domain::{CredentialsConfig, EndpointsConfig, GatewayConfig, StorageConfig};
use mpauth_infra::{Gateway, HttpClient};
use tempfile::TempDir;
use wiremock::MockServer;

pub const MERCHANT: &str = "merchant-42";

/// Gateway wired against a wiremock server with a SQLite token store that
/// lives as long as this value.
pub struct TestGateway {
    pub gateway: Gateway,
    pub config: GatewayConfig,
    _temp_dir: TempDir,
}

impl TestGateway {
    pub fn new(server: &MockServer) -> Self {
        let temp_dir = TempDir::new().expect("temp dir should be created");
        let config = GatewayConfig {
            credentials: CredentialsConfig {
                client_id: Some("1234567890".into()),
                client_secret: Some("app-secret".into()),
            },
            state_signing_key: "integration-signing-key".into(),
            endpoints: EndpointsConfig {
                api_base_url: server.uri(),
                auth_base_url: "https://auth.example.test".into(),
            },
            http: Default::default(),
            tokens: Default::default(),
            state: Default::default(),
            storage: StorageConfig {
                database_path: Some(
                    temp_dir.path().join("tokens.db").to_string_lossy().into_owned(),
                ),
            },
        };

        let http = HttpClient::builder().no_proxy().build().expect("http client");
        let gateway = Gateway::with_http_client(&config, http).expect("gateway should build");

        Self { gateway, config, _temp_dir: temp_dir }
    }

    pub fn db_path(&self) -> PathBuf {
        PathBuf::from(self.config.storage.database_path.clone().expect("database path"))
    }
}

/// Stored record obtained `age_seconds` ago.
pub fn stored_record(access_token: &str, age_seconds: i64, expires_in: i64) -> TokenRecord {
    TokenRecord {
        access_token: access_token.to_string(),
        refresh_token: Some("TG-stored-refresh".to_string()),
        token_type: "Bearer".to_string(),
        expires_in,
        scope: Some("offline_access read write".to_string()),
        remote_user_id: Some(555),
        obtained_at: Utc::now() - chrono::Duration::seconds(age_seconds),
    }
}
