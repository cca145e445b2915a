//! Integration tests for the auth module
//!
//! Drives the OAuth + PKCE handshake and the token lifecycle against a
//! wiremock gateway.

#![cfg(feature = "runtime")]

use std::sync::{Arc, Once};
use std::time::Duration;

use chrono::Utc;
use futures::future::join_all;
use mpauth_common::auth::{
    generate_code_challenge, AuthError, ClientCredentials, GatewayEndpoints, GatewayOAuthClient,
    InMemoryTokenStore, OAuthService, SharedCredentials, StateTokenService, TokenLifecycleManager,
    TokenManagerConfig, TokenRecord, TokenStore,
};
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

type Manager = TokenLifecycleManager<GatewayOAuthClient, InMemoryTokenStore, SharedCredentials>;

fn disable_proxy() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        std::env::set_var("MPAUTH_DISABLE_PROXY", "1");
    });
}

fn manager_for(
    server: &MockServer,
    remote_timeout: Duration,
) -> (Arc<Manager>, Arc<InMemoryTokenStore>) {
    disable_proxy();
    let client = GatewayOAuthClient::new(
        GatewayEndpoints::new(server.uri(), "https://auth.example.test"),
        Duration::from_secs(5),
    )
    .expect("client");
    let store = Arc::new(InMemoryTokenStore::new());
    let manager = TokenLifecycleManager::with_config(
        Arc::new(client),
        Arc::clone(&store),
        Arc::new(SharedCredentials::new(ClientCredentials::new("app-id", "app-secret"))),
        TokenManagerConfig { refresh_skew: Duration::from_secs(300), remote_timeout },
    );
    (Arc::new(manager), store)
}

fn stored(age_seconds: i64, expires_in: i64) -> TokenRecord {
    TokenRecord {
        access_token: "APP_USR-old".to_string(),
        refresh_token: Some("TG-old-refresh".to_string()),
        token_type: "Bearer".to_string(),
        expires_in,
        scope: Some("offline_access read write".to_string()),
        remote_user_id: Some(555),
        obtained_at: Utc::now() - chrono::Duration::seconds(age_seconds),
    }
}

fn token_body(access: &str, refresh: &str) -> serde_json::Value {
    json!({
        "access_token": access,
        "token_type": "Bearer",
        "expires_in": 21600,
        "scope": "offline_access read write",
        "user_id": 555,
        "refresh_token": refresh,
    })
}

/// Validates the full authorization handshake against the gateway.
///
/// # Test Steps
/// 1. Start an authorization and read the PKCE challenge from the URL
/// 2. Mock the token endpoint to accept only the matching verifier
/// 3. Complete the callback and read the access token back
#[tokio::test(flavor = "multi_thread")]
async fn test_authorization_handshake_end_to_end() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    let (manager, _) = manager_for(&server, Duration::from_secs(5));
    let service = OAuthService::new(StateTokenService::in_memory("signing-key")?, manager);

    let request = service.start_authorization("https://shop.example/cb")?;
    assert!(request.url.starts_with("https://auth.example.test/authorization?client_id=app-id"));
    assert!(request.url.contains("redirect_uri=https%3A%2F%2Fshop.example%2Fcb"));
    assert!(request.url.contains("platform_id=mp"));

    let verifier = service.states().get(&request.state).expect("verifier saved");
    let challenge = generate_code_challenge(&verifier);
    assert!(request.url.contains(&format!("code_challenge={challenge}")));

    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .and(body_partial_json(json!({
            "grant_type": "authorization_code",
            "client_id": "app-id",
            "client_secret": "app-secret",
            "code": "TG-auth-code",
            "redirect_uri": "https://shop.example/cb",
            "code_verifier": verifier,
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("APP_USR-new", "TG-r1")))
        .expect(1)
        .mount(&server)
        .await;

    let record = service
        .complete_authorization(
            "merchant-1",
            "TG-auth-code",
            &request.state,
            "https://shop.example/cb",
        )
        .await?;
    assert_eq!(record.remote_user_id, Some(555));
    assert!(service.states().get(&request.state).is_none());

    assert_eq!(service.get_access_token("merchant-1").await?, "APP_USR-new");
    Ok(())
}

/// Validates that a fresh token is served from the store.
///
/// # Test Steps
/// 1. Store a record obtained one second ago
/// 2. Request a token with the token endpoint expecting no calls
#[tokio::test(flavor = "multi_thread")]
async fn test_fresh_token_does_not_hit_gateway() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("unused", "unused")))
        .expect(0)
        .mount(&server)
        .await;
    let (manager, store) = manager_for(&server, Duration::from_secs(5));
    store.put("merchant-1", stored(1, 3600)).await.unwrap();

    assert_eq!(manager.get_valid_access_token("merchant-1").await.unwrap(), "APP_USR-old");
}

/// Validates single-flight refresh across concurrent callers.
///
/// # Test Steps
/// 1. Store a record with 4 seconds left (inside the 5 minute skew)
/// 2. Fire 12 concurrent requests at a slow token endpoint
/// 3. Verify one refresh call and one consistent token for everyone
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_refresh_hits_gateway_once() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .and(body_partial_json(json!({
            "grant_type": "refresh_token",
            "refresh_token": "TG-old-refresh",
            "client_id": "app-id",
            "client_secret": "app-secret",
        })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(token_body("APP_USR-refreshed", "TG-new-refresh"))
                .set_delay(Duration::from_millis(200)),
        )
        .expect(1)
        .mount(&server)
        .await;
    let (manager, store) = manager_for(&server, Duration::from_secs(5));
    store.put("merchant-1", stored(3596, 3600)).await.unwrap();

    let calls = (0..12).map(|_| {
        let manager = Arc::clone(&manager);
        tokio::spawn(async move { manager.get_valid_access_token("merchant-1").await })
    });
    for result in join_all(calls).await {
        assert_eq!(result.unwrap().unwrap(), "APP_USR-refreshed");
    }

    let record = store.get("merchant-1").await.unwrap().unwrap();
    assert_eq!(record.refresh_token.as_deref(), Some("TG-new-refresh"));
    assert_eq!(record.expires_in, 21600);
}

/// Validates that gateway rejections surface with the raw body.
///
/// # Test Steps
/// 1. Mock a 400 `invalid_grant` response
/// 2. Verify a Remote error with status and body, and the stale token kept
#[tokio::test(flavor = "multi_thread")]
async fn test_rejected_refresh_is_remote_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(
            ResponseTemplate::new(400)
                .set_body_string(r#"{"error":"invalid_grant","message":"invalid refresh_token"}"#),
        )
        .mount(&server)
        .await;
    let (manager, store) = manager_for(&server, Duration::from_secs(5));
    store.put("merchant-1", stored(3596, 3600)).await.unwrap();

    let err = manager.get_valid_access_token("merchant-1").await.unwrap_err();
    match err {
        AuthError::Remote { status, body } => {
            assert_eq!(status, Some(400));
            assert!(body.contains("invalid_grant"));
        }
        other => panic!("expected remote error, got {other:?}"),
    }
    assert_eq!(store.get("merchant-1").await.unwrap().unwrap().access_token, "APP_USR-old");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_empty_success_body_is_remote_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    let (manager, _) = manager_for(&server, Duration::from_secs(5));
    let creds = ClientCredentials::new("app-id", "app-secret");

    let err = manager.refresh_access_token(&creds, "TG-old-refresh").await.unwrap_err();
    assert!(matches!(err, AuthError::Remote { status: Some(200), .. }), "got {err:?}");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_malformed_success_body_is_decode_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount(&server)
        .await;
    let (manager, _) = manager_for(&server, Duration::from_secs(5));
    let creds = ClientCredentials::new("app-id", "app-secret");

    let err = manager
        .exchange_code_for_token(&creds, "TG-code", "https://cb", "verifier")
        .await
        .unwrap_err();
    match &err {
        AuthError::Decode { body, .. } => assert!(body.contains("maintenance")),
        other => panic!("expected decode error, got {other:?}"),
    }
    assert!(err.is_remote());
}

/// Validates that a hung gateway releases the refresh gate.
///
/// # Test Steps
/// 1. Delay the token endpoint past the manager's remote timeout
/// 2. Verify a Remote error without status, twice in a row
#[tokio::test(flavor = "multi_thread")]
async fn test_slow_gateway_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(token_body("late", "late"))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;
    let (manager, store) = manager_for(&server, Duration::from_millis(100));
    store.put("merchant-1", stored(3596, 3600)).await.unwrap();

    for _ in 0..2 {
        let err = manager.get_valid_access_token("merchant-1").await.unwrap_err();
        assert!(matches!(err, AuthError::Remote { status: None, .. }), "got {err:?}");
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn test_unknown_user_is_unauthorized() {
    let server = MockServer::start().await;
    let (manager, _) = manager_for(&server, Duration::from_secs(5));

    let err = manager.get_valid_access_token("nobody").await.unwrap_err();
    assert_eq!(err, AuthError::Unauthorized("no tokens for user".to_string()));
}
