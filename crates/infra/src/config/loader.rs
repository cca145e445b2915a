//! Configuration loader
//!
//! Loads gateway configuration from environment variables or files.
//!
//! ## Loading Strategy
//! 1. First, attempts to load from environment variables
//! 2. If the signing key is absent, falls back to loading from file
//! 3. Probes multiple paths for config files
//! 4. Supports JSON and TOML formats
//!
//! ## Environment Variables
//! - `MERCADOPAGO_STATE_SIGNING_KEY`: HMAC key for state tokens (required)
//! - `MERCADOPAGO_CLIENT_ID` / `MERCADOPAGO_CLIENT_SECRET`: application
//!   credentials
//! - `MERCADOPAGO_API_BASE_URL` / `MERCADOPAGO_AUTH_BASE_URL`: gateway hosts
//! - `MERCADOPAGO_HTTP_TIMEOUT_SECS`: per-request HTTP timeout
//! - `MERCADOPAGO_REFRESH_SKEW_SECS`: refresh this long before expiry
//! - `MERCADOPAGO_REMOTE_TIMEOUT_SECS`: bound on a single exchange/refresh
//! - `MERCADOPAGO_STATE_TTL_SECS`: lifetime of a pending authorization
//! - `MERCADOPAGO_STATE_MAX_CAPACITY`: max pending authorizations
//! - `MERCADOPAGO_TOKEN_DB_PATH`: SQLite token database (optional)
//!
//! ## File Locations
//! The loader probes the following paths (in order):
//! 1. `./config.json` or `./config.toml` (current working directory)
//! 2. `./mpauth.json` or `./mpauth.toml` (current working directory)
//! 3. `../config.json` or `../config.toml` (parent directory)
//! 4. `../../config.json` or `../../config.toml` (grandparent directory)
//! 5. Relative to executable location

use std::path::{Path, PathBuf};

use mpauth_domain::constants::{ENV_CLIENT_ID, ENV_CLIENT_SECRET, ENV_STATE_SIGNING_KEY};
use mpauth_domain::{
    CredentialsConfig, EndpointsConfig, GatewayConfig, GatewayError, HttpConfig, Result,
    StateConfig, StorageConfig, TokenConfig,
};

pub const ENV_API_BASE_URL: &str = "MERCADOPAGO_API_BASE_URL";
pub const ENV_AUTH_BASE_URL: &str = "MERCADOPAGO_AUTH_BASE_URL";
pub const ENV_HTTP_TIMEOUT: &str = "MERCADOPAGO_HTTP_TIMEOUT_SECS";
pub const ENV_REFRESH_SKEW: &str = "MERCADOPAGO_REFRESH_SKEW_SECS";
pub const ENV_REMOTE_TIMEOUT: &str = "MERCADOPAGO_REMOTE_TIMEOUT_SECS";
pub const ENV_STATE_TTL: &str = "MERCADOPAGO_STATE_TTL_SECS";
pub const ENV_STATE_MAX_CAPACITY: &str = "MERCADOPAGO_STATE_MAX_CAPACITY";
pub const ENV_TOKEN_DB_PATH: &str = "MERCADOPAGO_TOKEN_DB_PATH";

/// Load configuration with automatic fallback strategy
///
/// First attempts to load from environment variables. If the required
/// signing key is missing or a value is malformed, falls back to loading
/// from a config file.
///
/// # Errors
/// Returns `GatewayError::Config` if:
/// - Configuration cannot be loaded from either source
/// - File format is invalid
/// - Required fields are missing
pub fn load() -> Result<GatewayConfig> {
    match load_from_env() {
        Ok(config) => {
            tracing::info!("Configuration loaded from environment variables");
            Ok(config)
        }
        Err(e) => {
            tracing::debug!(error = ?e, "Failed to load from environment, trying file");
            load_from_file(None)
        }
    }
}

/// Load configuration from environment variables
///
/// Only the signing key is required; every other value falls back to the
/// defaults of [`GatewayConfig`].
///
/// # Errors
/// Returns `GatewayError::Config` if the signing key is missing or a numeric
/// variable cannot be parsed.
pub fn load_from_env() -> Result<GatewayConfig> {
    let state_signing_key = env_var(ENV_STATE_SIGNING_KEY)?;

    let credentials = CredentialsConfig {
        client_id: env_opt(ENV_CLIENT_ID),
        client_secret: env_opt(ENV_CLIENT_SECRET),
    };

    let endpoint_defaults = EndpointsConfig::default();
    let endpoints = EndpointsConfig {
        api_base_url: env_opt(ENV_API_BASE_URL).unwrap_or(endpoint_defaults.api_base_url),
        auth_base_url: env_opt(ENV_AUTH_BASE_URL).unwrap_or(endpoint_defaults.auth_base_url),
    };

    let http_defaults = HttpConfig::default();
    let token_defaults = TokenConfig::default();
    let state_defaults = StateConfig::default();

    let config = GatewayConfig {
        credentials,
        state_signing_key,
        endpoints,
        http: HttpConfig {
            timeout_seconds: env_u64(ENV_HTTP_TIMEOUT, http_defaults.timeout_seconds)?,
        },
        tokens: TokenConfig {
            refresh_skew_seconds: env_u64(ENV_REFRESH_SKEW, token_defaults.refresh_skew_seconds)?,
            remote_timeout_seconds: env_u64(
                ENV_REMOTE_TIMEOUT,
                token_defaults.remote_timeout_seconds,
            )?,
        },
        state: StateConfig {
            ttl_seconds: env_u64(ENV_STATE_TTL, state_defaults.ttl_seconds)?,
            max_capacity: env_u64(ENV_STATE_MAX_CAPACITY, state_defaults.max_capacity)?,
        },
        storage: StorageConfig { database_path: env_opt(ENV_TOKEN_DB_PATH) },
    };

    config.validate()?;
    Ok(config)
}

/// Load configuration from a file
///
/// If `path` is `None`, probes multiple locations for config files.
/// Supports both JSON and TOML formats (detected by file extension).
///
/// # Errors
/// Returns `GatewayError::Config` if:
/// - File not found (when path is specified)
/// - No config file found (when path is `None`)
/// - File format is invalid
/// - The loaded configuration fails validation
pub fn load_from_file(path: Option<PathBuf>) -> Result<GatewayConfig> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(GatewayError::Config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            GatewayError::Config("No config file found in any of the standard locations".into())
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| GatewayError::Config(format!("Failed to read config file: {}", e)))?;

    let config = parse_config(&contents, &config_path)?;
    config.validate()?;
    Ok(config)
}

/// Parse configuration from string content
///
/// Format is detected by file extension (`.json` or `.toml`).
fn parse_config(contents: &str, path: &Path) -> Result<GatewayConfig> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| GatewayError::Config(format!("Invalid TOML format: {}", e))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| GatewayError::Config(format!("Invalid JSON format: {}", e))),
        _ => Err(GatewayError::Config(format!("Unsupported config format: {}", extension))),
    }
}

/// Probe multiple paths for configuration files
///
/// Searches the working directory, its two parents, and the executable's
/// directory. Returns the first file that exists.
pub fn probe_config_paths() -> Option<PathBuf> {
    let mut candidates = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        candidates.extend(candidate_files(&cwd));
    }

    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            candidates.extend(candidate_files(exe_dir));
        }
    }

    candidates.into_iter().find(|path| path.exists())
}

fn candidate_files(base: &Path) -> Vec<PathBuf> {
    vec![
        base.join("config.json"),
        base.join("config.toml"),
        base.join("mpauth.json"),
        base.join("mpauth.toml"),
        base.join("../config.json"),
        base.join("../config.toml"),
        base.join("../../config.json"),
        base.join("../../config.toml"),
    ]
}

/// Get required environment variable
///
/// # Errors
/// Returns `GatewayError::Config` if the variable is not set or blank.
fn env_var(key: &str) -> Result<String> {
    env_opt(key).ok_or_else(|| {
        GatewayError::Config(format!("Missing required environment variable: {}", key))
    })
}

/// Optional environment variable; blank values count as unset.
fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn env_u64(key: &str, default: u64) -> Result<u64> {
    match env_opt(key) {
        Some(raw) => raw
            .trim()
            .parse::<u64>()
            .map_err(|e| GatewayError::Config(format!("Invalid value for {}: {}", key, e))),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::sync::Mutex;

    use once_cell::sync::Lazy;
    use tempfile::NamedTempFile;

    use super::*;

    static ENV_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

    const ALL_VARS: [&str; 11] = [
        ENV_STATE_SIGNING_KEY,
        ENV_CLIENT_ID,
        ENV_CLIENT_SECRET,
        ENV_API_BASE_URL,
        ENV_AUTH_BASE_URL,
        ENV_HTTP_TIMEOUT,
        ENV_REFRESH_SKEW,
        ENV_REMOTE_TIMEOUT,
        ENV_STATE_TTL,
        ENV_STATE_MAX_CAPACITY,
        ENV_TOKEN_DB_PATH,
    ];

    fn clear_env() {
        for key in ALL_VARS {
            std::env::remove_var(key);
        }
    }

    fn write_temp(contents: &str, extension: &str) -> PathBuf {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(contents.as_bytes()).unwrap();
        let path = temp_file.path().with_extension(extension);
        std::fs::copy(temp_file.path(), &path).unwrap();
        path
    }

    #[test]
    fn test_load_from_env_all_vars_set() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_env();

        std::env::set_var(ENV_STATE_SIGNING_KEY, "signing-key");
        std::env::set_var(ENV_CLIENT_ID, "app-123");
        std::env::set_var(ENV_CLIENT_SECRET, "secret");
        std::env::set_var(ENV_API_BASE_URL, "http://127.0.0.1:9000");
        std::env::set_var(ENV_HTTP_TIMEOUT, "5");
        std::env::set_var(ENV_REFRESH_SKEW, "120");
        std::env::set_var(ENV_REMOTE_TIMEOUT, "10");
        std::env::set_var(ENV_STATE_TTL, "60");
        std::env::set_var(ENV_STATE_MAX_CAPACITY, "500");
        std::env::set_var(ENV_TOKEN_DB_PATH, "/tmp/tokens.db");

        let result = load_from_env();
        assert!(result.is_ok(), "Should load config from env vars, error: {:?}", result.err());

        let config = result.unwrap();
        assert_eq!(config.state_signing_key, "signing-key");
        assert_eq!(config.credentials.client_id.as_deref(), Some("app-123"));
        assert_eq!(config.credentials.client_secret.as_deref(), Some("secret"));
        assert_eq!(config.endpoints.api_base_url, "http://127.0.0.1:9000");
        assert_eq!(config.endpoints.auth_base_url, EndpointsConfig::default().auth_base_url);
        assert_eq!(config.http.timeout_seconds, 5);
        assert_eq!(config.tokens.refresh_skew_seconds, 120);
        assert_eq!(config.tokens.remote_timeout_seconds, 10);
        assert_eq!(config.state.ttl_seconds, 60);
        assert_eq!(config.state.max_capacity, 500);
        assert_eq!(config.storage.database_path.as_deref(), Some("/tmp/tokens.db"));

        clear_env();
    }

    #[test]
    fn test_load_from_env_defaults() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_env();
        std::env::set_var(ENV_STATE_SIGNING_KEY, "signing-key");

        let config = load_from_env().unwrap();
        assert_eq!(config.tokens, TokenConfig::default());
        assert_eq!(config.state, StateConfig::default());
        assert!(config.credentials.client_id.is_none());
        assert!(config.storage.database_path.is_none());

        clear_env();
    }

    #[test]
    fn test_load_from_env_missing_signing_key() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_env();
        std::env::set_var(ENV_CLIENT_ID, "app-123");

        let err = load_from_env().unwrap_err();
        assert!(
            matches!(err, GatewayError::Config(ref msg) if msg.contains(ENV_STATE_SIGNING_KEY))
        );

        clear_env();
    }

    #[test]
    fn test_load_from_env_invalid_number() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_env();
        std::env::set_var(ENV_STATE_SIGNING_KEY, "signing-key");
        std::env::set_var(ENV_REFRESH_SKEW, "five minutes");

        let err = load_from_env().unwrap_err();
        assert!(matches!(err, GatewayError::Config(ref msg) if msg.contains(ENV_REFRESH_SKEW)));

        clear_env();
    }

    #[test]
    fn test_load_from_file_json() {
        let path = write_temp(
            r#"{
                "state_signing_key": "file-key",
                "credentials": { "client_id": "app-1", "client_secret": "s" },
                "tokens": { "refresh_skew_seconds": 60, "remote_timeout_seconds": 15 }
            }"#,
            "json",
        );

        let config = load_from_file(Some(path.clone())).unwrap();
        assert_eq!(config.state_signing_key, "file-key");
        assert_eq!(config.tokens.refresh_skew_seconds, 60);
        assert_eq!(config.tokens.remote_timeout_seconds, 15);
        assert_eq!(config.http, HttpConfig::default());

        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_load_from_file_toml() {
        let path = write_temp(
            r#"
state_signing_key = "toml-key"

[endpoints]
api_base_url = "https://api.example.test"
auth_base_url = "https://auth.example.test"

[storage]
database_path = "tokens.db"
"#,
            "toml",
        );

        let config = load_from_file(Some(path.clone())).unwrap();
        assert_eq!(config.endpoints.api_base_url, "https://api.example.test");
        assert_eq!(config.storage.database_path.as_deref(), Some("tokens.db"));

        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_load_from_file_rejects_empty_signing_key() {
        let path = write_temp(r#"{ "state_signing_key": "  " }"#, "json");

        let err = load_from_file(Some(path.clone())).unwrap_err();
        assert!(matches!(err, GatewayError::Config(_)));

        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_load_from_file_not_found() {
        let result = load_from_file(Some(PathBuf::from("/nonexistent/config.json")));
        assert!(matches!(result, Err(GatewayError::Config(_))), "Should be a Config error");
    }

    #[test]
    fn test_load_from_file_invalid_json() {
        let path = write_temp(r#"{ "this is": "not valid json" "#, "json");

        let result = load_from_file(Some(path.clone()));
        assert!(result.is_err(), "Should fail with invalid JSON");

        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_parse_config_unsupported_extension() {
        let result = parse_config("state_signing_key: k", Path::new("config.yaml"));
        assert!(matches!(result, Err(GatewayError::Config(ref msg)) if msg.contains("yaml")));
    }
}
