//! Signed OAuth state and pending authorization attempts
//!
//! A state value is `raw.signature` where `raw` is 32 random bytes and
//! `signature` is HMAC-SHA256 of `raw` under the configured signing key,
//! both base64url without padding. The state also keys the PKCE verifier
//! saved for the attempt until the callback completes or the TTL lapses.

use std::sync::Arc;
use std::time::Duration;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use hmac::{Hmac, Mac};
use moka::sync::Cache;
use rand::RngCore;
use sha2::Sha256;

use super::error::AuthError;
use super::traits::VerifierStore;

type HmacSha256 = Hmac<Sha256>;

/// Default lifetime of an authorization attempt (10 minutes)
pub const DEFAULT_STATE_TTL_SECONDS: u64 = 600;

/// Default upper bound on concurrently pending attempts
pub const DEFAULT_STATE_MAX_CAPACITY: u64 = 10_000;

const RAW_STATE_BYTES: usize = 32;

/// Verifier store configuration
#[derive(Debug, Clone)]
pub struct VerifierStoreConfig {
    /// Time after which an unused attempt is evicted
    pub ttl: Duration,

    /// Maximum number of pending attempts kept
    pub max_capacity: u64,
}

impl Default for VerifierStoreConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(DEFAULT_STATE_TTL_SECONDS),
            max_capacity: DEFAULT_STATE_MAX_CAPACITY,
        }
    }
}

impl VerifierStoreConfig {
    /// Create config with custom TTL (useful for testing)
    #[must_use]
    pub fn with_ttl(ttl: Duration) -> Self {
        Self { ttl, max_capacity: DEFAULT_STATE_MAX_CAPACITY }
    }
}

/// Process-local verifier store with time-to-live eviction
#[derive(Clone)]
pub struct InMemoryVerifierStore {
    cache: Cache<String, String>,
}

impl InMemoryVerifierStore {
    /// Create an empty store with the given TTL and capacity
    #[must_use]
    pub fn new(config: &VerifierStoreConfig) -> Self {
        tracing::debug!(
            ttl_seconds = config.ttl.as_secs(),
            max_capacity = config.max_capacity,
            "verifier store configured"
        );
        let cache = Cache::builder()
            .max_capacity(config.max_capacity)
            .time_to_live(config.ttl)
            .build();
        Self { cache }
    }
}

impl Default for InMemoryVerifierStore {
    fn default() -> Self {
        Self::new(&VerifierStoreConfig::default())
    }
}

impl VerifierStore for InMemoryVerifierStore {
    fn save(&self, state: &str, verifier: &str) {
        self.cache.insert(state.to_string(), verifier.to_string());
    }

    fn get(&self, state: &str) -> Option<String> {
        self.cache.get(state)
    }

    fn remove(&self, state: &str) {
        self.cache.invalidate(state);
    }
}

/// Issues and validates signed state values and tracks their verifiers
pub struct StateTokenService<V: VerifierStore = InMemoryVerifierStore> {
    mac: HmacSha256,
    verifiers: Arc<V>,
}

impl StateTokenService<InMemoryVerifierStore> {
    /// Service backed by a default in-memory verifier store
    ///
    /// # Errors
    /// Returns `AuthError::Config` if `signing_key` is empty.
    pub fn in_memory(signing_key: &str) -> Result<Self, AuthError> {
        Self::new(signing_key, Arc::new(InMemoryVerifierStore::default()))
    }
}

impl<V: VerifierStore> StateTokenService<V> {
    /// # Errors
    /// Returns `AuthError::Config` if `signing_key` is empty.
    pub fn new(signing_key: &str, verifiers: Arc<V>) -> Result<Self, AuthError> {
        if signing_key.is_empty() {
            return Err(AuthError::config("state signing key is not configured"));
        }
        let mac = HmacSha256::new_from_slice(signing_key.as_bytes())
            .map_err(|e| AuthError::config(format!("invalid state signing key: {e}")))?;

        Ok(Self { mac, verifiers })
    }

    /// Produce a fresh `raw.signature` state value
    #[must_use]
    pub fn generate_signed_state(&self) -> String {
        let mut raw = [0u8; RAW_STATE_BYTES];
        rand::thread_rng().fill_bytes(&mut raw);
        let raw = URL_SAFE_NO_PAD.encode(raw);

        let signature = URL_SAFE_NO_PAD.encode(self.sign(&raw));
        format!("{raw}.{signature}")
    }

    /// Check that `state` carries a valid signature for its raw part
    ///
    /// The comparison is constant-time.
    #[must_use]
    pub fn validate_signed_state(&self, state: &str) -> bool {
        let mut parts = state.split('.');
        let (Some(raw), Some(signature), None) = (parts.next(), parts.next(), parts.next()) else {
            return false;
        };

        let Ok(signature) = URL_SAFE_NO_PAD.decode(signature) else {
            return false;
        };

        let mut mac = self.mac.clone();
        mac.update(raw.as_bytes());
        mac.verify_slice(&signature).is_ok()
    }

    /// Associate a code verifier with a state value, overwriting silently
    pub fn save(&self, state: &str, verifier: &str) {
        self.verifiers.save(state, verifier);
    }

    /// Look up the verifier for `state` without consuming it
    #[must_use]
    pub fn get(&self, state: &str) -> Option<String> {
        self.verifiers.get(state)
    }

    /// Discard an attempt once its code has been exchanged
    pub fn remove(&self, state: &str) {
        self.verifiers.remove(state);
    }

    fn sign(&self, raw: &str) -> Vec<u8> {
        let mut mac = self.mac.clone();
        mac.update(raw.as_bytes());
        mac.finalize().into_bytes().to_vec()
    }
}

impl<V: VerifierStore> std::fmt::Debug for StateTokenService<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateTokenService").field("signing_key", &"<redacted>").finish()
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for auth::state.
    use super::*;

    fn service() -> StateTokenService {
        StateTokenService::in_memory("test-signing-key").unwrap()
    }

    #[test]
    fn test_empty_key_is_config_error() {
        let err = StateTokenService::in_memory("").unwrap_err();
        assert!(matches!(err, AuthError::Config(_)));
    }

    #[test]
    fn test_generated_state_validates() {
        let service = service();
        for _ in 0..32 {
            let state = service.generate_signed_state();
            assert!(service.validate_signed_state(&state), "rejected {state}");
        }
    }

    #[test]
    fn test_state_shape() {
        let state = service().generate_signed_state();
        let parts: Vec<&str> = state.split('.').collect();

        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0].len(), 43);
        assert_eq!(parts[1].len(), 43);
        assert!(!state.contains('+') && !state.contains('/') && !state.contains('='));
    }

    /// Validates tamper detection.
    ///
    /// Assertions:
    /// - Every single-character substitution of a signed state is rejected.
    #[test]
    fn test_single_character_mutations_rejected() {
        let service = service();
        let state = service.generate_signed_state();

        for (index, original) in state.char_indices() {
            let replacement = if original == 'A' { 'B' } else { 'A' };
            let mut mutated = state.clone();
            mutated.replace_range(index..=index, &replacement.to_string());

            assert!(!service.validate_signed_state(&mutated), "mutation at {index} accepted");
        }
    }

    #[test]
    fn test_state_signed_with_other_key_rejected() {
        let other = StateTokenService::in_memory("another-key").unwrap();
        assert!(!service().validate_signed_state(&other.generate_signed_state()));
    }

    #[test]
    fn test_malformed_states_rejected() {
        let service = service();
        let state = service.generate_signed_state();

        assert!(!service.validate_signed_state(""));
        assert!(!service.validate_signed_state("no-dot-here"));
        assert!(!service.validate_signed_state(&format!("{state}.extra")));
        assert!(!service.validate_signed_state("raw.not base64!"));
    }

    #[test]
    fn test_save_then_get_round_trip() {
        let service = service();
        let state = service.generate_signed_state();

        service.save(&state, "verifier-1");
        assert_eq!(service.get(&state).as_deref(), Some("verifier-1"));
        // get does not consume
        assert_eq!(service.get(&state).as_deref(), Some("verifier-1"));

        service.save(&state, "verifier-2");
        assert_eq!(service.get(&state).as_deref(), Some("verifier-2"));

        service.remove(&state);
        assert!(service.get(&state).is_none());
    }

    #[test]
    fn test_unknown_state_is_absent() {
        assert!(service().get("unknown").is_none());
    }

    #[test]
    fn test_attempt_expires_after_ttl() {
        let store = Arc::new(InMemoryVerifierStore::new(&VerifierStoreConfig::with_ttl(
            Duration::from_millis(50),
        )));
        let service = StateTokenService::new("k", store).unwrap();

        service.save("s", "v");
        assert_eq!(service.get("s").as_deref(), Some("v"));

        std::thread::sleep(Duration::from_millis(120));
        assert!(service.get("s").is_none());
    }
}
