//! PKCE (Proof Key for Code Exchange) implementation for OAuth 2.0
//!
//! Implements RFC 7636 with the `S256` challenge method. The gateway binds
//! each authorization code to the verifier generated here, so the verifier
//! never leaves the server until the code exchange.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::RngCore;
use sha2::{Digest, Sha256};

/// Unreserved characters allowed in a code verifier (RFC 7636 §4.1)
const VERIFIER_ALPHABET: &[u8] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-._~";

/// Verifier length used when callers have no preference
pub const DEFAULT_VERIFIER_LENGTH: usize = 64;

/// Generate a cryptographically secure code verifier of `length` characters
///
/// Each random byte is mapped onto the 66-character unreserved alphabet by
/// taking it modulo the alphabet size.
#[must_use]
pub fn generate_code_verifier(length: usize) -> String {
    let mut bytes = vec![0u8; length];
    rand::thread_rng().fill_bytes(&mut bytes);

    bytes
        .into_iter()
        .map(|byte| char::from(VERIFIER_ALPHABET[usize::from(byte) % VERIFIER_ALPHABET.len()]))
        .collect()
}

/// Generate code challenge from verifier using SHA256
///
/// Per RFC 7636, the challenge is BASE64URL(SHA256(ASCII(code_verifier))),
/// always 43 characters.
#[must_use]
pub fn generate_code_challenge(verifier: &str) -> String {
    let hash = Sha256::digest(verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(hash)
}

/// Verifier/challenge pair for one authorization attempt
#[derive(Debug, Clone)]
pub struct PkcePair {
    /// Kept server-side until token exchange
    pub code_verifier: String,
    /// Sent in the authorization URL
    pub code_challenge: String,
}

impl PkcePair {
    /// Generate a fresh pair with a [`DEFAULT_VERIFIER_LENGTH`] verifier
    ///
    /// # Examples
    /// ```
    /// use mpauth_common::auth::pkce::PkcePair;
    ///
    /// let pair = PkcePair::generate();
    /// assert_eq!(pair.code_verifier.len(), 64);
    /// assert_eq!(pair.code_challenge.len(), 43);
    /// ```
    #[must_use]
    pub fn generate() -> Self {
        let code_verifier = generate_code_verifier(DEFAULT_VERIFIER_LENGTH);
        let code_challenge = generate_code_challenge(&code_verifier);
        Self { code_verifier, code_challenge }
    }

    /// Get the challenge method (always "S256" for SHA256)
    #[must_use]
    pub fn challenge_method(&self) -> &str {
        "S256"
    }
}
