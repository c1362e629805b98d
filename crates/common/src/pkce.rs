//! PKCE (Proof Key for Code Exchange) helpers
//!
//! Implements RFC 7636 for public clients such as mobile and desktop apps
//! that cannot keep a client secret. Used by the browser-based authorization
//! flow before the authorization code is exchanged at the token endpoint.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::Rng;
use sha2::{Digest, Sha256};

/// Challenge method advertised in the authorization request
pub const CHALLENGE_METHOD: &str = "S256";

fn random_urlsafe(len: usize) -> String {
    let mut rng = rand::thread_rng();
    let bytes: Vec<u8> = (0..len).map(|_| rng.gen()).collect();
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Generate a code verifier
///
/// 32 random bytes encode to 43 URL-safe characters, the RFC 7636 minimum.
#[must_use]
pub fn generate_code_verifier() -> String {
    random_urlsafe(32)
}

/// Derive the code challenge: `BASE64URL(SHA256(ASCII(code_verifier)))`
#[must_use]
pub fn generate_code_challenge(verifier: &str) -> String {
    let hash = Sha256::digest(verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(hash)
}

/// Generate an opaque `state` value for CSRF protection
#[must_use]
pub fn generate_state() -> String {
    random_urlsafe(32)
}

/// Compare the state sent with the authorization request against the one
/// echoed back on the redirect.
///
/// Runs in constant time with respect to the contents.
#[must_use]
pub fn validate_state(expected: &str, actual: &str) -> bool {
    if expected.len() != actual.len() {
        return false;
    }
    expected.bytes().zip(actual.bytes()).fold(0u8, |acc, (a, b)| acc | (a ^ b)) == 0
}

/// Verifier, challenge and state for one authorization attempt
#[derive(Debug, Clone)]
pub struct PkceChallenge {
    /// Secret kept until the token exchange
    pub code_verifier: String,
    /// SHA-256 of the verifier, sent with the authorization request
    pub code_challenge: String,
    /// CSRF token that must round-trip unchanged
    pub state: String,
}

impl PkceChallenge {
    /// Generate a fresh challenge
    ///
    /// # Examples
    /// ```
    /// use authsession_common::pkce::PkceChallenge;
    ///
    /// let challenge = PkceChallenge::generate();
    /// assert_eq!(challenge.code_verifier.len(), 43);
    /// ```
    #[must_use]
    pub fn generate() -> Self {
        let code_verifier = generate_code_verifier();
        let code_challenge = generate_code_challenge(&code_verifier);
        Self { code_verifier, code_challenge, state: generate_state() }
    }

    /// Challenge method (always `S256`)
    #[must_use]
    pub fn challenge_method(&self) -> &'static str {
        CHALLENGE_METHOD
    }
}
