//! PKCE (Proof Key for Code Exchange) and CSRF state
//!
//! Implements RFC 7636 S256. Random values come from the OS generator;
//! if it fails the flow is refused rather than degraded.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};

use crate::error::OAuthError;

/// Bytes of entropy behind the verifier and the state token
const RANDOM_BYTES: usize = 32;

/// PKCE code verifier and challenge pair
#[derive(Clone)]
pub struct PkceChallenge {
    /// The code verifier (kept secret, sent in token exchange)
    pub verifier: String,
    /// The code challenge (sent in authorization request)
    pub challenge: String,
}

impl PkceChallenge {
    /// Challenge method advertised in the authorization URL
    pub const METHOD: &'static str = "S256";

    /// Generate a new PKCE pair
    pub fn generate() -> Result<Self, OAuthError> {
        let verifier = generate_code_verifier()?;
        let challenge = code_challenge(&verifier);
        Ok(Self {
            verifier,
            challenge,
        })
    }

    /// Verify that a verifier matches a challenge
    pub fn verify(verifier: &str, challenge: &str) -> bool {
        code_challenge(verifier) == challenge
    }
}

impl std::fmt::Debug for PkceChallenge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PkceChallenge")
            .field("challenge", &self.challenge)
            .finish_non_exhaustive()
    }
}

fn random_token() -> Result<String, OAuthError> {
    let mut bytes = [0u8; RANDOM_BYTES];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|e| OAuthError::Entropy(e.to_string()))?;
    Ok(URL_SAFE_NO_PAD.encode(bytes))
}

/// 32 random bytes, base64url without padding (43 characters).
pub fn generate_code_verifier() -> Result<String, OAuthError> {
    random_token()
}

/// CSRF state token, drawn independently of the verifier.
pub fn generate_state() -> Result<String, OAuthError> {
    random_token()
}

/// SHA-256 of the verifier, base64url without padding.
pub fn code_challenge(verifier: &str) -> String {
    let hash = Sha256::digest(verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(hash)
}
