//! OAuth flow errors
//!
//! Display strings are the one-line messages shown to the user.

use sercha_core::ProviderType;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OAuthError {
    /// The OS random source failed; no predictable fallback is used.
    #[error("failed to generate secure random value: {0}")]
    Entropy(String),

    #[error("failed to start callback server: {0}")]
    CallbackServerStart(String),

    /// The provider redirected back with an `error` parameter
    #[error("oauth error: {error} - {description}")]
    ProviderDenied { error: String, description: String },

    #[error("state mismatch")]
    StateMismatch,

    #[error("no authorization code received")]
    MissingCode,

    #[error("timeout waiting for authorization callback")]
    CallbackTimeout,

    #[error("callback listener closed before a result arrived")]
    ListenerClosed,

    #[error("token error: {error} - {description}")]
    TokenEndpoint { error: String, description: String },

    #[error("token request failed with status {0}")]
    TokenStatus(u16),

    #[error("token request: {0}")]
    TokenRequest(String),

    #[error("decode token response: {0}")]
    TokenDecode(String),

    #[error("user info request failed: {0}")]
    UserInfo(String),

    #[error("unsupported provider: {0}")]
    UnsupportedProvider(ProviderType),

    #[error("auth provider has no OAuth configuration")]
    MissingOAuthConfig,

    #[error("failed to build auth URL: {0}")]
    AuthUrl(String),
}

impl OAuthError {
    /// Callback outcomes that may indicate tampering. Never retried.
    pub fn is_protocol_violation(&self) -> bool {
        matches!(
            self,
            Self::ProviderDenied { .. } | Self::StateMismatch | Self::MissingCode
        )
    }
}
