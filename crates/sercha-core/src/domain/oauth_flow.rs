//! Ephemeral per-attempt OAuth state. Never persisted.

use std::fmt;

/// Everything one authorization attempt needs to finish.
///
/// Created fresh for each attempt and dropped when the attempt completes or
/// is cancelled.
#[derive(Clone, PartialEq, Eq)]
pub struct OAuthFlowState {
    /// Full authorization URL the browser is sent to
    pub auth_url: String,
    /// PKCE verifier, sent with the token exchange
    pub code_verifier: String,
    /// CSRF state echoed back on the callback
    pub state: String,
    pub redirect_uri: String,
    pub redirect_port: u16,
}

impl OAuthFlowState {
    /// Truncated state for logs.
    pub fn state_prefix(&self) -> &str {
        match self.state.char_indices().nth(8) {
            Some((idx, _)) => &self.state[..idx],
            None => &self.state,
        }
    }
}

// Verifier and state stay out of debug output.
impl fmt::Debug for OAuthFlowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuthFlowState")
            .field("auth_url", &self.auth_url)
            .field("state", &format_args!("{}...", self.state_prefix()))
            .field("redirect_uri", &self.redirect_uri)
            .field("redirect_port", &self.redirect_port)
            .finish_non_exhaustive()
    }
}
