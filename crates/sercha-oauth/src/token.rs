//! Token endpoint calls
//!
//! Authorization-code and refresh grants as form POSTs. One round trip per
//! call with a bounded timeout; retrying is left to the caller.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use reqwest::header::ACCEPT;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info};

use sercha_core::OAuthCredentials;

use crate::error::OAuthError;

/// Default token endpoint timeout
pub const DEFAULT_TOKEN_TIMEOUT: Duration = Duration::from_secs(30);

/// Token response from the provider
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TokenResponse {
    #[serde(default)]
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
}

impl TokenResponse {
    /// Convert to stored credentials, with expiry relative to `now`.
    pub fn into_credentials(self, now: DateTime<Utc>) -> OAuthCredentials {
        OAuthCredentials {
            expiry: compute_expiry(now, self.expires_in),
            access_token: self.access_token,
            refresh_token: self.refresh_token.filter(|t| !t.is_empty()),
            token_type: self
                .token_type
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| "Bearer".to_string()),
        }
    }
}

/// `now + expires_in` for a positive lifetime, otherwise no expiry.
pub fn compute_expiry(now: DateTime<Utc>, expires_in: Option<i64>) -> Option<DateTime<Utc>> {
    expires_in
        .filter(|secs| *secs > 0)
        .map(|secs| now + ChronoDuration::seconds(secs))
}

#[derive(Debug, Deserialize)]
struct TokenErrorBody {
    #[serde(default)]
    error: String,
    #[serde(default)]
    error_description: String,
}

impl TokenErrorBody {
    fn parse(body: &[u8]) -> Option<Self> {
        serde_json::from_slice::<Self>(body)
            .ok()
            .filter(|e| !e.error.is_empty())
    }

    fn into_error(self) -> OAuthError {
        OAuthError::TokenEndpoint {
            error: self.error,
            description: self.error_description,
        }
    }
}

/// Authorization-code grant inputs
#[derive(Clone, Copy)]
pub struct CodeExchange<'a> {
    pub token_url: &'a str,
    pub client_id: &'a str,
    pub client_secret: &'a str,
    pub code: &'a str,
    pub redirect_uri: &'a str,
    /// Omitted from the request when empty
    pub code_verifier: &'a str,
}

/// Refresh grant inputs
#[derive(Clone, Copy)]
pub struct RefreshExchange<'a> {
    pub token_url: &'a str,
    pub client_id: &'a str,
    pub client_secret: &'a str,
    pub refresh_token: &'a str,
}

/// Performs token endpoint requests.
#[derive(Debug, Clone)]
pub struct TokenExchanger {
    client: reqwest::Client,
    timeout: Duration,
}

impl TokenExchanger {
    pub fn new(timeout: Duration) -> Self {
        Self::with_client(reqwest::Client::new(), timeout)
    }

    pub fn with_client(client: reqwest::Client, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub(crate) fn client(&self) -> &reqwest::Client {
        &self.client
    }

    /// Exchange an authorization code for tokens.
    pub async fn exchange_code(&self, req: CodeExchange<'_>) -> Result<TokenResponse, OAuthError> {
        info!("[OAuth] Exchanging authorization code for tokens");

        let mut form = vec![
            ("grant_type", "authorization_code"),
            ("client_id", req.client_id),
            ("client_secret", req.client_secret),
            ("code", req.code),
            ("redirect_uri", req.redirect_uri),
        ];
        if !req.code_verifier.is_empty() {
            form.push(("code_verifier", req.code_verifier));
        }

        let response = self.post_form(req.token_url, &form).await?;
        info!("[OAuth] Token exchange successful");
        Ok(response)
    }

    /// Refresh an access token.
    ///
    /// A response without a new refresh token keeps the old one.
    pub async fn refresh(&self, req: RefreshExchange<'_>) -> Result<TokenResponse, OAuthError> {
        info!("[OAuth] Refreshing access token");

        let form = [
            ("grant_type", "refresh_token"),
            ("client_id", req.client_id),
            ("client_secret", req.client_secret),
            ("refresh_token", req.refresh_token),
        ];

        let mut response = self.post_form(req.token_url, &form).await?;
        if response.refresh_token.as_deref().map_or(true, str::is_empty) {
            response.refresh_token = Some(req.refresh_token.to_string());
        }
        info!("[OAuth] Token refresh successful");
        Ok(response)
    }

    async fn post_form(
        &self,
        token_url: &str,
        form: &[(&str, &str)],
    ) -> Result<TokenResponse, OAuthError> {
        let response = self
            .client
            .post(token_url)
            .header(ACCEPT, "application/json")
            .timeout(self.timeout)
            .form(form)
            .send()
            .await
            .map_err(|e| OAuthError::TokenRequest(e.to_string()))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| OAuthError::TokenRequest(e.to_string()))?;

        if !status.is_success() {
            debug!(status = status.as_u16(), "[OAuth] Token endpoint returned error status");
            return Err(match TokenErrorBody::parse(&body) {
                Some(err) => err.into_error(),
                None => OAuthError::TokenStatus(status.as_u16()),
            });
        }

        let parsed: TokenResponse =
            serde_json::from_slice(&body).map_err(|e| OAuthError::TokenDecode(e.to_string()))?;

        // Some providers (GitHub) report grant errors with a 200 status
        if parsed.access_token.is_empty() {
            return Err(match TokenErrorBody::parse(&body) {
                Some(err) => err.into_error(),
                None => OAuthError::TokenDecode("response has no access_token".to_string()),
            });
        }

        Ok(parsed)
    }
}

impl Default for TokenExchanger {
    fn default() -> Self {
        Self::new(DEFAULT_TOKEN_TIMEOUT)
    }
}
