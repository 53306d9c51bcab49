//! Provider-specific OAuth behaviour
//!
//! Each provider type supplies its authorization URL shape, default
//! endpoints, account lookup and setup guidance. Token requests go through
//! the shared [`TokenExchanger`].

mod github;
mod google;

pub use github::GitHubHandler;
pub use google::GoogleHandler;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::{ACCEPT, AUTHORIZATION};
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

use sercha_core::{AuthProvider, Credentials, OAuthCredentials, OAuthEndpoints, OAuthProviderConfig, ProviderType};

use crate::error::OAuthError;
use crate::pkce::PkceChallenge;
use crate::token::{CodeExchange, RefreshExchange, TokenExchanger};

/// Timeout for account lookups
pub const USER_INFO_TIMEOUT: Duration = Duration::from_secs(10);

#[async_trait]
pub trait OAuthHandler: Send + Sync {
    fn provider_type(&self) -> ProviderType;

    /// Default endpoints and scopes for new registrations
    fn default_config(&self) -> OAuthEndpoints;

    /// Where to create an OAuth app for this provider
    fn setup_hint(&self) -> &'static str;

    fn exchanger(&self) -> &TokenExchanger;

    fn build_auth_url(
        &self,
        provider: &AuthProvider,
        redirect_uri: &str,
        state: &str,
        code_challenge: &str,
    ) -> Result<String, OAuthError>;

    /// Account identifier for the token owner (login, email).
    async fn user_info(&self, access_token: &str) -> Result<String, OAuthError>;

    async fn exchange_code(
        &self,
        provider: &AuthProvider,
        code: &str,
        redirect_uri: &str,
        code_verifier: &str,
    ) -> Result<OAuthCredentials, OAuthError> {
        let config = oauth_config(provider)?;
        let defaults = self.default_config();
        let response = self
            .exchanger()
            .exchange_code(CodeExchange {
                token_url: endpoint_or(&config.token_url, &defaults.token_url),
                client_id: &config.client_id,
                client_secret: &config.client_secret,
                code,
                redirect_uri,
                code_verifier,
            })
            .await?;
        Ok(response.into_credentials(Utc::now()))
    }

    async fn refresh_token(
        &self,
        provider: &AuthProvider,
        refresh_token: &str,
    ) -> Result<OAuthCredentials, OAuthError> {
        let config = oauth_config(provider)?;
        let defaults = self.default_config();
        let response = self
            .exchanger()
            .refresh(RefreshExchange {
                token_url: endpoint_or(&config.token_url, &defaults.token_url),
                client_id: &config.client_id,
                client_secret: &config.client_secret,
                refresh_token,
            })
            .await?;
        Ok(response.into_credentials(Utc::now()))
    }
}

/// The provider's OAuth configuration, or an error for PAT-only providers.
pub fn oauth_config(provider: &AuthProvider) -> Result<&OAuthProviderConfig, OAuthError> {
    provider.oauth.as_ref().ok_or(OAuthError::MissingOAuthConfig)
}

fn endpoint_or<'a>(configured: &'a str, default: &'a str) -> &'a str {
    if configured.is_empty() {
        default
    } else {
        configured
    }
}

/// Standard authorization URL with PKCE S256, plus provider extras.
pub(crate) fn authorization_url(
    provider: &AuthProvider,
    defaults: &OAuthEndpoints,
    redirect_uri: &str,
    state: &str,
    code_challenge: &str,
    extra: &[(&str, &str)],
) -> Result<String, OAuthError> {
    let config = oauth_config(provider)?;
    let base = endpoint_or(&config.auth_url, &defaults.auth_url);
    let scopes = if config.scopes.is_empty() {
        &defaults.scopes
    } else {
        &config.scopes
    };

    let mut url = Url::parse(base).map_err(|e| OAuthError::AuthUrl(e.to_string()))?;
    {
        let mut query = url.query_pairs_mut();
        query.append_pair("client_id", &config.client_id);
        query.append_pair("redirect_uri", redirect_uri);
        query.append_pair("response_type", "code");
        query.append_pair("scope", &scopes.join(" "));
        query.append_pair("state", state);
        query.append_pair("code_challenge", code_challenge);
        query.append_pair("code_challenge_method", PkceChallenge::METHOD);
        for (key, value) in extra {
            query.append_pair(key, value);
        }
    }

    debug!("[OAuth] Built authorization URL for {}", provider.provider_type);
    Ok(url.to_string())
}

/// GET a JSON document with the bearer token.
pub(crate) async fn get_user_json<T: DeserializeOwned>(
    client: &reqwest::Client,
    url: &str,
    accept: &str,
    access_token: &str,
) -> Result<T, OAuthError> {
    let response = client
        .get(url)
        .header(AUTHORIZATION, format!("Bearer {}", access_token))
        .header(ACCEPT, accept)
        .timeout(USER_INFO_TIMEOUT)
        .send()
        .await
        .map_err(|e| OAuthError::UserInfo(e.to_string()))?;

    let status = response.status();
    if status != reqwest::StatusCode::OK {
        return Err(OAuthError::UserInfo(format!(
            "request failed with status {}",
            status.as_u16()
        )));
    }

    response
        .json()
        .await
        .map_err(|e| OAuthError::UserInfo(format!("decode user info: {}", e)))
}

/// Handlers by provider type
#[derive(Clone)]
pub struct HandlerRegistry {
    handlers: HashMap<ProviderType, Arc<dyn OAuthHandler>>,
}

impl HandlerRegistry {
    pub fn empty() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// GitHub and Google handlers sharing one exchanger
    pub fn builtin(exchanger: TokenExchanger) -> Self {
        let mut registry = Self::empty();
        registry.register(Arc::new(GitHubHandler::new(exchanger.clone())));
        registry.register(Arc::new(GoogleHandler::new(exchanger)));
        registry
    }

    pub fn register(&mut self, handler: Arc<dyn OAuthHandler>) {
        self.handlers.insert(handler.provider_type(), handler);
    }

    pub fn get(&self, provider_type: ProviderType) -> Result<Arc<dyn OAuthHandler>, OAuthError> {
        self.handlers
            .get(&provider_type)
            .cloned()
            .ok_or(OAuthError::UnsupportedProvider(provider_type))
    }

    pub fn supports(&self, provider_type: ProviderType) -> bool {
        self.handlers.contains_key(&provider_type)
    }

    /// Refresh expired OAuth credentials in place.
    ///
    /// Returns `false` when nothing needed refreshing.
    pub async fn refresh_if_needed(
        &self,
        provider: &AuthProvider,
        credentials: &mut Credentials,
        now: DateTime<Utc>,
    ) -> Result<bool, OAuthError> {
        if !credentials.needs_refresh_at(now) {
            return Ok(false);
        }
        let Some(refresh_token) = credentials
            .oauth_tokens()
            .and_then(|o| o.refresh_token.clone())
        else {
            return Ok(false);
        };

        let handler = self.get(provider.provider_type)?;
        let tokens = handler.refresh_token(provider, &refresh_token).await?;
        credentials.update_tokens(tokens);
        info!(
            credentials_id = %credentials.id,
            "[OAuth] Refreshed expired access token"
        );
        Ok(true)
    }
}
