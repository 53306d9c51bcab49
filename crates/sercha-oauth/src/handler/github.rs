//! GitHub OAuth app handler

use async_trait::async_trait;
use serde::Deserialize;

use sercha_core::{AuthProvider, OAuthEndpoints, ProviderRegistry, ProviderType};

use super::{authorization_url, get_user_json, OAuthHandler};
use crate::error::OAuthError;
use crate::token::TokenExchanger;

const USER_INFO_URL: &str = "https://api.github.com/user";

#[derive(Deserialize)]
struct GitHubUser {
    #[serde(default)]
    login: String,
}

pub struct GitHubHandler {
    exchanger: TokenExchanger,
    user_info_url: String,
}

impl GitHubHandler {
    pub fn new(exchanger: TokenExchanger) -> Self {
        Self {
            exchanger,
            user_info_url: USER_INFO_URL.to_string(),
        }
    }

    /// Point account lookups elsewhere (GitHub Enterprise, tests).
    pub fn with_user_info_url(mut self, url: impl Into<String>) -> Self {
        self.user_info_url = url.into();
        self
    }
}

#[async_trait]
impl OAuthHandler for GitHubHandler {
    fn provider_type(&self) -> ProviderType {
        ProviderType::GitHub
    }

    fn default_config(&self) -> OAuthEndpoints {
        ProviderRegistry::new()
            .oauth_endpoints(ProviderType::GitHub)
            .unwrap_or_else(|| OAuthEndpoints {
                auth_url: String::new(),
                token_url: String::new(),
                scopes: Vec::new(),
            })
    }

    fn setup_hint(&self) -> &'static str {
        "Create OAuth app at github.com/settings/developers"
    }

    fn exchanger(&self) -> &TokenExchanger {
        &self.exchanger
    }

    fn build_auth_url(
        &self,
        provider: &AuthProvider,
        redirect_uri: &str,
        state: &str,
        code_challenge: &str,
    ) -> Result<String, OAuthError> {
        authorization_url(
            provider,
            &self.default_config(),
            redirect_uri,
            state,
            code_challenge,
            &[],
        )
    }

    async fn user_info(&self, access_token: &str) -> Result<String, OAuthError> {
        let user: GitHubUser = get_user_json(
            self.exchanger.client(),
            &self.user_info_url,
            "application/vnd.github+json",
            access_token,
        )
        .await?;
        Ok(user.login)
    }
}
