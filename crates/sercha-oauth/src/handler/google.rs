//! Google OAuth client handler
//!
//! One registration covers Drive, Gmail and Calendar. Offline access with a
//! forced consent prompt so a refresh token is issued every time.

use async_trait::async_trait;
use serde::Deserialize;

use sercha_core::{AuthProvider, OAuthEndpoints, ProviderRegistry, ProviderType};

use super::{authorization_url, get_user_json, OAuthHandler};
use crate::error::OAuthError;
use crate::token::TokenExchanger;

const USER_INFO_URL: &str = "https://www.googleapis.com/oauth2/v2/userinfo";

#[derive(Deserialize)]
struct GoogleUser {
    #[serde(default)]
    email: String,
}

pub struct GoogleHandler {
    exchanger: TokenExchanger,
    user_info_url: String,
}

impl GoogleHandler {
    pub fn new(exchanger: TokenExchanger) -> Self {
        Self {
            exchanger,
            user_info_url: USER_INFO_URL.to_string(),
        }
    }

    pub fn with_user_info_url(mut self, url: impl Into<String>) -> Self {
        self.user_info_url = url.into();
        self
    }
}

#[async_trait]
impl OAuthHandler for GoogleHandler {
    fn provider_type(&self) -> ProviderType {
        ProviderType::Google
    }

    fn default_config(&self) -> OAuthEndpoints {
        ProviderRegistry::new()
            .oauth_endpoints(ProviderType::Google)
            .unwrap_or_else(|| OAuthEndpoints {
                auth_url: String::new(),
                token_url: String::new(),
                scopes: Vec::new(),
            })
    }

    fn setup_hint(&self) -> &'static str {
        "Create OAuth credentials at console.cloud.google.com/apis/credentials"
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
            &[("access_type", "offline"), ("prompt", "consent")],
        )
    }

    async fn user_info(&self, access_token: &str) -> Result<String, OAuthError> {
        let user: GoogleUser = get_user_json(
            self.exchanger.client(),
            &self.user_info_url,
            "application/json",
            access_token,
        )
        .await?;
        Ok(user.email)
    }
}
