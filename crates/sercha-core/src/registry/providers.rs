//! Provider capability resolver
//!
//! Answers, per provider type, which auth methods are available, which
//! connectors share the provider, and where its OAuth endpoints live.

use serde::{Deserialize, Serialize};

use crate::domain::{AuthCapability, AuthMethod, ProviderType};
use crate::error::{CoreError, CoreResult};

/// Default OAuth endpoints and scopes of a provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OAuthEndpoints {
    pub auth_url: String,
    pub token_url: String,
    pub scopes: Vec<String>,
}

/// Stateless lookups over the known provider types.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProviderRegistry;

const PROVIDERS: &[ProviderType] = &[ProviderType::Local, ProviderType::Google, ProviderType::GitHub];

impl ProviderRegistry {
    pub fn new() -> Self {
        Self
    }

    /// Provider types with at least one connector.
    pub fn providers(&self) -> Vec<ProviderType> {
        PROVIDERS.to_vec()
    }

    pub fn connectors_for_provider(&self, provider: ProviderType) -> &'static [&'static str] {
        match provider {
            ProviderType::Local => &["filesystem"],
            ProviderType::Google => &["google-drive", "gmail", "google-calendar"],
            ProviderType::GitHub => &["github"],
            ProviderType::Slack | ProviderType::Notion => &[],
        }
    }

    pub fn provider_for_connector(&self, connector_id: &str) -> CoreResult<ProviderType> {
        PROVIDERS
            .iter()
            .copied()
            .find(|p| self.is_compatible(*p, connector_id))
            .ok_or_else(|| CoreError::UnknownConnector(connector_id.to_string()))
    }

    pub fn is_compatible(&self, provider: ProviderType, connector_id: &str) -> bool {
        self.connectors_for_provider(provider)
            .iter()
            .any(|c| *c == connector_id)
    }

    pub fn auth_capability(&self, provider: ProviderType) -> AuthCapability {
        match provider {
            ProviderType::GitHub => AuthCapability::Both,
            ProviderType::Google => AuthCapability::OAuth,
            ProviderType::Local | ProviderType::Slack | ProviderType::Notion => AuthCapability::None,
        }
    }

    pub fn supported_auth_methods(&self, provider: ProviderType) -> Vec<AuthMethod> {
        self.auth_capability(provider).supported_methods()
    }

    pub fn supports_multiple_auth_methods(&self, provider: ProviderType) -> bool {
        self.auth_capability(provider).supports_multiple_methods()
    }

    /// PAT when available, then OAuth.
    pub fn default_auth_method(&self, provider: ProviderType) -> AuthMethod {
        let capability = self.auth_capability(provider);
        if capability.supports_pat() {
            AuthMethod::Pat
        } else if capability.supports_oauth() {
            AuthMethod::OAuth
        } else {
            AuthMethod::None
        }
    }

    /// Whether several connectors share one OAuth app registration, which is
    /// when the wizard offers to reuse an existing app.
    pub fn has_multiple_connectors(&self, provider: ProviderType) -> bool {
        matches!(provider, ProviderType::Google)
    }

    pub fn oauth_endpoints(&self, provider: ProviderType) -> Option<OAuthEndpoints> {
        match provider {
            ProviderType::GitHub => Some(OAuthEndpoints {
                auth_url: "https://github.com/login/oauth/authorize".to_string(),
                token_url: "https://github.com/login/oauth/access_token".to_string(),
                scopes: vec!["repo".to_string(), "read:user".to_string()],
            }),
            ProviderType::Google => Some(OAuthEndpoints {
                auth_url: "https://accounts.google.com/o/oauth2/v2/auth".to_string(),
                token_url: "https://oauth2.googleapis.com/token".to_string(),
                scopes: [
                    "https://www.googleapis.com/auth/userinfo.email",
                    "https://www.googleapis.com/auth/userinfo.profile",
                    "https://www.googleapis.com/auth/calendar.readonly",
                    "https://www.googleapis.com/auth/drive.readonly",
                    "https://www.googleapis.com/auth/gmail.readonly",
                ]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            }),
            ProviderType::Local | ProviderType::Slack | ProviderType::Notion => None,
        }
    }
}
