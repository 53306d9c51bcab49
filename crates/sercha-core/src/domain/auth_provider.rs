//! AuthProvider entity - a persisted OAuth application registration
//!
//! Several connectors of one provider type (Drive, Gmail, Calendar) can share
//! a single registration, so providers are stored apart from sources.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{AuthMethod, ProviderType};

/// OAuth client registration details.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OAuthProviderConfig {
    pub client_id: String,
    pub client_secret: String,
    /// Authorization endpoint; empty means the provider default
    #[serde(default)]
    pub auth_url: String,
    /// Token endpoint; empty means the provider default
    #[serde(default)]
    pub token_url: String,
    #[serde(default)]
    pub scopes: Vec<String>,
}

/// Named OAuth app registration owned by the user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthProvider {
    pub id: String,
    pub name: String,
    pub provider_type: ProviderType,
    pub auth_method: AuthMethod,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oauth: Option<OAuthProviderConfig>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AuthProvider {
    /// Create a new OAuth provider with a fresh id.
    pub fn new_oauth(
        name: impl Into<String>,
        provider_type: ProviderType,
        config: OAuthProviderConfig,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            provider_type,
            auth_method: AuthMethod::OAuth,
            oauth: Some(config),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_oauth(&self) -> bool {
        self.auth_method == AuthMethod::OAuth && self.oauth.is_some()
    }

    /// First 8 characters of the id, for lists.
    pub fn short_id(&self) -> &str {
        match self.id.char_indices().nth(8) {
            Some((idx, _)) => &self.id[..idx],
            None => &self.id,
        }
    }
}
