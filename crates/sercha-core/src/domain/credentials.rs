//! Credentials entity - the secret material bound to one source
//!
//! A source authenticates with exactly one of a personal access token or an
//! OAuth token set, so the secret is an enum rather than two optional fields.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::AuthMethod;

/// Tokens obtained through the OAuth authorization code flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OAuthCredentials {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    pub token_type: String,
    /// `None` when the provider reported no lifetime
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry: Option<DateTime<Utc>>,
}

impl OAuthCredentials {
    /// Tokens without an expiry never count as expired.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expiry.map(|exp| now >= exp).unwrap_or(false)
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatCredentials {
    pub token: String,
}

/// The secret half of a credentials record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CredentialSecret {
    Pat(PatCredentials),
    #[serde(rename = "oauth")]
    OAuth(OAuthCredentials),
}

impl CredentialSecret {
    pub fn method(&self) -> AuthMethod {
        match self {
            Self::Pat(_) => AuthMethod::Pat,
            Self::OAuth(_) => AuthMethod::OAuth,
        }
    }
}

/// Credentials owned by exactly one source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Credentials {
    pub id: String,
    pub source_id: String,
    /// Account the tokens belong to (GitHub login, Google email)
    #[serde(default)]
    pub account_identifier: String,
    pub secret: CredentialSecret,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Credentials {
    /// Create credentials with a fresh id for a source.
    pub fn new(
        source_id: impl Into<String>,
        account_identifier: impl Into<String>,
        secret: CredentialSecret,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            source_id: source_id.into(),
            account_identifier: account_identifier.into(),
            secret,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn pat(source_id: impl Into<String>, token: impl Into<String>) -> Self {
        Self::new(
            source_id,
            "",
            CredentialSecret::Pat(PatCredentials {
                token: token.into(),
            }),
        )
    }

    pub fn oauth(
        source_id: impl Into<String>,
        account_identifier: impl Into<String>,
        tokens: OAuthCredentials,
    ) -> Self {
        Self::new(source_id, account_identifier, CredentialSecret::OAuth(tokens))
    }

    /// Token to put in an Authorization header, if any.
    pub fn access_token(&self) -> Option<&str> {
        let token = match &self.secret {
            CredentialSecret::Pat(p) => p.token.as_str(),
            CredentialSecret::OAuth(o) => o.access_token.as_str(),
        };
        (!token.is_empty()).then_some(token)
    }

    pub fn is_authenticated(&self) -> bool {
        self.access_token().is_some()
    }

    pub fn oauth_tokens(&self) -> Option<&OAuthCredentials> {
        match &self.secret {
            CredentialSecret::OAuth(o) => Some(o),
            CredentialSecret::Pat(_) => None,
        }
    }

    pub fn has_refresh_token(&self) -> bool {
        self.oauth_tokens()
            .and_then(|o| o.refresh_token.as_deref())
            .is_some_and(|t| !t.is_empty())
    }

    /// Expired OAuth tokens that can be renewed without the browser.
    pub fn needs_refresh_at(&self, now: DateTime<Utc>) -> bool {
        self.has_refresh_token()
            && self
                .oauth_tokens()
                .is_some_and(|o| o.is_expired_at(now))
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.oauth_tokens().is_some_and(|o| o.is_expired_at(now))
    }

    /// Replace the OAuth tokens after a refresh, keeping the old refresh
    /// token when the provider did not rotate it.
    pub fn update_tokens(&mut self, mut tokens: OAuthCredentials) {
        if tokens.refresh_token.is_none() {
            tokens.refresh_token = self.oauth_tokens().and_then(|o| o.refresh_token.clone());
        }
        self.secret = CredentialSecret::OAuth(tokens);
        self.updated_at = Utc::now();
    }
}
