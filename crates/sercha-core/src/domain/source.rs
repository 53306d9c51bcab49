//! Source entity - one configured data source

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// A configured instance of a connector.
///
/// `credentials_id`, when set, names a `Credentials` record whose
/// `source_id` is this source's id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Source {
    pub id: String,
    /// Connector id (`github`, `gmail`, ...)
    #[serde(rename = "type")]
    pub source_type: String,
    pub name: String,
    #[serde(default)]
    pub config: HashMap<String, String>,
    /// Empty for PAT-authenticated and auth-free sources
    #[serde(default)]
    pub auth_provider_id: String,
    #[serde(default)]
    pub credentials_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Source {
    pub fn new(
        source_type: impl Into<String>,
        name: impl Into<String>,
        config: HashMap<String, String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            source_type: source_type.into(),
            name: name.into(),
            config,
            auth_provider_id: String::new(),
            credentials_id: String::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_auth_provider(mut self, auth_provider_id: impl Into<String>) -> Self {
        self.auth_provider_id = auth_provider_id.into();
        self
    }

    pub fn has_credentials(&self) -> bool {
        !self.credentials_id.is_empty()
    }

    /// Name with the account appended, unless the name already mentions it.
    pub fn display_name(&self, account_identifier: &str) -> String {
        if !account_identifier.is_empty() && !self.name.contains(account_identifier) {
            format!("{} - {}", self.name, account_identifier)
        } else {
            self.name.clone()
        }
    }
}
