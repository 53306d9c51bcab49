//! Connector descriptors - the data-source types a user can add

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::{AuthCapability, AuthMethod, ProviderType};

/// A configuration field a connector asks for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigKey {
    pub key: String,
    pub label: String,
    pub description: String,
    /// Pre-filled value, empty when there is none
    #[serde(default)]
    pub default: String,
    #[serde(default)]
    pub required: bool,
    /// Masked when prompted
    #[serde(default)]
    pub secret: bool,
}

impl ConfigKey {
    pub fn new(key: impl Into<String>, label: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            label: label.into(),
            description: description.into(),
            default: String::new(),
            required: false,
            secret: false,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_default(mut self, default: impl Into<String>) -> Self {
        self.default = default.into();
        self
    }

    pub fn secret(mut self) -> Self {
        self.secret = true;
        self
    }
}

/// Describes one data-source type and how it authenticates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectorDescriptor {
    /// Stable identifier, stored as `Source::source_type`
    pub id: String,
    pub name: String,
    pub description: String,
    pub provider_type: ProviderType,
    pub auth_capability: AuthCapability,
    /// Method used when the caller does not choose one
    pub default_auth_method: AuthMethod,
    pub config_keys: Vec<ConfigKey>,
}

impl ConnectorDescriptor {
    pub fn requires_auth(&self) -> bool {
        self.auth_capability.requires_auth()
    }

    /// Keys of required fields whose value is missing or blank.
    pub fn missing_required(&self, config: &HashMap<String, String>) -> Vec<String> {
        self.config_keys
            .iter()
            .filter(|k| k.required)
            .filter(|k| {
                config
                    .get(&k.key)
                    .map(|v| v.trim().is_empty())
                    .unwrap_or(true)
            })
            .map(|k| k.key.clone())
            .collect()
    }

    /// Fill unset or blank optional values with their defaults.
    pub fn apply_defaults(&self, config: &mut HashMap<String, String>) {
        for key in &self.config_keys {
            if key.default.is_empty() {
                continue;
            }
            let entry = config.entry(key.key.clone()).or_default();
            if entry.trim().is_empty() {
                *entry = key.default.clone();
            }
        }
    }
}
