//! Built-in connector descriptors

use std::collections::{BTreeMap, HashMap};

use crate::domain::{AuthCapability, AuthMethod, ConfigKey, ConnectorDescriptor, ProviderType};
use crate::error::{CoreError, CoreResult};

/// Immutable lookup of connector descriptors by id.
///
/// `list()` is ordered by connector id so menus are stable.
#[derive(Debug, Clone)]
pub struct ConnectorRegistry {
    connectors: BTreeMap<String, ConnectorDescriptor>,
}

impl ConnectorRegistry {
    /// Registry holding the built-in connectors.
    pub fn builtin() -> Self {
        Self::from_descriptors([filesystem(), github(), google_drive(), gmail(), google_calendar()])
    }

    /// Registry over an explicit set of descriptors.
    pub fn from_descriptors(descriptors: impl IntoIterator<Item = ConnectorDescriptor>) -> Self {
        let connectors = descriptors
            .into_iter()
            .map(|d| (d.id.clone(), d))
            .collect();
        Self { connectors }
    }

    pub fn list(&self) -> Vec<ConnectorDescriptor> {
        self.connectors.values().cloned().collect()
    }

    pub fn get(&self, id: &str) -> CoreResult<&ConnectorDescriptor> {
        self.connectors
            .get(id)
            .ok_or_else(|| CoreError::UnknownConnector(id.to_string()))
    }

    /// Check that every required key has a non-blank value.
    pub fn validate_config(&self, id: &str, config: &HashMap<String, String>) -> CoreResult<()> {
        let missing = self.get(id)?.missing_required(config);
        if missing.is_empty() {
            Ok(())
        } else {
            Err(CoreError::MissingConfig { keys: missing })
        }
    }

    /// Copy of `config` with defaults filled in for blank optional keys.
    pub fn apply_defaults(
        &self,
        id: &str,
        config: &HashMap<String, String>,
    ) -> CoreResult<HashMap<String, String>> {
        let mut out = config.clone();
        self.get(id)?.apply_defaults(&mut out);
        Ok(out)
    }
}

impl Default for ConnectorRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

fn filesystem() -> ConnectorDescriptor {
    ConnectorDescriptor {
        id: "filesystem".to_string(),
        name: "Local Filesystem".to_string(),
        description: "Index files from a local directory".to_string(),
        provider_type: ProviderType::Local,
        auth_capability: AuthCapability::None,
        default_auth_method: AuthMethod::None,
        config_keys: vec![
            ConfigKey::new("path", "Directory Path", "Path to the directory to index").required(),
            ConfigKey::new(
                "patterns",
                "File Patterns",
                "Glob patterns to match (e.g., *.md,*.txt)",
            ),
        ],
    }
}

fn github() -> ConnectorDescriptor {
    ConnectorDescriptor {
        id: "github".to_string(),
        name: "GitHub".to_string(),
        description: "Index repositories, issues, PRs, and wikis from GitHub".to_string(),
        provider_type: ProviderType::GitHub,
        auth_capability: AuthCapability::Both,
        default_auth_method: AuthMethod::Pat,
        config_keys: vec![
            ConfigKey::new("content_types", "Content Types", "Content to index: files,issues,prs,wikis")
                .with_default("files"),
            ConfigKey::new("file_patterns", "File Patterns", "Glob patterns for files to include")
                .with_default("*"),
        ],
    }
}

fn google_drive() -> ConnectorDescriptor {
    ConnectorDescriptor {
        id: "google-drive".to_string(),
        name: "Google Drive".to_string(),
        description: "Index documents from Google Drive".to_string(),
        provider_type: ProviderType::Google,
        auth_capability: AuthCapability::OAuth,
        default_auth_method: AuthMethod::OAuth,
        config_keys: vec![
            ConfigKey::new("content_types", "Content Types", "Content to sync: files,docs,sheets")
                .with_default("files,docs,sheets"),
            ConfigKey::new("folder_ids", "Folder IDs", "Specific folder IDs to sync (optional)"),
            ConfigKey::new("mime_types", "MIME Types", "Filter by MIME types (optional)"),
        ],
    }
}

fn gmail() -> ConnectorDescriptor {
    ConnectorDescriptor {
        id: "gmail".to_string(),
        name: "Gmail".to_string(),
        description: "Index emails from Gmail".to_string(),
        provider_type: ProviderType::Google,
        auth_capability: AuthCapability::OAuth,
        default_auth_method: AuthMethod::OAuth,
        config_keys: vec![
            ConfigKey::new("label_ids", "Label IDs", "Labels to sync: INBOX,SENT,etc")
                .with_default("INBOX"),
            ConfigKey::new("query", "Search Query", "Gmail search query to filter emails"),
            ConfigKey::new(
                "include_spam_trash",
                "Include Spam/Trash",
                "Include spam and trash (true/false)",
            )
            .with_default("false"),
        ],
    }
}

fn google_calendar() -> ConnectorDescriptor {
    ConnectorDescriptor {
        id: "google-calendar".to_string(),
        name: "Google Calendar".to_string(),
        description: "Index events from Google Calendar".to_string(),
        provider_type: ProviderType::Google,
        auth_capability: AuthCapability::OAuth,
        default_auth_method: AuthMethod::OAuth,
        config_keys: vec![
            ConfigKey::new("calendar_ids", "Calendar IDs", "Specific calendar IDs to sync (optional)"),
            ConfigKey::new("single_events", "Expand Recurring", "Expand recurring events (true/false)")
                .with_default("true"),
        ],
    }
}
