//! App Settings Service
//!
//! High-level service for managing application settings with typed access.
//! Provides convenient methods for common settings while using the repository
//! for persistence.

use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::branding::{DEFAULT_OAUTH_CALLBACK_PORT, DEFAULT_OAUTH_CALLBACK_PORT_RANGE_END};
use crate::repository::AppSettingsRepository;

// =============================================================================
// Setting Keys (centralized constants)
// =============================================================================

/// Setting key constants for type-safe access.
pub mod keys {
    /// OAuth flow settings namespace
    pub mod oauth {
        /// Preferred OAuth callback port (u16)
        pub const CALLBACK_PORT: &str = "oauth.callback_port";
        /// Last port of the fallback scan range (u16)
        pub const CALLBACK_PORT_RANGE_END: &str = "oauth.callback_port_range_end";
        /// Seconds to wait for the browser redirect (u64)
        pub const CALLBACK_TIMEOUT_SECS: &str = "oauth.callback_timeout_secs";
        /// Token endpoint request timeout in seconds (u64)
        pub const TOKEN_TIMEOUT_SECS: &str = "oauth.token_timeout_secs";
    }
}

// =============================================================================
// AppSettingsService
// =============================================================================

/// Service for managing application settings with typed access.
///
/// Wraps the repository with convenient typed methods and default values.
///
/// # Example
/// ```ignore
/// let service = AppSettingsService::new(repo);
///
/// // Typed access with defaults
/// let port = service.get_oauth_callback_port().await;
/// let timeout = service.get_oauth_callback_timeout().await;
///
/// // Set values
/// service.set_oauth_callback_port(18081).await?;
/// ```
pub struct AppSettingsService {
    repository: Arc<dyn AppSettingsRepository>,
}

impl AppSettingsService {
    /// Create a new settings service with the given repository.
    pub fn new(repository: Arc<dyn AppSettingsRepository>) -> Self {
        Self { repository }
    }

    // =========================================================================
    // Generic typed access
    // =========================================================================

    /// Get a setting value parsed as the specified type.
    ///
    /// Returns `None` if the key doesn't exist or parsing fails.
    pub async fn get_typed<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        match self.repository.get(key).await {
            Ok(Some(value)) => {
                // Try parsing as JSON first (for complex types)
                if let Ok(parsed) = serde_json::from_str(&value) {
                    return Some(parsed);
                }
                // For simple types, try wrapping in quotes for JSON parsing
                if let Ok(parsed) = serde_json::from_str(&format!("\"{}\"", value)) {
                    return Some(parsed);
                }
                warn!("[Settings] Failed to parse '{}' value: {}", key, value);
                None
            }
            Ok(None) => None,
            Err(e) => {
                warn!("[Settings] Failed to get '{}': {}", key, e);
                None
            }
        }
    }

    /// Get a setting value with a default if not set.
    pub async fn get_or_default<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        self.get_typed(key).await.unwrap_or(default)
    }

    /// Set a setting value, serializing it appropriately.
    pub async fn set_typed<T: Serialize>(&self, key: &str, value: &T) -> anyhow::Result<()> {
        let serialized = serde_json::to_string(value)?;
        // Remove quotes for simple string values to keep storage clean
        let clean_value = serialized.trim_matches('"');
        self.repository.set(key, clean_value).await
    }

    // =========================================================================
    // OAuth settings
    // =========================================================================

    /// Default seconds to wait for the authorization redirect
    pub const DEFAULT_OAUTH_CALLBACK_TIMEOUT_SECS: u64 = 300;

    /// Default token endpoint timeout in seconds
    pub const DEFAULT_OAUTH_TOKEN_TIMEOUT_SECS: u64 = 30;

    /// Get the preferred OAuth callback port (default 18080).
    pub async fn get_oauth_callback_port(&self) -> u16 {
        self.get_or_default(keys::oauth::CALLBACK_PORT, DEFAULT_OAUTH_CALLBACK_PORT)
            .await
    }

    /// Set the preferred OAuth callback port.
    pub async fn set_oauth_callback_port(&self, port: u16) -> anyhow::Result<()> {
        info!("[Settings] Setting OAuth callback port to {}", port);
        self.set_typed(keys::oauth::CALLBACK_PORT, &port).await
    }

    /// Last port scanned when the preferred port is taken.
    ///
    /// Never below the preferred port; a misconfigured end collapses the
    /// range to the preferred port alone.
    pub async fn get_oauth_callback_port_range_end(&self) -> u16 {
        let port = self.get_oauth_callback_port().await;
        let end = self
            .get_or_default(
                keys::oauth::CALLBACK_PORT_RANGE_END,
                DEFAULT_OAUTH_CALLBACK_PORT_RANGE_END,
            )
            .await;
        end.max(port)
    }

    pub async fn set_oauth_callback_port_range_end(&self, port: u16) -> anyhow::Result<()> {
        info!("[Settings] Setting OAuth callback port range end to {}", port);
        self.set_typed(keys::oauth::CALLBACK_PORT_RANGE_END, &port).await
    }

    /// How long to wait for the browser redirect.
    pub async fn get_oauth_callback_timeout(&self) -> Duration {
        let secs = self
            .get_or_default(
                keys::oauth::CALLBACK_TIMEOUT_SECS,
                Self::DEFAULT_OAUTH_CALLBACK_TIMEOUT_SECS,
            )
            .await;
        Duration::from_secs(secs.max(1))
    }

    pub async fn set_oauth_callback_timeout_secs(&self, secs: u64) -> anyhow::Result<()> {
        info!("[Settings] Setting OAuth callback timeout to {}s", secs);
        self.set_typed(keys::oauth::CALLBACK_TIMEOUT_SECS, &secs).await
    }

    /// Request timeout for token endpoint calls.
    pub async fn get_oauth_token_timeout(&self) -> Duration {
        let secs = self
            .get_or_default(
                keys::oauth::TOKEN_TIMEOUT_SECS,
                Self::DEFAULT_OAUTH_TOKEN_TIMEOUT_SECS,
            )
            .await;
        Duration::from_secs(secs.max(1))
    }

    pub async fn set_oauth_token_timeout_secs(&self, secs: u64) -> anyhow::Result<()> {
        info!("[Settings] Setting OAuth token timeout to {}s", secs);
        self.set_typed(keys::oauth::TOKEN_TIMEOUT_SECS, &secs).await
    }

    /// Stored settings under a namespace prefix, e.g. `"oauth."`.
    pub async fn list_by_prefix(&self, prefix: &str) -> anyhow::Result<Vec<(String, String)>> {
        self.repository.list_by_prefix(prefix).await
    }
}
