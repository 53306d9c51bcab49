//! Repository traits for data access
//!
//! These traits define the interface for data storage without specifying
//! the implementation (SQLite, in-memory, etc.)

use async_trait::async_trait;

use crate::domain::{AuthProvider, Credentials, ProviderType, Source};

/// Result type for repository operations
pub type RepoResult<T> = anyhow::Result<T>;

/// Source repository trait
#[async_trait]
pub trait SourceRepository: Send + Sync {
    /// Get all sources
    async fn list(&self) -> RepoResult<Vec<Source>>;

    /// Get a source by ID
    async fn get(&self, id: &str) -> RepoResult<Option<Source>>;

    /// Get all sources using an auth provider
    async fn list_by_auth_provider(&self, auth_provider_id: &str) -> RepoResult<Vec<Source>>;

    /// Insert or replace a source
    async fn save(&self, source: &Source) -> RepoResult<()>;

    /// Delete a source (its credentials go with it)
    async fn delete(&self, id: &str) -> RepoResult<()>;
}

/// AuthProvider repository trait
#[async_trait]
pub trait AuthProviderRepository: Send + Sync {
    /// Get all auth providers
    async fn list(&self) -> RepoResult<Vec<AuthProvider>>;

    /// Get auth providers registered for a provider type
    async fn list_by_provider(&self, provider_type: ProviderType) -> RepoResult<Vec<AuthProvider>>;

    /// Get an auth provider by ID
    async fn get(&self, id: &str) -> RepoResult<Option<AuthProvider>>;

    /// Insert or replace an auth provider
    async fn save(&self, provider: &AuthProvider) -> RepoResult<()>;

    /// Delete an auth provider
    async fn delete(&self, id: &str) -> RepoResult<()>;
}

/// Credentials repository trait
#[async_trait]
pub trait CredentialsRepository: Send + Sync {
    /// Get credentials by ID
    async fn get(&self, id: &str) -> RepoResult<Option<Credentials>>;

    /// Get the credentials owned by a source
    async fn get_for_source(&self, source_id: &str) -> RepoResult<Option<Credentials>>;

    /// Insert or replace credentials
    async fn save(&self, credentials: &Credentials) -> RepoResult<()>;

    /// Delete credentials by ID
    async fn delete(&self, id: &str) -> RepoResult<()>;
}

/// App settings repository trait
///
/// Key-value store for application-wide settings.
#[async_trait]
pub trait AppSettingsRepository: Send + Sync {
    /// Get a setting value by key
    async fn get(&self, key: &str) -> RepoResult<Option<String>>;

    /// Set a setting value (insert or update)
    async fn set(&self, key: &str, value: &str) -> RepoResult<()>;

    /// Delete a setting by key
    async fn delete(&self, key: &str) -> RepoResult<()>;

    /// Get all settings (for export/debug)
    async fn list(&self) -> RepoResult<Vec<(String, String)>>;

    /// Get all settings with a given prefix (e.g., "oauth." returns all OAuth settings)
    async fn list_by_prefix(&self, prefix: &str) -> RepoResult<Vec<(String, String)>>;
}
