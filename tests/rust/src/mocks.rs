//! Mock repository implementations for testing
//!
//! In-memory implementations of all repository traits for fast, isolated
//! tests. Each mock can be told to fail specific calls.

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use sercha_core::{
    domain::{AuthProvider, Credentials, ProviderType, Source},
    repository::{
        AppSettingsRepository, AuthProviderRepository, CredentialsRepository, RepoResult,
        SourceRepository,
    },
};

fn injected(flag: &AtomicBool, what: &str) -> RepoResult<()> {
    if flag.load(Ordering::SeqCst) {
        anyhow::bail!("injected {} failure", what);
    }
    Ok(())
}

// ============================================================================
// MockSourceRepository
// ============================================================================

#[derive(Default)]
pub struct MockSourceRepository {
    sources: RwLock<HashMap<String, Source>>,
    fail_inserts: AtomicBool,
    fail_updates: AtomicBool,
    fail_deletes: AtomicBool,
}

impl MockSourceRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail saves of sources not stored yet
    pub fn fail_inserts(&self, fail: bool) {
        self.fail_inserts.store(fail, Ordering::SeqCst);
    }

    /// Fail saves of sources already stored
    pub fn fail_updates(&self, fail: bool) {
        self.fail_updates.store(fail, Ordering::SeqCst);
    }

    pub fn fail_deletes(&self, fail: bool) {
        self.fail_deletes.store(fail, Ordering::SeqCst);
    }

    pub fn count(&self) -> usize {
        self.sources.read().unwrap().len()
    }

    pub fn all(&self) -> Vec<Source> {
        self.sources.read().unwrap().values().cloned().collect()
    }
}

#[async_trait]
impl SourceRepository for MockSourceRepository {
    async fn list(&self) -> RepoResult<Vec<Source>> {
        let mut sources = self.all();
        sources.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(sources)
    }

    async fn get(&self, id: &str) -> RepoResult<Option<Source>> {
        Ok(self.sources.read().unwrap().get(id).cloned())
    }

    async fn list_by_auth_provider(&self, auth_provider_id: &str) -> RepoResult<Vec<Source>> {
        Ok(self
            .all()
            .into_iter()
            .filter(|s| s.auth_provider_id == auth_provider_id)
            .collect())
    }

    async fn save(&self, source: &Source) -> RepoResult<()> {
        let exists = self.sources.read().unwrap().contains_key(&source.id);
        if exists {
            injected(&self.fail_updates, "source update")?;
        } else {
            injected(&self.fail_inserts, "source insert")?;
        }
        self.sources
            .write()
            .unwrap()
            .insert(source.id.clone(), source.clone());
        Ok(())
    }

    async fn delete(&self, id: &str) -> RepoResult<()> {
        injected(&self.fail_deletes, "source delete")?;
        self.sources.write().unwrap().remove(id);
        Ok(())
    }
}

// ============================================================================
// MockAuthProviderRepository
// ============================================================================

#[derive(Default)]
pub struct MockAuthProviderRepository {
    providers: RwLock<HashMap<String, AuthProvider>>,
    fail_lists: AtomicBool,
    fail_saves: AtomicBool,
}

impl MockAuthProviderRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_provider(self, provider: AuthProvider) -> Self {
        self.providers
            .write()
            .unwrap()
            .insert(provider.id.clone(), provider);
        self
    }

    pub fn fail_lists(&self, fail: bool) {
        self.fail_lists.store(fail, Ordering::SeqCst);
    }

    pub fn fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    pub fn count(&self) -> usize {
        self.providers.read().unwrap().len()
    }
}

#[async_trait]
impl AuthProviderRepository for MockAuthProviderRepository {
    async fn list(&self) -> RepoResult<Vec<AuthProvider>> {
        injected(&self.fail_lists, "auth provider list")?;
        let mut providers: Vec<_> = self.providers.read().unwrap().values().cloned().collect();
        providers.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.name.cmp(&b.name)));
        Ok(providers)
    }

    async fn list_by_provider(&self, provider_type: ProviderType) -> RepoResult<Vec<AuthProvider>> {
        Ok(self
            .list()
            .await?
            .into_iter()
            .filter(|p| p.provider_type == provider_type)
            .collect())
    }

    async fn get(&self, id: &str) -> RepoResult<Option<AuthProvider>> {
        Ok(self.providers.read().unwrap().get(id).cloned())
    }

    async fn save(&self, provider: &AuthProvider) -> RepoResult<()> {
        injected(&self.fail_saves, "auth provider save")?;
        self.providers
            .write()
            .unwrap()
            .insert(provider.id.clone(), provider.clone());
        Ok(())
    }

    async fn delete(&self, id: &str) -> RepoResult<()> {
        self.providers.write().unwrap().remove(id);
        Ok(())
    }
}

// ============================================================================
// MockCredentialsRepository
// ============================================================================

#[derive(Default)]
pub struct MockCredentialsRepository {
    credentials: RwLock<HashMap<String, Credentials>>,
    fail_saves: AtomicBool,
}

impl MockCredentialsRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    pub fn count(&self) -> usize {
        self.credentials.read().unwrap().len()
    }
}

#[async_trait]
impl CredentialsRepository for MockCredentialsRepository {
    async fn get(&self, id: &str) -> RepoResult<Option<Credentials>> {
        Ok(self.credentials.read().unwrap().get(id).cloned())
    }

    async fn get_for_source(&self, source_id: &str) -> RepoResult<Option<Credentials>> {
        Ok(self
            .credentials
            .read()
            .unwrap()
            .values()
            .find(|c| c.source_id == source_id)
            .cloned())
    }

    async fn save(&self, credentials: &Credentials) -> RepoResult<()> {
        injected(&self.fail_saves, "credentials save")?;
        self.credentials
            .write()
            .unwrap()
            .insert(credentials.id.clone(), credentials.clone());
        Ok(())
    }

    async fn delete(&self, id: &str) -> RepoResult<()> {
        self.credentials.write().unwrap().remove(id);
        Ok(())
    }
}

// ============================================================================
// MockAppSettingsRepository
// ============================================================================

#[derive(Default)]
pub struct MockAppSettingsRepository {
    settings: RwLock<BTreeMap<String, String>>,
}

impl MockAppSettingsRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AppSettingsRepository for MockAppSettingsRepository {
    async fn get(&self, key: &str) -> RepoResult<Option<String>> {
        Ok(self.settings.read().unwrap().get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> RepoResult<()> {
        self.settings
            .write()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn delete(&self, key: &str) -> RepoResult<()> {
        self.settings.write().unwrap().remove(key);
        Ok(())
    }

    async fn list(&self) -> RepoResult<Vec<(String, String)>> {
        Ok(self
            .settings
            .read()
            .unwrap()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }

    async fn list_by_prefix(&self, prefix: &str) -> RepoResult<Vec<(String, String)>> {
        Ok(self
            .list()
            .await?
            .into_iter()
            .filter(|(k, _)| k.starts_with(prefix))
            .collect())
    }
}

// ============================================================================
// MockRepositories
// ============================================================================

/// One of every mock, shared through `Arc`s
pub struct MockRepositories {
    pub sources: Arc<MockSourceRepository>,
    pub auth_providers: Arc<MockAuthProviderRepository>,
    pub credentials: Arc<MockCredentialsRepository>,
    pub settings: Arc<MockAppSettingsRepository>,
}

impl MockRepositories {
    /// Create a fresh set of empty mock repositories
    pub fn new() -> Self {
        Self {
            sources: Arc::new(MockSourceRepository::new()),
            auth_providers: Arc::new(MockAuthProviderRepository::new()),
            credentials: Arc::new(MockCredentialsRepository::new()),
            settings: Arc::new(MockAppSettingsRepository::new()),
        }
    }

    pub fn with_auth_providers(providers: impl IntoIterator<Item = AuthProvider>) -> Self {
        let repo = providers
            .into_iter()
            .fold(MockAuthProviderRepository::new(), |repo, p| repo.with_provider(p));
        Self {
            auth_providers: Arc::new(repo),
            ..Self::new()
        }
    }
}

impl Default for MockRepositories {
    fn default() -> Self {
        Self::new()
    }
}
