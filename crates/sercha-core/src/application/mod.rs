//! Application Services - orchestration over the domain services
//!
//! Application services sit between the front-end (the CLI, the OAuth flow
//! driver) and the domain services. They coordinate operations that span
//! several repositories and emit events when something noteworthy happens.
//!
//! # Usage
//!
//! ```ignore
//! let services = ApplicationServicesBuilder::new()
//!     .with_event_bus(event_bus)
//!     .with_source_repo(source_repo)
//!     .with_auth_provider_repo(auth_provider_repo)
//!     .with_credentials_repo(credentials_repo)
//!     .build()?;
//!
//! let outcome = services.provisioner.provision(request).await?;
//! ```

mod provisioner;

pub use provisioner::{
    CredentialProvisioner, ProvisionOutcome, ProvisionRequest, ProvisionSecret, ProvisionWarning,
};

use std::sync::Arc;

use crate::event_bus::EventBus;
use crate::registry::ConnectorRegistry;
use crate::repository::*;
use crate::service::{AuthProviderService, CredentialsService, SourceService};

/// Builder for creating all application services with shared dependencies
pub struct ApplicationServicesBuilder {
    event_bus: Option<Arc<EventBus>>,
    connectors: Option<Arc<ConnectorRegistry>>,
    source_repo: Option<Arc<dyn SourceRepository>>,
    auth_provider_repo: Option<Arc<dyn AuthProviderRepository>>,
    credentials_repo: Option<Arc<dyn CredentialsRepository>>,
}

impl ApplicationServicesBuilder {
    pub fn new() -> Self {
        Self {
            event_bus: None,
            connectors: None,
            source_repo: None,
            auth_provider_repo: None,
            credentials_repo: None,
        }
    }

    pub fn with_event_bus(mut self, bus: Arc<EventBus>) -> Self {
        self.event_bus = Some(bus);
        self
    }

    /// Defaults to the built-in connectors
    pub fn with_connectors(mut self, connectors: Arc<ConnectorRegistry>) -> Self {
        self.connectors = Some(connectors);
        self
    }

    pub fn with_source_repo(mut self, repo: Arc<dyn SourceRepository>) -> Self {
        self.source_repo = Some(repo);
        self
    }

    pub fn with_auth_provider_repo(mut self, repo: Arc<dyn AuthProviderRepository>) -> Self {
        self.auth_provider_repo = Some(repo);
        self
    }

    pub fn with_credentials_repo(mut self, repo: Arc<dyn CredentialsRepository>) -> Self {
        self.credentials_repo = Some(repo);
        self
    }

    /// Build all application services
    ///
    /// Returns an error if a required dependency is missing.
    pub fn build(self) -> anyhow::Result<ApplicationServices> {
        let event_bus = self.event_bus.unwrap_or_else(|| Arc::new(EventBus::new()));
        let connectors = self
            .connectors
            .unwrap_or_else(|| Arc::new(ConnectorRegistry::builtin()));
        let source_repo = self
            .source_repo
            .ok_or_else(|| anyhow::anyhow!("source_repo is required"))?;
        let auth_provider_repo = self
            .auth_provider_repo
            .ok_or_else(|| anyhow::anyhow!("auth_provider_repo is required"))?;
        let credentials_repo = self
            .credentials_repo
            .ok_or_else(|| anyhow::anyhow!("credentials_repo is required"))?;

        let sender = event_bus.sender();

        let sources = Arc::new(
            SourceService::new(source_repo.clone(), connectors.clone()).with_events(sender.clone()),
        );
        let auth_providers = Arc::new(
            AuthProviderService::new(auth_provider_repo, source_repo).with_events(sender.clone()),
        );
        let credentials =
            Arc::new(CredentialsService::new(credentials_repo).with_events(sender.clone()));
        let provisioner = Arc::new(
            CredentialProvisioner::new(sources.clone(), credentials.clone()).with_events(sender),
        );

        Ok(ApplicationServices {
            event_bus,
            connectors,
            sources,
            auth_providers,
            credentials,
            provisioner,
        })
    }
}

impl Default for ApplicationServicesBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Container for all application services
#[derive(Clone)]
pub struct ApplicationServices {
    pub event_bus: Arc<EventBus>,
    pub connectors: Arc<ConnectorRegistry>,
    pub sources: Arc<SourceService>,
    pub auth_providers: Arc<AuthProviderService>,
    pub credentials: Arc<CredentialsService>,
    pub provisioner: Arc<CredentialProvisioner>,
}
