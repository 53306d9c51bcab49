//! Auth provider service - OAuth app registrations

use std::sync::Arc;
use tracing::info;

use crate::domain::{AuthProvider, DomainEvent, ProviderType};
use crate::error::{CoreError, CoreResult};
use crate::event_bus::EventSender;
use crate::repository::{AuthProviderRepository, SourceRepository};

/// Service for managing AuthProviders
pub struct AuthProviderService {
    repository: Arc<dyn AuthProviderRepository>,
    sources: Arc<dyn SourceRepository>,
    event_sender: Option<EventSender>,
}

impl AuthProviderService {
    pub fn new(
        repository: Arc<dyn AuthProviderRepository>,
        sources: Arc<dyn SourceRepository>,
    ) -> Self {
        Self {
            repository,
            sources,
            event_sender: None,
        }
    }

    pub fn with_events(mut self, event_sender: EventSender) -> Self {
        self.event_sender = Some(event_sender);
        self
    }

    /// Insert or replace a provider
    ///
    /// Emits: `AuthProviderCreated` for providers not seen before
    pub async fn save(&self, provider: &AuthProvider) -> CoreResult<()> {
        if provider.id.is_empty() {
            return Err(CoreError::InvalidInput(
                "auth provider id is required".to_string(),
            ));
        }

        let is_new = self.repository.get(&provider.id).await?.is_none();
        self.repository.save(provider).await?;

        if is_new {
            info!(
                auth_provider_id = %provider.id,
                provider_type = %provider.provider_type,
                "[AuthProviderService] Created auth provider"
            );
            if let Some(sender) = &self.event_sender {
                sender.emit(DomainEvent::AuthProviderCreated {
                    auth_provider_id: provider.id.clone(),
                    provider_type: provider.provider_type,
                    name: provider.name.clone(),
                });
            }
        }
        Ok(())
    }

    pub async fn get(&self, id: &str) -> CoreResult<AuthProvider> {
        self.repository
            .get(id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("auth provider {}", id)))
    }

    pub async fn list(&self) -> CoreResult<Vec<AuthProvider>> {
        Ok(self.repository.list().await?)
    }

    pub async fn list_by_provider(&self, provider_type: ProviderType) -> CoreResult<Vec<AuthProvider>> {
        Ok(self.repository.list_by_provider(provider_type).await?)
    }

    /// Delete a provider no source references
    ///
    /// Emits: `AuthProviderDeleted`
    pub async fn delete(&self, id: &str) -> CoreResult<()> {
        if !self.sources.list_by_auth_provider(id).await?.is_empty() {
            return Err(CoreError::AuthProviderInUse);
        }

        self.repository.delete(id).await?;
        info!(auth_provider_id = %id, "[AuthProviderService] Deleted auth provider");

        if let Some(sender) = &self.event_sender {
            sender.emit(DomainEvent::AuthProviderDeleted {
                auth_provider_id: id.to_string(),
            });
        }
        Ok(())
    }
}
