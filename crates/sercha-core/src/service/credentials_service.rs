//! Credentials service

use std::sync::Arc;
use tracing::debug;

use crate::domain::{Credentials, DomainEvent};
use crate::error::{CoreError, CoreResult};
use crate::event_bus::EventSender;
use crate::repository::CredentialsRepository;

/// Service for managing Credentials
pub struct CredentialsService {
    repository: Arc<dyn CredentialsRepository>,
    event_sender: Option<EventSender>,
}

impl CredentialsService {
    pub fn new(repository: Arc<dyn CredentialsRepository>) -> Self {
        Self {
            repository,
            event_sender: None,
        }
    }

    pub fn with_events(mut self, event_sender: EventSender) -> Self {
        self.event_sender = Some(event_sender);
        self
    }

    /// Emits: `CredentialsSaved`
    pub async fn save(&self, credentials: &Credentials) -> CoreResult<()> {
        if credentials.id.is_empty() {
            return Err(CoreError::InvalidInput("credentials id is required".to_string()));
        }
        if credentials.source_id.is_empty() {
            return Err(CoreError::InvalidInput(
                "credentials source id is required".to_string(),
            ));
        }

        self.repository.save(credentials).await?;
        debug!(
            credentials_id = %credentials.id,
            source_id = %credentials.source_id,
            method = credentials.secret.method().as_str(),
            "[CredentialsService] Saved credentials"
        );

        if let Some(sender) = &self.event_sender {
            sender.emit(DomainEvent::CredentialsSaved {
                credentials_id: credentials.id.clone(),
                source_id: credentials.source_id.clone(),
            });
        }
        Ok(())
    }

    pub async fn get(&self, id: &str) -> CoreResult<Credentials> {
        self.repository
            .get(id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("credentials {}", id)))
    }

    pub async fn get_for_source(&self, source_id: &str) -> CoreResult<Option<Credentials>> {
        Ok(self.repository.get_for_source(source_id).await?)
    }

    /// Emits: `CredentialsDeleted`
    pub async fn delete(&self, id: &str) -> CoreResult<()> {
        self.repository.delete(id).await?;

        if let Some(sender) = &self.event_sender {
            sender.emit(DomainEvent::CredentialsDeleted {
                credentials_id: id.to_string(),
            });
        }
        Ok(())
    }
}
