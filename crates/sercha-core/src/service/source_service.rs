//! Source service - business logic for configured sources

use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

use crate::domain::{DomainEvent, Source};
use crate::error::{CoreError, CoreResult};
use crate::event_bus::EventSender;
use crate::registry::ConnectorRegistry;
use crate::repository::SourceRepository;

/// Service for managing Sources
pub struct SourceService {
    repository: Arc<dyn SourceRepository>,
    connectors: Arc<ConnectorRegistry>,
    event_sender: Option<EventSender>,
}

impl SourceService {
    pub fn new(repository: Arc<dyn SourceRepository>, connectors: Arc<ConnectorRegistry>) -> Self {
        Self {
            repository,
            connectors,
            event_sender: None,
        }
    }

    /// Emit domain events for every change
    pub fn with_events(mut self, event_sender: EventSender) -> Self {
        self.event_sender = Some(event_sender);
        self
    }

    /// Persist a new source
    ///
    /// Emits: `SourceAdded`
    pub async fn add(&self, source: &Source) -> CoreResult<()> {
        if source.id.is_empty() {
            return Err(CoreError::InvalidInput("source id is required".to_string()));
        }
        if self.repository.get(&source.id).await?.is_some() {
            return Err(CoreError::AlreadyExists(format!("source {}", source.id)));
        }

        self.repository.save(source).await?;
        info!(
            source_id = %source.id,
            source_type = %source.source_type,
            "[SourceService] Added source"
        );

        if let Some(sender) = &self.event_sender {
            sender.emit(DomainEvent::SourceAdded {
                source_id: source.id.clone(),
                source_type: source.source_type.clone(),
                name: source.name.clone(),
            });
        }
        Ok(())
    }

    pub async fn get(&self, id: &str) -> CoreResult<Source> {
        self.repository
            .get(id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("source {}", id)))
    }

    pub async fn list(&self) -> CoreResult<Vec<Source>> {
        Ok(self.repository.list().await?)
    }

    /// Replace an existing source
    ///
    /// Emits: `SourceUpdated`
    pub async fn update(&self, source: &Source) -> CoreResult<()> {
        let existing = self.get(&source.id).await?;

        let mut updated = source.clone();
        updated.created_at = existing.created_at;
        updated.updated_at = chrono::Utc::now();
        self.repository.save(&updated).await?;

        if let Some(sender) = &self.event_sender {
            sender.emit(DomainEvent::SourceUpdated {
                source_id: source.id.clone(),
            });
        }
        Ok(())
    }

    /// Delete a source and, through the store, its credentials
    ///
    /// Emits: `SourceRemoved`
    pub async fn remove(&self, id: &str) -> CoreResult<()> {
        self.repository.delete(id).await?;
        info!(source_id = %id, "[SourceService] Removed source");

        if let Some(sender) = &self.event_sender {
            sender.emit(DomainEvent::SourceRemoved {
                source_id: id.to_string(),
            });
        }
        Ok(())
    }

    pub fn validate_config(&self, source_type: &str, config: &HashMap<String, String>) -> CoreResult<()> {
        self.connectors.validate_config(source_type, config)
    }
}
