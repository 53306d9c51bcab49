//! Domain Events - facts emitted while sources and authorizations change
//!
//! Events are emitted by the domain services, the provisioner and the OAuth
//! flow driver. The CLI writes each invocation's events to the log, raising
//! `SourceOrphaned` at error level.

use serde::{Deserialize, Serialize};

use super::ProviderType;

/// Unified domain event type.
///
/// # Serialization
///
/// Events serialize with a `type` field containing the snake_case variant name:
/// ```json
/// { "type": "source_added", "source_id": "...", "source_type": "github", "name": "..." }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DomainEvent {
    // ════════════════════════════════════════════════════════════════════════
    // SOURCES
    // ════════════════════════════════════════════════════════════════════════
    SourceAdded {
        source_id: String,
        source_type: String,
        name: String,
    },

    SourceUpdated {
        source_id: String,
    },

    SourceRemoved {
        source_id: String,
    },

    /// A source was left behind after a failed credentials save and could
    /// not be deleted. Needs manual cleanup.
    SourceOrphaned {
        source_id: String,
        reason: String,
    },

    // ════════════════════════════════════════════════════════════════════════
    // AUTH PROVIDERS & CREDENTIALS
    // ════════════════════════════════════════════════════════════════════════
    AuthProviderCreated {
        auth_provider_id: String,
        provider_type: ProviderType,
        name: String,
    },

    AuthProviderDeleted {
        auth_provider_id: String,
    },

    CredentialsSaved {
        credentials_id: String,
        source_id: String,
    },

    CredentialsDeleted {
        credentials_id: String,
    },

    // ════════════════════════════════════════════════════════════════════════
    // OAUTH FLOW
    // ════════════════════════════════════════════════════════════════════════
    /// Browser authorization started; the listener is waiting on `redirect_uri`
    #[serde(rename = "oauth_flow_started")]
    OAuthFlowStarted {
        connector_id: String,
        auth_provider_id: String,
        redirect_uri: String,
    },

    #[serde(rename = "oauth_flow_completed")]
    OAuthFlowCompleted {
        connector_id: String,
        auth_provider_id: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        account: Option<String>,
    },

    #[serde(rename = "oauth_flow_failed")]
    OAuthFlowFailed {
        connector_id: String,
        error: String,
    },
}

impl DomainEvent {
    /// Get the event type name as a string
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::SourceAdded { .. } => "source_added",
            Self::SourceUpdated { .. } => "source_updated",
            Self::SourceRemoved { .. } => "source_removed",
            Self::SourceOrphaned { .. } => "source_orphaned",
            Self::AuthProviderCreated { .. } => "auth_provider_created",
            Self::AuthProviderDeleted { .. } => "auth_provider_deleted",
            Self::CredentialsSaved { .. } => "credentials_saved",
            Self::CredentialsDeleted { .. } => "credentials_deleted",
            Self::OAuthFlowStarted { .. } => "oauth_flow_started",
            Self::OAuthFlowCompleted { .. } => "oauth_flow_completed",
            Self::OAuthFlowFailed { .. } => "oauth_flow_failed",
        }
    }

    /// Source this event is about, if any
    pub fn source_id(&self) -> Option<&str> {
        match self {
            Self::SourceAdded { source_id, .. }
            | Self::SourceUpdated { source_id }
            | Self::SourceRemoved { source_id }
            | Self::SourceOrphaned { source_id, .. }
            | Self::CredentialsSaved { source_id, .. } => Some(source_id.as_str()),
            _ => None,
        }
    }

    /// Whether this event belongs to the browser authorization flow
    pub fn is_oauth_flow(&self) -> bool {
        matches!(
            self,
            Self::OAuthFlowStarted { .. }
                | Self::OAuthFlowCompleted { .. }
                | Self::OAuthFlowFailed { .. }
        )
    }
}
