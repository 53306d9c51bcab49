//! Credential Provisioner
//!
//! Persists a source and its credentials as one logical unit across two
//! store calls. The source is written first because credentials reference
//! it; a failed credentials save removes the source again.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::domain::{Credentials, DomainEvent, OAuthCredentials, Source};
use crate::error::{CoreError, ProvisionError};
use crate::event_bus::EventSender;
use crate::service::{CredentialsService, SourceService};

/// Secret material handed to the provisioner.
#[derive(Clone, PartialEq, Eq)]
pub enum ProvisionSecret {
    /// Connector needs no authentication
    None,
    Pat { token: String },
    OAuth {
        tokens: OAuthCredentials,
        /// Account the tokens belong to; empty when the lookup failed
        account_identifier: String,
    },
}

impl fmt::Debug for ProvisionSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("None"),
            Self::Pat { .. } => f.write_str("Pat { .. }"),
            Self::OAuth {
                account_identifier, ..
            } => f
                .debug_struct("OAuth")
                .field("account_identifier", account_identifier)
                .finish_non_exhaustive(),
        }
    }
}

/// Everything needed to create a source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionRequest {
    pub connector_id: String,
    pub connector_name: String,
    pub config: HashMap<String, String>,
    /// Empty for PAT-authenticated and auth-free sources
    pub auth_provider_id: String,
    pub secret: ProvisionSecret,
}

impl ProvisionRequest {
    /// Source name from the configuration: a `path`, else `owner/repo`, else
    /// the connector name. OAuth sources get the account in parentheses.
    pub fn source_name(&self) -> String {
        let non_blank = |key: &str| {
            self.config
                .get(key)
                .map(|v| v.trim())
                .filter(|v| !v.is_empty())
        };

        let mut name = match (non_blank("path"), non_blank("owner"), non_blank("repo")) {
            (Some(path), _, _) => path.to_string(),
            (None, Some(owner), Some(repo)) => format!("{}/{}", owner, repo),
            _ => self.connector_name.clone(),
        };

        if let ProvisionSecret::OAuth {
            account_identifier, ..
        } = &self.secret
        {
            if !account_identifier.is_empty() {
                name = format!("{} ({})", name, account_identifier);
            }
        }
        name
    }
}

/// A best-effort step that failed without failing the operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProvisionWarning {
    /// Credentials exist but the source does not point at them yet
    CredentialsLinkFailed { source_id: String, error: String },
}

impl fmt::Display for ProvisionWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CredentialsLinkFailed { source_id, error } => write!(
                f,
                "source {} was saved but could not be linked to its credentials: {}",
                source_id, error
            ),
        }
    }
}

/// Result of a successful provision.
#[derive(Debug, Clone)]
pub struct ProvisionOutcome {
    pub source: Source,
    pub credentials: Option<Credentials>,
    pub warnings: Vec<ProvisionWarning>,
}

/// Creates sources together with their credentials.
pub struct CredentialProvisioner {
    sources: Arc<SourceService>,
    credentials: Arc<CredentialsService>,
    event_sender: Option<EventSender>,
}

impl CredentialProvisioner {
    pub fn new(sources: Arc<SourceService>, credentials: Arc<CredentialsService>) -> Self {
        Self {
            sources,
            credentials,
            event_sender: None,
        }
    }

    pub fn with_events(mut self, event_sender: EventSender) -> Self {
        self.event_sender = Some(event_sender);
        self
    }

    /// Create the source, then its credentials.
    ///
    /// Emits: `SourceOrphaned` when the rollback delete fails
    pub async fn provision(
        &self,
        request: ProvisionRequest,
    ) -> Result<ProvisionOutcome, ProvisionError> {
        let name = request.source_name();
        let mut source = Source::new(&request.connector_id, name, request.config.clone())
            .with_auth_provider(&request.auth_provider_id);

        self.sources
            .add(&source)
            .await
            .map_err(ProvisionError::SourceCreate)?;

        let credentials = match request.secret {
            ProvisionSecret::None => {
                info!(source_id = %source.id, "[Provisioner] Created source without credentials");
                return Ok(ProvisionOutcome {
                    source,
                    credentials: None,
                    warnings: Vec::new(),
                });
            }
            ProvisionSecret::Pat { token } => Credentials::pat(&source.id, token.trim()),
            ProvisionSecret::OAuth {
                tokens,
                account_identifier,
            } => Credentials::oauth(&source.id, account_identifier, tokens),
        };

        if let Err(save_error) = self.credentials.save(&credentials).await {
            return Err(self.roll_back(&source.id, save_error).await);
        }

        let mut warnings = Vec::new();
        source.credentials_id = credentials.id.clone();
        if let Err(e) = self.sources.update(&source).await {
            warn!(
                source_id = %source.id,
                error = %e,
                "[Provisioner] Failed to link credentials to source"
            );
            warnings.push(ProvisionWarning::CredentialsLinkFailed {
                source_id: source.id.clone(),
                error: e.to_string(),
            });
        }

        info!(
            source_id = %source.id,
            credentials_id = %credentials.id,
            "[Provisioner] Created source with credentials"
        );
        Ok(ProvisionOutcome {
            source,
            credentials: Some(credentials),
            warnings,
        })
    }

    async fn roll_back(&self, source_id: &str, save_error: CoreError) -> ProvisionError {
        warn!(
            source_id = %source_id,
            error = %save_error,
            "[Provisioner] Credentials save failed, removing source"
        );

        match self.sources.remove(source_id).await {
            Ok(()) => ProvisionError::CredentialsSave(save_error),
            Err(rollback_error) => {
                error!(
                    source_id = %source_id,
                    error = %rollback_error,
                    "[Provisioner] Rollback failed, source left without credentials"
                );
                if let Some(sender) = &self.event_sender {
                    sender.emit(DomainEvent::SourceOrphaned {
                        source_id: source_id.to_string(),
                        reason: rollback_error.to_string(),
                    });
                }
                ProvisionError::RollbackFailed {
                    source_id: source_id.to_string(),
                    save_error,
                    rollback_error,
                }
            }
        }
    }
}
