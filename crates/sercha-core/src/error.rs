//! Core error taxonomy
//!
//! Repositories return `anyhow` errors; services and the provisioner map them
//! into these typed errors so callers can tell a configuration problem from a
//! storage failure.

use thiserror::Error;

/// Errors raised by the domain services.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("auth provider is in use by one or more sources")]
    AuthProviderInUse,

    #[error("unknown connector type: {0}")]
    UnknownConnector(String),

    #[error("missing required config keys: {}", .keys.join(", "))]
    MissingConfig { keys: Vec<String> },

    #[error(transparent)]
    Repository(#[from] anyhow::Error),
}

impl CoreError {
    /// Problems the user can fix by editing their input.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidInput(_) | Self::MissingConfig { .. } | Self::UnknownConnector(_)
        )
    }
}

/// Result type for domain service operations
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors from persisting a source together with its credentials.
#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error("failed to add source: {0}")]
    SourceCreate(#[source] CoreError),

    /// Credentials could not be saved; the source was rolled back.
    #[error("failed to save credentials: {0}")]
    CredentialsSave(#[source] CoreError),

    /// Credentials could not be saved and the source could not be removed.
    #[error(
        "failed to save credentials ({save_error}); rollback of source {source_id} also failed \
         ({rollback_error}), manual cleanup required"
    )]
    RollbackFailed {
        source_id: String,
        save_error: CoreError,
        rollback_error: CoreError,
    },
}

impl ProvisionError {
    /// True when the store may hold a source without credentials.
    pub fn needs_manual_cleanup(&self) -> bool {
        matches!(self, Self::RollbackFailed { .. })
    }
}
