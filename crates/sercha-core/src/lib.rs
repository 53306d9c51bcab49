//! # Sercha Core Library
//!
//! Domain model and business rules for connecting data sources.
//!
//! ## Modules
//!
//! - `branding` - Centralized branding constants
//! - `domain` - Core entities (Source, AuthProvider, Credentials, ConnectorDescriptor)
//! - `registry` - Static connector registry and provider capability resolver
//! - `repository` - Data access traits
//! - `service` - Domain services
//! - `application` - Orchestration, including the credential provisioner
//! - `event_bus` - Domain event distribution
//! - `error` - Error taxonomy

pub mod application;
pub mod branding;
pub mod domain;
pub mod error;
pub mod event_bus;
pub mod registry;
pub mod repository;
pub mod service;

// Re-export commonly used types
pub use domain::*;
pub use error::{CoreError, CoreResult, ProvisionError};
pub use repository::*;
pub use service::*;

pub use event_bus::{EventBus, EventReceiver, EventSender};
pub use registry::{ConnectorRegistry, OAuthEndpoints, ProviderRegistry};
pub use application::{
    ApplicationServices, ApplicationServicesBuilder, CredentialProvisioner, ProvisionOutcome,
    ProvisionRequest, ProvisionSecret, ProvisionWarning,
};
