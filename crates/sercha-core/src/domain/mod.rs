//! Domain entities, value objects, and events
//!
//! This module contains all domain-level types for Sercha:
//! - Entities (Source, AuthProvider, Credentials)
//! - Value Objects (AuthCapability, AuthMethod, ProviderType, ConnectorDescriptor)
//! - Ephemeral flow state (OAuthFlowState)
//! - Domain Events (DomainEvent enum for event-driven architecture)

mod auth;
mod auth_provider;
mod connector;
mod credentials;
mod event;
mod oauth_flow;
mod source;

pub use auth::*;
pub use auth_provider::*;
pub use connector::*;
pub use credentials::*;
pub use event::DomainEvent;
pub use oauth_flow::OAuthFlowState;
pub use source::*;
