//! Domain services
//!
//! Business logic that operates on domain entities via repositories.

pub mod app_settings_service;
mod auth_provider_service;
mod credentials_service;
mod source_service;

pub use app_settings_service::{keys, AppSettingsService};
pub use auth_provider_service::AuthProviderService;
pub use credentials_service::CredentialsService;
pub use source_service::SourceService;
