//! Static registries
//!
//! - `connectors` - the built-in connector descriptors and config validation
//! - `providers` - provider capability resolution and OAuth endpoint defaults

mod connectors;
mod providers;

pub use connectors::ConnectorRegistry;
pub use providers::{OAuthEndpoints, ProviderRegistry};
