//! Sercha OAuth
//!
//! Browser-based authorization for data sources:
//! - PKCE (S256) and CSRF state generation
//! - Loopback callback listener with single delivery and bounded wait
//! - Callback port selection with visible fallback
//! - Token exchange and refresh grants
//! - Per-provider handlers (GitHub, Google)
//! - The add-source wizard and the driver that executes its effects

pub mod browser;
pub mod callback;
pub mod driver;
pub mod error;
pub mod handler;
pub mod pkce;
pub mod port;
pub mod token;
pub mod wizard;

pub use browser::{open_best_effort, BrowserOpener, NoBrowser, SystemBrowser};
pub use callback::{validate_callback, CallbackListener, CallbackParams};
pub use driver::{FlowDriver, FlowSettings};
pub use error::OAuthError;
pub use handler::{GitHubHandler, GoogleHandler, HandlerRegistry, OAuthHandler};
pub use pkce::{code_challenge, generate_code_verifier, generate_state, PkceChallenge};
pub use port::{select_callback_port, PortFallback, PortSelection};
pub use token::{compute_expiry, TokenExchanger, TokenResponse, DEFAULT_TOKEN_TIMEOUT};
pub use wizard::{
    AuthorizedTokens, Busy, Draft, Effect, PreparedOAuth, ProviderSelection, Step, Wizard,
    WizardEvent, WizardState,
};
