//! Centralized branding constants
//!
//! All product naming and well-known local endpoints come from this module.
//!
//! # Usage
//!
//! ```rust
//! use sercha_core::branding;
//!
//! println!("App: {}", branding::DISPLAY_NAME);
//! let uri = branding::oauth_callback_uri_with_port(18080);
//! assert_eq!(uri, "http://localhost:18080/callback");
//! ```

/// Machine name used for directories and keychain entries.
pub const APP_NAME: &str = "sercha";

/// Human readable product name (HTML pages, prompts).
pub const DISPLAY_NAME: &str = "Sercha";

/// Service name under which secrets are stored in the OS keychain.
pub const KEYCHAIN_SERVICE: &str = "com.custodia.sercha";

/// Well-known port the OAuth callback listener tries first.
pub const DEFAULT_OAUTH_CALLBACK_PORT: u16 = 18080;

/// Last port of the fallback scan range when the default port is taken.
pub const DEFAULT_OAUTH_CALLBACK_PORT_RANGE_END: u16 = 18099;

/// Route served by the loopback callback listener.
const OAUTH_CALLBACK_PATH: &str = "/callback";

/// Get the OAuth callback path registered on the loopback listener.
pub fn oauth_callback_path() -> &'static str {
    OAUTH_CALLBACK_PATH
}

/// Get the OAuth redirect URI for a listener port.
///
/// The host is `localhost` even though the listener binds `127.0.0.1`;
/// providers match the redirect URI string exactly, so this shape must not
/// change once an app registration exists.
pub fn oauth_callback_uri_with_port(port: u16) -> String {
    format!("http://localhost:{}{}", port, OAUTH_CALLBACK_PATH)
}
