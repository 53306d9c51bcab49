//! Shared test utilities and fixtures for Sercha integration tests.

pub use sercha_core::domain::{AuthProvider, Credentials, DomainEvent, ProviderType, Source};

/// Mock repository implementations
pub mod mocks;
pub use mocks::MockRepositories;

/// Service test helpers
pub mod services;
pub use services::DriverHarness;

/// Route driver and provisioner logs to the test output.
///
/// Filter with `RUST_LOG`; defaults to `debug` for the sercha crates.
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("sercha_oauth=debug,sercha_core=debug"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}

/// Event testing utilities
pub mod events {
    use sercha_core::{DomainEvent, EventReceiver};
    use std::time::Duration;

    /// Everything already emitted, without waiting
    pub fn drain(rx: &mut EventReceiver) -> Vec<DomainEvent> {
        std::iter::from_fn(|| rx.try_recv()).collect()
    }

    /// Wait for an event matching `predicate`
    pub async fn wait_for_event<F>(
        rx: &mut EventReceiver,
        timeout: Duration,
        predicate: F,
    ) -> Option<DomainEvent>
    where
        F: Fn(&DomainEvent) -> bool,
    {
        let deadline = tokio::time::Instant::now() + timeout;

        loop {
            let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
            if remaining.is_zero() {
                return None;
            }

            match tokio::time::timeout(remaining, rx.recv()).await {
                Ok(Some(event)) if predicate(&event) => return Some(event),
                Ok(Some(_)) => continue, // Not the event we want
                Ok(None) => return None, // Channel closed
                Err(_) => return None,   // Timeout
            }
        }
    }
}

/// Test fixture utilities
pub mod fixtures {
    use super::*;
    use sercha_core::{OAuthCredentials, OAuthProviderConfig};

    /// OAuth app registration whose token endpoint is `token_url`
    pub fn oauth_provider(name: &str, provider_type: ProviderType, token_url: &str) -> AuthProvider {
        AuthProvider::new_oauth(
            name,
            provider_type,
            OAuthProviderConfig {
                client_id: format!("{}-client", name.to_lowercase().replace(' ', "-")),
                client_secret: "test-secret".to_string(),
                auth_url: "https://auth.example.com/authorize".to_string(),
                token_url: token_url.to_string(),
                scopes: vec!["read".to_string()],
            },
        )
    }

    pub fn oauth_tokens(access_token: &str, refresh_token: Option<&str>) -> OAuthCredentials {
        OAuthCredentials {
            access_token: access_token.to_string(),
            refresh_token: refresh_token.map(str::to_string),
            token_type: "Bearer".to_string(),
            expiry: None,
        }
    }

    /// Token endpoint success body
    pub fn token_body(
        access_token: &str,
        refresh_token: Option<&str>,
        expires_in: Option<i64>,
    ) -> serde_json::Value {
        let mut body = serde_json::json!({
            "access_token": access_token,
            "token_type": "Bearer",
        });
        if let Some(rt) = refresh_token {
            body["refresh_token"] = rt.into();
        }
        if let Some(secs) = expires_in {
            body["expires_in"] = secs.into();
        }
        body
    }
}

/// Fake browsers that complete the redirect themselves
pub mod browser {
    use sercha_oauth::BrowserOpener;
    use std::sync::Mutex;

    /// What the fake provider sends back to the callback
    #[derive(Clone, Debug)]
    pub enum Redirect {
        /// `code` with the state from the authorization URL
        Code(String),
        /// `code` with a different state
        ForgedState(String),
        Denied { error: String, description: String },
        /// Never redirects
        Nothing,
    }

    /// Reads `redirect_uri` and `state` off the authorization URL and hits
    /// the callback listener like a real browser would after consent.
    pub struct RedirectingBrowser {
        redirect: Redirect,
        opened: Mutex<Vec<String>>,
    }

    impl RedirectingBrowser {
        pub fn new(redirect: Redirect) -> Self {
            Self {
                redirect,
                opened: Mutex::new(Vec::new()),
            }
        }

        pub fn opened(&self) -> Vec<String> {
            self.opened.lock().unwrap().clone()
        }
    }

    impl BrowserOpener for RedirectingBrowser {
        fn open(&self, auth_url: &str) -> Result<(), String> {
            self.opened.lock().unwrap().push(auth_url.to_string());

            let url = url::Url::parse(auth_url).map_err(|e| e.to_string())?;
            let param = |name: &str| {
                url.query_pairs()
                    .find(|(k, _)| k == name)
                    .map(|(_, v)| v.into_owned())
                    .unwrap_or_default()
            };
            let redirect_uri = param("redirect_uri");
            let state = param("state");

            let query: Vec<(&str, String)> = match &self.redirect {
                Redirect::Code(code) => vec![("code", code.clone()), ("state", state)],
                Redirect::ForgedState(code) => {
                    vec![("code", code.clone()), ("state", "forged-state".to_string())]
                }
                Redirect::Denied { error, description } => vec![
                    ("error", error.clone()),
                    ("error_description", description.clone()),
                    ("state", state),
                ],
                Redirect::Nothing => return Ok(()),
            };

            // Open is called from inside the driver's runtime
            tokio::spawn(async move {
                let _ = reqwest::Client::new()
                    .get(&redirect_uri)
                    .query(&query)
                    .send()
                    .await;
            });
            Ok(())
        }
    }

    /// Always fails, like a headless machine
    pub struct BrokenBrowser;

    impl BrowserOpener for BrokenBrowser {
        fn open(&self, _url: &str) -> Result<(), String> {
            Err("no display".to_string())
        }
    }
}

/// Database test helpers
pub mod db {
    use sercha_storage::Database;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    /// Database file name
    const DB_FILE: &str = "sercha.db";

    /// Create a temporary database for testing
    pub struct TestDatabase {
        pub db: Database,
        _temp_dir: TempDir,
        db_path: PathBuf,
    }

    impl TestDatabase {
        /// Create a new test database in a temporary directory
        pub fn new() -> Self {
            let temp_dir = TempDir::new().expect("Failed to create temp dir");
            let db_path = temp_dir.path().join(DB_FILE);
            let db = Database::open(&db_path).expect("Failed to open test database");
            Self {
                db,
                db_path,
                _temp_dir: temp_dir,
            }
        }

        /// Get the full database file path
        pub fn db_path(&self) -> &Path {
            &self.db_path
        }

        pub fn into_parts(self) -> (Database, TempDir) {
            (self.db, self._temp_dir)
        }
    }

    impl Default for TestDatabase {
        fn default() -> Self {
            Self::new()
        }
    }
}

/// Async test helpers
pub mod async_helpers {
    use std::time::Duration;
    use tokio::time::timeout;

    /// Run an async operation with a timeout
    pub async fn with_timeout<F, T>(duration: Duration, f: F) -> T
    where
        F: std::future::Future<Output = T>,
    {
        timeout(duration, f).await.expect("Operation timed out")
    }

    /// Default test timeout (5 seconds)
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);
}
