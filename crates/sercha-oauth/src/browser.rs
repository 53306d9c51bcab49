//! Opening the authorization URL in the user's browser

use tracing::{info, warn};

/// Opens URLs for the user. Failure is never fatal to a flow; the URL is
/// always shown as well.
pub trait BrowserOpener: Send + Sync {
    fn open(&self, url: &str) -> Result<(), String>;
}

/// Default system browser via the platform opener
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemBrowser;

impl BrowserOpener for SystemBrowser {
    fn open(&self, url: &str) -> Result<(), String> {
        open::that(url).map_err(|e| format!("Failed to open URL: {}", e))
    }
}

/// Never opens anything; for headless sessions.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoBrowser;

impl BrowserOpener for NoBrowser {
    fn open(&self, _url: &str) -> Result<(), String> {
        Err("browser launch disabled".to_string())
    }
}

/// Try to open `url`, logging the outcome.
pub fn open_best_effort(browser: &dyn BrowserOpener, url: &str) -> Result<(), String> {
    match browser.open(url) {
        Ok(()) => {
            info!("[OAuth] Opened browser for authorization");
            Ok(())
        }
        Err(e) => {
            warn!(error = %e, "[OAuth] Could not open browser");
            Err(e)
        }
    }
}
