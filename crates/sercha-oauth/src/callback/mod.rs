//! Loopback callback listener
//!
//! Catches the provider's redirect on `http://localhost:{port}/callback`
//! (RFC 8252 Section 7.3) and hands exactly one outcome to the waiting flow.
//! The server keeps answering repeated hits, but only the first outcome is
//! delivered; later ones are dropped without blocking the handler.

mod page;

use axum::{
    extract::{Query, State},
    response::Html,
    routing::get,
    Router,
};
use parking_lot::Mutex;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use sercha_core::branding;

use crate::error::OAuthError;

/// Upper bound on graceful shutdown before the server task is aborted
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

type CallbackOutcome = Result<String, OAuthError>;

/// Query parameters of the redirect
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CallbackParams {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub error_description: Option<String>,
}

/// Decide the outcome of one redirect
///
/// Order matters: a provider `error` wins, then the state check runs
/// whether or not a code is present, then the code is required.
pub fn validate_callback(params: &CallbackParams, expected_state: &str) -> CallbackOutcome {
    if let Some(error) = params.error.as_deref().filter(|e| !e.is_empty()) {
        return Err(OAuthError::ProviderDenied {
            error: error.to_string(),
            description: params.error_description.clone().unwrap_or_default(),
        });
    }

    if params.state.as_deref() != Some(expected_state) {
        return Err(OAuthError::StateMismatch);
    }

    match params.code.as_deref() {
        Some(code) if !code.is_empty() => Ok(code.to_string()),
        _ => Err(OAuthError::MissingCode),
    }
}

/// Shared with the request handler
struct CallbackContext {
    expected_state: String,
    /// Single-slot handoff; the first delivery takes the sender
    slot: Mutex<Option<oneshot::Sender<CallbackOutcome>>>,
}

impl CallbackContext {
    fn deliver(&self, outcome: CallbackOutcome) {
        match self.slot.lock().take() {
            Some(tx) => {
                if tx.send(outcome).is_err() {
                    debug!("[OAuth] Callback receiver already gone");
                }
            }
            None => debug!("[OAuth] Dropping repeated callback, outcome already delivered"),
        }
    }
}

async fn handle_callback(
    State(ctx): State<Arc<CallbackContext>>,
    Query(params): Query<CallbackParams>,
) -> Html<String> {
    let outcome = validate_callback(&params, &ctx.expected_state);
    let html = page::render(&outcome);

    match &outcome {
        Ok(_) => info!("[OAuth] Authorization code received on callback"),
        Err(OAuthError::StateMismatch) => {
            let got = params.state.as_deref().unwrap_or_default();
            let got = &got[..got.char_indices().nth(8).map(|(i, _)| i).unwrap_or(got.len())];
            warn!(received_state = %got, "[OAuth] Callback state mismatch");
        }
        Err(e) => warn!(error = %e, "[OAuth] Callback reported failure"),
    }

    ctx.deliver(outcome);
    Html(html)
}

/// A running callback server bound to one loopback port.
pub struct CallbackListener {
    port: u16,
    shutdown_tx: watch::Sender<bool>,
    server: Mutex<Option<JoinHandle<()>>>,
    result_rx: Mutex<Option<oneshot::Receiver<CallbackOutcome>>>,
}

impl CallbackListener {
    /// Bind `127.0.0.1:port` and start serving in the background.
    ///
    /// Port `0` asks the OS for any free port; [`port`](Self::port) reports
    /// the one actually bound. Bind failures are returned here.
    pub async fn start(port: u16, expected_state: impl Into<String>) -> Result<Self, OAuthError> {
        let listener = TcpListener::bind(("127.0.0.1", port))
            .await
            .map_err(|e| OAuthError::CallbackServerStart(e.to_string()))?;
        let port = listener
            .local_addr()
            .map_err(|e| OAuthError::CallbackServerStart(e.to_string()))?
            .port();

        let (result_tx, result_rx) = oneshot::channel();
        let ctx = Arc::new(CallbackContext {
            expected_state: expected_state.into(),
            slot: Mutex::new(Some(result_tx)),
        });

        let app = Router::new()
            .route(branding::oauth_callback_path(), get(handle_callback))
            .with_state(ctx);

        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let server = tokio::spawn(async move {
            let server = axum::serve(listener, app).with_graceful_shutdown(async move {
                let _ = shutdown_rx.changed().await;
                debug!("[OAuth] Callback server shutting down");
            });

            if let Err(e) = server.await {
                error!("[OAuth] Callback server error: {}", e);
            }
        });

        info!("[OAuth] Callback server listening on 127.0.0.1:{}", port);

        Ok(Self {
            port,
            shutdown_tx,
            server: Mutex::new(Some(server)),
            result_rx: Mutex::new(Some(result_rx)),
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn redirect_uri(&self) -> String {
        branding::oauth_callback_uri_with_port(self.port)
    }

    /// Wait for the first callback outcome, at most `timeout`.
    ///
    /// Only one caller gets the outcome; a second wait returns
    /// [`OAuthError::ListenerClosed`].
    pub async fn wait_for_code(&self, timeout: Duration) -> Result<String, OAuthError> {
        let rx = self
            .result_rx
            .lock()
            .take()
            .ok_or(OAuthError::ListenerClosed)?;

        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(_)) => Err(OAuthError::ListenerClosed),
            Err(_) => {
                warn!(
                    "[OAuth] No callback within {}s on port {}",
                    timeout.as_secs(),
                    self.port
                );
                Err(OAuthError::CallbackTimeout)
            }
        }
    }

    /// Shut the server down and release the port. Safe to call repeatedly.
    pub async fn stop(&self) {
        let _ = self.shutdown_tx.send(true);

        let handle = self.server.lock().take();
        let Some(mut handle) = handle else {
            return;
        };

        match tokio::time::timeout(SHUTDOWN_GRACE, &mut handle).await {
            Ok(_) => info!("[OAuth] Callback server on port {} stopped", self.port),
            Err(_) => {
                warn!(
                    "[OAuth] Callback server on port {} did not stop within {}s, aborting",
                    self.port,
                    SHUTDOWN_GRACE.as_secs()
                );
                handle.abort();
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.server
            .lock()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }
}

impl Drop for CallbackListener {
    fn drop(&mut self) {
        let _ = self.shutdown_tx.send(true);
        if let Some(handle) = self.server.get_mut().take() {
            handle.abort();
        }
    }
}
