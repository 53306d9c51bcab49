//! Flow driver - executes wizard effects
//!
//! The driver owns the [`Wizard`], at most one [`CallbackListener`] and the
//! task waiting on it. Quick effects (listener start/stop, browser) run
//! inline; slow ones (database, network) run as tokio tasks whose results
//! come back through an mpsc channel as [`WizardEvent`]s.
//!
//! # Usage
//!
//! ```ignore
//! let mut driver = FlowDriver::new(Wizard::new(&connectors), auth_providers, provisioner, handlers)
//!     .with_events(event_bus.sender());
//! driver.dispatch(WizardEvent::SelectConnector(0)).await;
//! while driver.wizard().busy().is_some() {
//!     let event = driver.next_completion().await;
//!     driver.dispatch(event).await;
//! }
//! ```

use std::collections::VecDeque;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use sercha_core::{
    branding, AppSettingsService, AuthProvider, AuthProviderService, ConnectorDescriptor,
    CredentialProvisioner, DomainEvent, EventSender, OAuthFlowState, OAuthProviderConfig,
    ProviderType,
};

use crate::browser::{open_best_effort, BrowserOpener, SystemBrowser};
use crate::callback::CallbackListener;
use crate::handler::{HandlerRegistry, OAuthHandler};
use crate::pkce::{generate_state, PkceChallenge};
use crate::port::select_callback_port;
use crate::token::{TokenExchanger, DEFAULT_TOKEN_TIMEOUT};
use crate::wizard::{
    AuthorizedTokens, Effect, PreparedOAuth, ProviderSelection, Wizard, WizardEvent, WizardState,
};

/// Ports and timeouts for authorization attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlowSettings {
    pub callback_port: u16,
    /// Last port tried before falling back to an ephemeral one
    pub callback_port_range_end: u16,
    pub callback_timeout: Duration,
    pub token_timeout: Duration,
}

impl Default for FlowSettings {
    fn default() -> Self {
        Self {
            callback_port: branding::DEFAULT_OAUTH_CALLBACK_PORT,
            callback_port_range_end: branding::DEFAULT_OAUTH_CALLBACK_PORT_RANGE_END,
            callback_timeout: Duration::from_secs(
                AppSettingsService::DEFAULT_OAUTH_CALLBACK_TIMEOUT_SECS,
            ),
            token_timeout: DEFAULT_TOKEN_TIMEOUT,
        }
    }
}

impl FlowSettings {
    /// Read the `oauth.*` settings, with defaults for anything unset.
    pub async fn load(settings: &AppSettingsService) -> Self {
        Self {
            callback_port: settings.get_oauth_callback_port().await,
            callback_port_range_end: settings.get_oauth_callback_port_range_end().await,
            callback_timeout: settings.get_oauth_callback_timeout().await,
            token_timeout: settings.get_oauth_token_timeout().await,
        }
    }

    pub fn token_exchanger(&self) -> TokenExchanger {
        TokenExchanger::new(self.token_timeout)
    }
}

pub struct FlowDriver {
    wizard: Wizard,
    auth_providers: Arc<AuthProviderService>,
    provisioner: Arc<CredentialProvisioner>,
    handlers: Arc<HandlerRegistry>,
    browser: Arc<dyn BrowserOpener>,
    settings: FlowSettings,
    event_sender: Option<EventSender>,
    listener: Option<Arc<CallbackListener>>,
    wait_task: Option<JoinHandle<()>>,
    tx: mpsc::UnboundedSender<WizardEvent>,
    rx: mpsc::UnboundedReceiver<WizardEvent>,
}

impl FlowDriver {
    pub fn new(
        wizard: Wizard,
        auth_providers: Arc<AuthProviderService>,
        provisioner: Arc<CredentialProvisioner>,
        handlers: Arc<HandlerRegistry>,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            wizard,
            auth_providers,
            provisioner,
            handlers,
            browser: Arc::new(SystemBrowser),
            settings: FlowSettings::default(),
            event_sender: None,
            listener: None,
            wait_task: None,
            tx,
            rx,
        }
    }

    pub fn with_browser(mut self, browser: Arc<dyn BrowserOpener>) -> Self {
        self.browser = browser;
        self
    }

    pub fn with_settings(mut self, settings: FlowSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Emit `OAuthFlow*` events on the bus
    pub fn with_events(mut self, event_sender: EventSender) -> Self {
        self.event_sender = Some(event_sender);
        self
    }

    pub fn wizard(&self) -> &Wizard {
        &self.wizard
    }

    pub fn settings(&self) -> &FlowSettings {
        &self.settings
    }

    /// Where to register an OAuth app for a provider
    pub fn setup_hint(&self, provider_type: ProviderType) -> Option<&'static str> {
        self.handlers.get(provider_type).ok().map(|h| h.setup_hint())
    }

    /// Whether a callback listener is currently bound
    pub fn listener_running(&self) -> bool {
        self.listener.as_ref().is_some_and(|l| l.is_running())
    }

    /// Feed an event and run every effect it causes, including follow-up
    /// events from inline effects.
    pub async fn dispatch(&mut self, event: WizardEvent) {
        let mut queue = VecDeque::from([event]);
        while let Some(event) = queue.pop_front() {
            for effect in self.wizard.handle(event) {
                debug!("[Wizard] Running effect {}", effect.name());
                if let Some(follow_up) = self.execute(effect).await {
                    queue.push_back(follow_up);
                }
            }
        }
    }

    /// Next result of background work. Pending forever when nothing runs.
    pub async fn next_completion(&mut self) -> WizardEvent {
        match self.rx.recv().await {
            Some(event) => event,
            // The driver holds a sender, so the channel never closes
            None => std::future::pending().await,
        }
    }

    /// Dispatch completions until the wizard waits on the user again.
    pub async fn run_until_idle(&mut self) {
        while self.wizard.busy().is_some() && !self.wizard.is_finished() {
            let event = self.next_completion().await;
            self.dispatch(event).await;
        }
    }

    /// Release the callback port and abandon any wait.
    pub async fn shutdown(&mut self) {
        self.stop_listener().await;
    }

    async fn execute(&mut self, effect: Effect) -> Option<WizardEvent> {
        match effect {
            Effect::LoadAuthProviders { provider_type } => {
                let auth_providers = self.auth_providers.clone();
                self.spawn(async move {
                    let result = auth_providers
                        .list_by_provider(provider_type)
                        .await
                        .map_err(|e| e.to_string());
                    WizardEvent::AuthProvidersLoaded(result)
                });
                None
            }
            Effect::PrepareOAuth {
                connector,
                selection,
            } => {
                let auth_providers = self.auth_providers.clone();
                let handlers = self.handlers.clone();
                let settings = self.settings;
                self.spawn(async move {
                    let result =
                        prepare_oauth(&auth_providers, &handlers, settings, &connector, selection)
                            .await;
                    WizardEvent::OAuthPrepared(result)
                });
                None
            }
            Effect::StartListener {
                port,
                expected_state,
            } => Some(self.start_listener(port, expected_state).await),
            Effect::OpenBrowser { url } => open_best_effort(self.browser.as_ref(), &url)
                .err()
                .map(WizardEvent::BrowserOpenFailed),
            Effect::AwaitCallback { provider, flow } => self.await_callback(provider, flow),
            Effect::StopListener => {
                self.stop_listener().await;
                None
            }
            Effect::PersistSource { request } => {
                let provisioner = self.provisioner.clone();
                self.spawn(async move {
                    let result = provisioner
                        .provision(request)
                        .await
                        .map_err(|e| e.to_string());
                    WizardEvent::SourceCreated(result)
                });
                None
            }
        }
    }

    fn spawn<F>(&self, work: F)
    where
        F: Future<Output = WizardEvent> + Send + 'static,
    {
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let event = work.await;
            if tx.send(event).is_err() {
                debug!("[Wizard] Driver gone, dropping completion");
            }
        });
    }

    async fn start_listener(&mut self, port: u16, expected_state: String) -> WizardEvent {
        // One flow at a time
        self.stop_listener().await;

        let (connector_id, auth_provider_id) = self.flow_ids();
        match CallbackListener::start(port, expected_state.clone()).await {
            Ok(listener) => {
                let redirect_uri = listener.redirect_uri();
                info!(port = listener.port(), "[OAuth] Callback listener ready");
                self.listener = Some(Arc::new(listener));
                self.emit(DomainEvent::OAuthFlowStarted {
                    connector_id,
                    auth_provider_id,
                    redirect_uri,
                });
                WizardEvent::ListenerStarted {
                    state: expected_state,
                }
            }
            Err(e) => {
                warn!(port, error = %e, "[OAuth] Callback listener failed to start");
                self.emit(DomainEvent::OAuthFlowFailed {
                    connector_id,
                    error: e.to_string(),
                });
                WizardEvent::ListenerFailed {
                    state: expected_state,
                    error: e.to_string(),
                }
            }
        }
    }

    fn await_callback(&mut self, provider: AuthProvider, flow: OAuthFlowState) -> Option<WizardEvent> {
        let state = flow.state.clone();
        let Some(listener) = self.listener.clone() else {
            return Some(WizardEvent::OAuthFinished {
                state,
                result: Err("authorization failed: callback listener is not running".to_string()),
            });
        };
        let handler = match self.handlers.get(provider.provider_type) {
            Ok(handler) => handler,
            Err(e) => {
                return Some(WizardEvent::OAuthFinished {
                    state,
                    result: Err(e.to_string()),
                })
            }
        };

        let (connector_id, auth_provider_id) = self.flow_ids();
        let timeout = self.settings.callback_timeout;
        let events = self.event_sender.clone();
        let tx = self.tx.clone();

        self.wait_task = Some(tokio::spawn(async move {
            let result = authorize(&listener, handler.as_ref(), &provider, &flow, timeout).await;
            if let Some(events) = &events {
                let event = match &result {
                    Ok(authorized) => DomainEvent::OAuthFlowCompleted {
                        connector_id,
                        auth_provider_id,
                        account: Some(authorized.account_identifier.clone())
                            .filter(|a| !a.is_empty()),
                    },
                    Err(e) => DomainEvent::OAuthFlowFailed {
                        connector_id,
                        error: e.clone(),
                    },
                };
                events.emit(event);
            }
            if tx.send(WizardEvent::OAuthFinished { state, result }).is_err() {
                debug!("[OAuth] Driver gone, dropping authorization result");
            }
        }));
        None
    }

    async fn stop_listener(&mut self) {
        if let Some(task) = self.wait_task.take() {
            task.abort();
        }
        if let Some(listener) = self.listener.take() {
            listener.stop().await;
        }
    }

    fn flow_ids(&self) -> (String, String) {
        match self.wizard.state() {
            WizardState::OAuthInFlight {
                draft, provider, ..
            } => (draft.connector.id.clone(), provider.id.clone()),
            _ => (String::new(), String::new()),
        }
    }

    fn emit(&self, event: DomainEvent) {
        if let Some(sender) = &self.event_sender {
            sender.emit(event);
        }
    }
}

impl Drop for FlowDriver {
    fn drop(&mut self) {
        if let Some(task) = self.wait_task.take() {
            task.abort();
        }
    }
}

/// Resolve the registration, callback port and authorization URL.
async fn prepare_oauth(
    auth_providers: &AuthProviderService,
    handlers: &HandlerRegistry,
    settings: FlowSettings,
    connector: &ConnectorDescriptor,
    selection: ProviderSelection,
) -> Result<PreparedOAuth, String> {
    let handler = handlers
        .get(connector.provider_type)
        .map_err(|e| e.to_string())?;

    let provider = match selection {
        ProviderSelection::Existing(provider) => provider,
        ProviderSelection::New {
            client_id,
            client_secret,
        } => {
            let defaults = handler.default_config();
            let provider = AuthProvider::new_oauth(
                format!("{} OAuth App", connector.name),
                connector.provider_type,
                OAuthProviderConfig {
                    client_id,
                    client_secret,
                    auth_url: defaults.auth_url,
                    token_url: defaults.token_url,
                    scopes: defaults.scopes,
                },
            );
            auth_providers
                .save(&provider)
                .await
                .map_err(|e| format!("failed to create auth provider: {}", e))?;
            provider
        }
    };

    let port = select_callback_port(settings.callback_port, settings.callback_port_range_end)
        .map_err(|e| e.to_string())?;
    let notice = port.fallback.map(|fallback| {
        warn!("[OAuth] {}", fallback);
        fallback.to_string()
    });

    let pkce = PkceChallenge::generate().map_err(|e| e.to_string())?;
    let state = generate_state().map_err(|e| e.to_string())?;
    let redirect_uri = branding::oauth_callback_uri_with_port(port.port);
    let auth_url = handler
        .build_auth_url(&provider, &redirect_uri, &state, &pkce.challenge)
        .map_err(|e| e.to_string())?;

    let flow = OAuthFlowState {
        auth_url,
        code_verifier: pkce.verifier,
        state,
        redirect_uri,
        redirect_port: port.port,
    };
    info!(
        auth_provider_id = %provider.id,
        state = %flow.state_prefix(),
        "[OAuth] Prepared authorization for {}",
        connector.id
    );

    Ok(PreparedOAuth {
        provider,
        flow,
        notice,
    })
}

/// Wait for the redirect, exchange the code and look up the account.
async fn authorize(
    listener: &CallbackListener,
    handler: &dyn OAuthHandler,
    provider: &AuthProvider,
    flow: &OAuthFlowState,
    timeout: Duration,
) -> Result<AuthorizedTokens, String> {
    let code = listener
        .wait_for_code(timeout)
        .await
        .map_err(|e| format!("authorization failed: {}", e))?;

    let tokens = handler
        .exchange_code(provider, &code, &flow.redirect_uri, &flow.code_verifier)
        .await
        .map_err(|e| format!("failed to exchange code for tokens: {}", e))?;

    let mut warnings = Vec::new();
    let account_identifier = match handler.user_info(&tokens.access_token).await {
        Ok(account) => account,
        Err(e) => {
            warn!(error = %e, "[OAuth] Could not look up account identifier");
            warnings.push(format!("could not look up account identifier: {}", e));
            String::new()
        }
    };

    Ok(AuthorizedTokens {
        tokens,
        account_identifier,
        warnings,
    })
}
