//! Transition table
//!
//! One handler per state. A handler looks at the current state and one
//! event and returns the next state with the effects to run, or `None` when
//! the event does not apply.

use tracing::{debug, info, warn};

use sercha_core::{
    AuthMethod, AuthProvider, ConnectorDescriptor, ConnectorRegistry, OAuthFlowState,
    ProviderRegistry, ProvisionOutcome, ProvisionRequest, ProvisionSecret,
};

use super::effect::{AuthorizedTokens, Effect, PreparedOAuth, ProviderSelection, WizardEvent};
use super::state::{Busy, Draft, Step, WizardState};

struct Transition {
    state: WizardState,
    effects: Vec<Effect>,
    busy: Option<Busy>,
    error: Option<String>,
    notice: Option<String>,
    warnings: Vec<String>,
}

impl Transition {
    fn to(state: WizardState) -> Self {
        Self {
            state,
            effects: Vec::new(),
            busy: None,
            error: None,
            notice: None,
            warnings: Vec::new(),
        }
    }

    fn effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }

    fn busy(mut self, busy: Busy) -> Self {
        self.busy = Some(busy);
        self
    }

    fn idle(mut self) -> Self {
        self.busy = None;
        self
    }

    fn error(mut self, message: impl Into<String>) -> Self {
        self.error = Some(message.into());
        self
    }

    fn notice(mut self, message: Option<String>) -> Self {
        self.notice = message;
        self
    }

    fn warnings(mut self, warnings: Vec<String>) -> Self {
        self.warnings = warnings;
        self
    }
}

/// The add-source wizard.
///
/// Pure: no I/O happens here. [`Wizard::handle`] returns the effects the
/// caller must execute, and their results come back as events.
pub struct Wizard {
    connectors: Vec<ConnectorDescriptor>,
    providers: ProviderRegistry,
    state: WizardState,
    visited: Vec<Step>,
    busy: Option<Busy>,
    error: Option<String>,
    notice: Option<String>,
    warnings: Vec<String>,
}

impl Wizard {
    pub fn new(registry: &ConnectorRegistry) -> Self {
        Self::with_connectors(registry.list())
    }

    pub fn with_connectors(connectors: Vec<ConnectorDescriptor>) -> Self {
        Self {
            connectors,
            providers: ProviderRegistry::new(),
            state: WizardState::SelectConnector,
            visited: vec![Step::SelectConnector],
            busy: None,
            error: None,
            notice: None,
            warnings: Vec::new(),
        }
    }

    pub fn state(&self) -> &WizardState {
        &self.state
    }

    pub fn step(&self) -> Step {
        self.state.step()
    }

    /// Steps entered so far, in order, starting with `SelectConnector`
    pub fn visited(&self) -> &[Step] {
        &self.visited
    }

    pub fn busy(&self) -> Option<Busy> {
        self.busy
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn connectors(&self) -> &[ConnectorDescriptor] {
        &self.connectors
    }

    /// Methods offered on `SelectAuthMethod`, PAT first
    pub fn auth_method_options(&self) -> Vec<AuthMethod> {
        self.state
            .draft()
            .map(|d| d.connector.auth_capability.supported_methods())
            .unwrap_or_default()
    }

    pub fn is_finished(&self) -> bool {
        self.state.is_terminal()
    }

    /// Feed one event, returning the effects to execute.
    pub fn handle(&mut self, event: WizardEvent) -> Vec<Effect> {
        if self.state.is_terminal() || !self.accepts(&event) {
            debug!("[Wizard] Ignoring {:?} in {:?}", event, self.state.step());
            return Vec::new();
        }

        let name = event.name();
        let transition = match event {
            WizardEvent::Cancel => Some(self.cancel()),
            WizardEvent::Back => self.back(),
            event => self.forward(event),
        };

        match transition {
            Some(transition) => self.apply(transition),
            None => {
                debug!("[Wizard] {} does not apply to {:?}", name, self.state.step());
                Vec::new()
            }
        }
    }

    fn accepts(&self, event: &WizardEvent) -> bool {
        match event {
            WizardEvent::Cancel => true,
            WizardEvent::Back => self.busy != Some(Busy::Persisting),
            WizardEvent::AuthProvidersLoaded(_) => self.busy == Some(Busy::LoadingProviders),
            WizardEvent::OAuthPrepared(_) => self.busy == Some(Busy::Preparing),
            WizardEvent::ListenerStarted { .. }
            | WizardEvent::ListenerFailed { .. }
            | WizardEvent::OAuthFinished { .. } => self.busy == Some(Busy::Authorizing),
            WizardEvent::BrowserOpenFailed(_) => {
                matches!(self.state, WizardState::OAuthInFlight { .. })
            }
            WizardEvent::SourceCreated(_) => self.busy == Some(Busy::Persisting),
            _ => self.busy.is_none(),
        }
    }

    fn apply(&mut self, transition: Transition) -> Vec<Effect> {
        let from = self.state.step();
        let to = transition.state.step();
        if from != to {
            info!("[Wizard] {:?} -> {:?}", from, to);
            self.visited.push(to);
            self.notice = None;
        }
        if let Some(error) = &transition.error {
            debug!(error = %error, "[Wizard] Step error");
        }

        self.state = transition.state;
        self.busy = transition.busy;
        self.error = transition.error;
        // Notices raised within one step accumulate until the step changes
        if let Some(message) = transition.notice {
            self.notice = Some(match self.notice.take() {
                Some(existing) if existing != message => format!("{}\n{}", existing, message),
                _ => message,
            });
        }
        self.warnings.extend(transition.warnings);
        transition.effects
    }

    /// Same state, same busy flag
    fn stay(&self) -> Transition {
        let mut transition = Transition::to(self.state.clone());
        transition.busy = self.busy;
        transition
    }

    fn forward(&self, event: WizardEvent) -> Option<Transition> {
        match &self.state {
            WizardState::SelectConnector => self.on_select_connector(event),
            WizardState::EnterConfig { draft } => self.on_enter_config(draft, event),
            WizardState::SelectAuthMethod { draft } => self.on_select_auth_method(draft, event),
            WizardState::SelectExistingAuth { draft, providers } => {
                self.on_select_existing_auth(draft, providers, event)
            }
            WizardState::EnterCredentials {
                draft, providers, ..
            } => self.on_enter_credentials(draft, providers, event),
            WizardState::OAuthInFlight {
                draft,
                providers,
                provider,
                flow,
            } => self.on_oauth_in_flight(draft, providers, provider, flow, event),
            WizardState::Complete { .. } | WizardState::Cancelled => None,
        }
    }

    fn on_select_connector(&self, event: WizardEvent) -> Option<Transition> {
        let WizardEvent::SelectConnector(index) = event else {
            return None;
        };
        match self.connectors.get(index) {
            Some(connector) => Some(Transition::to(WizardState::EnterConfig {
                draft: Draft::new(connector.clone()),
            })),
            None => Some(self.stay().error(invalid_selection(index))),
        }
    }

    fn on_enter_config(&self, draft: &Draft, event: WizardEvent) -> Option<Transition> {
        match event {
            WizardEvent::SubmitConfig(config) => {
                let missing = draft.connector.missing_required(&config);
                if !missing.is_empty() {
                    return Some(
                        self.stay()
                            .error(format!("missing required fields: {}", missing.join(", "))),
                    );
                }
                let mut draft = draft.clone();
                draft.config = config;
                draft.connector.apply_defaults(&mut draft.config);
                Some(self.after_config(draft))
            }
            WizardEvent::AuthProvidersLoaded(result) => Some(providers_loaded(draft, result)),
            WizardEvent::SourceCreated(result) => Some(self.source_created(result)),
            _ => None,
        }
    }

    fn after_config(&self, draft: Draft) -> Transition {
        let methods = draft.connector.auth_capability.supported_methods();
        match methods.as_slice() {
            [] => {
                let request = provision_request(&draft, "", ProvisionSecret::None);
                persist(WizardState::EnterConfig { draft }, request)
            }
            [method] => {
                let method = *method;
                self.choose_method(draft, method, |draft| WizardState::EnterConfig { draft })
            }
            _ => Transition::to(WizardState::SelectAuthMethod { draft }),
        }
    }

    /// Route to credential entry, or first look up reusable registrations.
    /// `hold` is the state to wait in while they load.
    fn choose_method(
        &self,
        mut draft: Draft,
        method: AuthMethod,
        hold: fn(Draft) -> WizardState,
    ) -> Transition {
        draft.method = method;
        let provider_type = draft.connector.provider_type;
        if method == AuthMethod::OAuth && self.providers.has_multiple_connectors(provider_type) {
            return Transition::to(hold(draft))
                .busy(Busy::LoadingProviders)
                .effect(Effect::LoadAuthProviders { provider_type });
        }
        Transition::to(WizardState::EnterCredentials {
            draft,
            creating_new: false,
            providers: Vec::new(),
        })
    }

    fn on_select_auth_method(&self, draft: &Draft, event: WizardEvent) -> Option<Transition> {
        match event {
            WizardEvent::SelectAuthMethod(index) => {
                let methods = draft.connector.auth_capability.supported_methods();
                Some(match methods.get(index) {
                    Some(method) => self.choose_method(draft.clone(), *method, |draft| {
                        WizardState::SelectAuthMethod { draft }
                    }),
                    None => self.stay().error(invalid_selection(index)),
                })
            }
            WizardEvent::AuthProvidersLoaded(result) => Some(providers_loaded(draft, result)),
            _ => None,
        }
    }

    fn on_select_existing_auth(
        &self,
        draft: &Draft,
        providers: &[AuthProvider],
        event: WizardEvent,
    ) -> Option<Transition> {
        let create_new = || {
            Transition::to(WizardState::EnterCredentials {
                draft: draft.clone(),
                creating_new: true,
                providers: providers.to_vec(),
            })
        };
        match event {
            WizardEvent::SelectExistingAuth(index) if index < providers.len() => Some(
                self.stay()
                    .busy(Busy::Preparing)
                    .effect(Effect::PrepareOAuth {
                        connector: draft.connector.clone(),
                        selection: ProviderSelection::Existing(providers[index].clone()),
                    }),
            ),
            WizardEvent::SelectExistingAuth(index) if index == providers.len() => Some(create_new()),
            WizardEvent::CreateNewAuth => Some(create_new()),
            WizardEvent::SelectExistingAuth(index) => Some(self.stay().error(invalid_selection(index))),
            WizardEvent::OAuthPrepared(result) => Some(self.prepared(draft, providers, result)),
            _ => None,
        }
    }

    fn on_enter_credentials(
        &self,
        draft: &Draft,
        providers: &[AuthProvider],
        event: WizardEvent,
    ) -> Option<Transition> {
        match (draft.method, event) {
            (AuthMethod::Pat, WizardEvent::SubmitPat(token)) => {
                let token = token.trim();
                if token.is_empty() {
                    return Some(self.stay().error("token is required"));
                }
                let request = provision_request(
                    draft,
                    "",
                    ProvisionSecret::Pat {
                        token: token.to_string(),
                    },
                );
                Some(persist(self.state.clone(), request))
            }
            (
                AuthMethod::OAuth,
                WizardEvent::SubmitOAuthClient {
                    client_id,
                    client_secret,
                },
            ) => {
                let (client_id, client_secret) = (client_id.trim(), client_secret.trim());
                if client_id.is_empty() || client_secret.is_empty() {
                    return Some(self.stay().error("client ID and client secret are required"));
                }
                Some(
                    self.stay()
                        .busy(Busy::Preparing)
                        .effect(Effect::PrepareOAuth {
                            connector: draft.connector.clone(),
                            selection: ProviderSelection::New {
                                client_id: client_id.to_string(),
                                client_secret: client_secret.to_string(),
                            },
                        }),
                )
            }
            (_, WizardEvent::OAuthPrepared(result)) => Some(self.prepared(draft, providers, result)),
            (_, WizardEvent::SourceCreated(result)) => Some(self.source_created(result)),
            _ => None,
        }
    }

    fn prepared(
        &self,
        draft: &Draft,
        providers: &[AuthProvider],
        result: Result<PreparedOAuth, String>,
    ) -> Transition {
        match result {
            Ok(prepared) => {
                let start = Effect::StartListener {
                    port: prepared.flow.redirect_port,
                    expected_state: prepared.flow.state.clone(),
                };
                Transition::to(WizardState::OAuthInFlight {
                    draft: draft.clone(),
                    providers: providers.to_vec(),
                    provider: prepared.provider,
                    flow: prepared.flow,
                })
                .busy(Busy::Authorizing)
                .notice(prepared.notice)
                .effect(start)
            }
            Err(e) => self.stay().idle().error(e),
        }
    }

    fn on_oauth_in_flight(
        &self,
        draft: &Draft,
        providers: &[AuthProvider],
        provider: &AuthProvider,
        flow: &OAuthFlowState,
        event: WizardEvent,
    ) -> Option<Transition> {
        match event {
            WizardEvent::ListenerStarted { state } if state == flow.state => Some(
                self.stay()
                    .effect(Effect::OpenBrowser {
                        url: flow.auth_url.clone(),
                    })
                    .effect(Effect::AwaitCallback {
                        provider: provider.clone(),
                        flow: flow.clone(),
                    }),
            ),
            WizardEvent::ListenerFailed { state, error } if state == flow.state => {
                Some(Transition::to(retry_credentials(draft, providers)).error(error))
            }
            WizardEvent::BrowserOpenFailed(e) => Some(self.stay().notice(Some(format!(
                "Could not open the browser ({}). Open this URL to continue: {}",
                e, flow.auth_url
            )))),
            WizardEvent::OAuthFinished { state, result } if state == flow.state => {
                Some(match result {
                    Ok(authorized) => {
                        let AuthorizedTokens {
                            tokens,
                            account_identifier,
                            warnings,
                        } = authorized;
                        let request = provision_request(
                            draft,
                            &provider.id,
                            ProvisionSecret::OAuth {
                                tokens,
                                account_identifier,
                            },
                        );
                        Transition::to(self.state.clone())
                            .effect(Effect::StopListener)
                            .effect(Effect::PersistSource { request })
                            .busy(Busy::Persisting)
                            .warnings(warnings)
                    }
                    Err(e) => Transition::to(retry_credentials(draft, providers))
                        .effect(Effect::StopListener)
                        .error(e),
                })
            }
            WizardEvent::SourceCreated(Err(e)) => {
                Some(Transition::to(retry_credentials(draft, providers)).error(e))
            }
            WizardEvent::SourceCreated(result) => Some(self.source_created(result)),
            _ => None,
        }
    }

    fn source_created(&self, result: Result<ProvisionOutcome, String>) -> Transition {
        match result {
            Ok(outcome) => {
                let warnings = outcome.warnings.iter().map(|w| w.to_string()).collect();
                Transition::to(WizardState::Complete { outcome }).warnings(warnings)
            }
            Err(e) => {
                warn!(error = %e, "[Wizard] Source creation failed");
                self.stay().idle().error(e)
            }
        }
    }

    fn back(&self) -> Option<Transition> {
        let state = match &self.state {
            WizardState::SelectConnector => WizardState::Cancelled,
            WizardState::EnterConfig { .. } => WizardState::SelectConnector,
            WizardState::SelectAuthMethod { draft } => WizardState::EnterConfig {
                draft: draft.clone(),
            },
            WizardState::SelectExistingAuth { draft, .. } => before_reuse(draft),
            WizardState::EnterCredentials {
                draft,
                creating_new: true,
                providers,
            } => WizardState::SelectExistingAuth {
                draft: draft.clone(),
                providers: providers.clone(),
            },
            WizardState::EnterCredentials { draft, .. } => before_reuse(draft),
            WizardState::OAuthInFlight {
                draft, providers, ..
            } => {
                return Some(
                    Transition::to(retry_credentials(draft, providers))
                        .effect(Effect::StopListener),
                )
            }
            WizardState::Complete { .. } | WizardState::Cancelled => return None,
        };
        Some(Transition::to(state))
    }

    /// Cancel during the browser wait abandons that attempt only; anywhere
    /// else it ends the wizard.
    fn cancel(&self) -> Transition {
        match &self.state {
            WizardState::OAuthInFlight {
                draft, providers, ..
            } if self.busy == Some(Busy::Authorizing) => {
                Transition::to(retry_credentials(draft, providers)).effect(Effect::StopListener)
            }
            WizardState::OAuthInFlight { .. } => {
                Transition::to(WizardState::Cancelled).effect(Effect::StopListener)
            }
            _ => Transition::to(WizardState::Cancelled),
        }
    }
}

fn invalid_selection(index: usize) -> String {
    format!("invalid selection: {}", index + 1)
}

fn persist(hold: WizardState, request: ProvisionRequest) -> Transition {
    Transition::to(hold)
        .busy(Busy::Persisting)
        .effect(Effect::PersistSource { request })
}

fn provision_request(draft: &Draft, auth_provider_id: &str, secret: ProvisionSecret) -> ProvisionRequest {
    ProvisionRequest {
        connector_id: draft.connector.id.clone(),
        connector_name: draft.connector.name.clone(),
        config: draft.config.clone(),
        auth_provider_id: auth_provider_id.to_string(),
        secret,
    }
}

fn providers_loaded(draft: &Draft, result: Result<Vec<AuthProvider>, String>) -> Transition {
    let credentials = || WizardState::EnterCredentials {
        draft: draft.clone(),
        creating_new: false,
        providers: Vec::new(),
    };
    match result {
        Ok(providers) if !providers.is_empty() => Transition::to(WizardState::SelectExistingAuth {
            draft: draft.clone(),
            providers,
        }),
        Ok(_) => Transition::to(credentials()),
        Err(e) => {
            warn!(error = %e, "[Wizard] Could not load existing OAuth apps");
            Transition::to(credentials())
                .notice(Some(format!("Could not load existing OAuth apps: {}", e)))
        }
    }
}

/// Step before the reuse/credentials steps
fn before_reuse(draft: &Draft) -> WizardState {
    if draft.connector.auth_capability.supports_multiple_methods() {
        WizardState::SelectAuthMethod {
            draft: draft.clone(),
        }
    } else {
        WizardState::EnterConfig {
            draft: draft.clone(),
        }
    }
}

/// Credential entry after a failed or abandoned attempt
fn retry_credentials(draft: &Draft, providers: &[AuthProvider]) -> WizardState {
    WizardState::EnterCredentials {
        draft: draft.clone(),
        creating_new: !providers.is_empty(),
        providers: providers.to_vec(),
    }
}
