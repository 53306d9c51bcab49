//! Messages in and out of the wizard

use std::collections::HashMap;
use std::fmt;

use sercha_core::{
    AuthProvider, ConnectorDescriptor, OAuthCredentials, OAuthFlowState, ProviderType,
    ProvisionOutcome, ProvisionRequest,
};

/// Which app registration an authorization attempt uses
#[derive(Clone)]
pub enum ProviderSelection {
    Existing(AuthProvider),
    New {
        client_id: String,
        client_secret: String,
    },
}

impl fmt::Debug for ProviderSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Existing(p) => f.debug_tuple("Existing").field(&p.id).finish(),
            Self::New { client_id, .. } => f
                .debug_struct("New")
                .field("client_id", client_id)
                .finish_non_exhaustive(),
        }
    }
}

/// Side effects requested by a transition, executed by the driver.
#[derive(Clone)]
pub enum Effect {
    LoadAuthProviders {
        provider_type: ProviderType,
    },
    /// Save a new registration if needed, pick the callback port and build
    /// the authorization URL
    PrepareOAuth {
        connector: ConnectorDescriptor,
        selection: ProviderSelection,
    },
    StartListener {
        port: u16,
        expected_state: String,
    },
    OpenBrowser {
        url: String,
    },
    /// Wait for the redirect, then exchange the code
    AwaitCallback {
        provider: AuthProvider,
        flow: OAuthFlowState,
    },
    StopListener,
    PersistSource {
        request: ProvisionRequest,
    },
}

impl Effect {
    pub fn name(&self) -> &'static str {
        match self {
            Self::LoadAuthProviders { .. } => "load_auth_providers",
            Self::PrepareOAuth { .. } => "prepare_oauth",
            Self::StartListener { .. } => "start_listener",
            Self::OpenBrowser { .. } => "open_browser",
            Self::AwaitCallback { .. } => "await_callback",
            Self::StopListener => "stop_listener",
            Self::PersistSource { .. } => "persist_source",
        }
    }
}

impl fmt::Debug for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LoadAuthProviders { provider_type } => f
                .debug_struct("LoadAuthProviders")
                .field("provider_type", provider_type)
                .finish(),
            Self::PrepareOAuth {
                connector,
                selection,
            } => f
                .debug_struct("PrepareOAuth")
                .field("connector", &connector.id)
                .field("selection", selection)
                .finish(),
            Self::StartListener { port, .. } => f
                .debug_struct("StartListener")
                .field("port", port)
                .finish_non_exhaustive(),
            Self::AwaitCallback { provider, flow } => f
                .debug_struct("AwaitCallback")
                .field("auth_provider_id", &provider.id)
                .field("flow", flow)
                .finish(),
            Self::PersistSource { request } => f
                .debug_struct("PersistSource")
                .field("request", request)
                .finish(),
            Self::OpenBrowser { url } => f.debug_struct("OpenBrowser").field("url", url).finish(),
            Self::StopListener => f.write_str("StopListener"),
        }
    }
}

/// A registration and flow ready for the browser
#[derive(Clone)]
pub struct PreparedOAuth {
    pub provider: AuthProvider,
    pub flow: OAuthFlowState,
    /// Shown to the user, e.g. a callback port fallback
    pub notice: Option<String>,
}

/// Tokens from a finished authorization
#[derive(Clone)]
pub struct AuthorizedTokens {
    pub tokens: OAuthCredentials,
    /// Empty when the account lookup failed
    pub account_identifier: String,
    /// Non-fatal problems along the way
    pub warnings: Vec<String>,
}

/// User input and completions of effects.
///
/// Failures arrive as rendered messages; the driver owns the error types.
#[derive(Clone)]
pub enum WizardEvent {
    SelectConnector(usize),
    SubmitConfig(HashMap<String, String>),
    SelectAuthMethod(usize),
    SelectExistingAuth(usize),
    CreateNewAuth,
    SubmitPat(String),
    SubmitOAuthClient {
        client_id: String,
        client_secret: String,
    },
    Back,
    Cancel,

    AuthProvidersLoaded(Result<Vec<AuthProvider>, String>),
    OAuthPrepared(Result<PreparedOAuth, String>),
    ListenerStarted {
        state: String,
    },
    ListenerFailed {
        state: String,
        error: String,
    },
    BrowserOpenFailed(String),
    OAuthFinished {
        state: String,
        result: Result<AuthorizedTokens, String>,
    },
    SourceCreated(Result<ProvisionOutcome, String>),
}

impl WizardEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::SelectConnector(_) => "select_connector",
            Self::SubmitConfig(_) => "submit_config",
            Self::SelectAuthMethod(_) => "select_auth_method",
            Self::SelectExistingAuth(_) => "select_existing_auth",
            Self::CreateNewAuth => "create_new_auth",
            Self::SubmitPat(_) => "submit_pat",
            Self::SubmitOAuthClient { .. } => "submit_oauth_client",
            Self::Back => "back",
            Self::Cancel => "cancel",
            Self::AuthProvidersLoaded(_) => "auth_providers_loaded",
            Self::OAuthPrepared(_) => "oauth_prepared",
            Self::ListenerStarted { .. } => "listener_started",
            Self::ListenerFailed { .. } => "listener_failed",
            Self::BrowserOpenFailed(_) => "browser_open_failed",
            Self::OAuthFinished { .. } => "oauth_finished",
            Self::SourceCreated(_) => "source_created",
        }
    }

    /// Whether the event reports the end of background work
    pub fn is_completion(&self) -> bool {
        matches!(
            self,
            Self::AuthProvidersLoaded(_)
                | Self::OAuthPrepared(_)
                | Self::ListenerStarted { .. }
                | Self::ListenerFailed { .. }
                | Self::BrowserOpenFailed(_)
                | Self::OAuthFinished { .. }
                | Self::SourceCreated(_)
        )
    }
}

// Events can carry tokens and client secrets.
impl fmt::Debug for WizardEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "WizardEvent::{}", self.name())
    }
}
