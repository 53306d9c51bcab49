//! Wizard states

use std::collections::HashMap;
use std::fmt;

use sercha_core::{AuthMethod, AuthProvider, ConnectorDescriptor, OAuthFlowState, ProvisionOutcome};

/// Choices collected so far for the source being added.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Draft {
    pub connector: ConnectorDescriptor,
    pub config: HashMap<String, String>,
    pub method: AuthMethod,
}

impl Draft {
    pub(crate) fn new(connector: ConnectorDescriptor) -> Self {
        Self {
            connector,
            config: HashMap::new(),
            method: AuthMethod::None,
        }
    }
}

/// Where the wizard is. Each variant carries the data its step needs.
#[derive(Clone)]
pub enum WizardState {
    SelectConnector,
    EnterConfig {
        draft: Draft,
    },
    SelectAuthMethod {
        draft: Draft,
    },
    /// Reuse an existing app registration; index `providers.len()` is
    /// "create new"
    SelectExistingAuth {
        draft: Draft,
        providers: Vec<AuthProvider>,
    },
    /// PAT or OAuth client credentials, depending on `draft.method`
    EnterCredentials {
        draft: Draft,
        /// Reached through "create new" on the reuse step
        creating_new: bool,
        providers: Vec<AuthProvider>,
    },
    /// Browser authorization in progress for `flow`
    OAuthInFlight {
        draft: Draft,
        providers: Vec<AuthProvider>,
        provider: AuthProvider,
        flow: OAuthFlowState,
    },
    Complete {
        outcome: ProvisionOutcome,
    },
    Cancelled,
}

impl WizardState {
    pub fn step(&self) -> Step {
        match self {
            Self::SelectConnector => Step::SelectConnector,
            Self::EnterConfig { .. } => Step::EnterConfig,
            Self::SelectAuthMethod { .. } => Step::SelectAuthMethod,
            Self::SelectExistingAuth { .. } => Step::SelectExistingAuth,
            Self::EnterCredentials { .. } => Step::EnterCredentials,
            Self::OAuthInFlight { .. } => Step::OAuthInFlight,
            Self::Complete { .. } => Step::Complete,
            Self::Cancelled => Step::Cancelled,
        }
    }

    pub fn draft(&self) -> Option<&Draft> {
        match self {
            Self::EnterConfig { draft }
            | Self::SelectAuthMethod { draft }
            | Self::SelectExistingAuth { draft, .. }
            | Self::EnterCredentials { draft, .. }
            | Self::OAuthInFlight { draft, .. } => Some(draft),
            Self::SelectConnector | Self::Complete { .. } | Self::Cancelled => None,
        }
    }

    /// Existing registrations known to this step
    pub fn providers(&self) -> &[AuthProvider] {
        match self {
            Self::SelectExistingAuth { providers, .. }
            | Self::EnterCredentials { providers, .. }
            | Self::OAuthInFlight { providers, .. } => providers,
            _ => &[],
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete { .. } | Self::Cancelled)
    }
}

// AuthProvider carries the client secret; only ids reach debug output.
impl fmt::Debug for WizardState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("WizardState");
        s.field("step", &self.step());
        if let Some(draft) = self.draft() {
            s.field("connector", &draft.connector.id);
            s.field("method", &draft.method);
        }
        if let Self::OAuthInFlight { provider, flow, .. } = self {
            s.field("auth_provider_id", &provider.id);
            s.field("flow", flow);
        }
        if let Self::Complete { outcome } = self {
            s.field("source_id", &outcome.source.id);
        }
        s.finish_non_exhaustive()
    }
}

/// State tag, for history and display
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Step {
    SelectConnector,
    EnterConfig,
    SelectAuthMethod,
    SelectExistingAuth,
    EnterCredentials,
    OAuthInFlight,
    Complete,
    Cancelled,
}

impl Step {
    pub fn title(&self) -> &'static str {
        match self {
            Self::SelectConnector => "Select connector",
            Self::EnterConfig => "Configure source",
            Self::SelectAuthMethod => "Choose authentication method",
            Self::SelectExistingAuth => "Choose OAuth app",
            Self::EnterCredentials => "Enter credentials",
            Self::OAuthInFlight => "Authorize in browser",
            Self::Complete => "Done",
            Self::Cancelled => "Cancelled",
        }
    }
}

/// Background work the wizard is waiting on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Busy {
    LoadingProviders,
    Preparing,
    /// Listener up, waiting for the browser redirect and token exchange
    Authorizing,
    Persisting,
}
