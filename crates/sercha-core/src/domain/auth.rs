//! Authentication capability and method value objects

use serde::{Deserialize, Serialize};
use std::fmt;

/// Authentication method chosen for a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthMethod {
    None,
    Pat,
    #[serde(rename = "oauth")]
    OAuth,
}

impl AuthMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Pat => "pat",
            Self::OAuth => "oauth",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "none" => Some(Self::None),
            "pat" => Some(Self::Pat),
            "oauth" => Some(Self::OAuth),
            _ => None,
        }
    }

    /// Label shown when the user picks between methods.
    pub fn label(&self) -> &'static str {
        match self {
            Self::None => "None",
            Self::Pat => "Personal Access Token",
            Self::OAuth => "OAuth App",
        }
    }
}

impl fmt::Display for AuthMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which authentication methods a connector (or provider) accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthCapability {
    /// Auth-free connectors (local filesystem)
    #[default]
    None,
    /// Personal access token only
    Pat,
    /// OAuth authorization code flow only
    #[serde(rename = "oauth")]
    OAuth,
    /// Either PAT or OAuth; the user must pick one
    Both,
}

impl AuthCapability {
    pub fn requires_auth(&self) -> bool {
        !matches!(self, Self::None)
    }

    pub fn supports_pat(&self) -> bool {
        matches!(self, Self::Pat | Self::Both)
    }

    pub fn supports_oauth(&self) -> bool {
        matches!(self, Self::OAuth | Self::Both)
    }

    /// True when a method-selection step is needed.
    pub fn supports_multiple_methods(&self) -> bool {
        self.supports_pat() && self.supports_oauth()
    }

    /// Supported methods, PAT first.
    pub fn supported_methods(&self) -> Vec<AuthMethod> {
        let mut methods = Vec::with_capacity(2);
        if self.supports_pat() {
            methods.push(AuthMethod::Pat);
        }
        if self.supports_oauth() {
            methods.push(AuthMethod::OAuth);
        }
        methods
    }

    /// The only method when exactly one is supported.
    pub fn single_method(&self) -> Option<AuthMethod> {
        match self {
            Self::Pat => Some(AuthMethod::Pat),
            Self::OAuth => Some(AuthMethod::OAuth),
            Self::None | Self::Both => None,
        }
    }

    /// Short badge used in connector lists.
    pub fn badge(&self) -> &'static str {
        match self {
            Self::None => "[no auth]",
            Self::Pat => "[token]",
            Self::OAuth => "[oauth]",
            Self::Both => "[token/oauth]",
        }
    }
}

impl fmt::Display for AuthCapability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::None => "none",
            Self::Pat => "pat",
            Self::OAuth => "oauth",
            Self::Both => "pat,oauth",
        };
        f.write_str(s)
    }
}

/// The third party behind one or more connectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderType {
    Local,
    Google,
    #[serde(rename = "github")]
    GitHub,
    Slack,
    Notion,
}

impl ProviderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Google => "google",
            Self::GitHub => "github",
            Self::Slack => "slack",
            Self::Notion => "notion",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "local" => Some(Self::Local),
            "google" => Some(Self::Google),
            "github" => Some(Self::GitHub),
            "slack" => Some(Self::Slack),
            "notion" => Some(Self::Notion),
            _ => None,
        }
    }
}

impl fmt::Display for ProviderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
