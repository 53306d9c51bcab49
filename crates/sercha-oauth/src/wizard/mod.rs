//! Add-source wizard
//!
//! A pure state machine over [`WizardState`]. [`Wizard::handle`] takes a
//! [`WizardEvent`] (user input or the completion of earlier work) and
//! returns the [`Effect`]s to execute; the flow driver runs them and feeds
//! the results back in.
//!
//! ```text
//! SelectConnector -> EnterConfig -> [SelectAuthMethod] -> [SelectExistingAuth]
//!     -> EnterCredentials -> [OAuthInFlight] -> Complete
//! ```

mod effect;
mod machine;
mod state;

pub use effect::{AuthorizedTokens, Effect, PreparedOAuth, ProviderSelection, WizardEvent};
pub use machine::Wizard;
pub use state::{Busy, Draft, Step, WizardState};
