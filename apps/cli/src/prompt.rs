//! Line-based prompts driving the add-source wizard.
//!
//! `:b` goes back a step and `:q` cancels at any prompt. While the browser
//! authorization is pending, either one abandons the attempt and returns to
//! credential entry.

use std::collections::HashMap;
use std::io::Write;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

use sercha_core::{branding, AuthMethod, ProvisionOutcome};
use sercha_oauth::{Busy, FlowDriver, WizardEvent, WizardState};

enum Input {
    Value(String),
    Back,
    Cancel,
}

pub struct Prompter {
    lines: Lines<BufReader<Stdin>>,
}

impl Prompter {
    pub fn new() -> Self {
        Self {
            lines: BufReader::new(tokio::io::stdin()).lines(),
        }
    }

    async fn read(&mut self, prompt: &str) -> Result<Input> {
        print!("{}", prompt);
        std::io::stdout().flush()?;
        let line = self
            .lines
            .next_line()
            .await
            .context("Failed to read from stdin")?;
        // EOF cancels
        let Some(line) = line else {
            return Ok(Input::Cancel);
        };
        Ok(match line.trim() {
            ":b" => Input::Back,
            ":q" => Input::Cancel,
            value => Input::Value(value.to_string()),
        })
    }

    /// Read a 1-based menu choice as a 0-based index. Non-numbers map past
    /// the end so the wizard reports them as invalid.
    async fn choose(&mut self, prompt: &str) -> Result<Result<usize, WizardEvent>> {
        Ok(match self.read(prompt).await? {
            Input::Value(v) => Ok(v
                .parse::<usize>()
                .ok()
                .and_then(|n| n.checked_sub(1))
                .unwrap_or(usize::MAX)),
            Input::Back => Err(WizardEvent::Back),
            Input::Cancel => Err(WizardEvent::Cancel),
        })
    }

    /// Run the wizard until it completes or is cancelled.
    pub async fn run_wizard(&mut self, driver: &mut FlowDriver) -> Result<Option<ProvisionOutcome>> {
        let mut announced: Option<String> = None;
        let mut shown_notice: Option<String> = None;

        loop {
            if let WizardState::Complete { outcome } = driver.wizard().state() {
                for warning in driver.wizard().warnings() {
                    println!("warning: {}", warning);
                }
                return Ok(Some(outcome.clone()));
            }
            if driver.wizard().is_finished() {
                return Ok(None);
            }

            match driver.wizard().busy() {
                Some(Busy::Authorizing) => {
                    if let WizardState::OAuthInFlight { flow, .. } = driver.wizard().state() {
                        if announced.as_deref() != Some(flow.state.as_str()) {
                            announced = Some(flow.state.clone());
                            println!("Authorize in your browser. If it did not open, visit:");
                            println!("  {}", flow.auth_url);
                            println!("Waiting for the redirect (:q to abandon this attempt)...");
                        }
                    }
                    if let Some(notice) = driver.wizard().notice() {
                        if let Some(unseen) = unseen_notice(shown_notice.as_deref(), notice) {
                            println!("{}", unseen);
                        }
                        shown_notice = Some(notice.to_string());
                    }
                    tokio::select! {
                        event = driver.next_completion() => driver.dispatch(event).await,
                        input = self.read("") => match input? {
                            Input::Back => driver.dispatch(WizardEvent::Back).await,
                            Input::Cancel => driver.dispatch(WizardEvent::Cancel).await,
                            Input::Value(_) => {}
                        },
                    }
                    continue;
                }
                Some(_) => {
                    let event = driver.next_completion().await;
                    driver.dispatch(event).await;
                    continue;
                }
                None => {}
            }

            shown_notice = driver.wizard().notice().map(str::to_string);
            self.render_messages(driver);
            let event = self.prompt_step(driver).await?;
            driver.dispatch(event).await;
        }
    }

    fn render_messages(&self, driver: &FlowDriver) {
        let wizard = driver.wizard();
        println!();
        println!("== {} ==", wizard.step().title());
        if let Some(notice) = wizard.notice() {
            println!("{}", notice);
        }
        if let Some(error) = wizard.error() {
            println!("error: {}", error);
        }
    }

    async fn prompt_step(&mut self, driver: &FlowDriver) -> Result<WizardEvent> {
        let wizard = driver.wizard();
        match wizard.state() {
            WizardState::SelectConnector => {
                for (i, connector) in wizard.connectors().iter().enumerate() {
                    println!(
                        "  {}) {} [{}] - {}",
                        i + 1,
                        connector.name,
                        connector.auth_capability,
                        connector.description
                    );
                }
                let choice = self.choose("Connector: ").await?;
                Ok(choice.map_or_else(|e| e, WizardEvent::SelectConnector))
            }
            WizardState::EnterConfig { draft } => {
                let mut config = HashMap::new();
                for key in &draft.connector.config_keys {
                    let marker = if key.required { " (required)" } else { "" };
                    let shown_default = if key.default.is_empty() {
                        String::new()
                    } else {
                        format!(" [{}]", key.default)
                    };
                    let prompt = format!("{}{}{}: ", key.label, marker, shown_default);
                    match self.read(&prompt).await? {
                        Input::Value(v) if !v.is_empty() => {
                            config.insert(key.key.clone(), v);
                        }
                        Input::Value(_) => {}
                        Input::Back => return Ok(WizardEvent::Back),
                        Input::Cancel => return Ok(WizardEvent::Cancel),
                    }
                }
                Ok(WizardEvent::SubmitConfig(config))
            }
            WizardState::SelectAuthMethod { .. } => {
                for (i, method) in wizard.auth_method_options().iter().enumerate() {
                    println!("  {}) {}", i + 1, method.label());
                }
                let choice = self.choose("Method: ").await?;
                Ok(choice.map_or_else(|e| e, WizardEvent::SelectAuthMethod))
            }
            WizardState::SelectExistingAuth { providers, .. } => {
                for (i, provider) in providers.iter().enumerate() {
                    let client_id = provider
                        .oauth
                        .as_ref()
                        .map(|o| o.client_id.as_str())
                        .unwrap_or("");
                    println!("  {}) {} ({})", i + 1, provider.name, client_id);
                }
                println!("  {}) Create a new OAuth app", providers.len() + 1);
                let choice = self.choose("OAuth app: ").await?;
                Ok(choice.map_or_else(|e| e, WizardEvent::SelectExistingAuth))
            }
            WizardState::EnterCredentials { draft, .. } => match draft.method {
                AuthMethod::Pat => Ok(match self.read("Personal access token: ").await? {
                    Input::Value(token) => WizardEvent::SubmitPat(token),
                    Input::Back => WizardEvent::Back,
                    Input::Cancel => WizardEvent::Cancel,
                }),
                _ => {
                    if let Some(hint) = driver.setup_hint(draft.connector.provider_type) {
                        println!("{}", hint);
                    }
                    let redirect_uri = branding::oauth_callback_uri_with_port(driver.settings().callback_port);
                    println!("Redirect URI: {}", redirect_uri);
                    let client_id = match self.read("Client ID: ").await? {
                        Input::Value(v) => v,
                        Input::Back => return Ok(WizardEvent::Back),
                        Input::Cancel => return Ok(WizardEvent::Cancel),
                    };
                    let client_secret = match self.read("Client secret: ").await? {
                        Input::Value(v) => v,
                        Input::Back => return Ok(WizardEvent::Back),
                        Input::Cancel => return Ok(WizardEvent::Cancel),
                    };
                    Ok(WizardEvent::SubmitOAuthClient {
                        client_id,
                        client_secret,
                    })
                }
            },
            // Only reachable idle if a completion is still on its way
            WizardState::OAuthInFlight { .. } => {
                Ok(match self.read("Waiting (:q to cancel): ").await? {
                    Input::Back => WizardEvent::Back,
                    _ => WizardEvent::Cancel,
                })
            }
            WizardState::Complete { .. } | WizardState::Cancelled => Ok(WizardEvent::Cancel),
        }
    }
}

/// Part of `current` not printed yet. Notices within one step only grow by
/// appended lines.
fn unseen_notice<'a>(shown: Option<&str>, current: &'a str) -> Option<&'a str> {
    match shown {
        Some(shown) if current == shown => None,
        Some(shown) => match current.strip_prefix(shown) {
            Some(rest) => Some(rest.trim_start_matches('\n')),
            None => Some(current),
        },
        None => Some(current),
    }
}
