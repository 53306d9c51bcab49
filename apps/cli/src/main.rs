//! `sercha-auth` - add data sources and authorize them from the terminal.

mod app;
mod audit;
mod logging;
mod prompt;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;

use sercha_core::keys;

use app::{App, SettingsUpdate};
use audit::AuditLog;
use prompt::Prompter;

#[derive(Parser)]
#[command(name = "sercha-auth")]
#[command(about = "Add Sercha sources and manage their credentials")]
struct Cli {
    /// Database file (defaults to the platform data directory)
    #[arg(long, env = "SERCHA_DATABASE_PATH")]
    database: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Add a source with the interactive wizard
    Add,
    /// List configured sources
    List,
    /// Renew a source's OAuth tokens
    Refresh {
        source_id: String,
        /// Refresh even if the access token has not expired
        #[arg(long)]
        force: bool,
    },
    /// Remove a source and its credentials
    Remove { source_id: String },
    /// Show or change the OAuth callback port and timeouts
    Settings {
        #[arg(long)]
        callback_port: Option<u16>,
        /// Last port tried when the callback port is taken
        #[arg(long)]
        callback_port_range_end: Option<u16>,
        /// Seconds to wait for the browser redirect
        #[arg(long)]
        callback_timeout_secs: Option<u64>,
        /// Seconds before a token endpoint request gives up
        #[arg(long)]
        token_timeout_secs: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Optional .env next to the binary's working directory
    let _ = dotenvy::dotenv();
    let _log_guard = logging::init_tracing()?;

    let cli = Cli::parse();
    let app = App::open(cli.database).await?;
    let mut audit = AuditLog::subscribe(&app.services.event_bus);

    let result = run(&app, cli.command).await;
    for source_id in audit.flush() {
        eprintln!(
            "Source {} could not be rolled back; remove it with `sercha-auth remove {}`",
            source_id, source_id
        );
    }
    result
}

async fn run(app: &App, command: Command) -> Result<()> {
    match command {
        Command::Add => add(app).await,
        Command::List => list(app).await,
        Command::Refresh { source_id, force } => {
            if app.refresh_source(&source_id, force).await? {
                println!("Refreshed tokens for {}", source_id);
            } else {
                println!("Tokens for {} are still valid", source_id);
            }
            Ok(())
        }
        Command::Remove { source_id } => {
            app.remove_source(&source_id).await?;
            println!("Removed {}", source_id);
            Ok(())
        }
        Command::Settings {
            callback_port,
            callback_port_range_end,
            callback_timeout_secs,
            token_timeout_secs,
        } => {
            let update = SettingsUpdate {
                callback_port,
                callback_port_range_end,
                callback_timeout_secs,
                token_timeout_secs,
            };
            settings(app, &update).await
        }
    }
}

async fn settings(app: &App, update: &SettingsUpdate) -> Result<()> {
    let effective = app.update_flow_settings(update).await?;
    let stored = app.stored_flow_settings().await?;
    let origin = |key: &str| {
        if stored.iter().any(|(k, _)| k == key) {
            ""
        } else {
            "  (default)"
        }
    };

    println!(
        "callback port            {}{}",
        effective.callback_port,
        origin(keys::oauth::CALLBACK_PORT)
    );
    println!(
        "callback port range end  {}{}",
        effective.callback_port_range_end,
        origin(keys::oauth::CALLBACK_PORT_RANGE_END)
    );
    println!(
        "callback timeout         {}s{}",
        effective.callback_timeout.as_secs(),
        origin(keys::oauth::CALLBACK_TIMEOUT_SECS)
    );
    println!(
        "token timeout            {}s{}",
        effective.token_timeout.as_secs(),
        origin(keys::oauth::TOKEN_TIMEOUT_SECS)
    );
    Ok(())
}

async fn add(app: &App) -> Result<()> {
    let mut driver = app.flow_driver();
    let mut prompter = Prompter::new();
    let result = prompter.run_wizard(&mut driver).await;
    driver.shutdown().await;

    match result? {
        Some(outcome) => {
            let account = outcome
                .credentials
                .as_ref()
                .map(|c| c.account_identifier.as_str())
                .unwrap_or("");
            info!(source_id = %outcome.source.id, "[CLI] Source added");
            println!("Added {} ({})", outcome.source.display_name(account), outcome.source.id);
        }
        None => println!("Cancelled"),
    }
    Ok(())
}

async fn list(app: &App) -> Result<()> {
    let sources = app.sources().await?;
    if sources.is_empty() {
        println!("No sources configured");
        return Ok(());
    }
    for (source, credentials) in sources {
        let (auth, account) = match &credentials {
            Some(c) => (c.secret.method().as_str(), c.account_identifier.as_str()),
            None => ("none", ""),
        };
        let expired = credentials
            .as_ref()
            .is_some_and(|c| c.is_expired_at(chrono::Utc::now()));
        println!(
            "{}  {:<16} {:<6} {}{}",
            source.id,
            source.source_type,
            auth,
            source.display_name(account),
            if expired { "  (expired)" } else { "" }
        );
    }
    Ok(())
}
