//! Console and daily rolling file logging.

use anyhow::{Context, Result};
use sercha_core::branding;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize tracing. Keep the returned guard alive or buffered file
/// output is lost on exit.
pub fn init_tracing() -> Result<WorkerGuard> {
    let logs_dir = dirs::data_local_dir()
        .context("Could not determine the local data directory")?
        .join(branding::APP_NAME)
        .join("logs");
    std::fs::create_dir_all(&logs_dir)
        .with_context(|| format!("Failed to create log directory {:?}", logs_dir))?;

    let file_appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(branding::APP_NAME)
        .filename_suffix("log")
        .build(&logs_dir)
        .context("Failed to create log file appender")?;
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::new("info")
            .add_directive("hyper=warn".parse()?)
            .add_directive("reqwest=warn".parse()?),
    };

    // Prompts own stdout
    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(true)
        .compact()
        .with_target(true);

    let file_layer = fmt::layer()
        .with_writer(file_writer)
        .with_ansi(false)
        .with_thread_ids(true)
        .with_line_number(true)
        .with_file(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    tracing::info!(logs_dir = ?logs_dir, "{} logging initialized", branding::DISPLAY_NAME);
    Ok(guard)
}
