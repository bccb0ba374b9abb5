use anyhow::{Context, Result};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::AppConfig;

const LOG_FILE: &str = "error.log";

/// Install the global subscriber.
///
/// Always logs to stderr. Outside debug mode an `error.log` file under the
/// configured log directory receives the same events without ANSI colours.
/// The returned guard flushes the file writer and must outlive the program's work.
pub fn init(config: &AppConfig) -> Result<Option<WorkerGuard>> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false);

    if config.debug {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .try_init()
            .context("failed to initialize tracing subscriber")?;
        return Ok(None);
    }

    let log_dir = config.log_dir();
    std::fs::create_dir_all(&log_dir)
        .with_context(|| format!("failed to create log directory {}", log_dir.display()))?;
    let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::never(
        &log_dir, LOG_FILE,
    ));
    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(writer)
        .with_ansi(false)
        .with_file(true)
        .with_line_number(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .context("failed to initialize tracing subscriber")?;

    info!(log_file = %log_dir.join(LOG_FILE).display(), "logging initialised");
    Ok(Some(guard))
}
