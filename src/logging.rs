//! File-based logging.
//!
//! The terminal belongs to the UI, so tracing output goes to a daily-rotated
//! file under the configured log directory instead of stdout.

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::LoggingSettings;

const LOG_FILE_PREFIX: &str = "canto";

/// Install the global subscriber.
///
/// Logs land in `<dir>/canto.YYYY-MM-DD`. `RUST_LOG` overrides the configured
/// filter. Keep the returned guard alive until exit or buffered lines are lost.
pub fn init_logging(settings: &LoggingSettings) -> std::io::Result<WorkerGuard> {
    ensure_dir(&settings.dir)?;

    let file_appender = RollingFileAppender::new(Rotation::DAILY, &settings.dir, LOG_FILE_PREFIX);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let fmt_layer = fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(true);

    tracing_subscriber::registry()
        .with(env_filter(&settings.filter))
        .with(fmt_layer)
        .init();

    tracing::info!(dir = %settings.dir.display(), "logging initialized");
    Ok(guard)
}

fn env_filter(default: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
}

fn ensure_dir(dir: &Path) -> std::io::Result<()> {
    if !dir.exists() {
        std::fs::create_dir_all(dir)?;
    }
    Ok(())
}
