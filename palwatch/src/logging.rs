use std::fs;

use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;

/// Daily log files kept before the oldest is deleted.
const MAX_LOG_FILES: usize = 90;

/// Console plus daily rotated file logging.
///
/// `RUST_LOG` wins over the configured level when set. The returned guard
/// flushes the file writer and must live until the process exits.
pub fn init_logging(config: &Config) -> Result<WorkerGuard> {
    fs::create_dir_all(&config.log_dir)
        .with_context(|| format!("creating log directory {}", config.log_dir.display()))?;

    let appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix("main")
        .filename_suffix("log")
        .max_log_files(MAX_LOG_FILES)
        .build(&config.log_dir)
        .context("creating rolling log file")?;
    let (non_blocking_file, guard) = tracing_appender::non_blocking(appender);

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.directive()));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(false).compact())
        .with(
            fmt::layer()
                .with_writer(non_blocking_file)
                .with_ansi(false)
                .with_target(true),
        )
        .init();

    Ok(guard)
}
