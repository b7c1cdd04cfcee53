use crate::conf::LoggingConfig;
use anyhow::{Context, Result};
use std::fs::{self, OpenOptions};
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Initialize the logging system with JSON formatting.
///
/// The filter comes from `RUST_LOG` when set, otherwise from the configured
/// level. With a configured file the sink is `<path>/<file>` (created on
/// demand, truncated first when `rewrite` is set); otherwise stdout.
pub fn init(config: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::try_new(&config.level).unwrap_or_else(|_| EnvFilter::new("info"))
    });

    if config.file.is_empty() {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .flatten_event(true)
            .init();
        return Ok(());
    }

    let dir = Path::new(&config.path);
    if !config.path.is_empty() {
        fs::create_dir_all(dir)
            .with_context(|| format!("failed to create log directory {}", dir.display()))?;
    }

    let log_path = dir.join(&config.file);
    if config.rewrite && log_path.exists() {
        fs::remove_file(&log_path)
            .with_context(|| format!("failed to rewrite log file {}", log_path.display()))?;
    }

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("failed to open log file {}", log_path.display()))?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .json()
        .flatten_event(true)
        .with_writer(Arc::new(file))
        .with_ansi(false)
        .init();

    Ok(())
}
