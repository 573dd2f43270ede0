//! Tracing setup for the chat server.
//!
//! `RUST_LOG`, when set, overrides the configured level.

use std::fs::{self, File, OpenOptions};
use std::path::Path;
use std::sync::Arc;

use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;
use crate::{PampaError, Result};

const LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Normalize a configured level name. Unknown names fall back to `info`.
fn level_name(level: &str) -> &'static str {
    let level = level.trim().to_ascii_lowercase();
    if level == "warning" {
        return "warn";
    }
    LEVELS
        .iter()
        .copied()
        .find(|known| *known == level)
        .unwrap_or("info")
}

fn filter_for(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level_name(level)))
}

/// Open the log file for appending, creating missing directories.
fn open_log_file(path: &Path) -> Result<File> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir)?;
    }
    Ok(OpenOptions::new().create(true).append(true).open(path)?)
}

/// Install the global subscriber.
///
/// Events go to stdout and are appended to `config.file`. An empty `file`
/// logs to stdout only.
pub fn init(config: &LoggingConfig) -> Result<()> {
    let filter = filter_for(&config.level);
    let layer = tracing_subscriber::fmt::layer().with_ansi(false);

    let installed = if config.file.is_empty() {
        tracing_subscriber::registry()
            .with(layer.with_writer(std::io::stdout))
            .with(filter)
            .try_init()
    } else {
        let file = Arc::new(open_log_file(Path::new(&config.file))?);
        tracing_subscriber::registry()
            .with(layer.with_writer(std::io::stdout.and(file)))
            .with(filter)
            .try_init()
    };

    installed.map_err(|e| PampaError::Config(format!("logging init failed: {e}")))
}

/// Install a colored stdout-only subscriber. Used when [`init`] fails.
pub fn init_console_only(level: &str) {
    let _ = tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(filter_for(level))
        .try_init();
}
