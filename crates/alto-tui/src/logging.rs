use anyhow::{Context, Result};
use std::fs::{self, File};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn filter(verbose: bool, quiet_default: &str) -> EnvFilter {
    let default_filter = if verbose { "debug" } else { quiet_default };
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter))
}

/// Where the TUI writes its log, so the alternate screen stays clean
pub fn log_path() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("alto")
        .join("alto.log")
}

/// Log to a file; used while the TUI owns the terminal
pub fn init_file(verbose: bool) -> Result<PathBuf> {
    let path = log_path();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create log directory {}", parent.display()))?;
    }
    let log_file = File::create(&path)
        .with_context(|| format!("Failed to create log file {}", path.display()))?;

    tracing_subscriber::registry()
        .with(filter(verbose, "info,alto_core=debug"))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_ansi(false)
                .with_writer(std::sync::Mutex::new(log_file)),
        )
        .init();

    Ok(path)
}

/// Log to stderr; used by the one-shot commands
pub fn init_stderr(verbose: bool) {
    tracing_subscriber::registry()
        .with(filter(verbose, "warn"))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
