//! Logging setup for hosts embedding the gallery.
//!
//! Uses systemd-journald when available on Linux; otherwise logs roll daily
//! into a `logs` directory next to the configured database.

use anyhow::Result;
use std::path::PathBuf;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;

/// Initialize the logging system for this process.
///
/// Call once at startup, before any gallery operation. The level is
/// controlled via the `AIVAULT_LOG` environment variable (`debug`, `info`,
/// `warn`, `error`); unset means `info`.
pub fn init(config: &Config) -> Result<()> {
    let env_filter = EnvFilter::try_from_env("AIVAULT_LOG")
        .unwrap_or_else(|_| EnvFilter::new("info"));

    #[cfg(target_os = "linux")]
    {
        // Try to use journald on Linux
        if let Ok(journald_layer) = tracing_journald::layer() {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(journald_layer)
                .init();

            tracing::info!("Logging initialized with journald backend");
            return Ok(());
        }
    }

    // Fallback: daily-rolling file next to the database.
    let log_dir = log_dir_for(config);
    std::fs::create_dir_all(&log_dir)?;

    let file_appender = tracing_appender::rolling::daily(&log_dir, "aivault.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    // Store the guard in a static to prevent it from being dropped
    // This is safe because we only call init() once at startup
    static GUARD: std::sync::OnceLock<tracing_appender::non_blocking::WorkerGuard> = std::sync::OnceLock::new();
    let _ = GUARD.set(_guard);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
        .init();

    tracing::info!("Logging initialized with file backend at {:?}", log_dir);
    Ok(())
}

/// Logs live alongside the database so a backup of the data directory
/// carries them too.
fn log_dir_for(config: &Config) -> PathBuf {
    config
        .db_path
        .parent()
        .map(|p| p.join("logs"))
        .unwrap_or_else(|| PathBuf::from("logs"))
}
