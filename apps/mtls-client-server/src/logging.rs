//! Global `tracing` subscriber setup.

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::UtcTime;

use crate::config::{LogFormat, LoggingConfig};

/// Installs the global subscriber and routes `log` records into it.
///
/// `RUST_LOG` takes precedence over the configured level; `-v` flags raise
/// the configured level to info, debug or trace.
///
/// # Errors
/// Returns an error if the filter directive is invalid or a global
/// subscriber is already installed.
pub fn init(config: &LoggingConfig, verbose: u8) -> Result<()> {
    let filter = build_filter(config, verbose)?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(UtcTime::rfc_3339())
        .with_target(true);

    match config.format {
        LogFormat::Text => tracing::subscriber::set_global_default(builder.finish()),
        LogFormat::Json => tracing::subscriber::set_global_default(builder.json().finish()),
    }
    .context("failed to install tracing subscriber")?;

    // rustls and hyper-rustls log through the `log` facade
    tracing_log::LogTracer::init().context("failed to bridge log records")?;
    Ok(())
}

fn build_filter(config: &LoggingConfig, verbose: u8) -> Result<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }

    let directive = match verbose {
        0 => config.level.as_str(),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    EnvFilter::try_new(directive).with_context(|| format!("invalid log level '{directive}'"))
}
