use anyhow::Result;
use tokio::signal;

/// Resolves on Ctrl+C or, on unix, SIGTERM.
///
/// # Errors
/// Returns an error if a signal handler cannot be installed.
pub async fn wait_for_shutdown() -> Result<()> {
    let signal = tokio::select! {
        result = ctrl_c() => result?,
        result = sigterm() => result?,
    };

    tracing::info!(signal, "shutdown signal received, draining connections");
    Ok(())
}

async fn ctrl_c() -> Result<&'static str> {
    signal::ctrl_c().await.inspect_err(|e| {
        tracing::error!(error = %e, "failed to listen for Ctrl+C");
    })?;
    Ok("SIGINT")
}

#[cfg(unix)]
async fn sigterm() -> Result<&'static str> {
    let mut terminate = signal::unix::signal(signal::unix::SignalKind::terminate())
        .inspect_err(|e| tracing::error!(error = %e, "failed to install SIGTERM handler"))?;
    terminate.recv().await;
    Ok("SIGTERM")
}

#[cfg(not(unix))]
async fn sigterm() -> Result<&'static str> {
    std::future::pending().await
}
