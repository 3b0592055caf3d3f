//! # OS shutdown signals.
//!
//! [`wait_for_shutdown_signal`] completes when the process is asked to
//! terminate, which ends the run loop and stops every worker.
//!
//! - **Unix**: `SIGINT`, `SIGTERM` (systemd stop), `SIGQUIT`
//! - **Elsewhere**: Ctrl-C

/// Waits for a termination signal.
///
/// Returns `Err` if the signal listeners cannot be installed.
#[cfg(unix)]
pub async fn wait_for_shutdown_signal() -> std::io::Result<()> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigquit = signal(SignalKind::quit())?;

    tokio::select! {
        _ = sigint.recv()  => {},
        _ = sigterm.recv() => {},
        _ = sigquit.recv() => {},
    }
    Ok(())
}

/// Waits for a termination signal.
#[cfg(not(unix))]
pub async fn wait_for_shutdown_signal() -> std::io::Result<()> {
    tokio::signal::ctrl_c().await
}
