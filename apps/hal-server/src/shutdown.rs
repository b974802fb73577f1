//! Process shutdown: OS signals and programmatic cancellation share one token.

use std::fmt;

use tokio::signal;
use tokio_util::sync::CancellationToken;

/// What ended the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownReason {
    /// Ctrl+C
    Interrupt,
    /// SIGTERM
    Terminate,
    /// Another holder of the token cancelled it
    Cancelled,
}

impl fmt::Display for ShutdownReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Interrupt => "ctrl-c",
            Self::Terminate => "SIGTERM",
            Self::Cancelled => "cancelled",
        })
    }
}

/// Resolve on Ctrl+C, SIGTERM or cancellation of `token`, whichever comes first, then
/// cancel `token` so every other holder observes the shutdown.
///
/// A signal handler that cannot be installed is logged and that trigger is ignored.
pub async fn shutdown_on_signal(token: CancellationToken) -> ShutdownReason {
    let reason = tokio::select! {
        biased;
        () = token.cancelled() => ShutdownReason::Cancelled,
        reason = interrupt() => reason,
        reason = terminate() => reason,
    };
    tracing::info!(%reason, "Shutting down HAL server");
    token.cancel();
    reason
}

async fn interrupt() -> ShutdownReason {
    if let Err(e) = signal::ctrl_c().await {
        tracing::warn!(error = %e, "Ctrl+C handler unavailable");
        std::future::pending::<()>().await;
    }
    ShutdownReason::Interrupt
}

#[cfg(unix)]
async fn terminate() -> ShutdownReason {
    match signal::unix::signal(signal::unix::SignalKind::terminate()) {
        Ok(mut handler) => {
            handler.recv().await;
        }
        Err(e) => {
            tracing::warn!(error = %e, "SIGTERM handler unavailable");
            std::future::pending::<()>().await;
        }
    }
    ShutdownReason::Terminate
}

#[cfg(not(unix))]
async fn terminate() -> ShutdownReason {
    std::future::pending::<ShutdownReason>().await
}
