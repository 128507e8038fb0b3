//! Map process termination signals onto the shutdown token.
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Resolve on the first SIGINT or SIGTERM and name it.
pub async fn termination_signal() -> &'static str {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => tokio::select! {
                _ = tokio::signal::ctrl_c() => "SIGINT",
                _ = terminate.recv() => "SIGTERM",
            },
            Err(err) => {
                warn!(
                    target: "chatapp_mcp::lifecycle",
                    error = %err,
                    "SIGTERM handler unavailable; listening for SIGINT only"
                );
                ctrl_c_only().await
            }
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c_only().await
    }
}

async fn ctrl_c_only() -> &'static str {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(
            target: "chatapp_mcp::lifecycle",
            error = %err,
            "Ctrl-C handler unavailable"
        );
        std::future::pending::<()>().await;
    }
    "SIGINT"
}

/// Cancel `token` on the first termination signal.
///
/// The task also ends quietly when the token is cancelled for another reason.
pub fn install(token: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::select! {
            signal = termination_signal() => {
                info!(
                    target: "chatapp_mcp::lifecycle",
                    signal,
                    "Termination signal received"
                );
                token.cancel();
            }
            _ = token.cancelled() => {}
        }
    })
}
