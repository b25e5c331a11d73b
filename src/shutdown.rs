use tokio_util::sync::CancellationToken;

/// Why we are shutting down
#[derive(Debug, Clone, Copy)]
pub enum ShutdownReason {
    CtrlC,
    Sigterm,
}

/// Cancel `token` on Ctrl+C or SIGTERM
pub async fn cancel_on_signal(token: CancellationToken) {
    let reason = tokio::select! {
        _ = token.cancelled() => return,
        reason = wait_ctrl_c() => reason,
        reason = wait_sigterm() => reason,
    };

    tracing::info!(?reason, "Shutting down, waiting for collectors to finish");
    token.cancel();
}

async fn wait_ctrl_c() -> ShutdownReason {
    match tokio::signal::ctrl_c().await {
        Ok(()) => ShutdownReason::CtrlC,
        // If we can't register, just never fire.
        Err(_) => std::future::pending().await,
    }
}

#[cfg(unix)]
async fn wait_sigterm() -> ShutdownReason {
    use tokio::signal::unix::{SignalKind, signal};

    match signal(SignalKind::terminate()) {
        Ok(mut sig) => {
            sig.recv().await;
            ShutdownReason::Sigterm
        }
        Err(_) => std::future::pending().await,
    }
}

#[cfg(not(unix))]
async fn wait_sigterm() -> ShutdownReason {
    std::future::pending().await
}
