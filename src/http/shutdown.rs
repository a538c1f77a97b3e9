//! Process signal handling.
//!
//! The binary waits on [`shutdown_signal`] and hands the signal name to
//! `HttpsServer::stop` as the shutdown reason.

/// Resolve when SIGINT (Ctrl+C) or SIGTERM arrives.
///
/// Returns the signal name. If a handler cannot be installed that branch
/// never resolves and the failure is logged.
pub async fn shutdown_signal() -> &'static str {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
            "SIGINT"
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown");
            "SIGTERM"
        }
    }
}
