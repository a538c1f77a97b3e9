//! HTTPS listener lifecycle.
//!
//! [`HttpsServer::start`] binds the socket, loads the PEM material from a
//! resolved [`HttpsConfig`] and spawns the serve loop. [`HttpsServer::stop`]
//! cancels the server's token, which triggers a graceful shutdown. Dropping
//! the handle cancels the token as well.

use std::any::Any;
use std::net::SocketAddr;
use std::sync::OnceLock;
use std::time::Duration;

use axum::response::Response;
use axum::Router;
use axum_server::tls_rustls::RustlsConfig;
use axum_server::Handle;
use tokio::task::JoinHandle;
use tokio_util::sync::{CancellationToken, DropGuard};
use tower_http::catch_panic::CatchPanicLayer;

use crate::config::HttpsConfig;
use crate::error::{default_error_handler, ExchangeError};

/// Time allowed for in-flight connections to finish after `stop`
pub const SHUTDOWN_GRACE_SECS: u64 = 30;

/// Server startup error
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Failed to bind server: {0}")]
    Bind(#[from] std::io::Error),

    #[error("Failed to load TLS configuration: {0}")]
    TlsConfig(String),

    #[error("Server error: {0}")]
    Server(String),
}

/// Where a server is in its lifecycle. Transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    /// Bound and accepting connections
    Running,
    /// `stop` was called; connections are draining
    Stopping,
    /// Serve loop has exited
    Stopped,
}

/// A running HTTPS listener.
pub struct HttpsServer {
    host: String,
    port: u16,
    local_addr: SocketAddr,
    cancel: CancellationToken,
    // Cancels on drop so a discarded handle never leaves the listener running
    _cancel_on_drop: DropGuard,
    stop_reason: OnceLock<String>,
    task: JoinHandle<Result<(), ServerError>>,
}

impl HttpsServer {
    /// Start serving `app` with the default error handler.
    pub async fn start_default(config: &HttpsConfig, app: Router) -> Result<Self, ServerError> {
        Self::start(config, app, default_error_handler).await
    }

    /// Start serving `app` over TLS.
    ///
    /// Returns once the serve loop is accepting connections; bind failures
    /// and unusable certificate material are reported here. `error_handler` builds the
    /// response for any request whose handler panics.
    pub async fn start<E>(config: &HttpsConfig, app: Router, error_handler: E) -> Result<Self, ServerError>
    where
        E: Fn(ExchangeError) -> Response + Clone + Send + Sync + 'static,
    {
        install_crypto_provider();

        let rustls_config = RustlsConfig::from_pem(
            config.cert().as_bytes().to_vec(),
            config.key().as_bytes().to_vec(),
        )
        .await
        .map_err(|e| ServerError::TlsConfig(format!("Failed to load certificates: {}", e)))?;

        let listener = tokio::net::TcpListener::bind((config.host(), config.port())).await?;
        let local_addr = listener.local_addr()?;
        let listener = listener.into_std()?;

        tracing::info!(
            %local_addr,
            host = %config.host(),
            port = config.port(),
            cert = %config.cert_path().display(),
            key = %config.key_path().display(),
            "Starting HTTPS server"
        );

        let app = app.layer(CatchPanicLayer::custom(
            move |payload: Box<dyn Any + Send + 'static>| {
                error_handler(ExchangeError::from_panic(payload))
            },
        ));

        let handle = Handle::new();
        let cancel = CancellationToken::new();

        let shutdown = spawn_shutdown_watcher(handle.clone(), cancel.clone());

        let server = axum_server::from_tcp_rustls(listener, rustls_config).handle(handle.clone());
        let task = tokio::spawn(async move {
            let result = server
                .serve(app.into_make_service())
                .await
                .map_err(|e| ServerError::Server(e.to_string()));

            // Serve loop ended on its own; the watcher has nothing left to do
            shutdown.abort();

            match &result {
                Ok(()) => tracing::info!(%local_addr, "HTTPS server stopped"),
                Err(e) => tracing::error!(%local_addr, error = %e, "HTTPS server failed"),
            }
            result
        });

        // onListen: report only once the serve loop is accepting
        match handle.listening().await {
            Some(addr) => tracing::info!(%addr, "HTTPS server started"),
            None => {
                cancel.cancel();
                return match task.await {
                    Ok(Err(e)) => Err(e),
                    _ => Err(ServerError::Server(
                        "Listener exited before accepting connections".to_string(),
                    )),
                };
            }
        }

        Ok(Self {
            host: config.host().to_string(),
            port: config.port(),
            local_addr,
            _cancel_on_drop: cancel.clone().drop_guard(),
            cancel,
            stop_reason: OnceLock::new(),
            task,
        })
    }

    /// Host the server was asked to bind.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Port the server was asked to bind. `0` stays `0`; see [`Self::local_addr`].
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Address the OS actually assigned.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Reason passed to the first `stop` call, if any.
    pub fn stop_reason(&self) -> Option<&str> {
        self.stop_reason.get().map(String::as_str)
    }

    pub fn state(&self) -> ServerState {
        if self.task.is_finished() {
            ServerState::Stopped
        } else if self.cancel.is_cancelled() {
            ServerState::Stopping
        } else {
            ServerState::Running
        }
    }

    /// Begin graceful shutdown.
    ///
    /// Returns immediately; use [`Self::wait`] to observe completion.
    /// Calling it again, or after the server has stopped, does nothing.
    pub fn stop(&self, reason: Option<&str>) {
        if self.cancel.is_cancelled() {
            tracing::debug!(addr = %self.local_addr, "HTTPS server already stopping");
            return;
        }

        if let Some(reason) = reason {
            let _ = self.stop_reason.set(reason.to_string());
        }
        tracing::info!(
            addr = %self.local_addr,
            reason = reason.unwrap_or("none"),
            "Stopping HTTPS server"
        );
        self.cancel.cancel();
    }

    /// Wait for the serve loop to exit.
    ///
    /// Dropping the returned future before it completes stops the server.
    pub async fn wait(self) -> Result<(), ServerError> {
        self.task
            .await
            .map_err(|e| ServerError::Server(format!("Serve task failed: {}", e)))?
    }
}

/// Translate token cancellation into a graceful shutdown of the listener.
fn spawn_shutdown_watcher(handle: Handle, cancel: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        cancel.cancelled().await;
        handle.graceful_shutdown(Some(Duration::from_secs(SHUTDOWN_GRACE_SECS)));
        tracing::info!(
            "Graceful shutdown initiated, waiting up to {} seconds for connections to close",
            SHUTDOWN_GRACE_SECS
        );
    })
}

/// Pick aws-lc-rs as the process crypto provider unless one is already set.
fn install_crypto_provider() {
    if rustls::crypto::CryptoProvider::get_default().is_some() {
        return;
    }

    let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();
}
