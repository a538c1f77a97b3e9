//! https-server: layered TLS configuration and HTTPS listener lifecycle.
//!
//! [`HttpsOptions`] collects explicit settings, [`HttpsOptions::resolve`]
//! fills the gaps from the environment and reads the certificate and key,
//! and [`HttpsServer`] runs an axum router over TLS until stopped.

pub mod config;
pub mod error;
pub mod http;

pub use config::{ConfigError, EnvSource, HttpsConfig, HttpsOptions, ProcessEnv};
pub use error::{default_error_handler, ExchangeError};
pub use http::{shutdown_signal, HttpsServer, ServerError, ServerState};
