//! HTTPS server module.
//!
//! Wraps an axum-server TLS listener with an explicit lifecycle:
//! - Start from a resolved [`HttpsConfig`](crate::config::HttpsConfig)
//! - Cooperative shutdown through a cancellation token
//! - Per-exchange error handling for panicking handlers

mod server;
mod shutdown;

pub use server::{HttpsServer, ServerError, ServerState, SHUTDOWN_GRACE_SECS};
pub use shutdown::shutdown_signal;
