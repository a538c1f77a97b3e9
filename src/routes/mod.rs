//! Demo routes served by the binary.
//!
//! Request handling itself belongs to whoever embeds the library; this
//! router only gives the binary something to answer with.

pub mod health;

use axum::{routing::get, Router};
use tower_http::trace::TraceLayer;

/// Build the binary's router with request tracing.
pub fn create_router() -> Router {
    Router::new()
        .route("/health", get(health::health))
        .fallback(greeting)
        .layer(TraceLayer::new_for_http())
}

async fn greeting() -> &'static str {
    "Hello from https-server\n"
}
