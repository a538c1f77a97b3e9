//! Liveness probe.

/// Returns `ok` whenever the listener can answer over TLS.
pub async fn health() -> &'static str {
    "ok"
}
