//! https-server: serve a small router over TLS.
//!
//! Initializes tracing, merges CLI flags over an optional TOML file,
//! resolves the rest from `<PREFIX>_*` environment variables, starts the
//! listener and stops it on SIGINT/SIGTERM.

mod routes;

use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use https_server::config::{HttpsOptions, DEFAULT_LOG_FILTER, DEFAULT_LOG_FORMAT};
use https_server::{shutdown_signal, HttpsServer};
use routes::create_router;

/// Serve HTTPS with layered configuration
#[derive(Parser, Debug)]
#[command(name = "https-server", version, about)]
struct Args {
    /// Optional TOML file with prefix, host, port, cert_path, key_path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Environment variable prefix (default: HTTPS_SERVER)
    #[arg(long)]
    prefix: Option<String>,

    /// Bind host
    #[arg(long)]
    host: Option<String>,

    /// Bind port
    #[arg(short, long)]
    port: Option<u16>,

    /// Path to the PEM certificate chain
    #[arg(long)]
    cert: Option<PathBuf>,

    /// Path to the PEM private key
    #[arg(long)]
    key: Option<PathBuf>,

    /// Log level filter (e.g., "https_server=debug,tower_http=info")
    #[arg(short, long)]
    log_level: Option<String>,

    /// Log format: "text" or "json"
    #[arg(long, default_value = DEFAULT_LOG_FORMAT)]
    log_format: String,
}

impl Args {
    fn options(&self) -> HttpsOptions {
        HttpsOptions {
            prefix: self.prefix.clone(),
            host: self.host.clone(),
            port: self.port,
            cert_path: self.cert.clone(),
            key_path: self.key.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Initialize tracing with priority: CLI > env > default
    let log_filter = args
        .log_level
        .clone()
        .or_else(|| std::env::var("RUST_LOG").ok())
        .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string());

    let registry =
        tracing_subscriber::registry().with(tracing_subscriber::EnvFilter::new(&log_filter));
    if args.log_format == "json" {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    let file_options = match &args.config {
        Some(path) => {
            tracing::info!(path = %path.display(), "Loading configuration file");
            HttpsOptions::load(path)?
        }
        None => HttpsOptions::default(),
    };

    let config = args.options().merge(file_options).resolve_from_env()?;
    tracing::info!(
        prefix = %config.prefix(),
        host = %config.host(),
        port = config.port(),
        "Loaded configuration"
    );

    let server = HttpsServer::start_default(&config, create_router()).await?;

    let reason = shutdown_signal().await;
    server.stop(Some(reason));
    server.wait().await?;

    Ok(())
}
