//! Configuration resolution and constants.
//!
//! Resolves TLS server settings from layered sources. Every field is resolved
//! independently, highest priority first:
//!
//! 1. Explicit value from [`HttpsOptions`] (CLI flag or TOML file)
//! 2. Environment variable `<PREFIX>_<FIELD>`
//! 3. Built-in default (host and port only)
//!
//! Certificate and private key have no default. Their paths must resolve and
//! the files are read once, producing an immutable [`HttpsConfig`].

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::Deserialize;

// =============================================================================
// Defaults
// =============================================================================

/// Environment variable namespace when no prefix is given
pub const DEFAULT_PREFIX: &str = "HTTPS_SERVER";

/// Bind host when neither explicit nor environment value is set
pub const DEFAULT_HOST: &str = "localhost";

/// Bind port when neither explicit nor environment value is set
pub const DEFAULT_PORT: u16 = 443;

/// Default log filter when RUST_LOG is not set
pub const DEFAULT_LOG_FILTER: &str = "https_server=info,tower_http=info";

/// Default log format (text or json)
pub const DEFAULT_LOG_FORMAT: &str = "text";

// Environment variable suffixes, joined to the prefix with an underscore
pub const ENV_HOST: &str = "HOST";
pub const ENV_PORT: &str = "PORT";
pub const ENV_CERT_PATH: &str = "CERT_PATH";
pub const ENV_KEY_PATH: &str = "KEY_PATH";

// =============================================================================
// Environment lookup
// =============================================================================

/// Key/value lookup used for environment overrides.
///
/// Resolution never touches process state directly; callers pass either
/// [`ProcessEnv`] or a snapshot map.
pub trait EnvSource {
    fn var(&self, key: &str) -> Option<String>;
}

/// Reads from the real process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

impl EnvSource for HashMap<String, String> {
    fn var(&self, key: &str) -> Option<String> {
        self.get(key).cloned()
    }
}

// =============================================================================
// Partial options
// =============================================================================

/// Caller-supplied settings. Any field may be left out.
///
/// Empty strings and a port of `0` count as "not provided" and fall through
/// to the environment.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct HttpsOptions {
    /// Environment variable namespace (default: `HTTPS_SERVER`)
    pub prefix: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    /// Path to the PEM certificate chain
    pub cert_path: Option<PathBuf>,
    /// Path to the PEM private key
    pub key_path: Option<PathBuf>,
}

impl HttpsOptions {
    /// Load options from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&contents)?)
    }

    /// Overlay `self` on `fallback`: fields set here win.
    ///
    /// Empty strings and port `0` count as unset, same as in [`Self::resolve`].
    pub fn merge(self, fallback: HttpsOptions) -> HttpsOptions {
        HttpsOptions {
            prefix: non_empty(self.prefix).or(fallback.prefix),
            host: non_empty(self.host).or(fallback.host),
            port: self.port.filter(|port| *port != 0).or(fallback.port),
            cert_path: non_empty_path(self.cert_path).or(fallback.cert_path),
            key_path: non_empty_path(self.key_path).or(fallback.key_path),
        }
    }

    /// Resolve against the process environment.
    pub fn resolve_from_env(self) -> Result<HttpsConfig, ConfigError> {
        self.resolve(&ProcessEnv)
    }

    /// Resolve every field and read the certificate and key files.
    pub fn resolve<E: EnvSource + ?Sized>(self, env: &E) -> Result<HttpsConfig, ConfigError> {
        let prefix = non_empty(self.prefix).unwrap_or_else(|| DEFAULT_PREFIX.to_string());
        let lookup = Lookup { env, prefix: &prefix };

        let host = match non_empty(self.host) {
            Some(host) => host,
            None => lookup.get(ENV_HOST).unwrap_or_else(|| DEFAULT_HOST.to_string()),
        };

        let port = match self.port.filter(|port| *port != 0) {
            Some(port) => port,
            None => match lookup.get(ENV_PORT) {
                Some(value) => value.trim().parse::<u16>().map_err(|_| {
                    ConfigError::InvalidPort {
                        var: lookup.name(ENV_PORT),
                        value,
                    }
                })?,
                None => DEFAULT_PORT,
            },
        };

        let cert_path = lookup
            .path(self.cert_path, ENV_CERT_PATH)
            .ok_or_else(|| ConfigError::MissingCertPath {
                var: lookup.name(ENV_CERT_PATH),
            })?;
        let key_path = lookup
            .path(self.key_path, ENV_KEY_PATH)
            .ok_or_else(|| ConfigError::MissingKeyPath {
                var: lookup.name(ENV_KEY_PATH),
            })?;

        let cert = read_secret(&cert_path)?;
        let key = read_secret(&key_path)?;

        tracing::debug!(
            prefix = %prefix,
            host = %host,
            port,
            cert = %cert_path.display(),
            key = %key_path.display(),
            "Resolved HTTPS configuration"
        );

        Ok(HttpsConfig {
            prefix,
            host,
            port,
            cert,
            key,
            cert_path,
            key_path,
        })
    }
}

/// Prefixed view over an [`EnvSource`].
struct Lookup<'a, E: ?Sized> {
    env: &'a E,
    prefix: &'a str,
}

impl<E: EnvSource + ?Sized> Lookup<'_, E> {
    fn name(&self, field: &str) -> String {
        format!("{}_{}", self.prefix, field)
    }

    fn get(&self, field: &str) -> Option<String> {
        non_empty(self.env.var(&self.name(field)))
    }

    fn path(&self, explicit: Option<PathBuf>, field: &str) -> Option<PathBuf> {
        non_empty_path(explicit).or_else(|| self.get(field).map(PathBuf::from))
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

fn non_empty_path(value: Option<PathBuf>) -> Option<PathBuf> {
    value.filter(|path| !path.as_os_str().is_empty())
}

/// Read a whole PEM file as UTF-8 text.
fn read_secret(path: &Path) -> Result<String, ConfigError> {
    let bytes = std::fs::read(path).map_err(|source| ConfigError::ReadSecret {
        path: path.to_path_buf(),
        source,
    })?;

    let text = String::from_utf8_lossy(&bytes).into_owned();
    if text.is_empty() {
        return Err(ConfigError::EmptySecret {
            path: path.to_path_buf(),
        });
    }
    Ok(text)
}

// =============================================================================
// Resolved configuration
// =============================================================================

/// Fully resolved TLS server configuration.
///
/// Built only by [`HttpsOptions::resolve`] and never modified afterwards.
#[derive(Clone, PartialEq, Eq)]
pub struct HttpsConfig {
    prefix: String,
    host: String,
    port: u16,
    cert: String,
    key: String,
    cert_path: PathBuf,
    key_path: PathBuf,
}

impl HttpsConfig {
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// PEM certificate chain text
    pub fn cert(&self) -> &str {
        &self.cert
    }

    /// PEM private key text
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Path the certificate was read from
    pub fn cert_path(&self) -> &Path {
        &self.cert_path
    }

    /// Path the private key was read from
    pub fn key_path(&self) -> &Path {
        &self.key_path
    }
}

impl fmt::Debug for HttpsConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpsConfig")
            .field("prefix", &self.prefix)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("cert_path", &self.cert_path)
            .field("key_path", &self.key_path)
            .field("cert_len", &self.cert.len())
            .field("key", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Missing certificate path: no explicit path and {var} is not set")]
    MissingCertPath { var: String },
    #[error("Missing key path: no explicit path and {var} is not set")]
    MissingKeyPath { var: String },
    #[error("Invalid port in {var}: {value:?}")]
    InvalidPort { var: String, value: String },
    #[error("Failed to read {}: {source}", path.display())]
    ReadSecret {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Secret file {} is empty", path.display())]
    EmptySecret { path: PathBuf },
}
