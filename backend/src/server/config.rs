//! Application configuration.
//!
//! Built once at process entry from the environment and passed by reference
//! into the wiring; core logic never performs ambient lookups. A missing
//! database URL is fatal before the service binds a socket.

use std::net::SocketAddr;
use std::time::Duration;

/// Environment variable naming the PostgreSQL connection string.
pub const DATABASE_URL_VAR: &str = "DATABASE_URL";
/// Environment variable carrying the optional shared secret for reads.
pub const API_KEY_VAR: &str = "API_KEY";
/// Environment variable overriding the bind address.
pub const BIND_ADDR_VAR: &str = "BIND_ADDR";
/// Environment variable overriding the connection-establishment timeout.
pub const CONNECT_TIMEOUT_VAR: &str = "DB_CONNECT_TIMEOUT_SECS";

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Configuration errors, all fatal at startup.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// `DATABASE_URL` is unset or blank; the service cannot run.
    #[error("{DATABASE_URL_VAR} is not set; the service cannot reach its database")]
    MissingDatabaseUrl,

    /// `BIND_ADDR` is present but not a valid socket address.
    #[error("{BIND_ADDR_VAR} is not a valid socket address: {value}")]
    InvalidBindAddr { value: String },

    /// `DB_CONNECT_TIMEOUT_SECS` is present but not a number of seconds.
    #[error("{CONNECT_TIMEOUT_VAR} is not a number of seconds: {value}")]
    InvalidConnectTimeout { value: String },
}

/// Everything the process needs, resolved before any component starts.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// PostgreSQL connection string. Mandatory.
    pub database_url: String,
    /// Shared secret gating `GET /rsvps`; `None` means open mode.
    pub api_key: Option<String>,
    /// Socket address the HTTP server binds to.
    pub bind_addr: SocketAddr,
    /// Connection-establishment timeout for pool checkout and the
    /// reconciler's startup connection.
    pub connect_timeout: Duration,
}

impl AppConfig {
    /// Resolve configuration from the process environment.
    ///
    /// # Errors
    /// Returns a [`ConfigError`] when `DATABASE_URL` is absent or an
    /// override fails to parse; the caller aborts startup.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolve configuration through an explicit lookup function.
    ///
    /// Split out from [`Self::from_env`] so tests can exercise every path
    /// without mutating process-global state.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let database_url = lookup(DATABASE_URL_VAR)
            .map(|value| value.trim().to_owned())
            .filter(|value| !value.is_empty())
            .ok_or(ConfigError::MissingDatabaseUrl)?;

        // A blank secret would gate reads on the empty string; treat it as
        // unset instead.
        let api_key = lookup(API_KEY_VAR).filter(|value| !value.is_empty());

        let bind_addr = match lookup(BIND_ADDR_VAR) {
            Some(value) => value
                .parse()
                .map_err(|_| ConfigError::InvalidBindAddr { value })?,
            None => DEFAULT_BIND_ADDR
                .parse()
                .map_err(|_| ConfigError::InvalidBindAddr {
                    value: DEFAULT_BIND_ADDR.to_owned(),
                })?,
        };

        let connect_timeout = match lookup(CONNECT_TIMEOUT_VAR) {
            Some(value) => {
                let secs: u64 = value
                    .parse()
                    .map_err(|_| ConfigError::InvalidConnectTimeout { value })?;
                Duration::from_secs(secs)
            }
            None => Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
        };

        Ok(Self {
            database_url,
            api_key,
            bind_addr,
            connect_timeout,
        })
    }
}
