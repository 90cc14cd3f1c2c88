//! Server configuration module.
//!
//! This module provides configuration loading for the test case server from
//! environment variables.
//!
//! # Environment Variables
//!
//! - `NOCODE_JWT_ISSUER_URI`: Expected `iss` claim of bearer tokens (required)
//! - `NOCODE_JWK_SET_URI`: URL of the issuer's JSON Web Key Set (required)
//! - `NOCODE_DATABASE_PATH`: SQLite file, or `:memory:` (default: `./data/nocode.db`)
//! - `NOCODE_LISTEN_ADDRESS`: IP address to bind (default: `127.0.0.1`)
//! - `NOCODE_LISTEN_PORT`: Port to listen on (default: `8080`)
//! - `NOCODE_JWKS_CACHE_TTL_SECS`: How long a fetched key set is trusted (default: `300`)
//! - `NOCODE_JWKS_REFRESH_COOLDOWN_SECS`: Minimum gap between forced key set
//!   refreshes triggered by unknown key ids (default: `30`)
//! - `NOCODE_JWKS_FETCH_TIMEOUT_MS`: HTTP timeout for key set fetches (default: `5000`)
//!
//! # Invariants
//!
//! - `jwt_issuer_uri` and `jwk_set_uri` are never empty
//! - `listen_port` is always a valid port number

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

const ISSUER_URI_VAR: &str = "NOCODE_JWT_ISSUER_URI";
const JWK_SET_URI_VAR: &str = "NOCODE_JWK_SET_URI";
const DATABASE_PATH_VAR: &str = "NOCODE_DATABASE_PATH";
const LISTEN_ADDRESS_VAR: &str = "NOCODE_LISTEN_ADDRESS";
const LISTEN_PORT_VAR: &str = "NOCODE_LISTEN_PORT";
const JWKS_CACHE_TTL_VAR: &str = "NOCODE_JWKS_CACHE_TTL_SECS";
const JWKS_REFRESH_COOLDOWN_VAR: &str = "NOCODE_JWKS_REFRESH_COOLDOWN_SECS";
const JWKS_FETCH_TIMEOUT_VAR: &str = "NOCODE_JWKS_FETCH_TIMEOUT_MS";

/// Server configuration.
///
/// Contains all configuration parameters needed to run the server.
///
/// # Pre-conditions
///
/// When constructed via `from_env()`:
/// - All required environment variables must be set
/// - All values must be valid for their respective types
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Issuer that every accepted token must name in its `iss` claim.
    pub jwt_issuer_uri: String,
    /// Where the issuer publishes its signing keys.
    pub jwk_set_uri: String,
    /// SQLite database file.
    pub database_path: PathBuf,
    /// IP address to bind.
    pub listen_address: IpAddr,
    /// Port to listen on for HTTP connections.
    pub listen_port: u16,
    /// Lifetime of a cached key set.
    pub jwks_cache_ttl: Duration,
    /// Minimum time between forced key set refreshes.
    pub jwks_refresh_cooldown: Duration,
    /// Timeout for a single key set fetch.
    pub jwks_fetch_timeout: Duration,
}

/// Error returned when loading configuration fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// An environment variable is missing.
    MissingEnvVar(String),
    /// An environment variable has an invalid value.
    InvalidValue { name: String, message: String },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingEnvVar(name) => {
                write!(f, "missing required environment variable: {name}")
            }
            Self::InvalidValue { name, message } => {
                write!(f, "invalid value for {name}: {message}")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

impl ServerConfig {
    /// Default port for the server.
    pub const DEFAULT_PORT: u16 = 8080;
    /// Default bind address.
    pub const DEFAULT_LISTEN_ADDRESS: IpAddr = IpAddr::V4(Ipv4Addr::LOCALHOST);
    /// Default database file.
    pub const DEFAULT_DATABASE_PATH: &'static str = "./data/nocode.db";
    /// Default key set cache lifetime in seconds.
    pub const DEFAULT_JWKS_CACHE_TTL_SECS: u64 = 300;
    /// Default forced-refresh cooldown in seconds.
    pub const DEFAULT_JWKS_REFRESH_COOLDOWN_SECS: u64 = 30;
    /// Default key set fetch timeout in milliseconds.
    pub const DEFAULT_JWKS_FETCH_TIMEOUT_MS: u64 = 5_000;

    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `NOCODE_JWT_ISSUER_URI` or `NOCODE_JWK_SET_URI` is not set or is empty
    /// - any optional variable is set but cannot be parsed
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration from an arbitrary variable lookup.
    ///
    /// `from_env` is this function applied to the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            jwt_issuer_uri: required(&lookup, ISSUER_URI_VAR)?,
            jwk_set_uri: required(&lookup, JWK_SET_URI_VAR)?,
            database_path: lookup(DATABASE_PATH_VAR)
                .map_or_else(|| PathBuf::from(Self::DEFAULT_DATABASE_PATH), PathBuf::from),
            listen_address: parsed(&lookup, LISTEN_ADDRESS_VAR, "an IP address")?
                .unwrap_or(Self::DEFAULT_LISTEN_ADDRESS),
            listen_port: parsed(&lookup, LISTEN_PORT_VAR, "a valid port number (must be 0-65535)")?
                .unwrap_or(Self::DEFAULT_PORT),
            jwks_cache_ttl: Duration::from_secs(
                parsed(&lookup, JWKS_CACHE_TTL_VAR, "a number of seconds")?
                    .unwrap_or(Self::DEFAULT_JWKS_CACHE_TTL_SECS),
            ),
            jwks_refresh_cooldown: Duration::from_secs(
                parsed(&lookup, JWKS_REFRESH_COOLDOWN_VAR, "a number of seconds")?
                    .unwrap_or(Self::DEFAULT_JWKS_REFRESH_COOLDOWN_SECS),
            ),
            jwks_fetch_timeout: Duration::from_millis(
                parsed(&lookup, JWKS_FETCH_TIMEOUT_VAR, "a number of milliseconds")?
                    .unwrap_or(Self::DEFAULT_JWKS_FETCH_TIMEOUT_MS),
            ),
        })
    }

    /// The socket address the server binds to.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.listen_address, self.listen_port)
    }
}

/// Load a variable that must be present and non-empty.
fn required<F>(lookup: &F, name: &str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let value = lookup(name).ok_or_else(|| ConfigError::MissingEnvVar(name.to_string()))?;

    if value.trim().is_empty() {
        return Err(ConfigError::InvalidValue {
            name: name.to_string(),
            message: "must not be empty".to_string(),
        });
    }

    Ok(value)
}

/// Load and parse an optional variable. Returns `None` if it is not set.
fn parsed<F, T>(lookup: &F, name: &str, expected: &str) -> Result<Option<T>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    lookup(name)
        .map(|value| {
            value.trim().parse::<T>().map_err(|_| ConfigError::InvalidValue {
                name: name.to_string(),
                message: format!("'{value}' is not {expected}"),
            })
        })
        .transpose()
}
