//! Configuration for the berth server.
//!
//! This module handles:
//! - Listen address and persistence settings
//! - JWT secret handling
//! - Development and production mode settings

use std::{
    fmt,
    net::{IpAddr, SocketAddr},
    path::PathBuf,
    str::FromStr,
    sync::LazyLock,
};

use base64::{prelude::BASE64_URL_SAFE_NO_PAD, Engine};
use getset::Getters;

use crate::{ServerError, ServerResult};

//--------------------------------------------------------------------------------------------------
// Constants
//--------------------------------------------------------------------------------------------------

/// Default JWT header for the HS256 algorithm, base64url encoded as it appears in a token.
pub static DEFAULT_JWT_HEADER: LazyLock<String> =
    LazyLock::new(|| BASE64_URL_SAFE_NO_PAD.encode("{\"typ\":\"JWT\",\"alg\":\"HS256\"}"));

/// Prefix of API keys handed out by `berthd keygen`.
pub const API_KEY_PREFIX: &str = "berth_";

/// Signing secret used when the server runs in development mode without a key.
pub const DEV_MODE_KEY: &str = "berth-development-key";

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// The container engine the server drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RuntimeKind {
    /// A Docker engine reached through its API socket
    #[default]
    Docker,

    /// An in-process engine that only tracks containers in memory
    Memory,
}

/// Settings the server runs with.
#[derive(Debug, Getters)]
#[getset(get = "pub with_prefix")]
pub struct Config {
    /// Secret key used for JWT token validation
    key: String,

    /// Whether the server runs in development mode
    dev_mode: bool,

    /// Address to listen on
    addr: SocketAddr,

    /// SQLite database file; state is kept in memory when unset
    database: Option<PathBuf>,

    /// Docker engine address; local defaults are used when unset
    docker_host: Option<String>,

    /// The container engine to drive
    runtime: RuntimeKind,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl Config {
    /// Creates a new configuration.
    ///
    /// A key is required unless `dev_mode` is set, in which case a fixed development key is used.
    pub fn new(
        key: Option<String>,
        host: IpAddr,
        port: u16,
        database: Option<PathBuf>,
        docker_host: Option<String>,
        runtime: RuntimeKind,
        dev_mode: bool,
    ) -> ServerResult<Self> {
        let key = match key.filter(|k| !k.is_empty()) {
            Some(k) => k,
            None if dev_mode => {
                tracing::warn!("no key provided, signing tokens with the development key");
                DEV_MODE_KEY.to_string()
            }
            None => {
                return Err(ServerError::ConfigError(
                    "No key provided. A key is required when not in dev mode".to_string(),
                ));
            }
        };

        Ok(Self {
            key,
            dev_mode,
            addr: SocketAddr::new(host, port),
            database,
            docker_host,
            runtime,
        })
    }
}

impl RuntimeKind {
    /// The name used on the command line.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Docker => "docker",
            Self::Memory => "memory",
        }
    }
}

//--------------------------------------------------------------------------------------------------
// Trait Implementations
//--------------------------------------------------------------------------------------------------

impl FromStr for RuntimeKind {
    type Err = ServerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "docker" => Ok(Self::Docker),
            "memory" => Ok(Self::Memory),
            other => Err(ServerError::ConfigError(format!(
                "unknown runtime '{}', expected 'docker' or 'memory'",
                other
            ))),
        }
    }
}

impl fmt::Display for RuntimeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::net::Ipv4Addr;

    use super::*;

    #[test]
    fn test_key_required_outside_dev_mode() {
        let result = Config::new(
            None,
            IpAddr::V4(Ipv4Addr::LOCALHOST),
            8080,
            None,
            None,
            RuntimeKind::Memory,
            false,
        );
        assert!(matches!(result, Err(ServerError::ConfigError(_))));
    }

    #[test]
    fn test_dev_mode_falls_back_to_dev_key() {
        let config = Config::new(
            Some(String::new()),
            IpAddr::V4(Ipv4Addr::LOCALHOST),
            9000,
            None,
            None,
            RuntimeKind::Memory,
            true,
        )
        .unwrap();

        assert_eq!(config.get_key(), DEV_MODE_KEY);
        assert_eq!(config.get_addr().port(), 9000);
        assert!(*config.get_dev_mode());
    }

    #[test]
    fn test_runtime_kind_parse() {
        assert_eq!("docker".parse::<RuntimeKind>().unwrap(), RuntimeKind::Docker);
        assert_eq!("Memory".parse::<RuntimeKind>().unwrap(), RuntimeKind::Memory);
        assert!("podman".parse::<RuntimeKind>().is_err());
        assert_eq!(RuntimeKind::default().to_string(), "docker");
    }

    #[test]
    fn test_default_jwt_header_matches_jsonwebtoken() {
        let token = jsonwebtoken::encode(
            &jsonwebtoken::Header::default(),
            &serde_json::json!({ "sub": "1" }),
            &jsonwebtoken::EncodingKey::from_secret(b"secret"),
        )
        .unwrap();

        assert_eq!(token.split('.').next(), Some(DEFAULT_JWT_HEADER.as_str()));
    }
}
