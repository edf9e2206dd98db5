//! Service configuration
//!
//! Read once at startup from the process environment (a `.env` file is
//! loaded first when present) and immutable afterwards.

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use thiserror::Error;
use url::Url;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Required variable unset or blank
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    /// Variable present but unusable
    #[error("invalid value for {name}: {reason}")]
    Invalid {
        /// Variable name
        name: &'static str,
        /// Parser message
        reason: String,
    },
}

/// API configuration
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Upstream forms API base, e.g. `https://api.fillout.com/v1/api/forms`
    pub base_url: Url,
    /// Bearer credential sent to the upstream API
    pub bearer_token: String,
    /// Listen host
    pub host: IpAddr,
    /// Listen port
    pub port: u16,
    /// Upstream request timeout; none means the transport default
    pub upstream_timeout: Option<Duration>,
}

impl ApiConfig {
    /// Listen port when `PORT` is unset
    pub const DEFAULT_PORT: u16 = 8000;

    /// Load from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load using an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &'static str| {
            lookup(name)
                .filter(|v| !v.trim().is_empty())
                .ok_or(ConfigError::Missing(name))
        };

        let base_url = parse_base_url(&required("BASE_URL")?)?;
        let bearer_token = required("BEARER_TOKEN")?;

        let host = match lookup("HOST") {
            Some(host) => host.parse().map_err(|e: std::net::AddrParseError| ConfigError::Invalid {
                name: "HOST",
                reason: e.to_string(),
            })?,
            None => IpAddr::from([0, 0, 0, 0]),
        };

        let port = match lookup("PORT") {
            Some(port) => port.parse().map_err(|e: std::num::ParseIntError| ConfigError::Invalid {
                name: "PORT",
                reason: e.to_string(),
            })?,
            None => Self::DEFAULT_PORT,
        };

        let upstream_timeout = lookup("UPSTREAM_TIMEOUT_SECS")
            .map(|secs| {
                secs.parse::<u64>().map(Duration::from_secs).map_err(|e| ConfigError::Invalid {
                    name: "UPSTREAM_TIMEOUT_SECS",
                    reason: e.to_string(),
                })
            })
            .transpose()?;

        Ok(Self { base_url, bearer_token, host, port, upstream_timeout })
    }

    /// Socket address to listen on
    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

fn parse_base_url(raw: &str) -> Result<Url, ConfigError> {
    let invalid = |reason: String| ConfigError::Invalid { name: "BASE_URL", reason };

    let url = Url::parse(raw).map_err(|e| invalid(e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") || url.cannot_be_a_base() {
        return Err(invalid(format!("{raw} is not an http(s) base URL")));
    }
    Ok(url)
}
