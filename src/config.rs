// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Configuration is read from the environment once at startup into a
//! [`GatekeeperConfig`] that is passed explicitly to everything that needs it.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `3000` |
//! | `API_ENDPOINT` | Authorization service base URL (e.g. `http://api:8200/api/v1`) | Required |
//! | `UPSTREAM_URL` | Front-end server that forwarded requests go to | Required |
//! | `ALLOWED_ORIGINS` | Comma-separated CORS origin allow-list | Empty |
//! | `SERVER_ENDPOINT` | Single allowed origin, used when `ALLOWED_ORIGINS` is unset | Unset |
//! | `AUTH_TIMEOUT_MS` | Bound on each authorization service call | `5000` |
//! | `REFRESH_POLICY` | `redirect` (refresh page) or `inline` (gatekeeper refreshes) | `redirect` |
//! | `TLS_CERT_PATH` / `TLS_KEY_PATH` | PEM certificate and key; both or neither | Unset (plain HTTP) |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;
use url::Url;

pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";
pub const API_ENDPOINT_ENV: &str = "API_ENDPOINT";
pub const UPSTREAM_URL_ENV: &str = "UPSTREAM_URL";
pub const ALLOWED_ORIGINS_ENV: &str = "ALLOWED_ORIGINS";
pub const SERVER_ENDPOINT_ENV: &str = "SERVER_ENDPOINT";
pub const AUTH_TIMEOUT_MS_ENV: &str = "AUTH_TIMEOUT_MS";
pub const REFRESH_POLICY_ENV: &str = "REFRESH_POLICY";
pub const TLS_CERT_PATH_ENV: &str = "TLS_CERT_PATH";
pub const TLS_KEY_PATH_ENV: &str = "TLS_KEY_PATH";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_AUTH_TIMEOUT: Duration = Duration::from_millis(5000);

/// Configuration errors reported at startup.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{var} has invalid value {value:?}: {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

impl ConfigError {
    fn invalid(var: &'static str, value: &str, reason: impl ToString) -> Self {
        ConfigError::Invalid {
            var,
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// How an unauthenticated request to a protected route gets a new token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RefreshPolicy {
    /// Redirect to the `/refresh` page, which refreshes in the browser.
    #[default]
    Redirect,
    /// Call the refresh endpoint from the gatekeeper and set the cookie.
    Inline,
}

impl FromStr for RefreshPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "redirect" => Ok(RefreshPolicy::Redirect),
            "inline" => Ok(RefreshPolicy::Inline),
            _ => Err("expected `redirect` or `inline`".to_string()),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            _ => Err("expected `json` or `pretty`".to_string()),
        }
    }
}

/// PEM files for serving HTTPS.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsPaths {
    pub cert: PathBuf,
    pub key: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatekeeperConfig {
    pub host: IpAddr,
    pub port: u16,
    /// Authorization service base URL.
    pub api_endpoint: Url,
    /// Front-end server for forwarded requests.
    pub upstream_url: Url,
    pub allowed_origins: Vec<String>,
    pub auth_timeout: Duration,
    pub refresh_policy: RefreshPolicy,
    pub tls: Option<TlsPaths>,
    pub log_format: LogFormat,
}

impl GatekeeperConfig {
    /// Load from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load from an arbitrary variable lookup. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let host: IpAddr = match get(HOST_ENV) {
            Some(v) => v.trim().parse().map_err(|e| ConfigError::invalid(HOST_ENV, &v, e))?,
            None => IpAddr::V4(Ipv4Addr::UNSPECIFIED),
        };

        let port: u16 = match get(PORT_ENV) {
            Some(v) => v.trim().parse().map_err(|e| ConfigError::invalid(PORT_ENV, &v, e))?,
            None => DEFAULT_PORT,
        };

        let api_endpoint = parse_url(API_ENDPOINT_ENV, get(API_ENDPOINT_ENV))?;
        let upstream_url = parse_url(UPSTREAM_URL_ENV, get(UPSTREAM_URL_ENV))?;

        let allowed_origins = match get(ALLOWED_ORIGINS_ENV).or_else(|| get(SERVER_ENDPOINT_ENV)) {
            Some(list) => list
                .split(',')
                .map(|origin| origin.trim().trim_end_matches('/'))
                .filter(|origin| !origin.is_empty())
                .map(str::to_string)
                .collect(),
            None => Vec::new(),
        };

        let auth_timeout = match get(AUTH_TIMEOUT_MS_ENV) {
            Some(v) => {
                let ms: u64 = v
                    .trim()
                    .parse()
                    .map_err(|e| ConfigError::invalid(AUTH_TIMEOUT_MS_ENV, &v, e))?;
                if ms == 0 {
                    return Err(ConfigError::invalid(AUTH_TIMEOUT_MS_ENV, &v, "must be positive"));
                }
                Duration::from_millis(ms)
            }
            None => DEFAULT_AUTH_TIMEOUT,
        };

        let refresh_policy: RefreshPolicy = match get(REFRESH_POLICY_ENV) {
            Some(v) => v.parse().map_err(|e| ConfigError::invalid(REFRESH_POLICY_ENV, &v, e))?,
            None => RefreshPolicy::default(),
        };

        let log_format: LogFormat = match get(LOG_FORMAT_ENV) {
            Some(v) => v.parse().map_err(|e| ConfigError::invalid(LOG_FORMAT_ENV, &v, e))?,
            None => LogFormat::default(),
        };

        let tls = match (get(TLS_CERT_PATH_ENV), get(TLS_KEY_PATH_ENV)) {
            (Some(cert), Some(key)) => Some(TlsPaths {
                cert: PathBuf::from(cert),
                key: PathBuf::from(key),
            }),
            (None, None) => None,
            (Some(_), None) => return Err(ConfigError::Missing(TLS_KEY_PATH_ENV)),
            (None, Some(_)) => return Err(ConfigError::Missing(TLS_CERT_PATH_ENV)),
        };

        Ok(Self {
            host,
            port,
            api_endpoint,
            upstream_url,
            allowed_origins,
            auth_timeout,
            refresh_policy,
            tls,
            log_format,
        })
    }

    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

fn parse_url(var: &'static str, value: Option<String>) -> Result<Url, ConfigError> {
    let value = value.ok_or(ConfigError::Missing(var))?;
    let url = Url::parse(value.trim()).map_err(|e| ConfigError::invalid(var, &value, e))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(ConfigError::invalid(
            var,
            &value,
            format!("unsupported scheme `{other}`"),
        )),
    }
}
