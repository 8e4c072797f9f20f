// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Environment variable names, default values and the [`ProxyConfig`] loaded
//! from them once at startup.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `3000` |
//! | `AUTH_NODES` | Comma-separated auth node base URLs | three local nodes on `8081`-`8083` |
//! | `NODE_TIMEOUT_MS` | Per-node attempt timeout in milliseconds | `15000` |
//! | `MAX_BODY_BYTES` | Largest accepted ingress body in bytes | `16777216` (16 MiB) |
//! | `VERIFY_ATTESTATION` | Verify attestation chains at ingress (`true`/`false`) | `false` |
//! | `TLS_CERT_PATH` | PEM certificate chain; enables HTTPS with `TLS_KEY_PATH` | unset |
//! | `TLS_KEY_PATH` | PEM private key | unset |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use url::Url;

use crate::forwarder::DEFAULT_NODE_TIMEOUT;

pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";

/// Comma-separated list of backend auth node base URLs.
///
/// Each entry must be an absolute `http` or `https` URL. A trailing `/` is
/// stripped so paths can be appended directly.
pub const AUTH_NODES_ENV: &str = "AUTH_NODES";

pub const NODE_TIMEOUT_MS_ENV: &str = "NODE_TIMEOUT_MS";
pub const MAX_BODY_BYTES_ENV: &str = "MAX_BODY_BYTES";
pub const VERIFY_ATTESTATION_ENV: &str = "VERIFY_ATTESTATION";
pub const TLS_CERT_PATH_ENV: &str = "TLS_CERT_PATH";
pub const TLS_KEY_PATH_ENV: &str = "TLS_KEY_PATH";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_AUTH_NODES: [&str; 3] = [
    "http://127.0.0.1:8081",
    "http://127.0.0.1:8082",
    "http://127.0.0.1:8083",
];
pub const DEFAULT_MAX_BODY_BYTES: usize = 16 * 1024 * 1024;
pub const DEFAULT_LOG_FILTER: &str = "info,tower_http=debug";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} is not valid: {reason}")]
    Invalid { var: &'static str, reason: String },

    #[error("{0} must list at least one auth node")]
    NoNodes(&'static str),

    #[error("TLS_CERT_PATH and TLS_KEY_PATH must be set together")]
    PartialTls,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsPaths {
    pub cert: PathBuf,
    pub key: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyConfig {
    pub bind: SocketAddr,
    pub nodes: Vec<String>,
    pub node_timeout: Duration,
    pub max_body_bytes: usize,
    pub verify_attestation: bool,
    pub tls: Option<TlsPaths>,
    pub log_format: LogFormat,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT)),
            nodes: DEFAULT_AUTH_NODES.iter().map(|s| s.to_string()).collect(),
            node_timeout: DEFAULT_NODE_TIMEOUT,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            verify_attestation: false,
            tls: None,
            log_format: LogFormat::Pretty,
        }
    }
}

impl ProxyConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let host = var(HOST_ENV).unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port = match var(PORT_ENV) {
            Some(raw) => raw.trim().parse::<u16>().map_err(|e| ConfigError::Invalid {
                var: PORT_ENV,
                reason: e.to_string(),
            })?,
            None => DEFAULT_PORT,
        };
        let bind: SocketAddr =
            format!("{host}:{port}")
                .parse()
                .map_err(|e: std::net::AddrParseError| ConfigError::Invalid {
                    var: HOST_ENV,
                    reason: e.to_string(),
                })?;

        let nodes = match var(AUTH_NODES_ENV) {
            Some(raw) => parse_nodes(&raw)?,
            None => DEFAULT_AUTH_NODES.iter().map(|s| s.to_string()).collect(),
        };

        let node_timeout = match var(NODE_TIMEOUT_MS_ENV) {
            Some(raw) => {
                let ms = raw.trim().parse::<u64>().map_err(|e| ConfigError::Invalid {
                    var: NODE_TIMEOUT_MS_ENV,
                    reason: e.to_string(),
                })?;
                if ms == 0 {
                    return Err(ConfigError::Invalid {
                        var: NODE_TIMEOUT_MS_ENV,
                        reason: "must be greater than zero".into(),
                    });
                }
                Duration::from_millis(ms)
            }
            None => DEFAULT_NODE_TIMEOUT,
        };

        let max_body_bytes = match var(MAX_BODY_BYTES_ENV) {
            Some(raw) => match raw.trim().parse::<usize>() {
                Ok(0) => {
                    return Err(ConfigError::Invalid {
                        var: MAX_BODY_BYTES_ENV,
                        reason: "must be greater than zero".into(),
                    })
                }
                Ok(bytes) => bytes,
                Err(e) => {
                    return Err(ConfigError::Invalid {
                        var: MAX_BODY_BYTES_ENV,
                        reason: e.to_string(),
                    })
                }
            },
            None => DEFAULT_MAX_BODY_BYTES,
        };

        let verify_attestation = match var(VERIFY_ATTESTATION_ENV) {
            Some(raw) => parse_bool(VERIFY_ATTESTATION_ENV, &raw)?,
            None => false,
        };

        let tls = match (var(TLS_CERT_PATH_ENV), var(TLS_KEY_PATH_ENV)) {
            (Some(cert), Some(key)) => Some(TlsPaths {
                cert: cert.into(),
                key: key.into(),
            }),
            (None, None) => None,
            _ => return Err(ConfigError::PartialTls),
        };

        let log_format = match var(LOG_FORMAT_ENV).as_deref().map(str::trim) {
            Some("json") => LogFormat::Json,
            Some("pretty") | None => LogFormat::Pretty,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    var: LOG_FORMAT_ENV,
                    reason: format!("expected `json` or `pretty`, got `{other}`"),
                })
            }
        };

        Ok(Self {
            bind,
            nodes,
            node_timeout,
            max_body_bytes,
            verify_attestation,
            tls,
            log_format,
        })
    }
}

fn parse_nodes(raw: &str) -> Result<Vec<String>, ConfigError> {
    let mut nodes = Vec::new();
    for entry in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let url = Url::parse(entry).map_err(|e| ConfigError::Invalid {
            var: AUTH_NODES_ENV,
            reason: format!("`{entry}`: {e}"),
        })?;
        if !matches!(url.scheme(), "http" | "https") || !url.has_host() {
            return Err(ConfigError::Invalid {
                var: AUTH_NODES_ENV,
                reason: format!("`{entry}` is not an http(s) URL"),
            });
        }
        nodes.push(entry.trim_end_matches('/').to_string());
    }
    if nodes.is_empty() {
        return Err(ConfigError::NoNodes(AUTH_NODES_ENV));
    }
    Ok(nodes)
}

fn parse_bool(var: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ConfigError::Invalid {
            var,
            reason: format!("expected a boolean, got `{other}`"),
        }),
    }
}
