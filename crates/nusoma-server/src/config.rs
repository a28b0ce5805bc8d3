// Copyright (C) 2025 Nusoma Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Server configuration from environment variables.

use anyhow::{Context, bail};
use std::net::SocketAddr;

/// One accepted API key and the principal it authenticates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiKey {
    pub principal: String,
    pub key: String,
}

/// Server configuration.
///
/// Read from the environment:
/// - `NUSOMA_BIND_ADDR`  socket address to listen on (default `127.0.0.1:3000`)
/// - `NUSOMA_API_KEYS`   comma-separated `principal:key` pairs (required)
/// - `NUSOMA_BASE_URL`   base URL internal tools call back on (default derived
///   from the bind address)
/// - `NUSOMA_MAX_WORKER_DEPTH`    worker call depth limit (default 10)
/// - `NUSOMA_DEFAULT_TIMEOUT_MS`  default tool timeout (default 30000)
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    pub api_keys: Vec<ApiKey>,
    pub base_url: String,
    pub max_worker_depth: usize,
    pub default_timeout_ms: u64,
}

impl ServerConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let bind_addr: SocketAddr = std::env::var("NUSOMA_BIND_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:3000".to_string())
            .parse()
            .context("invalid NUSOMA_BIND_ADDR")?;

        let api_keys = parse_api_keys(
            &std::env::var("NUSOMA_API_KEYS").context("NUSOMA_API_KEYS is not set")?,
        )?;

        let base_url = std::env::var("NUSOMA_BASE_URL")
            .unwrap_or_else(|_| format!("http://{}", bind_addr));

        let max_worker_depth = match std::env::var("NUSOMA_MAX_WORKER_DEPTH") {
            Ok(raw) => raw.parse().context("invalid NUSOMA_MAX_WORKER_DEPTH")?,
            Err(_) => 10,
        };

        let default_timeout_ms = match std::env::var("NUSOMA_DEFAULT_TIMEOUT_MS") {
            Ok(raw) => raw.parse().context("invalid NUSOMA_DEFAULT_TIMEOUT_MS")?,
            Err(_) => 30_000,
        };

        Ok(Self {
            bind_addr,
            api_keys,
            base_url,
            max_worker_depth,
            default_timeout_ms,
        })
    }

    /// Principal authenticated by `key`, if any.
    pub fn principal_for_key(&self, key: &str) -> Option<&str> {
        self.api_keys
            .iter()
            .find(|k| k.key == key)
            .map(|k| k.principal.as_str())
    }
}

/// Parse `principal:key` pairs separated by commas.
pub fn parse_api_keys(raw: &str) -> anyhow::Result<Vec<ApiKey>> {
    let mut keys = Vec::new();
    for pair in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let Some((principal, key)) = pair.split_once(':') else {
            bail!("API key entry '{}' is not in principal:key form", pair);
        };
        if principal.is_empty() || key.is_empty() {
            bail!("API key entry '{}' has an empty principal or key", pair);
        }
        keys.push(ApiKey {
            principal: principal.to_string(),
            key: key.to_string(),
        });
    }
    if keys.is_empty() {
        bail!("no API keys configured");
    }
    Ok(keys)
}
