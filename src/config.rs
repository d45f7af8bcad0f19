// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Client Configuration
//!
//! Explicit constructor arguments, optionally overridden from the
//! environment. Empty or whitespace-only variables count as unset.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `LIAM_API_KEY` | API key issued at connector registration | Required |
//! | `LIAM_PRIVATE_KEY_PATH` | Path to the PEM private key | - |
//! | `LIAM_PRIVATE_KEY` | Inline PEM private key (used when no path is set) | - |
//! | `LIAM_BASE_URL` | API base URL | `https://api.liam.netxd.com/api` |
//! | `LIAM_TIMEOUT_SECS` | Per-request timeout in seconds | `30` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info` |

use std::path::PathBuf;
use std::time::Duration;

use crate::crypto::{KeyPair, RequestSigner};
use crate::error::{Error, Result};
use crate::transport::{DEFAULT_BASE_URL, DEFAULT_TIMEOUT};

pub const API_KEY_ENV: &str = "LIAM_API_KEY";
pub const PRIVATE_KEY_PATH_ENV: &str = "LIAM_PRIVATE_KEY_PATH";
pub const PRIVATE_KEY_ENV: &str = "LIAM_PRIVATE_KEY";
pub const BASE_URL_ENV: &str = "LIAM_BASE_URL";
pub const TIMEOUT_SECS_ENV: &str = "LIAM_TIMEOUT_SECS";

/// Default filename for a generated private key.
pub const DEFAULT_PRIVATE_KEY_FILE: &str = "private_key.pem";
/// Default filename for a generated public key.
pub const DEFAULT_PUBLIC_KEY_FILE: &str = "public_key.pem";

/// Responses larger than this are rejected without parsing (10 MiB).
pub const DEFAULT_MAX_RESPONSE_BYTES: usize = 10 * 1024 * 1024;

/// Where the signing key comes from.
#[derive(Clone, PartialEq, Eq)]
pub enum KeySource {
    Path(PathBuf),
    Pem(String),
}

impl std::fmt::Debug for KeySource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            KeySource::Path(path) => f.debug_tuple("Path").field(path).finish(),
            KeySource::Pem(_) => f.write_str("Pem(<redacted>)"),
        }
    }
}

impl KeySource {
    /// Load the key and build a signer.
    pub fn load_signer(&self) -> Result<RequestSigner> {
        let keys = match self {
            KeySource::Path(path) => KeyPair::load(path)?,
            // Inline keys from env files often carry literal `\n` sequences.
            KeySource::Pem(pem) => KeyPair::from_private_pem(&pem.replace("\\n", "\n"))?,
        };
        Ok(RequestSigner::from_key_pair(keys))
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub api_key: Option<String>,
    pub key_source: Option<KeySource>,
    pub base_url: String,
    pub timeout: Duration,
    pub max_response_bytes: usize,
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("key_source", &self.key_source)
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .field("max_response_bytes", &self.max_response_bytes)
            .finish()
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            key_source: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            max_response_bytes: DEFAULT_MAX_RESPONSE_BYTES,
        }
    }
}

impl ClientConfig {
    pub fn new(api_key: impl Into<String>, key_source: KeySource) -> Self {
        Self {
            api_key: Some(api_key.into()),
            key_source: Some(key_source),
            ..Self::default()
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_response_bytes(mut self, limit: usize) -> Self {
        self.max_response_bytes = limit;
        self
    }

    /// Configuration taken entirely from the environment.
    pub fn from_env() -> Result<Self> {
        Self::default().with_env_overrides()
    }

    /// Apply environment overrides on top of the explicit values.
    pub fn with_env_overrides(self) -> Result<Self> {
        self.with_overrides_from(env_optional)
    }

    /// Apply overrides from an arbitrary lookup (the environment in
    /// production, a map in tests).
    pub fn with_overrides_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(api_key) = lookup(API_KEY_ENV) {
            self.api_key = Some(api_key);
        }

        if let Some(path) = lookup(PRIVATE_KEY_PATH_ENV) {
            self.key_source = Some(KeySource::Path(PathBuf::from(path)));
        } else if let Some(pem) = lookup(PRIVATE_KEY_ENV) {
            self.key_source = Some(KeySource::Pem(pem));
        }

        if let Some(base_url) = lookup(BASE_URL_ENV) {
            self.base_url = base_url;
        }

        if let Some(raw) = lookup(TIMEOUT_SECS_ENV) {
            let secs: u64 = raw
                .parse()
                .ok()
                .filter(|secs| *secs > 0)
                .ok_or_else(|| {
                    Error::InvalidConfig(format!(
                        "{TIMEOUT_SECS_ENV} must be a positive integer, got '{raw}'"
                    ))
                })?;
            self.timeout = Duration::from_secs(secs);
        }

        Ok(self)
    }

    pub fn api_key(&self) -> Result<&str> {
        self.api_key
            .as_deref()
            .ok_or_else(|| Error::MissingConfig(format!("{API_KEY_ENV} is not set")))
    }

    pub fn key_source(&self) -> Result<&KeySource> {
        self.key_source.as_ref().ok_or_else(|| {
            Error::MissingConfig(format!(
                "either {PRIVATE_KEY_PATH_ENV} or {PRIVATE_KEY_ENV} must be set"
            ))
        })
    }
}

fn env_optional(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
