// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Error taxonomy for key handling, signing, dispatch and the API surface.
//!
//! Configuration and key errors surface synchronously to the caller.
//! Per-item transport and cancellation failures inside a batch are stored in
//! the [`BatchReport`](crate::batch::BatchReport) instead of being returned
//! from the batch call.

use std::path::PathBuf;

use serde_json::Value;

use crate::transport::TransportError;

/// Crate-wide result alias.
pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Secure randomness or curve arithmetic is unavailable.
    #[error("cryptography unavailable: {0}")]
    CryptoUnavailable(String),

    /// Key input is not a valid P-256 key encoding.
    #[error("invalid key format: {0}")]
    KeyFormat(String),

    /// Key is present but the signing operation failed.
    #[error("signing failed: {0}")]
    Signing(String),

    /// Batch concurrency limit must be at least 1.
    #[error("invalid concurrency limit {0}: must be at least 1")]
    InvalidConcurrency(usize),

    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// The batch deadline expired or the batch was cancelled before this
    /// item finished.
    #[error("operation cancelled")]
    Cancelled,

    /// A batch operation panicked.
    #[error("operation panicked: {0}")]
    Panicked(String),

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("configuration missing: {0}")]
    MissingConfig(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("failed to encode request body: {0}")]
    RequestEncoding(String),

    /// The API answered with a 4xx/5xx status.
    #[error("API error ({status}): {message}")]
    Api {
        status: u16,
        message: String,
        body: Option<Value>,
    },

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("response body of {size} bytes exceeds limit of {limit} bytes")]
    ResponseTooLarge { size: usize, limit: usize },
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }

    /// Stable machine-readable code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::CryptoUnavailable(_) => "crypto_unavailable",
            Error::KeyFormat(_) => "key_format_error",
            Error::Signing(_) => "signing_error",
            Error::InvalidConcurrency(_) => "invalid_concurrency",
            Error::Transport(_) => "transport_error",
            Error::Cancelled => "cancelled",
            Error::Panicked(_) => "panicked",
            Error::Io { .. } => "io_error",
            Error::MissingConfig(_) => "missing_config",
            Error::InvalidConfig(_) => "invalid_config",
            Error::RequestEncoding(_) => "request_encoding_error",
            Error::Api { .. } => "api_error",
            Error::InvalidResponse(_) => "invalid_response",
            Error::ResponseTooLarge { .. } => "response_too_large",
        }
    }

    /// HTTP status of an API error, if this is one.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}
