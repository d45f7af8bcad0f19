// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! LIAM Client - Signed Request & Batch Dispatch Core
//!
//! Client-side core for the LIAM memory-management API. Every request is
//! signed with an ECDSA P-256 key so the server can verify who sent it and
//! that it was not altered in transit. Independent requests can be fanned
//! out concurrently under a fixed limit with per-item outcomes.
//!
//! ## Modules
//!
//! - `crypto` - key generation, PEM persistence, canonical payload, signing
//! - `batch` - bounded-concurrency executor and ordered batch reports
//! - `transport` - the send boundary and its `reqwest` implementation
//! - `client` - signed endpoint wrappers and batch helpers
//! - `config` - explicit arguments with `LIAM_*` environment overrides
//! - `logging` - tracing subscriber setup

pub mod batch;
pub mod client;
pub mod config;
pub mod crypto;
pub mod error;
pub mod logging;
pub mod models;
pub mod transport;

pub use batch::{run_batch, BatchExecutor, BatchReport, CancelPolicy, ItemError};
pub use client::LiamClient;
pub use config::{ClientConfig, KeySource};
pub use crypto::{KeyPair, RequestSigner, SignatureVerifier, SignedEnvelope};
pub use error::{Error, Result};
pub use models::MemoryInput;
pub use transport::{HttpTransport, Transport, TransportError, TransportRequest, TransportResponse};
