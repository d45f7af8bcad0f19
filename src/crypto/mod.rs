// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Key material and request signing.
//!
//! - `keys` - P-256 key generation, PEM persistence and loading
//! - `canonical` - the byte string covered by a request signature
//! - `signing` - ECDSA signing, verification and auth headers

pub mod canonical;
pub mod keys;
pub mod signing;

pub use canonical::{canonical_payload, CanonicalRequest};
pub use keys::{
    generate_key_files, key_id, load_private_key, load_public_key, parse_private_key_pem,
    parse_public_key_pem, KeyPair,
};
pub use signing::{
    verify, RequestSigner, SignatureVerifier, SignedEnvelope, DEFAULT_MAX_CLOCK_SKEW,
    KEY_ID_HEADER, SIGNATURE_HEADER, TIMESTAMP_HEADER,
};
