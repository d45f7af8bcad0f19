// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Canonical request payload.
//!
//! The signed byte string is a contract with the remote verifier and must
//! stay byte-for-byte stable. Layout:
//!
//! ```text
//! LIAM-SIG-V1\n
//! <len>:<METHOD>\n
//! <len>:<path>\n
//! <len>:<body>\n
//! <len>:<timestamp>\n
//! ```
//!
//! `<len>` is the decimal byte length of the field that follows, so field
//! contents may contain `:` or `\n` without two requests ever sharing a
//! payload. The method is ASCII-uppercased; the path includes the query
//! string; an absent body is the empty string.

/// Version line prefixed to every canonical payload.
pub const CANONICAL_PREFIX: &[u8] = b"LIAM-SIG-V1\n";

/// The request parts covered by a signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CanonicalRequest<'a> {
    pub method: &'a str,
    pub path: &'a str,
    pub body: &'a [u8],
    pub timestamp: i64,
}

impl<'a> CanonicalRequest<'a> {
    pub fn new(method: &'a str, path: &'a str, body: &'a [u8], timestamp: i64) -> Self {
        Self {
            method,
            path,
            body,
            timestamp,
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let method = self.method.to_ascii_uppercase();
        let timestamp = self.timestamp.to_string();

        let mut out = Vec::with_capacity(
            CANONICAL_PREFIX.len() + method.len() + self.path.len() + self.body.len() + 48,
        );
        out.extend_from_slice(CANONICAL_PREFIX);
        push_field(&mut out, method.as_bytes());
        push_field(&mut out, self.path.as_bytes());
        push_field(&mut out, self.body);
        push_field(&mut out, timestamp.as_bytes());
        out
    }
}

/// Build the canonical payload for a request.
pub fn canonical_payload(method: &str, path: &str, body: &[u8], timestamp: i64) -> Vec<u8> {
    CanonicalRequest::new(method, path, body, timestamp).to_bytes()
}

fn push_field(out: &mut Vec<u8>, field: &[u8]) {
    out.extend_from_slice(field.len().to_string().as_bytes());
    out.push(b':');
    out.extend_from_slice(field);
    out.push(b'\n');
}
