// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! ECDSA P-256 request signing and verification.
//!
//! Every request is signed over its canonical payload (see
//! [`canonical`](super::canonical)) with a fresh timestamp. Signatures are
//! SHA-256 / ECDSA P-256, DER encoded, and use a randomized nonce: signing
//! the same request twice yields different bytes that both verify.

use std::sync::Arc;
use std::time::Duration;

use base64ct::{Base64, Encoding};
use chrono::Utc;
use p256::ecdsa::signature::{DigestVerifier, RandomizedDigestSigner};
use p256::ecdsa::{Signature, SigningKey, VerifyingKey};
use p256::elliptic_curve::rand_core::OsRng;
use sha2::{Digest, Sha256};
use tracing::debug;

use super::canonical::canonical_payload;
use super::keys::{key_id, KeyPair};
use crate::error::{Error, Result};

/// Header carrying the signing timestamp (decimal seconds since epoch).
pub const TIMESTAMP_HEADER: &str = "X-Liam-Timestamp";
/// Header carrying the public-key identifier.
pub const KEY_ID_HEADER: &str = "X-Liam-Key-Id";
/// Header carrying the base64 DER signature.
pub const SIGNATURE_HEADER: &str = "signature";

/// Default accepted clock skew between signer and verifier (5 minutes).
pub const DEFAULT_MAX_CLOCK_SKEW: Duration = Duration::from_secs(300);

/// Result of signing one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedEnvelope {
    /// Seconds since the Unix epoch at signing time.
    pub timestamp: i64,
    /// Identifier of the public key that verifies `signature`.
    pub key_id: String,
    /// Exact bytes that were signed.
    pub canonical_payload: Vec<u8>,
    /// DER-encoded ECDSA signature.
    pub signature: Vec<u8>,
}

impl SignedEnvelope {
    pub fn signature_base64(&self) -> String {
        Base64::encode_string(&self.signature)
    }

    /// Authentication headers the remote verifier needs.
    pub fn headers(&self) -> Vec<(String, String)> {
        vec![
            (TIMESTAMP_HEADER.to_string(), self.timestamp.to_string()),
            (KEY_ID_HEADER.to_string(), self.key_id.clone()),
            (SIGNATURE_HEADER.to_string(), self.signature_base64()),
        ]
    }
}

/// Signs outgoing requests with an owned, immutable private key.
///
/// Cloning is cheap and shares the key.
#[derive(Clone)]
pub struct RequestSigner {
    keys: Arc<KeyPair>,
    key_id: Arc<str>,
}

impl std::fmt::Debug for RequestSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestSigner")
            .field("key_id", &self.key_id)
            .finish_non_exhaustive()
    }
}

impl RequestSigner {
    pub fn new(signing_key: SigningKey) -> Self {
        Self::from_key_pair(KeyPair::from_signing_key(signing_key))
    }

    pub fn from_key_pair(keys: KeyPair) -> Self {
        let key_id = keys.key_id().into();
        Self {
            keys: Arc::new(keys),
            key_id,
        }
    }

    /// Build a signer from PEM text.
    ///
    /// # Errors
    /// [`Error::KeyFormat`] if the PEM is not a P-256 private key.
    pub fn from_pem(pem_str: &str) -> Result<Self> {
        KeyPair::from_private_pem(pem_str).map(Self::from_key_pair)
    }

    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    pub fn verifying_key(&self) -> &VerifyingKey {
        self.keys.verifying_key()
    }

    /// Sign a request with the current time.
    pub fn sign(&self, method: &str, path: &str, body: &[u8]) -> Result<SignedEnvelope> {
        self.sign_at(method, path, body, Utc::now().timestamp())
    }

    /// Sign a request with an explicit timestamp.
    ///
    /// # Errors
    /// [`Error::Signing`] if the curve operation fails. Message content never
    /// causes a failure.
    pub fn sign_at(
        &self,
        method: &str,
        path: &str,
        body: &[u8],
        timestamp: i64,
    ) -> Result<SignedEnvelope> {
        let canonical_payload = canonical_payload(method, path, body, timestamp);
        let digest = Sha256::new_with_prefix(&canonical_payload);

        let signature: Signature = self
            .keys
            .signing_key()
            .try_sign_digest_with_rng(&mut OsRng, digest)
            .map_err(|e| Error::Signing(e.to_string()))?;

        debug!(
            method = %method,
            path = %path,
            body_len = body.len(),
            timestamp,
            key_id = %self.key_id,
            "Signed request"
        );

        Ok(SignedEnvelope {
            timestamp,
            key_id: self.key_id.to_string(),
            canonical_payload,
            signature: signature.to_der().as_bytes().to_vec(),
        })
    }
}

/// Checks request signatures against one public key.
#[derive(Debug, Clone)]
pub struct SignatureVerifier {
    verifying_key: VerifyingKey,
    key_id: String,
    max_clock_skew: Duration,
}

impl SignatureVerifier {
    pub fn new(verifying_key: VerifyingKey) -> Self {
        let key_id = key_id(&verifying_key);
        Self {
            verifying_key,
            key_id,
            max_clock_skew: DEFAULT_MAX_CLOCK_SKEW,
        }
    }

    pub fn with_max_clock_skew(mut self, skew: Duration) -> Self {
        self.max_clock_skew = skew;
        self
    }

    pub fn verify(&self, envelope: &SignedEnvelope, method: &str, path: &str, body: &[u8]) -> bool {
        self.verify_at(envelope, method, path, body, Utc::now().timestamp())
    }

    /// Verify against an explicit current time.
    ///
    /// The canonical payload is rebuilt from the given request parts; the
    /// envelope's own copy is not trusted. Returns `false` on any mismatch.
    pub fn verify_at(
        &self,
        envelope: &SignedEnvelope,
        method: &str,
        path: &str,
        body: &[u8],
        now: i64,
    ) -> bool {
        if now.abs_diff(envelope.timestamp) > self.max_clock_skew.as_secs() {
            debug!(
                timestamp = envelope.timestamp,
                now,
                max_skew_secs = self.max_clock_skew.as_secs(),
                "Rejecting signature outside freshness window"
            );
            return false;
        }

        if envelope.key_id != self.key_id {
            debug!(key_id = %envelope.key_id, "Rejecting signature for unknown key id");
            return false;
        }

        let Ok(signature) = Signature::from_der(&envelope.signature) else {
            return false;
        };

        let payload = canonical_payload(method, path, body, envelope.timestamp);
        self.verifying_key
            .verify_digest(Sha256::new_with_prefix(&payload), &signature)
            .is_ok()
    }
}

/// Verify a signed request with the default clock-skew window.
pub fn verify(
    public_key: &VerifyingKey,
    envelope: &SignedEnvelope,
    method: &str,
    path: &str,
    body: &[u8],
) -> bool {
    SignatureVerifier::new(public_key.clone()).verify(envelope, method, path, body)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signer() -> RequestSigner {
        RequestSigner::from_key_pair(KeyPair::generate().unwrap())
    }

    #[test]
    fn signature_verifies() {
        let signer = signer();
        let body = br#"{"userKey":"u1","content":"hello"}"#;
        let envelope = signer.sign("POST", "/memory/create", body).unwrap();

        assert!(verify(signer.verifying_key(), &envelope, "POST", "/memory/create", body));
    }

    #[test]
    fn signatures_verify_for_many_keys() {
        for _ in 0..8 {
            let signer = signer();
            let envelope = signer.sign("GET", "/memory/list?limit=5", b"").unwrap();
            assert!(verify(signer.verifying_key(), &envelope, "GET", "/memory/list?limit=5", b""));
        }
    }

    #[test]
    fn signature_is_der_encoded() {
        let envelope = signer().sign("POST", "/x", b"{}").unwrap();
        // DER SEQUENCE tag
        assert_eq!(envelope.signature[0], 0x30);
        assert!(Signature::from_der(&envelope.signature).is_ok());
    }

    #[test]
    fn repeated_signing_differs_but_both_verify() {
        let signer = signer();
        let a = signer.sign_at("POST", "/memory/chat", b"{}", 1_700_000_000).unwrap();
        let b = signer.sign_at("POST", "/memory/chat", b"{}", 1_700_000_000).unwrap();

        assert_eq!(a.canonical_payload, b.canonical_payload);
        assert_ne!(a.signature, b.signature);

        let verifier = SignatureVerifier::new(signer.verifying_key().clone());
        assert!(verifier.verify_at(&a, "POST", "/memory/chat", b"{}", 1_700_000_000));
        assert!(verifier.verify_at(&b, "POST", "/memory/chat", b"{}", 1_700_000_000));
    }

    #[test]
    fn any_changed_field_fails_verification() {
        let signer = signer();
        let now = 1_700_000_000;
        let body = br#"{"userKey":"u1"}"#;
        let envelope = signer.sign_at("POST", "/memory/list", body, now).unwrap();
        let verifier = SignatureVerifier::new(signer.verifying_key().clone());

        assert!(verifier.verify_at(&envelope, "POST", "/memory/list", body, now));

        assert!(!verifier.verify_at(&envelope, "PUT", "/memory/list", body, now));
        assert!(!verifier.verify_at(&envelope, "POST", "/memory/lisT", body, now));
        assert!(!verifier.verify_at(&envelope, "POST", "/memory/list?", body, now));
        assert!(!verifier.verify_at(&envelope, "POST", "/memory/list", br#"{"userKey":"u2"}"#, now));
        assert!(!verifier.verify_at(&envelope, "POST", "/memory/list", b"", now));

        let mut shifted = envelope.clone();
        shifted.timestamp += 1;
        assert!(!verifier.verify_at(&shifted, "POST", "/memory/list", body, now));
    }

    #[test]
    fn tampered_signature_bytes_fail() {
        let signer = signer();
        let mut envelope = signer.sign_at("POST", "/a", b"x", 100).unwrap();
        let last = envelope.signature.len() - 1;
        envelope.signature[last] ^= 0x01;

        let verifier = SignatureVerifier::new(signer.verifying_key().clone());
        assert!(!verifier.verify_at(&envelope, "POST", "/a", b"x", 100));
    }

    #[test]
    fn garbage_signature_returns_false() {
        let signer = signer();
        let mut envelope = signer.sign_at("POST", "/a", b"x", 100).unwrap();
        envelope.signature = b"not der".to_vec();

        let verifier = SignatureVerifier::new(signer.verifying_key().clone());
        assert!(!verifier.verify_at(&envelope, "POST", "/a", b"x", 100));
    }

    #[test]
    fn other_key_does_not_verify() {
        let envelope = signer().sign("POST", "/a", b"x").unwrap();
        let other = signer();
        assert!(!verify(other.verifying_key(), &envelope, "POST", "/a", b"x"));
    }

    #[test]
    fn stale_timestamp_is_rejected() {
        let signer = signer();
        let now = 1_700_000_000;
        let envelope = signer.sign_at("POST", "/a", b"x", now - 600).unwrap();
        let verifier = SignatureVerifier::new(signer.verifying_key().clone())
            .with_max_clock_skew(Duration::from_secs(300));

        assert!(!verifier.verify_at(&envelope, "POST", "/a", b"x", now));
        assert!(verifier.verify_at(&envelope, "POST", "/a", b"x", now - 600 + 300));
    }

    #[test]
    fn future_timestamp_beyond_skew_is_rejected() {
        let signer = signer();
        let now = 1_700_000_000;
        let envelope = signer.sign_at("POST", "/a", b"x", now + 301).unwrap();
        let verifier = SignatureVerifier::new(signer.verifying_key().clone());
        assert!(!verifier.verify_at(&envelope, "POST", "/a", b"x", now));
    }

    #[test]
    fn sign_uses_current_time() {
        let before = Utc::now().timestamp();
        let envelope = signer().sign("GET", "/", b"").unwrap();
        let after = Utc::now().timestamp();
        assert!(envelope.timestamp >= before && envelope.timestamp <= after);
    }

    #[test]
    fn headers_carry_timestamp_key_id_and_signature() {
        let signer = signer();
        let envelope = signer.sign_at("POST", "/a", b"x", 42).unwrap();
        let headers = envelope.headers();

        let get = |name: &str| {
            headers
                .iter()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.clone())
                .unwrap()
        };
        assert_eq!(get(TIMESTAMP_HEADER), "42");
        assert_eq!(get(KEY_ID_HEADER), signer.key_id());
        assert_eq!(
            Base64::decode_vec(&get(SIGNATURE_HEADER)).unwrap(),
            envelope.signature
        );
    }

    #[test]
    fn from_pem_rejects_garbage() {
        let err = RequestSigner::from_pem("hello").unwrap_err();
        assert!(matches!(err, Error::KeyFormat(_)));
    }
}
