// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Transport boundary.
//!
//! The client core only needs `send(method, path, headers, body) ->
//! (status, body)`. [`HttpTransport`] implements it over `reqwest`; tests
//! substitute in-memory transports.

use std::future::Future;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Method};
use tracing::debug;
use url::Url;

/// Default API base URL.
pub const DEFAULT_BASE_URL: &str = "https://api.liam.netxd.com/api";

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Opaque failure from the transport.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("connection failed: {0}")]
    Connection(String),

    /// The response body is, or was declared to be, larger than the
    /// request's `max_response_bytes`. Reading stops at the limit.
    #[error("response body of {size} bytes exceeds limit of {limit} bytes")]
    ResponseTooLarge { size: usize, limit: usize },

    #[error("{0}")]
    Other(String),
}

/// One outgoing request, already signed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportRequest {
    pub method: String,
    /// Path relative to the base URL, including any query string.
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
    /// Largest response body the caller accepts.
    pub max_response_bytes: Option<usize>,
}

impl TransportRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

/// Sends requests to the remote service.
///
/// Retry and backoff, if any, are the implementation's concern.
pub trait Transport: Send + Sync + 'static {
    fn send(
        &self,
        request: TransportRequest,
    ) -> impl Future<Output = Result<TransportResponse, TransportError>> + Send;
}

/// `reqwest`-backed transport against a fixed base URL.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    base_url: Url,
    http: Client,
}

impl HttpTransport {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, TransportError> {
        let normalized = format!("{}/", base_url.trim_end_matches('/'));
        let base_url = Url::parse(&normalized)
            .map_err(|e| TransportError::InvalidRequest(format!("invalid base URL {base_url}: {e}")))?;

        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::Other(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { base_url, http })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Resolve a request path against the base URL, keeping the base path.
    pub fn endpoint_url(&self, path: &str) -> Result<Url, TransportError> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| TransportError::InvalidRequest(format!("invalid path {path}: {e}")))
    }
}

impl Transport for HttpTransport {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, TransportError> {
        let url = self.endpoint_url(&request.path)?;
        let limit = request.max_response_bytes;
        let method = Method::from_bytes(request.method.to_ascii_uppercase().as_bytes())
            .map_err(|e| TransportError::InvalidRequest(format!("invalid method: {e}")))?;

        let mut headers = HeaderMap::with_capacity(request.headers.len());
        for (name, value) in &request.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| TransportError::InvalidRequest(format!("invalid header name {name}: {e}")))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| TransportError::InvalidRequest(format!("invalid header value: {e}")))?;
            headers.insert(name, value);
        }

        debug!(method = %method, url = %url, body_len = request.body.len(), "Sending request");

        let response = self
            .http
            .request(method, url)
            .headers(headers)
            .body(request.body)
            .send()
            .await
            .map_err(classify)?;

        let status = response.status().as_u16();

        if let (Some(limit), Some(declared)) = (limit, response.content_length()) {
            if declared > limit as u64 {
                return Err(TransportError::ResponseTooLarge {
                    size: usize::try_from(declared).unwrap_or(usize::MAX),
                    limit,
                });
            }
        }

        let body = read_body(response, limit).await?;
        Ok(TransportResponse { status, body })
    }
}

/// Read the body chunk by chunk, giving up as soon as it passes `limit`.
async fn read_body(
    mut response: reqwest::Response,
    limit: Option<usize>,
) -> Result<Vec<u8>, TransportError> {
    let mut body = Vec::new();
    while let Some(chunk) = response.chunk().await.map_err(classify)? {
        let size = body.len() + chunk.len();
        if let Some(limit) = limit.filter(|limit| size > *limit) {
            return Err(TransportError::ResponseTooLarge { size, limit });
        }
        body.extend_from_slice(&chunk);
    }
    Ok(body)
}

fn classify(err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout(err.to_string())
    } else if err.is_connect() {
        TransportError::Connection(err.to_string())
    } else {
        TransportError::Other(err.to_string())
    }
}

/// One-shot HTTP server for exercising [`HttpTransport`] against real
/// sockets.
#[cfg(test)]
pub(crate) mod test_server {
    use std::time::Duration;

    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Accept one connection, answer with `head` then `body`, then hold the
    /// socket open without sending more. Returns the base URL.
    pub(crate) async fn serve_then_stall(head: &'static str, body: Vec<u8>) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = vec![0u8; 16 * 1024];
            let _ = socket.read(&mut request).await;
            let _ = socket.write_all(head.as_bytes()).await;
            let _ = socket.write_all(&body).await;
            let _ = socket.flush().await;
            tokio::time::sleep(Duration::from_secs(30)).await;
        });

        format!("http://{addr}")
    }
}

#[cfg(test)]
mod tests {
    use super::test_server::serve_then_stall;
    use super::*;

    #[test]
    fn endpoint_url_keeps_base_path() {
        let transport = HttpTransport::new(DEFAULT_BASE_URL, DEFAULT_TIMEOUT).unwrap();
        assert_eq!(
            transport.endpoint_url("/memory/create").unwrap().as_str(),
            "https://api.liam.netxd.com/api/memory/create"
        );
        assert_eq!(
            transport.endpoint_url("memory/list?limit=5").unwrap().as_str(),
            "https://api.liam.netxd.com/api/memory/list?limit=5"
        );
    }

    #[test]
    fn trailing_slash_on_base_url_is_normalized() {
        let transport = HttpTransport::new("https://example.com/v1/", DEFAULT_TIMEOUT).unwrap();
        assert_eq!(
            transport.endpoint_url("/memory/health").unwrap().as_str(),
            "https://example.com/v1/memory/health"
        );
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        let err = HttpTransport::new("not a url", DEFAULT_TIMEOUT).unwrap_err();
        assert!(matches!(err, TransportError::InvalidRequest(_)));
    }

    #[test]
    fn header_lookup_is_case_insensitive() {
        let request = TransportRequest {
            method: "POST".to_string(),
            path: "/x".to_string(),
            headers: vec![("apiKey".to_string(), "k".to_string())],
            body: Vec::new(),
            max_response_bytes: None,
        };
        assert_eq!(request.header("APIKEY"), Some("k"));
        assert_eq!(request.header("signature"), None);
    }

    fn post(path: &str, max_response_bytes: Option<usize>) -> TransportRequest {
        TransportRequest {
            method: "POST".to_string(),
            path: path.to_string(),
            headers: vec![("Content-Type".to_string(), "application/json".to_string())],
            body: b"{}".to_vec(),
            max_response_bytes,
        }
    }

    #[tokio::test]
    async fn declared_oversized_body_is_rejected_without_reading() {
        let base = serve_then_stall(
            "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: 104857600\r\n\r\n",
            vec![b' '; 4096],
        )
        .await;
        let transport = HttpTransport::new(&base, Duration::from_secs(10)).unwrap();

        let result = tokio::time::timeout(
            Duration::from_secs(2),
            transport.send(post("/memory/health", Some(1024))),
        )
        .await
        .expect("limit must apply before the body is read");

        assert_eq!(
            result.unwrap_err(),
            TransportError::ResponseTooLarge {
                size: 104_857_600,
                limit: 1024
            }
        );
    }

    #[tokio::test]
    async fn undeclared_oversized_body_stops_at_limit() {
        let base = serve_then_stall(
            "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nConnection: close\r\n\r\n",
            vec![b' '; 4096],
        )
        .await;
        let transport = HttpTransport::new(&base, Duration::from_secs(10)).unwrap();

        let result = tokio::time::timeout(
            Duration::from_secs(2),
            transport.send(post("/memory/health", Some(1024))),
        )
        .await
        .expect("reading must stop once the limit is passed");

        match result.unwrap_err() {
            TransportError::ResponseTooLarge { size, limit } => {
                assert_eq!(limit, 1024);
                assert!(size > 1024);
            }
            other => panic!("expected ResponseTooLarge, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn body_within_limit_is_returned() {
        let base = serve_then_stall(
            "HTTP/1.1 201 Created\r\nContent-Type: application/json\r\nContent-Length: 11\r\n\r\n",
            br#"{"ok":true}"#.to_vec(),
        )
        .await;
        let transport = HttpTransport::new(&base, Duration::from_secs(10)).unwrap();

        let response = transport
            .send(post("/memory/health", Some(1024)))
            .await
            .unwrap();
        assert_eq!(response.status, 201);
        assert_eq!(response.body, br#"{"ok":true}"#);
    }
}
