// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # LIAM API Client
//!
//! Every call is a signed `POST` of a compact JSON body:
//!
//! 1. serialize the payload once, so the signed bytes are the sent bytes
//! 2. sign method, path, body and timestamp with the [`RequestSigner`]
//! 3. attach `apiKey`, `Content-Type` and the signature headers
//! 4. send through the [`Transport`] and map the response
//!
//! A response with status >= 400 becomes [`Error::Api`] carrying the
//! server's `message` field. Non-JSON responses become
//! [`Error::InvalidResponse`] on success statuses and [`Error::Api`]
//! otherwise.

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::batch::{BatchExecutor, BatchReport};
use crate::config::{ClientConfig, DEFAULT_MAX_RESPONSE_BYTES};
use crate::crypto::RequestSigner;
use crate::error::{Error, Result};
use crate::models::*;
use crate::transport::{HttpTransport, Transport, TransportError, TransportRequest};

/// Header carrying the connector API key.
pub const API_KEY_HEADER: &str = "apiKey";

/// Concurrency used by batch helpers when the caller has no preference.
pub const DEFAULT_BATCH_CONCURRENCY: usize = 10;

/// Longest slice of an unparseable body echoed into an error message.
const MAX_ERROR_BODY_CHARS: usize = 512;

/// Signed client for the LIAM memory API.
pub struct LiamClient<T: Transport = HttpTransport> {
    api_key: String,
    signer: RequestSigner,
    transport: T,
    max_response_bytes: usize,
}

impl<T: Transport> std::fmt::Debug for LiamClient<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LiamClient")
            .field("key_id", &self.signer.key_id())
            .field("max_response_bytes", &self.max_response_bytes)
            .finish_non_exhaustive()
    }
}

impl LiamClient<HttpTransport> {
    /// Build an HTTP client from resolved configuration.
    ///
    /// # Errors
    /// - [`Error::MissingConfig`] if the API key or private key is absent
    /// - [`Error::Io`] / [`Error::KeyFormat`] if the key cannot be loaded
    /// - [`Error::Transport`] if the base URL is invalid
    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        let api_key = config.api_key()?.to_string();
        let signer = config.key_source()?.load_signer()?;
        let transport = HttpTransport::new(&config.base_url, config.timeout)?;

        debug!(
            base_url = %config.base_url,
            key_id = %signer.key_id(),
            "LIAM client configured"
        );

        Ok(Self::with_transport(api_key, signer, transport)
            .with_max_response_bytes(config.max_response_bytes))
    }

    /// Build an HTTP client entirely from `LIAM_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_config(&ClientConfig::from_env()?)
    }
}

impl<T: Transport> LiamClient<T> {
    pub fn with_transport(api_key: impl Into<String>, signer: RequestSigner, transport: T) -> Self {
        Self {
            api_key: api_key.into(),
            signer,
            transport,
            max_response_bytes: DEFAULT_MAX_RESPONSE_BYTES,
        }
    }

    pub fn with_max_response_bytes(mut self, limit: usize) -> Self {
        self.max_response_bytes = limit;
        self
    }

    pub fn signer(&self) -> &RequestSigner {
        &self.signer
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Serialize `payload` and send it as a signed `POST` to `path`.
    pub async fn post<B: Serialize + ?Sized>(&self, path: &str, payload: &B) -> Result<Value> {
        let body = serde_json::to_vec(payload).map_err(|e| Error::RequestEncoding(e.to_string()))?;
        self.send_signed("POST", path, body).await
    }

    /// Sign and send a pre-encoded body.
    pub async fn send_signed(&self, method: &str, path: &str, body: Vec<u8>) -> Result<Value> {
        let envelope = self.signer.sign(method, path, &body)?;

        let mut headers = vec![
            ("Content-Type".to_string(), "application/json".to_string()),
            (API_KEY_HEADER.to_string(), self.api_key.clone()),
        ];
        headers.extend(envelope.headers());

        let request = TransportRequest {
            method: method.to_string(),
            path: path.to_string(),
            headers,
            body,
            max_response_bytes: Some(self.max_response_bytes),
        };

        let response = self.transport.send(request).await.map_err(|e| match e {
            TransportError::ResponseTooLarge { size, limit } => {
                warn!(method, path, size, limit, "LIAM response too large");
                Error::ResponseTooLarge { size, limit }
            }
            other => {
                warn!(method, path, error = %other, "LIAM request failed");
                Error::from(other)
            }
        })?;

        // Transports that ignore `max_response_bytes` are still held to it.

        if response.body.len() > self.max_response_bytes {
            return Err(Error::ResponseTooLarge {
                size: response.body.len(),
                limit: self.max_response_bytes,
            });
        }

        let status = response.status;
        let data: Value = match serde_json::from_slice(&response.body) {
            Ok(data) => data,
            Err(_) => {
                let text = truncated_text(&response.body);
                if status >= 400 {
                    return Err(Error::Api {
                        status,
                        message: format!("Invalid JSON response: {text}"),
                        body: None,
                    });
                }
                return Err(Error::InvalidResponse(format!(
                    "{path} returned {status} with invalid JSON: {text}"
                )));
            }
        };

        if status >= 400 {
            let message = data
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("Unknown error")
                .to_string();
            warn!(method, path, status, message = %message, "LIAM API error");
            return Err(Error::Api {
                status,
                message,
                body: Some(data),
            });
        }

        debug!(method, path, status, "LIAM request succeeded");
        Ok(data)
    }

    // =========================================================================
    // Memory Operations
    // =========================================================================

    pub async fn create_memory(
        &self,
        user_key: &str,
        content: &str,
        tag: Option<&str>,
        session_id: Option<&str>,
    ) -> Result<Value> {
        let payload = CreateMemoryRequest {
            user_key,
            content,
            tag,
            session_id,
        };
        self.post(CREATE_MEMORY_PATH, &payload).await
    }

    pub async fn create_memory_with_image(
        &self,
        user_key: &str,
        content: &str,
        image_base64: &str,
        tag: Option<&str>,
        session_id: Option<&str>,
    ) -> Result<Value> {
        let payload = CreateMemoryWithImageRequest {
            user_key,
            content,
            image: image_base64,
            tag,
            session_id,
        };
        self.post(CREATE_MEMORY_WITH_IMAGE_PATH, &payload).await
    }

    pub async fn memory_status(&self, user_key: &str, process_id: Option<&str>) -> Result<Value> {
        let payload = MemoryStatusRequest {
            user_key,
            process_id,
        };
        self.post(MEMORY_STATUS_PATH, &payload).await
    }

    /// List memories, optionally filtered by a search query.
    /// `limit` defaults to [`DEFAULT_LIST_LIMIT`].
    pub async fn list_memories(
        &self,
        user_key: &str,
        query: Option<&str>,
        limit: Option<u32>,
    ) -> Result<Value> {
        let payload = ListMemoriesRequest {
            user_key,
            limit: limit.unwrap_or(DEFAULT_LIST_LIMIT),
            query,
        };
        self.post(LIST_MEMORIES_PATH, &payload).await
    }

    pub async fn chat(&self, user_key: &str, query: &str, session_id: Option<&str>) -> Result<Value> {
        let payload = ChatRequest {
            user_key,
            query,
            session_id,
        };
        self.post(CHAT_PATH, &payload).await
    }

    pub async fn summarize_memory(&self, user_key: &str, memory_id: Option<&str>) -> Result<Value> {
        let payload = SummarizeMemoryRequest { user_key, memory_id };
        self.post(SUMMARIZE_MEMORY_PATH, &payload).await
    }

    pub async fn forget_memory(&self, user_key: &str, memory_id: &str, permanent: bool) -> Result<Value> {
        let payload = ForgetMemoryRequest {
            user_key,
            memory_id,
            permanent,
        };
        self.post(FORGET_MEMORY_PATH, &payload).await
    }

    // =========================================================================
    // Tag Operations
    // =========================================================================

    pub async fn list_tags(&self, user_key: &str) -> Result<Value> {
        self.post(LIST_TAGS_PATH, &ListTagsRequest { user_key }).await
    }

    pub async fn add_tag(&self, user_key: &str, memory_id: &str, tag: &str) -> Result<Value> {
        let payload = AddTagRequest {
            user_key,
            memory_id,
            tag,
        };
        self.post(ADD_TAG_PATH, &payload).await
    }

    pub async fn get_by_tag(
        &self,
        user_key: &str,
        tag: &str,
        limit: Option<u32>,
        offset: Option<u32>,
    ) -> Result<Value> {
        let payload = GetByTagRequest {
            user_key,
            tag,
            limit: limit.unwrap_or(DEFAULT_TAG_PAGE_LIMIT),
            offset: offset.unwrap_or(0),
        };
        self.post(GET_BY_TAG_PATH, &payload).await
    }

    pub async fn change_tag(&self, user_key: &str, old_tag: &str, new_tag: &str) -> Result<Value> {
        let payload = ChangeTagRequest {
            user_key,
            old_tag,
            new_tag,
        };
        self.post(CHANGE_TAG_PATH, &payload).await
    }

    pub async fn health_check(&self) -> Result<Value> {
        self.post(HEALTH_PATH, &HealthCheckRequest::default()).await
    }

    // =========================================================================
    // Batch Operations
    // =========================================================================

    /// Create many memories with at most `concurrency` requests in flight.
    ///
    /// # Errors
    /// [`Error::InvalidConcurrency`] if `concurrency` is zero. Per-item
    /// failures are recorded in the report.
    pub async fn create_memories_batch(
        self: &Arc<Self>,
        user_key: &str,
        memories: Vec<MemoryInput>,
        concurrency: usize,
    ) -> Result<BatchReport<MemoryInput, Value, Error>> {
        let executor = BatchExecutor::new(concurrency)?;
        Ok(self.create_memories_with(&executor, user_key, memories).await)
    }

    /// Same as [`create_memories_batch`](Self::create_memories_batch) with a
    /// caller-configured executor (deadline, cancellation, progress).
    pub async fn create_memories_with(
        self: &Arc<Self>,
        executor: &BatchExecutor,
        user_key: &str,
        memories: Vec<MemoryInput>,
    ) -> BatchReport<MemoryInput, Value, Error> {
        let client = Arc::clone(self);
        let user_key: Arc<str> = Arc::from(user_key);

        executor
            .run(memories, move |memory: MemoryInput| {
                let client = Arc::clone(&client);
                let user_key = Arc::clone(&user_key);
                async move {
                    client
                        .create_memory(
                            &user_key,
                            &memory.content,
                            memory.tag.as_deref(),
                            memory.session_id.as_deref(),
                        )
                        .await
                }
            })
            .await
    }

    /// Fetch the memories for each tag, one item per tag in input order.
    ///
    /// # Errors
    /// [`Error::InvalidConcurrency`] if `concurrency` is zero.
    pub async fn get_all_tagged_memories(
        self: &Arc<Self>,
        user_key: &str,
        tags: Vec<String>,
        concurrency: usize,
    ) -> Result<BatchReport<String, Value, Error>> {
        let executor = BatchExecutor::new(concurrency)?;
        let client = Arc::clone(self);
        let user_key: Arc<str> = Arc::from(user_key);

        let report = executor
            .run(tags, move |tag: String| {
                let client = Arc::clone(&client);
                let user_key = Arc::clone(&user_key);
                async move { client.get_by_tag(&user_key, &tag, None, None).await }
            })
            .await;
        Ok(report)
    }
}

fn truncated_text(body: &[u8]) -> String {
    let text = String::from_utf8_lossy(body);
    if text.chars().count() <= MAX_ERROR_BODY_CHARS {
        text.into_owned()
    } else {
        let mut cut: String = text.chars().take(MAX_ERROR_BODY_CHARS).collect();
        cut.push_str("...");
        cut
    }
}
