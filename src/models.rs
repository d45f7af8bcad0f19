// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # API Data Models
//!
//! Request bodies for the memory endpoints. Field names serialize in
//! camelCase and unset optional fields are omitted from the JSON body,
//! so the signed bytes match what the server expects to receive.
//!
//! Responses are returned as untyped [`serde_json::Value`].

use serde::{Deserialize, Serialize};

// =============================================================================
// Endpoint Paths
// =============================================================================

pub const CREATE_MEMORY_PATH: &str = "/memory/create";
pub const CREATE_MEMORY_WITH_IMAGE_PATH: &str = "/memory/create-with-image";
pub const MEMORY_STATUS_PATH: &str = "/memory/status";
pub const LIST_MEMORIES_PATH: &str = "/memory/list";
pub const CHAT_PATH: &str = "/memory/chat";
pub const SUMMARIZE_MEMORY_PATH: &str = "/memory/summarize";
pub const FORGET_MEMORY_PATH: &str = "/memory/forget";
pub const LIST_TAGS_PATH: &str = "/memory/list-tags";
pub const ADD_TAG_PATH: &str = "/memory/add-tag";
pub const GET_BY_TAG_PATH: &str = "/memory/get-by-tag";
pub const CHANGE_TAG_PATH: &str = "/memory/change-tag";
pub const HEALTH_PATH: &str = "/memory/health";

/// Default page size for `list_memories`.
pub const DEFAULT_LIST_LIMIT: u32 = 50;
/// Default page size for `get_by_tag`.
pub const DEFAULT_TAG_PAGE_LIMIT: u32 = 50;

// =============================================================================
// Memories
// =============================================================================

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CreateMemoryRequest<'a> {
    pub user_key: &'a str,
    pub content: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<&'a str>,
}

/// Memory with an attached image (base64 or data URL, passed through as-is).
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CreateMemoryWithImageRequest<'a> {
    pub user_key: &'a str,
    pub content: &'a str,
    pub image: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<&'a str>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MemoryStatusRequest<'a> {
    pub user_key: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub process_id: Option<&'a str>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ListMemoriesRequest<'a> {
    pub user_key: &'a str,
    pub limit: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<&'a str>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest<'a> {
    pub user_key: &'a str,
    pub query: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<&'a str>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SummarizeMemoryRequest<'a> {
    pub user_key: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory_id: Option<&'a str>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ForgetMemoryRequest<'a> {
    pub user_key: &'a str,
    pub memory_id: &'a str,
    pub permanent: bool,
}

// =============================================================================
// Tags
// =============================================================================

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ListTagsRequest<'a> {
    pub user_key: &'a str,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AddTagRequest<'a> {
    pub user_key: &'a str,
    pub memory_id: &'a str,
    pub tag: &'a str,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GetByTagRequest<'a> {
    pub user_key: &'a str,
    pub tag: &'a str,
    pub limit: u32,
    pub offset: u32,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ChangeTagRequest<'a> {
    pub user_key: &'a str,
    pub old_tag: &'a str,
    pub new_tag: &'a str,
}

// =============================================================================
// Health
// =============================================================================

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct HealthCheckRequest {
    pub ping: &'static str,
}

impl Default for HealthCheckRequest {
    fn default() -> Self {
        Self { ping: "test" }
    }
}

// =============================================================================
// Batch Inputs
// =============================================================================

/// One memory to create in a batch.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MemoryInput {
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

impl MemoryInput {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            tag: None,
            session_id: None,
        }
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    pub fn with_session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_memory_omits_unset_optionals() {
        let body = CreateMemoryRequest {
            user_key: "user-1",
            content: "hello",
            tag: None,
            session_id: None,
        };
        assert_eq!(
            serde_json::to_string(&body).unwrap(),
            r#"{"userKey":"user-1","content":"hello"}"#
        );
    }

    #[test]
    fn create_memory_uses_camel_case_keys() {
        let body = CreateMemoryRequest {
            user_key: "user-1",
            content: "hello",
            tag: Some("work"),
            session_id: Some("s-9"),
        };
        assert_eq!(
            serde_json::to_string(&body).unwrap(),
            r#"{"userKey":"user-1","content":"hello","tag":"work","sessionId":"s-9"}"#
        );
    }

    #[test]
    fn change_tag_serializes_old_and_new() {
        let body = ChangeTagRequest {
            user_key: "u",
            old_tag: "a",
            new_tag: "b",
        };
        assert_eq!(
            serde_json::to_string(&body).unwrap(),
            r#"{"userKey":"u","oldTag":"a","newTag":"b"}"#
        );
    }

    #[test]
    fn health_check_pings() {
        assert_eq!(
            serde_json::to_string(&HealthCheckRequest::default()).unwrap(),
            r#"{"ping":"test"}"#
        );
    }

    #[test]
    fn memory_input_deserializes_without_optionals() {
        let input: MemoryInput = serde_json::from_str(r#"{"content":"note"}"#).unwrap();
        assert_eq!(input, MemoryInput::new("note"));

        let tagged: MemoryInput =
            serde_json::from_str(r#"{"content":"note","tag":"t","sessionId":"s"}"#).unwrap();
        assert_eq!(tagged, MemoryInput::new("note").with_tag("t").with_session_id("s"));
    }
}
