//! Completion client abstraction layer.
//!
//! Defines the [`LlmProvider`] trait and the request type shared by the
//! prompt builder and the HTTP client.
//!
//! One provider is implemented:
//! - [`openai::OpenAiProvider`]: OpenAI-compatible `/v1/chat/completions` API
//!
//! A provider performs exactly one outbound call per [`LlmProvider::complete`]
//! and never retries; callers decide what a failure means for their item.

use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};

pub mod openai;

// ---------------------------------------------------------------------------
// Core types
// ---------------------------------------------------------------------------

/// Conversation participant role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System message.
    System,
    /// Human user message.
    User,
}

/// A role-tagged message sent to the completion API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// The role of the message author.
    pub role: Role,
    /// Plain text content.
    pub content: String,
}

impl Message {
    /// Build a system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    /// Build a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// A single completion request. Built fresh for every item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionRequest {
    /// Model identifier sent to the endpoint.
    pub model: String,
    /// Ordered messages, system message first.
    pub messages: Vec<Message>,
    /// Maximum tokens in the response.
    pub max_tokens: u32,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors returned by completion providers.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// The call could not be completed (connect, timeout, body read).
    #[error("completion request failed: {0}")]
    Network(#[from] reqwest::Error),
    /// Upstream responded with a non-success status.
    #[error("completion API returned status {status}: {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Sanitized response body.
        body: String,
    },
    /// Response did not match the expected `choices[0].message.content` shape.
    #[error("completion response parse error: {0}")]
    Parse(String),
}

// ---------------------------------------------------------------------------
// HTTP helpers
// ---------------------------------------------------------------------------

/// Check HTTP response status and return body text or a structured error.
///
/// # Errors
///
/// Returns `ProviderError::Network` on transport failure, `ProviderError::Api` on non-2xx.
pub async fn check_http_response(response: reqwest::Response) -> Result<String, ProviderError> {
    let status = response.status();
    let body = response.text().await?;
    if !status.is_success() {
        return Err(ProviderError::Api {
            status: status.as_u16(),
            body: sanitize_http_error_body(&body),
        });
    }
    Ok(body)
}

fn sanitize_http_error_body(raw: &str) -> String {
    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");

    let mut sanitized = collapsed;
    for pattern in [r"sk-[A-Za-z0-9_\-]{20,}", r"Bearer [A-Za-z0-9_\-\.]{10,}"] {
        if let Ok(regex) = Regex::new(pattern) {
            sanitized = regex.replace_all(&sanitized, "[REDACTED]").into_owned();
        }
    }

    const MAX_ERROR_BODY_CHARS: usize = 256;
    if sanitized.chars().count() > MAX_ERROR_BODY_CHARS {
        let shortened = sanitized
            .chars()
            .take(MAX_ERROR_BODY_CHARS)
            .collect::<String>();
        return format!("{shortened}...[truncated]");
    }

    sanitized
}

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// Core completion interface.
///
/// Implementations must be `Send + Sync` so a single client can be shared
/// by both pipelines.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Request a completion and return the first choice's message text.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError`] on API, network, or parse failure.
    async fn complete(&self, request: &CompletionRequest) -> Result<String, ProviderError>;
}
