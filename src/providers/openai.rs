//! OpenAI-compatible provider using the `/v1/chat/completions` API.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::EnrichConfig;

use super::{check_http_response, CompletionRequest, LlmProvider, ProviderError, Role};

// ---------------------------------------------------------------------------
// Wire types (pub for integration testing)
// ---------------------------------------------------------------------------

/// Chat completions API request body.
#[doc(hidden)]
#[derive(Debug, Serialize)]
pub struct OpenAiRequest {
    /// Model identifier.
    pub model: String,
    /// Conversation messages.
    pub messages: Vec<OpenAiMessage>,
    /// Maximum completion tokens.
    pub max_tokens: u32,
}

/// A message in OpenAI chat format.
#[doc(hidden)]
#[derive(Debug, Serialize)]
pub struct OpenAiMessage {
    /// Role (`system`, `user`, `assistant`).
    pub role: String,
    /// Plain text content.
    pub content: String,
}

/// Chat completions API response body.
#[doc(hidden)]
#[derive(Debug, Deserialize)]
pub struct OpenAiResponse {
    /// Response choices.
    pub choices: Vec<OpenAiChoice>,
}

/// A response choice.
#[doc(hidden)]
#[derive(Debug, Deserialize)]
pub struct OpenAiChoice {
    /// Assistant message for this choice.
    pub message: OpenAiResponseMessage,
}

/// Assistant message.
#[doc(hidden)]
#[derive(Debug, Deserialize)]
pub struct OpenAiResponseMessage {
    /// Text content. Absent when the model refused or only called tools.
    pub content: Option<String>,
}

// ---------------------------------------------------------------------------
// Provider
// ---------------------------------------------------------------------------

/// Chat completions provider bound to one endpoint, key and model.
#[derive(Clone)]
pub struct OpenAiProvider {
    endpoint: String,
    api_key: String,
    client: reqwest::Client,
}

impl std::fmt::Debug for OpenAiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiProvider")
            .field("endpoint", &self.endpoint)
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

impl OpenAiProvider {
    /// Create a provider for the given endpoint and key.
    ///
    /// # Errors
    ///
    /// Returns `ProviderError::Network` if the HTTP client cannot be built.
    pub fn new(
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            client,
        })
    }

    /// Create a provider from resolved configuration.
    ///
    /// # Errors
    ///
    /// Returns `ProviderError::Network` if the HTTP client cannot be built.
    pub fn from_config(config: &EnrichConfig, timeout: Duration) -> Result<Self, ProviderError> {
        Self::new(config.api_endpoint.clone(), config.api_key.clone(), timeout)
    }
}

// ---------------------------------------------------------------------------
// Request / Response builders (pub for integration testing)
// ---------------------------------------------------------------------------

/// Build the wire request from a completion request.
#[doc(hidden)]
pub fn build_request(request: &CompletionRequest) -> OpenAiRequest {
    OpenAiRequest {
        model: request.model.clone(),
        messages: request
            .messages
            .iter()
            .map(|msg| OpenAiMessage {
                role: role_to_openai(msg.role).to_owned(),
                content: msg.content.clone(),
            })
            .collect(),
        max_tokens: request.max_tokens,
    }
}

/// Extract the first choice's message text from a response body.
///
/// # Errors
///
/// Returns `ProviderError::Parse` if the body is not the expected shape,
/// has no choices, or the first choice carries no text.
#[doc(hidden)]
pub fn parse_response(body: &str) -> Result<String, ProviderError> {
    let resp: OpenAiResponse =
        serde_json::from_str(body).map_err(|e| ProviderError::Parse(e.to_string()))?;

    let choice = resp
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| ProviderError::Parse("missing choices[0]".to_owned()))?;

    choice
        .message
        .content
        .ok_or_else(|| ProviderError::Parse("missing choices[0].message.content".to_owned()))
}

fn role_to_openai(role: Role) -> &'static str {
    match role {
        Role::System => "system",
        Role::User => "user",
    }
}

// ---------------------------------------------------------------------------
// Trait impl
// ---------------------------------------------------------------------------

#[async_trait::async_trait]
impl LlmProvider for OpenAiProvider {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, ProviderError> {
        let api_request = build_request(request);

        let response = self
            .client
            .post(&self.endpoint)
            .header("content-type", "application/json")
            .header("authorization", format!("Bearer {}", self.api_key))
            .json(&api_request)
            .send()
            .await?;

        let payload = check_http_response(response).await?;
        parse_response(&payload)
    }
}
