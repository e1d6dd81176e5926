// ABOUTME: Client for an OpenAI-compatible chat/completions endpoint (LM Studio and friends)
// ABOUTME: Renders the transcript, posts it, and classifies every failure into InferenceError

use crate::config::InferenceConfig;
use crate::session::Turn;
use anyhow::Context;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Longest error body kept in an `InferenceError::Http`
const MAX_ERROR_BODY: usize = 512;

/// Why a completion could not be produced.
///
/// All three surface the same apology to the user; they are kept apart so
/// the logs say whether the endpoint was down, refused, or spoke a
/// different protocol.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InferenceError {
    #[error("inference endpoint unreachable: {0}")]
    Unavailable(String),

    #[error("inference endpoint returned HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("malformed inference response: {0}")]
    MalformedResponse(String),
}

impl InferenceError {
    /// Short label used in logs and metrics
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Unavailable(_) => "unavailable",
            Self::Http { .. } => "http_error",
            Self::MalformedResponse(_) => "malformed_response",
        }
    }
}

/// Produces the assistant's next reply from a full transcript.
///
/// The endpoint is assumed to keep no memory, so every call carries the
/// whole history. Implementations must not retry.
#[async_trait]
pub trait InferenceClient: Send + Sync {
    async fn complete(&self, transcript: &[Turn]) -> Result<String, InferenceError>;
}

/// How the transcript is laid out in the request's `messages` array
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TranscriptFormat {
    /// System prompt plus one user message holding "\nrole: text" lines
    #[default]
    Concatenated,
    /// System prompt plus one message per turn
    Messages,
}

// =============================================================================
// Wire types
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    fn new(role: &str, content: impl Into<String>) -> Self {
        Self {
            role: role.to_string(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

/// Build the `messages` array for a request
pub fn render_messages(
    system_prompt: &str,
    transcript: &[Turn],
    format: TranscriptFormat,
) -> Vec<ChatMessage> {
    let mut messages = vec![ChatMessage::new("system", system_prompt)];
    match format {
        TranscriptFormat::Concatenated => {
            let history: String = transcript
                .iter()
                .map(|turn| format!("\n{}: {}", turn.role, turn.text))
                .collect();
            messages.push(ChatMessage::new("user", history));
        }
        TranscriptFormat::Messages => {
            messages.extend(
                transcript
                    .iter()
                    .map(|turn| ChatMessage::new(turn.role.as_str(), turn.text.clone())),
            );
        }
    }
    messages
}

/// Pull `choices[0].message.content` out of a response body
pub fn extract_reply(body: &str) -> Result<String, InferenceError> {
    let parsed: ChatCompletionResponse = serde_json::from_str(body)
        .map_err(|e| InferenceError::MalformedResponse(format!("invalid body: {e}")))?;

    parsed
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| InferenceError::MalformedResponse("no choices in response".to_string()))?
        .message
        .content
        .ok_or_else(|| InferenceError::MalformedResponse("choice has no content".to_string()))
}

fn truncate_body(body: &str) -> String {
    if body.len() <= MAX_ERROR_BODY {
        return body.to_string();
    }
    let mut end = MAX_ERROR_BODY;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &body[..end])
}

// =============================================================================
// HTTP implementation
// =============================================================================

/// `InferenceClient` over HTTP with a bounded per-request timeout
#[derive(Clone)]
pub struct HttpInferenceClient {
    client: reqwest::Client,
    config: InferenceConfig,
}

impl HttpInferenceClient {
    pub fn new(config: InferenceConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to build inference HTTP client")?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &InferenceConfig {
        &self.config
    }
}

#[async_trait]
impl InferenceClient for HttpInferenceClient {
    async fn complete(&self, transcript: &[Turn]) -> Result<String, InferenceError> {
        let request = ChatCompletionRequest {
            model: &self.config.model,
            messages: render_messages(
                &self.config.system_prompt,
                transcript,
                self.config.transcript_format,
            ),
            temperature: self.config.temperature,
        };

        tracing::debug!(
            url = %self.config.url,
            model = %self.config.model,
            turns = transcript.len(),
            "Sending completion request"
        );

        let mut builder = self.client.post(&self.config.url).json(&request);
        if let Some(ref key) = self.config.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| InferenceError::Unavailable(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| InferenceError::Unavailable(format!("failed to read body: {e}")))?;

        if !status.is_success() {
            return Err(InferenceError::Http {
                status: status.as_u16(),
                body: truncate_body(&body),
            });
        }

        extract_reply(&body)
    }
}
