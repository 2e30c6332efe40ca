//! Chat completion client
//!
//! Sends the settled utterance plus a bounded history window to the chat
//! endpoint and maps every failure mode onto one of two typed outcomes:
//! quota exhaustion or a generic connection error.

use crate::catalog::ModelInfo;
use crate::types::{history_window, Message};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

/// Substrings in a failure detail that mark the quota-exhaustion outcome.
const QUOTA_MARKERS: &[&str] = &["quota", "rate limit", "rate_limit", "429", "exceeded"];

/// Reply used when the endpoint answers 2xx but without any content.
pub const EMPTY_REPLY_FALLBACK: &str =
    "Maaf, saya tidak menerima jawaban yang bisa dibacakan. Silakan coba lagi.";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChatError {
    /// The provider's usage allowance is exhausted; gets a dedicated
    /// spoken apology instead of the generic one.
    #[error("Chat provider quota exhausted: {detail}")]
    QuotaExhausted { detail: String },

    /// Transport failure or any non-quota error status.
    #[error("Chat request failed: {0}")]
    Connection(String),
}

/// Returns true when `detail` indicates quota/rate-limit exhaustion.
pub fn is_quota_detail(detail: &str) -> bool {
    let lowered = detail.to_ascii_lowercase();
    QUOTA_MARKERS.iter().any(|marker| lowered.contains(marker))
}

/// Seam between the session and the chat endpoint.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Send one utterance with its history window; resolves to the
    /// assistant reply text.
    async fn send(
        &self,
        utterance: &str,
        history: &[Message],
        model: &ModelInfo,
    ) -> Result<String, ChatError>;
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    message: &'a str,
    model: &'a str,
    provider: &'a str,
    history: &'a [Message],
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: Option<ChoiceMessage>,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ErrorBody {
    details: Option<String>,
}

/// HTTP implementation of [`ChatBackend`].
pub struct HttpChatClient {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpChatClient {
    /// `endpoint` is the full chat-completion URL, e.g.
    /// `http://localhost:3000/api/chat`.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .unwrap_or_default(),
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl ChatBackend for HttpChatClient {
    async fn send(
        &self,
        utterance: &str,
        history: &[Message],
        model: &ModelInfo,
    ) -> Result<String, ChatError> {
        let window = history_window(history);
        debug!(
            target: "chat",
            "Sending utterance ({} chars) with {} history entries to model {}",
            utterance.len(),
            window.len(),
            model.id
        );

        let response = self
            .client
            .post(&self.endpoint)
            .json(&ChatRequest {
                message: utterance,
                model: &model.id,
                provider: model.provider.as_str(),
                history: window,
            })
            .send()
            .await
            .map_err(|e| ChatError::Connection(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response
                .json::<ErrorBody>()
                .await
                .ok()
                .and_then(|body| body.details)
                .unwrap_or_else(|| format!("status {}", status.as_u16()));
            warn!(target: "chat", "Chat endpoint failed: {} ({})", status, detail);

            if is_quota_detail(&detail) || status.as_u16() == 429 {
                return Err(ChatError::QuotaExhausted { detail });
            }
            return Err(ChatError::Connection(detail));
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| ChatError::Connection(e.to_string()))?;

        let reply = body
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message)
            .and_then(|message| message.content)
            .unwrap_or_else(|| EMPTY_REPLY_FALLBACK.to_string());

        Ok(reply)
    }
}
