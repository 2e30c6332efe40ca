//! Remote narration tier
//!
//! Posts text to the narration service and plays the returned audio
//! through an [`AudioSink`]. Any transport error, non-success status, or
//! sink failure is a tier failure; the speaker falls back to the local
//! tier without surfacing it to the user.

use crate::engine::{AudioSink, NarrationTier};
use crate::error::{TtsError, TtsResult};
use crate::types::NarrationConfig;
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

#[derive(Serialize)]
struct NarrateRequest<'a> {
    text: &'a str,
    lang: &'a str,
    slow: bool,
}

/// HTTP client for the narration service's streaming endpoint.
pub struct RemoteNarrator {
    client: reqwest::Client,
    endpoint: String,
    config: NarrationConfig,
    sink: Arc<dyn AudioSink>,
}

impl RemoteNarrator {
    /// `endpoint` is the full URL of the streaming TTS route, e.g.
    /// `http://localhost:5000/tts/stream`.
    pub fn new(endpoint: impl Into<String>, config: NarrationConfig, sink: Arc<dyn AudioSink>) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(15))
                .build()
                .unwrap_or_default(),
            endpoint: endpoint.into(),
            config,
            sink,
        }
    }

    async fn fetch_audio(&self, text: &str) -> TtsResult<Vec<u8>> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&NarrateRequest {
                text,
                lang: &self.config.lang,
                slow: self.config.slow,
            })
            .send()
            .await
            .map_err(|e| TtsError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TtsError::Http {
                status: status.as_u16(),
            });
        }

        let audio = response
            .bytes()
            .await
            .map_err(|e| TtsError::Transport(e.to_string()))?;
        Ok(audio.to_vec())
    }
}

#[async_trait]
impl NarrationTier for RemoteNarrator {
    fn name(&self) -> &'static str {
        "remote"
    }

    async fn narrate(&self, text: &str) -> TtsResult<()> {
        if text.trim().is_empty() {
            return Err(TtsError::InvalidInput("empty text".to_string()));
        }
        let audio = self.fetch_audio(text).await?;
        tracing::debug!(
            target: "tts",
            "Remote narration fetched {} bytes for {} chars",
            audio.len(),
            text.len()
        );
        self.sink.play(audio).await
    }
}
