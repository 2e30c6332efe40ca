//! Narration tier and playback seams

use crate::error::TtsResult;
use async_trait::async_trait;

/// Narration lifecycle events, forwarded to the session so playback
/// start/end can drive its state.
#[derive(Debug, Clone, PartialEq)]
pub enum SynthesisEvent {
    /// Narration began
    Started { narration_id: u64 },
    /// Narration played to completion
    Finished { narration_id: u64 },
    /// Both tiers failed for this narration
    Failed { narration_id: u64, error: String },
    /// Narration was cancelled before completion
    Cancelled { narration_id: u64 },
}

impl SynthesisEvent {
    pub fn narration_id(&self) -> u64 {
        match self {
            SynthesisEvent::Started { narration_id }
            | SynthesisEvent::Finished { narration_id }
            | SynthesisEvent::Failed { narration_id, .. }
            | SynthesisEvent::Cancelled { narration_id } => *narration_id,
        }
    }
}

/// One interchangeable text-to-speech backend.
///
/// `narrate` resolves when the audio has fully played. Implementations
/// must be cancellation-safe: the speaker aborts the narration task to
/// cancel, so any spawned child process or in-flight request has to die
/// with the future (`kill_on_drop`, dropped request handles).
#[async_trait]
pub trait NarrationTier: Send + Sync {
    /// Tier name for logs
    fn name(&self) -> &'static str;

    /// Synthesize and play `text`, returning once playback completes.
    async fn narrate(&self, text: &str) -> TtsResult<()>;
}

/// Playback collaborator for audio produced by the remote tier.
#[async_trait]
pub trait AudioSink: Send + Sync {
    /// Play the given encoded audio, resolving when playback finishes.
    async fn play(&self, audio: Vec<u8>) -> TtsResult<()>;
}

/// Sink that discards audio after a short simulated playback. Used where
/// no audio device is wired up (headless demos, tests).
pub struct NullSink;

#[async_trait]
impl AudioSink for NullSink {
    async fn play(&self, audio: Vec<u8>) -> TtsResult<()> {
        tracing::debug!(target: "tts", "Discarding {} bytes of audio (null sink)", audio.len());
        Ok(())
    }
}
