//! Core types for speech recognition

use serde::{Deserialize, Serialize};

/// Recognition configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecognitionConfig {
    /// BCP-47 locale tag for the recognizer
    pub lang: String,
    /// Keep recognizing across pauses instead of stopping after the first
    /// final result
    pub continuous: bool,
    /// Emit interim (non-final) transcripts for live display
    pub interim_results: bool,
    /// Maximum alternatives per result
    pub max_alternatives: u32,
}

impl Default for RecognitionConfig {
    fn default() -> Self {
        Self {
            lang: "id-ID".to_string(),
            continuous: true,
            interim_results: true,
            max_alternatives: 1,
        }
    }
}

/// One recognized alternative for a result slot
#[derive(Debug, Clone, PartialEq)]
pub struct RecognitionAlternative {
    pub transcript: String,
    /// Confidence score (0.0-1.0), when the engine reports one
    pub confidence: Option<f32>,
}

/// One slot in the engine's cumulative result list
#[derive(Debug, Clone, PartialEq)]
pub struct RecognitionResult {
    pub alternatives: Vec<RecognitionAlternative>,
    pub is_final: bool,
}

impl RecognitionResult {
    pub fn interim(text: impl Into<String>) -> Self {
        Self {
            alternatives: vec![RecognitionAlternative {
                transcript: text.into(),
                confidence: None,
            }],
            is_final: false,
        }
    }

    pub fn finalized(text: impl Into<String>) -> Self {
        Self {
            alternatives: vec![RecognitionAlternative {
                transcript: text.into(),
                confidence: None,
            }],
            is_final: true,
        }
    }

    /// Best transcript for this slot, empty when the engine produced no
    /// alternatives.
    pub fn best_transcript(&self) -> &str {
        self.alternatives
            .first()
            .map(|alt| alt.transcript.as_str())
            .unwrap_or("")
    }
}

/// Recognition event types
#[derive(Debug, Clone)]
pub enum RecognitionEvent {
    /// The engine re-delivers its full cumulative result list on every
    /// event; index order implies recognition order.
    Result { results: Vec<RecognitionResult> },
    /// The user started (or resumed) speaking
    SpeechStart,
    /// Recognition error
    Error(RecognitionError),
    /// The engine terminated naturally for this episode
    Ended,
}

/// Recognition error classification
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecognitionError {
    /// No speech was detected; recognition continues, callers ignore this.
    NoSpeech,
    /// Transient network failure inside the recognition engine; retried
    /// with bounded backoff.
    Network,
    /// Microphone permission denied
    NotAllowed,
    /// Recognition was aborted
    Aborted,
    /// Audio capture failed
    AudioCapture,
    /// Anything else the engine reports
    Other(String),
}

impl RecognitionError {
    /// Errors that do not end the current listening episode.
    pub fn is_ignorable(&self) -> bool {
        matches!(self, RecognitionError::NoSpeech)
    }

    /// Errors recovered by restarting the engine with backoff.
    pub fn is_transient(&self) -> bool {
        matches!(self, RecognitionError::Network)
    }

    pub fn message(&self) -> String {
        match self {
            RecognitionError::NoSpeech => "no speech detected".to_string(),
            RecognitionError::Network => "recognition network error".to_string(),
            RecognitionError::NotAllowed => "microphone access denied".to_string(),
            RecognitionError::Aborted => "recognition aborted".to_string(),
            RecognitionError::AudioCapture => "audio capture failed".to_string(),
            RecognitionError::Other(msg) => msg.clone(),
        }
    }
}
