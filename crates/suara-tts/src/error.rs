//! Error types for synthesis

use thiserror::Error;

/// TTS error types
#[derive(Error, Debug)]
pub enum TtsError {
    /// Engine is not available or not installed
    #[error("TTS engine not available: {0}")]
    EngineNotAvailable(String),

    /// Remote tier returned a non-success status
    #[error("Narration service returned status {status}")]
    Http { status: u16 },

    /// Remote tier transport failure
    #[error("Narration request failed: {0}")]
    Transport(String),

    /// Synthesis failed
    #[error("Synthesis failed: {0}")]
    SynthesisError(String),

    /// Audio playback error
    #[error("Audio output error: {0}")]
    AudioError(String),

    /// IO error (file operations, process spawning)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid text input
    #[error("Invalid text input: {0}")]
    InvalidInput(String),
}

/// Result type for synthesis operations
pub type TtsResult<T> = Result<T, TtsError>;
