//! Speech-recognition abstraction layer for Suara
//!
//! This crate provides the core abstractions for continuous speech
//! recognition: the engine trait, event and error types, and the
//! finalized-watermark transcript tracker that turns cumulative engine
//! result lists into an append-only committed transcript.

pub mod scripted;
pub mod tracker;
pub mod types;

pub use scripted::{ScriptedEngine, ScriptedHandle};
pub use tracker::{TranscriptTracker, TranscriptUpdate};
pub use types::{
    RecognitionAlternative, RecognitionConfig, RecognitionError, RecognitionEvent,
    RecognitionResult,
};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SttError {
    /// No recognition engine is available in this environment.
    #[error("Recognition engine not available: {0}")]
    EngineNotAvailable(String),

    /// Engine failed to start or stop.
    #[error("Recognition engine error: {0}")]
    Engine(String),
}

pub type SttResult<T> = Result<T, SttError>;

/// Continuous recognition engine interface.
///
/// Engines deliver [`RecognitionEvent`]s over the mpsc channel handed to
/// them at construction. The contract mirrors the browser engine the
/// session was designed around:
///
/// - `start` is a silent no-op when the engine is unavailable or already
///   active from this adapter's perspective.
/// - `stop` aborts recognition; errors from an already-stopped engine are
///   swallowed, never propagated.
/// - Result events re-deliver the full cumulative result list each time;
///   consumers deduplicate with [`TranscriptTracker`].
#[async_trait::async_trait]
pub trait RecognitionEngine: Send {
    /// Begin producing result events. Must not fail loudly: an unavailable
    /// or already-active engine returns `Ok(())` without doing anything.
    async fn start(&mut self) -> SttResult<()>;

    /// Abort recognition for the current episode.
    async fn stop(&mut self);

    /// Whether recognition is usable in this environment at all.
    fn is_available(&self) -> bool;
}
