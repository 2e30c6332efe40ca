//! Two-tier speech synthesis for Suara
//!
//! Narration prefers a remote service that produces natural-sounding audio
//! and silently falls back to an on-device engine when the service is
//! unreachable. At most one narration is ever active; starting a new one
//! cancels whatever is in flight.

pub mod engine;
pub mod error;
pub mod local;
pub mod remote;
pub mod speaker;
pub mod types;

pub use engine::{AudioSink, NarrationTier, NullSink, SynthesisEvent};
pub use error::{TtsError, TtsResult};
pub use local::LocalNarrator;
pub use remote::RemoteNarrator;
pub use speaker::Speaker;
pub use types::{NarrationConfig, VoiceInfo};

use std::sync::atomic::{AtomicU64, Ordering};

static NARRATION_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Generate a unique narration ID
pub fn next_narration_id() -> u64 {
    NARRATION_ID_COUNTER.fetch_add(1, Ordering::SeqCst)
}
