//! Voice session state machine for Suara
//!
//! The orchestrator: owns the lifecycle state and wires recognition,
//! utterance settling, the chat backend, and two-tier narration into one
//! cohesive session. The session runs as a single event-loop task; all
//! mutable trackers (finalized watermark, pending utterance, retry
//! counter) are ordinary fields on that task's state, so every handler
//! reads current truth rather than a stale capture.
//!
//! The presentation layer talks only to [`SessionHandle`]: it reads
//! snapshots and invokes the public actions, nothing else.

pub mod handle;
pub mod session;
pub mod snapshot;

pub use handle::SessionHandle;
pub use session::{SessionConfig, SessionDeps, VoiceSession};
pub use snapshot::{SessionNotice, SessionSnapshot};

use std::time::Duration;

/// Quiet period after the last finalized segment before an utterance is
/// considered settled and submitted.
pub const SETTLE_QUIET: Duration = Duration::from_millis(2500);

/// Maximum recognition network-error restarts per listening episode.
pub const MAX_NETWORK_RETRIES: u8 = 3;

/// Base delay for recognition restarts; attempt `n` waits `n` times this.
pub const RETRY_BASE_DELAY: Duration = Duration::from_millis(1000);

/// Fixed greeting narrated by the `greet` action.
pub const GREETING: &str =
    "Halo! Saya Suara, asisten suara Anda. Ada yang bisa saya bantu hari ini?";

/// Spoken and displayed when the chat backend cannot be reached.
pub const CONNECTION_APOLOGY: &str =
    "Maaf, saya sedang mengalami kendala koneksi. Silakan coba lagi.";

/// Spoken and displayed when the provider's quota is exhausted.
pub const QUOTA_APOLOGY: &str =
    "Maaf, kuota penggunaan AI sudah habis untuk saat ini. Silakan coba beberapa saat lagi.";
