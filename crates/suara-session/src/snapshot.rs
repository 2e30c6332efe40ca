//! Read-only views the presentation layer renders from

use suara_chat::Message;
use suara_foundation::SessionState;

/// Everything the UI needs, captured at one instant.
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    pub state: SessionState,
    /// Committed transcript plus the current interim tail.
    pub transcript: String,
    /// Latest assistant reply (or apology) for display.
    pub response: String,
    /// False when no recognition engine exists in this environment.
    pub is_supported: bool,
    /// Append-only conversation log for this session.
    pub messages: Vec<Message>,
    /// Selected model id; takes effect on the next utterance.
    pub current_model: String,
    /// True while the recognition engine is retrying a network failure.
    pub network_error: bool,
}

impl SessionSnapshot {
    pub fn new(is_supported: bool, current_model: String) -> Self {
        Self {
            state: SessionState::Idle,
            transcript: String::new(),
            response: String::new(),
            is_supported,
            messages: Vec::new(),
            current_model,
            network_error: false,
        }
    }
}

/// Out-of-band notifications for observers that want push instead of
/// polling. State changes are delivered via the state manager's own
/// subscription; this channel carries human-readable errors.
#[derive(Debug, Clone)]
pub enum SessionNotice {
    Error(String),
}
