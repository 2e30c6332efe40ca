use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;

/// Mutually exclusive session modes. Exactly one is active at any time and
/// it is the single source of truth the presentation layer renders from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    Idle,
    Listening,
    Processing,
    Speaking,
}

impl SessionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::Idle => "idle",
            SessionState::Listening => "listening",
            SessionState::Processing => "processing",
            SessionState::Speaking => "speaking",
        }
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Observable holder for the current [`SessionState`].
///
/// Observers read a snapshot or subscribe for change notifications; they
/// never mutate. Transitions are validated against the session lifecycle
/// graph, except `force_idle` which models user-triggered cancellation and
/// is legal from every state.
pub struct StateManager {
    state: Arc<RwLock<SessionState>>,
    state_tx: broadcast::Sender<SessionState>,
}

impl Default for StateManager {
    fn default() -> Self {
        Self::new()
    }
}

impl StateManager {
    pub fn new() -> Self {
        let (state_tx, _) = broadcast::channel(32);
        Self {
            state: Arc::new(RwLock::new(SessionState::Idle)),
            state_tx,
        }
    }

    /// Attempt a validated transition. Returns false (and leaves the state
    /// untouched) when the edge is not part of the lifecycle graph.
    pub fn transition(&self, new_state: SessionState) -> bool {
        let mut current = self.state.write();

        let valid = matches!(
            (*current, new_state),
            (SessionState::Idle, SessionState::Listening)
                | (SessionState::Idle, SessionState::Speaking)
                | (SessionState::Listening, SessionState::Processing)
                | (SessionState::Listening, SessionState::Idle)
                | (SessionState::Processing, SessionState::Speaking)
                | (SessionState::Processing, SessionState::Idle)
                | (SessionState::Speaking, SessionState::Idle)
        );

        if !valid {
            tracing::warn!(
                target: "session",
                "Rejected state transition: {} -> {}",
                *current,
                new_state
            );
            return false;
        }

        tracing::debug!(target: "session", "State transition: {} -> {}", *current, new_state);
        *current = new_state;
        let _ = self.state_tx.send(new_state);
        true
    }

    /// Force the session back to idle, valid from any state. No-op when
    /// already idle.
    pub fn force_idle(&self) {
        let mut current = self.state.write();
        if *current != SessionState::Idle {
            tracing::debug!(target: "session", "State forced: {} -> idle", *current);
            *current = SessionState::Idle;
            let _ = self.state_tx.send(SessionState::Idle);
        }
    }

    pub fn current(&self) -> SessionState {
        *self.state.read()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionState> {
        self.state_tx.subscribe()
    }
}
