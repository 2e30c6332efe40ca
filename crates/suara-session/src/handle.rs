//! Public session handle
//!
//! The only surface exposed to the presentation layer. Cloneable; all
//! clones drive the same session. Every action is safe to invoke after
//! shutdown (it becomes a no-op), which is what makes double teardown
//! harmless.

use crate::session::Command;
use crate::snapshot::{SessionNotice, SessionSnapshot};
use parking_lot::RwLock;
use std::sync::Arc;
use suara_foundation::{SessionState, StateManager};
use tokio::sync::{broadcast, mpsc, Mutex};
use tokio::task::JoinHandle;

#[derive(Clone)]
pub struct SessionHandle {
    command_tx: mpsc::Sender<Command>,
    snapshot: Arc<RwLock<SessionSnapshot>>,
    state: Arc<StateManager>,
    notice_tx: broadcast::Sender<SessionNotice>,
    join: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl SessionHandle {
    pub(crate) fn new(
        command_tx: mpsc::Sender<Command>,
        snapshot: Arc<RwLock<SessionSnapshot>>,
        state: Arc<StateManager>,
        notice_tx: broadcast::Sender<SessionNotice>,
        join: JoinHandle<()>,
    ) -> Self {
        Self {
            command_tx,
            snapshot,
            state,
            notice_tx,
            join: Arc::new(Mutex::new(Some(join))),
        }
    }

    /// Current session state.
    pub fn state(&self) -> SessionState {
        self.state.current()
    }

    /// Copy of everything the UI renders from.
    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshot.read().clone()
    }

    /// Whether a recognition engine exists in this environment.
    pub fn is_supported(&self) -> bool {
        self.snapshot.read().is_supported
    }

    /// Subscribe to state-change notifications.
    pub fn subscribe_state(&self) -> broadcast::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// Subscribe to human-readable error notices.
    pub fn subscribe_notices(&self) -> broadcast::Receiver<SessionNotice> {
        self.notice_tx.subscribe()
    }

    pub async fn start_listening(&self) {
        self.send(Command::Start).await;
    }

    pub async fn stop_listening(&self) {
        self.send(Command::Stop).await;
    }

    pub async fn speak(&self, text: impl Into<String>) {
        self.send(Command::Speak(text.into())).await;
    }

    pub async fn stop_speaking(&self) {
        self.send(Command::StopSpeaking).await;
    }

    pub async fn greet(&self) {
        self.send(Command::Greet).await;
    }

    pub async fn set_current_model(&self, id: impl Into<String>) {
        self.send(Command::SetModel(id.into())).await;
    }

    /// Tear the session down and wait for the loop to finish. Idempotent:
    /// a second call (from this or any clone) is a no-op.
    pub async fn shutdown(&self) {
        let _ = self.command_tx.send(Command::Shutdown).await;
        if let Some(join) = self.join.lock().await.take() {
            let _ = join.await;
        }
    }

    async fn send(&self, cmd: Command) {
        // A closed channel means the session is already torn down; every
        // action degrades to a no-op then.
        let _ = self.command_tx.send(cmd).await;
    }
}
