//! The voice session event loop
//!
//! Single-task, event-driven: the loop reacts to commands, recognition
//! events, synthesis events, chat outcomes, and at most two deadlines
//! (utterance settle, recognition retry). Both deadlines are `Option`
//! fields polled by `select!` branches, so arming a new one of a kind
//! replaces its predecessor by assignment and teardown cannot leak a live
//! timer.

use crate::snapshot::{SessionNotice, SessionSnapshot};
use crate::{
    CONNECTION_APOLOGY, GREETING, MAX_NETWORK_RETRIES, QUOTA_APOLOGY, RETRY_BASE_DELAY,
    SETTLE_QUIET,
};
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Duration;
use suara_chat::{history_window, ChatBackend, ChatError, Message, ModelCatalog, ModelInfo};
use suara_foundation::{SessionState, StateManager};
use suara_stt::{RecognitionEngine, RecognitionError, RecognitionEvent};
use suara_text::normalize_for_speech;
use suara_tts::{NarrationTier, Speaker, SynthesisEvent};
use tokio::sync::{broadcast, mpsc};
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, warn};

/// Session tuning knobs. Defaults match the crate-level constants.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub settle_quiet: Duration,
    pub max_network_retries: u8,
    pub retry_base_delay: Duration,
    pub greeting: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            settle_quiet: SETTLE_QUIET,
            max_network_retries: MAX_NETWORK_RETRIES,
            retry_base_delay: RETRY_BASE_DELAY,
            greeting: GREETING.to_string(),
        }
    }
}

/// Collaborators the session is built from.
pub struct SessionDeps {
    pub engine: Box<dyn RecognitionEngine>,
    pub recognition_rx: mpsc::Receiver<RecognitionEvent>,
    pub chat: Arc<dyn ChatBackend>,
    pub catalog: ModelCatalog,
    pub primary_tier: Arc<dyn NarrationTier>,
    pub fallback_tier: Arc<dyn NarrationTier>,
}

#[derive(Debug)]
pub(crate) enum Command {
    Start,
    Stop,
    Speak(String),
    StopSpeaking,
    Greet,
    SetModel(String),
    Shutdown,
}

/// The session event loop and all of its mutable state.
pub struct VoiceSession {
    config: SessionConfig,
    state: Arc<StateManager>,
    snapshot: Arc<RwLock<SessionSnapshot>>,
    notice_tx: broadcast::Sender<SessionNotice>,

    command_rx: mpsc::Receiver<Command>,
    engine: Box<dyn RecognitionEngine>,
    recognition_rx: mpsc::Receiver<RecognitionEvent>,
    speaker: Speaker,
    synthesis_rx: mpsc::Receiver<SynthesisEvent>,
    chat: Arc<dyn ChatBackend>,
    catalog: ModelCatalog,
    chat_tx: mpsc::Sender<(u64, Result<String, ChatError>)>,
    chat_rx: mpsc::Receiver<(u64, Result<String, ChatError>)>,

    tracker: suara_stt::TranscriptTracker,
    messages: Vec<Message>,
    pending_utterance: Option<String>,
    settle_deadline: Option<Instant>,
    retry_deadline: Option<Instant>,
    retry_attempts: u8,
    /// Bumped at every episode boundary; stale chat outcomes carry an old
    /// value and are dropped.
    episode: u64,
    /// Narration whose lifecycle events are allowed to drive state.
    expected_narration: Option<u64>,
}

impl VoiceSession {
    /// Spawn the session loop and return its public handle.
    pub fn spawn(deps: SessionDeps, config: SessionConfig) -> crate::SessionHandle {
        let (command_tx, command_rx) = mpsc::channel(32);
        let (synthesis_tx, synthesis_rx) = mpsc::channel(32);
        let (chat_tx, chat_rx) = mpsc::channel(8);
        let (notice_tx, _) = broadcast::channel(32);

        let is_supported = deps.engine.is_available();
        let current_model = deps
            .catalog
            .default_model()
            .map(|m| m.id.clone())
            .unwrap_or_default();
        let snapshot = Arc::new(RwLock::new(SessionSnapshot::new(
            is_supported,
            current_model,
        )));
        let state = Arc::new(StateManager::new());
        let speaker = Speaker::new(deps.primary_tier, deps.fallback_tier, synthesis_tx);

        let session = Self {
            config,
            state: state.clone(),
            snapshot: snapshot.clone(),
            notice_tx: notice_tx.clone(),
            command_rx,
            engine: deps.engine,
            recognition_rx: deps.recognition_rx,
            speaker,
            synthesis_rx,
            chat: deps.chat,
            catalog: deps.catalog,
            chat_tx,
            chat_rx,
            tracker: suara_stt::TranscriptTracker::new(),
            messages: Vec::new(),
            pending_utterance: None,
            settle_deadline: None,
            retry_deadline: None,
            retry_attempts: 0,
            episode: 0,
            expected_narration: None,
        };

        let join = tokio::spawn(session.run());
        crate::SessionHandle::new(command_tx, snapshot, state, notice_tx, join)
    }

    async fn run(mut self) {
        info!(target: "session", "Voice session loop started");
        loop {
            let settle = self.settle_deadline;
            let retry = self.retry_deadline;

            tokio::select! {
                cmd = self.command_rx.recv() => {
                    match cmd {
                        None | Some(Command::Shutdown) => break,
                        Some(cmd) => self.handle_command(cmd).await,
                    }
                }
                Some(event) = self.recognition_rx.recv() => {
                    self.handle_recognition(event).await;
                }
                Some(event) = self.synthesis_rx.recv() => {
                    self.handle_synthesis(event);
                }
                Some((episode, outcome)) = self.chat_rx.recv() => {
                    self.handle_chat_outcome(episode, outcome);
                }
                _ = async { sleep_until(settle.unwrap()).await }, if settle.is_some() => {
                    self.handle_settle_fired().await;
                }
                _ = async { sleep_until(retry.unwrap()).await }, if retry.is_some() => {
                    self.handle_retry_fired().await;
                }
            }
        }
        self.teardown().await;
        info!(target: "session", "Voice session loop stopped");
    }

    // ─── Commands ───────────────────────────────────────────────────

    async fn handle_command(&mut self, cmd: Command) {
        match cmd {
            Command::Start => self.start_listening().await,
            Command::Stop => self.stop_listening().await,
            Command::Speak(text) => self.speak(text),
            Command::StopSpeaking => self.stop_speaking(),
            Command::Greet => self.speak(self.config.greeting.clone()),
            Command::SetModel(id) => self.set_model(id),
            // Intercepted by the run loop before dispatch.
            Command::Shutdown => {}
        }
    }

    async fn start_listening(&mut self) {
        if self.state.current() != SessionState::Idle {
            debug!(target: "session", "start ignored: session not idle");
            return;
        }
        if !self.engine.is_available() {
            debug!(target: "session", "start ignored: recognition unavailable");
            return;
        }

        self.episode += 1;
        self.tracker.reset();
        self.pending_utterance = None;
        self.settle_deadline = None;
        self.retry_deadline = None;
        self.retry_attempts = 0;
        {
            let mut snap = self.snapshot.write();
            snap.transcript.clear();
            snap.response.clear();
            snap.network_error = false;
        }

        // Mark listening before starting the engine, so events that fire
        // immediately find the session already in the listening state.
        self.transition(SessionState::Listening);
        if let Err(e) = self.engine.start().await {
            warn!(target: "session", "Recognition start failed: {}", e);
            self.return_to_idle();
            self.notify_error(format!("Pengenalan suara gagal dimulai: {e}"));
        }
    }

    async fn stop_listening(&mut self) {
        // Valid from any state: cancel both deadlines, stop the adapter,
        // drop any narration, force idle.
        self.episode += 1;
        self.settle_deadline = None;
        self.retry_deadline = None;
        self.retry_attempts = 0;
        self.pending_utterance = None;
        self.engine.stop().await;
        self.speaker.stop();
        self.expected_narration = None;
        self.snapshot.write().network_error = false;
        self.state.force_idle();
        self.sync_state();
    }

    fn speak(&mut self, text: String) {
        let clean = normalize_for_speech(&text);
        if clean.is_empty() {
            return;
        }
        self.snapshot.write().response = text;
        let narration_id = self.speaker.speak(clean);
        self.expected_narration = Some(narration_id);
    }

    fn stop_speaking(&mut self) {
        self.speaker.stop();
        self.expected_narration = None;
        if self.state.current() == SessionState::Speaking {
            self.state.force_idle();
            self.sync_state();
        }
    }

    fn set_model(&mut self, id: String) {
        if self.catalog.resolve(&id).is_none() {
            warn!(target: "session", "Unknown model id '{}' ignored", id);
            return;
        }
        debug!(target: "session", "Model selection -> {} (next utterance)", id);
        self.snapshot.write().current_model = id;
    }

    // ─── Recognition ────────────────────────────────────────────────

    async fn handle_recognition(&mut self, event: RecognitionEvent) {
        match event {
            RecognitionEvent::Result { results } => {
                if self.state.current() != SessionState::Listening {
                    return;
                }
                // A result after a network retry means recognition
                // recovered; a pending restart deadline must die with the
                // counter or it would stop/start the engine mid-episode.
                if self.retry_attempts > 0 {
                    self.reset_retry();
                }

                let update = self.tracker.absorb(&results);
                self.snapshot.write().transcript = update.display;
                if update.committed_changed {
                    self.pending_utterance = Some(self.tracker.committed().to_string());
                    // Arming replaces any pending settle deadline.
                    self.settle_deadline = Some(Instant::now() + self.config.settle_quiet);
                }
            }
            RecognitionEvent::SpeechStart => {
                if self.state.current() == SessionState::Listening
                    && self.settle_deadline.take().is_some()
                {
                    debug!(target: "session", "Speech resumed; settle timer cancelled");
                }
            }
            RecognitionEvent::Error(err) => self.handle_recognition_error(err).await,
            RecognitionEvent::Ended => {
                if self.state.current() == SessionState::Listening
                    && self.settle_deadline.is_none()
                    && self.retry_deadline.is_none()
                {
                    debug!(target: "session", "Engine ended with nothing pending");
                    self.reset_retry();
                    self.return_to_idle();
                }
            }
        }
    }

    async fn handle_recognition_error(&mut self, err: RecognitionError) {
        if err.is_ignorable() {
            debug!(target: "session", "Ignoring recognition error: {}", err.message());
            return;
        }
        if self.state.current() != SessionState::Listening {
            return;
        }

        if err.is_transient() && self.retry_attempts < self.config.max_network_retries {
            self.retry_attempts += 1;
            self.snapshot.write().network_error = true;
            let delay = self.config.retry_base_delay * u32::from(self.retry_attempts);
            warn!(
                target: "session",
                "Recognition network error; retry {}/{} in {:?}",
                self.retry_attempts,
                self.config.max_network_retries,
                delay
            );
            self.retry_deadline = Some(Instant::now() + delay);
            return;
        }

        // Terminal: retry bound exceeded or a non-transient error.
        warn!(target: "session", "Terminal recognition error: {}", err.message());
        self.reset_retry();
        self.settle_deadline = None;
        self.pending_utterance = None;
        self.engine.stop().await;
        self.return_to_idle();
        self.notify_error(format!("Pengenalan suara berhenti: {}", err.message()));
    }

    async fn handle_retry_fired(&mut self) {
        self.retry_deadline = None;
        if self.state.current() != SessionState::Listening {
            // User cancelled while the retry was pending.
            return;
        }
        info!(
            target: "session",
            "Restarting recognition (attempt {})", self.retry_attempts
        );
        // The engine ended itself on the network error; clear its active
        // flag before restarting.
        self.engine.stop().await;
        if let Err(e) = self.engine.start().await {
            warn!(target: "session", "Recognition restart failed: {}", e);
            self.reset_retry();
            self.return_to_idle();
            self.notify_error(format!("Pengenalan suara gagal dimulai ulang: {e}"));
        }
    }

    // ─── Settling and chat ──────────────────────────────────────────

    async fn handle_settle_fired(&mut self) {
        self.settle_deadline = None;
        let Some(utterance) = self.pending_utterance.take() else {
            return;
        };
        let utterance = utterance.trim().to_string();
        if utterance.is_empty() || self.state.current() != SessionState::Listening {
            return;
        }

        info!(target: "session", "Utterance settled ({} chars)", utterance.len());
        self.engine.stop().await;
        if !self.transition(SessionState::Processing) {
            return;
        }

        // History window excludes the utterance being sent; the user
        // message is appended optimistically right after capture.
        let window: Vec<Message> = history_window(&self.messages).to_vec();
        self.messages.push(Message::user(utterance.clone()));
        self.snapshot.write().messages = self.messages.clone();

        let model = self.resolve_current_model();
        let chat = self.chat.clone();
        let chat_tx = self.chat_tx.clone();
        let episode = self.episode;
        tokio::spawn(async move {
            let outcome = chat.send(&utterance, &window, &model).await;
            let _ = chat_tx.send((episode, outcome)).await;
        });
    }

    fn handle_chat_outcome(&mut self, episode: u64, outcome: Result<String, ChatError>) {
        if episode != self.episode {
            debug!(target: "session", "Dropping stale chat outcome");
            return;
        }
        if self.state.current() != SessionState::Processing {
            return;
        }

        match outcome {
            Ok(reply) => {
                self.messages.push(Message::assistant(reply.clone()));
                {
                    let mut snap = self.snapshot.write();
                    snap.messages = self.messages.clone();
                    snap.response = reply.clone();
                }
                let clean = normalize_for_speech(&reply);
                if clean.is_empty() {
                    self.return_to_idle();
                    return;
                }
                let narration_id = self.speaker.speak(clean);
                self.expected_narration = Some(narration_id);
                self.transition(SessionState::Speaking);
            }
            Err(ChatError::QuotaExhausted { detail }) => {
                warn!(target: "session", "Chat quota exhausted: {}", detail);
                self.snapshot.write().response = QUOTA_APOLOGY.to_string();
                self.notify_error(QUOTA_APOLOGY.to_string());
                // The apology is still narrated; idle follows once it ends.
                let narration_id = self.speaker.speak(QUOTA_APOLOGY.to_string());
                self.expected_narration = Some(narration_id);
                self.transition(SessionState::Speaking);
            }
            Err(ChatError::Connection(detail)) => {
                warn!(target: "session", "Chat request failed: {}", detail);
                self.snapshot.write().response = CONNECTION_APOLOGY.to_string();
                self.notify_error(CONNECTION_APOLOGY.to_string());
                self.return_to_idle();
            }
        }
    }

    // ─── Narration ──────────────────────────────────────────────────

    fn handle_synthesis(&mut self, event: SynthesisEvent) {
        let Some(expected) = self.expected_narration else {
            return;
        };
        if event.narration_id() != expected {
            return;
        }

        match event {
            SynthesisEvent::Started { .. } => {
                if self.state.current() != SessionState::Speaking {
                    self.transition(SessionState::Speaking);
                }
            }
            SynthesisEvent::Finished { .. } | SynthesisEvent::Cancelled { .. } => {
                self.expected_narration = None;
                if self.state.current() == SessionState::Speaking {
                    self.return_to_idle();
                }
            }
            SynthesisEvent::Failed { error, .. } => {
                self.expected_narration = None;
                warn!(target: "session", "Narration failed: {}", error);
                self.notify_error("Maaf, suara tidak dapat diputar.".to_string());
                if self.state.current() == SessionState::Speaking {
                    self.return_to_idle();
                }
            }
        }
    }

    // ─── Plumbing ───────────────────────────────────────────────────

    fn resolve_current_model(&self) -> ModelInfo {
        let id = self.snapshot.read().current_model.clone();
        self.catalog
            .resolve(&id)
            .or_else(|| self.catalog.default_model())
            .cloned()
            .unwrap_or(ModelInfo {
                id,
                name: String::new(),
                provider: suara_chat::Provider::Gemini,
                is_free: true,
            })
    }

    fn reset_retry(&mut self) {
        self.retry_attempts = 0;
        self.retry_deadline = None;
        self.snapshot.write().network_error = false;
    }

    fn transition(&mut self, new_state: SessionState) -> bool {
        let ok = self.state.transition(new_state);
        if ok {
            self.sync_state();
        }
        ok
    }

    fn return_to_idle(&mut self) {
        self.state.force_idle();
        self.sync_state();
    }

    fn sync_state(&mut self) {
        self.snapshot.write().state = self.state.current();
    }

    fn notify_error(&self, message: String) {
        let _ = self.notice_tx.send(SessionNotice::Error(message));
    }

    /// Idempotent cleanup: clears every deadline, stops the adapter and
    /// any narration, and settles on idle. Running it against an already
    /// torn-down session is a safe no-op.
    async fn teardown(&mut self) {
        self.settle_deadline = None;
        self.retry_deadline = None;
        self.pending_utterance = None;
        self.reset_retry();
        self.engine.stop().await;
        self.speaker.stop();
        self.expected_narration = None;
        self.state.force_idle();
        self.sync_state();
    }
}
