//! End-to-end session scenarios driven through scripted collaborators.
//!
//! Time is virtual (`start_paused`), so the 2500ms settle window and the
//! 1000/2000/3000ms retry ladder are exercised exactly.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use suara_chat::{ChatBackend, ChatError, Message, ModelCatalog, ModelInfo, Role};
use suara_foundation::SessionState;
use suara_session::{
    SessionConfig, SessionDeps, SessionHandle, VoiceSession, CONNECTION_APOLOGY, GREETING,
    QUOTA_APOLOGY,
};
use suara_stt::{
    RecognitionError, RecognitionEvent, RecognitionResult, ScriptedEngine, ScriptedHandle,
};
use suara_tts::{NarrationTier, TtsError, TtsResult};

#[derive(Debug, Clone)]
struct ChatCall {
    utterance: String,
    history: Vec<Message>,
    model_id: String,
}

struct ScriptedChat {
    outcomes: Mutex<VecDeque<Result<String, ChatError>>>,
    calls: Arc<Mutex<Vec<ChatCall>>>,
}

#[async_trait]
impl ChatBackend for ScriptedChat {
    async fn send(
        &self,
        utterance: &str,
        history: &[Message],
        model: &ModelInfo,
    ) -> Result<String, ChatError> {
        self.calls.lock().unwrap().push(ChatCall {
            utterance: utterance.to_string(),
            history: history.to_vec(),
            model_id: model.id.clone(),
        });
        self.outcomes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok("Hai!".to_string()))
    }
}

struct RecordingTier {
    narrated: Arc<Mutex<Vec<String>>>,
    delay: Duration,
    fail: bool,
}

#[async_trait]
impl NarrationTier for RecordingTier {
    fn name(&self) -> &'static str {
        "recording"
    }

    async fn narrate(&self, text: &str) -> TtsResult<()> {
        self.narrated.lock().unwrap().push(text.to_string());
        tokio::time::sleep(self.delay).await;
        if self.fail {
            Err(TtsError::SynthesisError("scripted".to_string()))
        } else {
            Ok(())
        }
    }
}

struct Harness {
    handle: SessionHandle,
    engine: ScriptedHandle,
    chat_calls: Arc<Mutex<Vec<ChatCall>>>,
    narrated: Arc<Mutex<Vec<String>>>,
}

fn build(
    available: bool,
    outcomes: Vec<Result<String, ChatError>>,
    narration_delay: Duration,
) -> Harness {
    let (engine, engine_handle, recognition_rx) = ScriptedEngine::new(available);
    let chat_calls = Arc::new(Mutex::new(Vec::new()));
    let narrated = Arc::new(Mutex::new(Vec::new()));

    let chat = Arc::new(ScriptedChat {
        outcomes: Mutex::new(outcomes.into()),
        calls: chat_calls.clone(),
    });
    let primary = Arc::new(RecordingTier {
        narrated: narrated.clone(),
        delay: narration_delay,
        fail: false,
    });
    let fallback = Arc::new(RecordingTier {
        narrated: narrated.clone(),
        delay: Duration::ZERO,
        fail: false,
    });

    let handle = VoiceSession::spawn(
        SessionDeps {
            engine: Box::new(engine),
            recognition_rx,
            chat,
            catalog: ModelCatalog::default(),
            primary_tier: primary,
            fallback_tier: fallback,
        },
        SessionConfig::default(),
    );

    Harness {
        handle,
        engine: engine_handle,
        chat_calls,
        narrated,
    }
}

async fn wait_for_state(handle: &SessionHandle, state: SessionState) {
    for _ in 0..500 {
        if handle.state() == state {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("session never reached {state}, stuck at {}", handle.state());
}

fn finalized(text: &str) -> RecognitionEvent {
    RecognitionEvent::Result {
        results: vec![RecognitionResult::finalized(text)],
    }
}

#[tokio::test(start_paused = true)]
async fn happy_path_full_round_trip() {
    let h = build(true, vec![Ok("Hai!".to_string())], Duration::from_millis(50));
    let mut states = h.handle.subscribe_state();

    h.handle.start_listening().await;
    wait_for_state(&h.handle, SessionState::Listening).await;
    h.engine.emit(finalized("halo")).await;

    // Nothing submits before the quiet interval fully elapses.
    tokio::time::sleep(Duration::from_millis(2400)).await;
    assert!(h.chat_calls.lock().unwrap().is_empty());

    tokio::time::sleep(Duration::from_millis(200)).await;
    wait_for_state(&h.handle, SessionState::Idle).await;

    let calls = h.chat_calls.lock().unwrap().clone();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].utterance, "halo");
    assert!(calls[0].history.is_empty());

    let snapshot = h.handle.snapshot();
    assert_eq!(snapshot.messages.len(), 2);
    assert_eq!(snapshot.messages[0].role, Role::User);
    assert_eq!(snapshot.messages[0].content, "halo");
    assert_eq!(snapshot.messages[1].role, Role::Assistant);
    assert_eq!(snapshot.messages[1].content, "Hai!");
    assert_eq!(snapshot.response, "Hai!");
    assert_eq!(h.narrated.lock().unwrap().as_slice(), ["Hai!"]);

    // Observed state sequence: listening -> processing -> speaking -> idle.
    let mut observed = Vec::new();
    while let Ok(state) = states.try_recv() {
        observed.push(state);
    }
    assert_eq!(
        observed,
        vec![
            SessionState::Listening,
            SessionState::Processing,
            SessionState::Speaking,
            SessionState::Idle,
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn start_is_rejected_unless_idle() {
    let h = build(true, vec![], Duration::ZERO);
    h.handle.start_listening().await;
    wait_for_state(&h.handle, SessionState::Listening).await;
    h.handle.start_listening().await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(h.engine.start_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn unsupported_environment_never_leaves_idle() {
    let h = build(false, vec![], Duration::ZERO);
    assert!(!h.handle.is_supported());
    h.handle.start_listening().await;
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(h.handle.state(), SessionState::Idle);
    assert_eq!(h.engine.start_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn debounce_resubmits_only_the_settled_text() {
    let h = build(true, vec![], Duration::ZERO);
    h.handle.start_listening().await;
    wait_for_state(&h.handle, SessionState::Listening).await;

    h.engine.emit(finalized("saya")).await;
    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert!(h.chat_calls.lock().unwrap().is_empty());

    // Second final segment re-arms the timer; cumulative redelivery of the
    // first slot must not duplicate it.
    h.engine
        .emit(RecognitionEvent::Result {
            results: vec![
                RecognitionResult::finalized("saya"),
                RecognitionResult::finalized("mau makan"),
            ],
        })
        .await;
    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert!(h.chat_calls.lock().unwrap().is_empty());

    tokio::time::sleep(Duration::from_millis(1100)).await;
    let calls = h.chat_calls.lock().unwrap().clone();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].utterance, "saya mau makan");
}

#[tokio::test(start_paused = true)]
async fn speech_resume_cancels_the_settle_timer() {
    let h = build(true, vec![], Duration::ZERO);
    h.handle.start_listening().await;
    wait_for_state(&h.handle, SessionState::Listening).await;

    h.engine.emit(finalized("saya")).await;
    tokio::time::sleep(Duration::from_millis(1000)).await;
    h.engine.emit(RecognitionEvent::SpeechStart).await;

    // Well past the original deadline: nothing submits, the committed
    // accumulator is retained, and the session keeps listening.
    tokio::time::sleep(Duration::from_millis(4000)).await;
    assert!(h.chat_calls.lock().unwrap().is_empty());
    assert_eq!(h.handle.state(), SessionState::Listening);
    assert_eq!(h.handle.snapshot().transcript, "saya");

    h.engine
        .emit(RecognitionEvent::Result {
            results: vec![
                RecognitionResult::finalized("saya"),
                RecognitionResult::finalized("lapar"),
            ],
        })
        .await;
    tokio::time::sleep(Duration::from_millis(2600)).await;
    let calls = h.chat_calls.lock().unwrap().clone();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].utterance, "saya lapar");
}

#[tokio::test(start_paused = true)]
async fn interim_results_update_the_display_transcript() {
    let h = build(true, vec![], Duration::ZERO);
    h.handle.start_listening().await;
    wait_for_state(&h.handle, SessionState::Listening).await;

    h.engine
        .emit(RecognitionEvent::Result {
            results: vec![RecognitionResult::interim("hal")],
        })
        .await;
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(h.handle.snapshot().transcript, "hal");

    h.engine
        .emit(RecognitionEvent::Result {
            results: vec![
                RecognitionResult::finalized("halo"),
                RecognitionResult::interim("apa"),
            ],
        })
        .await;
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(h.handle.snapshot().transcript, "halo apa");
}

#[tokio::test(start_paused = true)]
async fn network_errors_retry_three_times_with_growing_delay() {
    let h = build(true, vec![], Duration::ZERO);
    h.handle.start_listening().await;
    wait_for_state(&h.handle, SessionState::Listening).await;
    assert_eq!(h.engine.start_count(), 1);

    // Attempt 1: restart after 1000ms.
    h.engine
        .emit(RecognitionEvent::Error(RecognitionError::Network))
        .await;
    tokio::time::sleep(Duration::from_millis(900)).await;
    assert_eq!(h.engine.start_count(), 1);
    assert!(h.handle.snapshot().network_error);
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(h.engine.start_count(), 2);

    // Attempt 2: restart after 2000ms.
    h.engine
        .emit(RecognitionEvent::Error(RecognitionError::Network))
        .await;
    tokio::time::sleep(Duration::from_millis(1900)).await;
    assert_eq!(h.engine.start_count(), 2);
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(h.engine.start_count(), 3);

    // Attempt 3: restart after 3000ms.
    h.engine
        .emit(RecognitionEvent::Error(RecognitionError::Network))
        .await;
    tokio::time::sleep(Duration::from_millis(3100)).await;
    assert_eq!(h.engine.start_count(), 4);
    assert_eq!(h.handle.state(), SessionState::Listening);

    // Fourth network error exceeds the bound: terminal.
    h.engine
        .emit(RecognitionEvent::Error(RecognitionError::Network))
        .await;
    wait_for_state(&h.handle, SessionState::Idle).await;
    let snapshot = h.handle.snapshot();
    assert!(!snapshot.network_error);
    assert_eq!(h.engine.start_count(), 4);
}

#[tokio::test(start_paused = true)]
async fn successful_results_reset_the_retry_counter() {
    let h = build(true, vec![], Duration::ZERO);
    h.handle.start_listening().await;
    wait_for_state(&h.handle, SessionState::Listening).await;

    h.engine
        .emit(RecognitionEvent::Error(RecognitionError::Network))
        .await;
    tokio::time::sleep(Duration::from_millis(1100)).await;
    assert_eq!(h.engine.start_count(), 2);

    // Results flowing again clear the flag and the counter.
    h.engine.emit(finalized("halo")).await;
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(!h.handle.snapshot().network_error);

    // The next network error starts over at a 1000ms delay.
    h.engine
        .emit(RecognitionEvent::Error(RecognitionError::Network))
        .await;
    tokio::time::sleep(Duration::from_millis(1100)).await;
    assert_eq!(h.engine.start_count(), 3);
}

#[tokio::test(start_paused = true)]
async fn results_before_the_retry_fires_cancel_the_restart() {
    let h = build(true, vec![], Duration::ZERO);
    h.handle.start_listening().await;
    wait_for_state(&h.handle, SessionState::Listening).await;

    h.engine
        .emit(RecognitionEvent::Error(RecognitionError::Network))
        .await;
    tokio::time::sleep(Duration::from_millis(150)).await;

    // Recognition recovers on its own before the 1000ms restart deadline.
    h.engine.emit(finalized("halo")).await;
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(!h.handle.snapshot().network_error);

    // Well past the original deadline: no stop/start cycle happened.
    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert_eq!(h.engine.start_count(), 1);
    assert_eq!(h.engine.stop_count(), 0);
    assert_eq!(h.handle.state(), SessionState::Listening);
}

#[tokio::test(start_paused = true)]
async fn no_speech_errors_are_ignored() {
    let h = build(true, vec![], Duration::ZERO);
    h.handle.start_listening().await;
    wait_for_state(&h.handle, SessionState::Listening).await;

    h.engine
        .emit(RecognitionEvent::Error(RecognitionError::NoSpeech))
        .await;
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(h.handle.state(), SessionState::Listening);
}

#[tokio::test(start_paused = true)]
async fn terminal_recognition_error_returns_to_idle() {
    let h = build(true, vec![], Duration::ZERO);
    let mut notices = h.handle.subscribe_notices();
    h.handle.start_listening().await;
    wait_for_state(&h.handle, SessionState::Listening).await;

    h.engine
        .emit(RecognitionEvent::Error(RecognitionError::NotAllowed))
        .await;
    wait_for_state(&h.handle, SessionState::Idle).await;
    assert!(notices.try_recv().is_ok());

    // The session is ready to start again.
    h.handle.start_listening().await;
    wait_for_state(&h.handle, SessionState::Listening).await;
}

#[tokio::test(start_paused = true)]
async fn engine_end_with_nothing_pending_returns_to_idle() {
    let h = build(true, vec![], Duration::ZERO);
    h.handle.start_listening().await;
    wait_for_state(&h.handle, SessionState::Listening).await;

    h.engine.emit(RecognitionEvent::Ended).await;
    wait_for_state(&h.handle, SessionState::Idle).await;
}

#[tokio::test(start_paused = true)]
async fn engine_end_with_settle_pending_still_submits() {
    let h = build(true, vec![Ok("Baik.".to_string())], Duration::ZERO);
    h.handle.start_listening().await;
    wait_for_state(&h.handle, SessionState::Listening).await;

    h.engine.emit(finalized("tolong bantu")).await;
    h.engine.emit(RecognitionEvent::Ended).await;
    tokio::time::sleep(Duration::from_millis(2600)).await;

    let calls = h.chat_calls.lock().unwrap().clone();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].utterance, "tolong bantu");
}

#[tokio::test(start_paused = true)]
async fn quota_exhaustion_narrates_the_dedicated_apology() {
    let h = build(
        true,
        vec![Err(ChatError::QuotaExhausted {
            detail: "quota exceeded".to_string(),
        })],
        Duration::from_millis(50),
    );
    let mut notices = h.handle.subscribe_notices();

    h.handle.start_listening().await;
    wait_for_state(&h.handle, SessionState::Listening).await;
    h.engine.emit(finalized("halo")).await;
    tokio::time::sleep(Duration::from_millis(2600)).await;

    wait_for_state(&h.handle, SessionState::Idle).await;
    assert_eq!(h.handle.snapshot().response, QUOTA_APOLOGY);
    assert_eq!(h.narrated.lock().unwrap().as_slice(), [QUOTA_APOLOGY]);
    let suara_session::SessionNotice::Error(msg) = notices.try_recv().unwrap();
    assert_eq!(msg, QUOTA_APOLOGY);
}

#[tokio::test(start_paused = true)]
async fn connection_failure_apologizes_without_narration() {
    let h = build(
        true,
        vec![Err(ChatError::Connection("dns failure".to_string()))],
        Duration::ZERO,
    );
    h.handle.start_listening().await;
    wait_for_state(&h.handle, SessionState::Listening).await;
    h.engine.emit(finalized("halo")).await;
    tokio::time::sleep(Duration::from_millis(2600)).await;

    wait_for_state(&h.handle, SessionState::Idle).await;
    let snapshot = h.handle.snapshot();
    assert_eq!(snapshot.response, CONNECTION_APOLOGY);
    // The raw error never reaches narration.
    assert!(h.narrated.lock().unwrap().is_empty());
    // The optimistic user message is retained; no assistant entry.
    assert_eq!(snapshot.messages.len(), 1);
    assert_eq!(snapshot.messages[0].role, Role::User);
}

#[tokio::test(start_paused = true)]
async fn greet_speaks_without_touching_history() {
    let h = build(true, vec![], Duration::from_millis(50));
    h.handle.greet().await;
    wait_for_state(&h.handle, SessionState::Speaking).await;
    wait_for_state(&h.handle, SessionState::Idle).await;
    assert_eq!(h.narrated.lock().unwrap().as_slice(), [GREETING]);
    assert!(h.handle.snapshot().messages.is_empty());
}

#[tokio::test(start_paused = true)]
async fn stop_speaking_forces_idle_immediately() {
    let h = build(true, vec![], Duration::from_secs(60));
    h.handle.greet().await;
    wait_for_state(&h.handle, SessionState::Speaking).await;
    h.handle.stop_speaking().await;
    wait_for_state(&h.handle, SessionState::Idle).await;
}

#[tokio::test(start_paused = true)]
async fn stop_cancels_a_pending_settle_timer() {
    let h = build(true, vec![], Duration::ZERO);
    h.handle.start_listening().await;
    wait_for_state(&h.handle, SessionState::Listening).await;

    h.engine.emit(finalized("halo")).await;
    tokio::time::sleep(Duration::from_millis(1000)).await;
    h.handle.stop_listening().await;
    wait_for_state(&h.handle, SessionState::Idle).await;

    tokio::time::sleep(Duration::from_millis(5000)).await;
    assert!(h.chat_calls.lock().unwrap().is_empty());
    assert!(!h.engine.is_active());
}

#[tokio::test(start_paused = true)]
async fn model_selection_takes_effect_on_the_next_utterance() {
    let h = build(true, vec![Ok("Ok".to_string()), Ok("Ok".to_string())], Duration::ZERO);
    h.handle.set_current_model("deepseek/deepseek-chat").await;
    h.handle.set_current_model("model-that-does-not-exist").await;
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(h.handle.snapshot().current_model, "deepseek/deepseek-chat");

    h.handle.start_listening().await;
    wait_for_state(&h.handle, SessionState::Listening).await;
    h.engine.emit(finalized("halo")).await;
    tokio::time::sleep(Duration::from_millis(2600)).await;
    wait_for_state(&h.handle, SessionState::Idle).await;

    let calls = h.chat_calls.lock().unwrap().clone();
    assert_eq!(calls[0].model_id, "deepseek/deepseek-chat");
}

#[tokio::test(start_paused = true)]
async fn double_shutdown_is_harmless() {
    let h = build(true, vec![], Duration::ZERO);
    h.handle.start_listening().await;
    wait_for_state(&h.handle, SessionState::Listening).await;
    h.engine.emit(finalized("halo")).await;

    h.handle.shutdown().await;
    h.handle.shutdown().await;

    assert!(!h.engine.is_active());
    assert_eq!(h.handle.state(), SessionState::Idle);

    // Actions after teardown degrade to no-ops.
    h.handle.start_listening().await;
    assert_eq!(h.handle.state(), SessionState::Idle);

    // The cancelled settle timer never fires into the torn-down session.
    tokio::time::sleep(Duration::from_millis(5000)).await;
    assert!(h.chat_calls.lock().unwrap().is_empty());
}
