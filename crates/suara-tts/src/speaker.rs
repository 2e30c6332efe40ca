//! Two-tier speaker with single-narration ownership
//!
//! Owns at most one active narration. `speak` cancels whatever is in
//! flight before starting, tries the primary tier, and silently falls
//! back to the secondary on any failure. Lifecycle events are forwarded
//! over an mpsc channel so the session can track playback state.

use crate::engine::{NarrationTier, SynthesisEvent};
use crate::next_narration_id;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

pub struct Speaker {
    primary: Arc<dyn NarrationTier>,
    fallback: Arc<dyn NarrationTier>,
    events_tx: mpsc::Sender<SynthesisEvent>,
    active: Option<(u64, JoinHandle<()>)>,
}

impl Speaker {
    pub fn new(
        primary: Arc<dyn NarrationTier>,
        fallback: Arc<dyn NarrationTier>,
        events_tx: mpsc::Sender<SynthesisEvent>,
    ) -> Self {
        Self {
            primary,
            fallback,
            events_tx,
            active: None,
        }
    }

    /// Start narrating `text`, cancelling any in-flight narration first.
    /// Returns the narration id whose lifecycle events will follow.
    pub fn speak(&mut self, text: String) -> u64 {
        self.stop();

        let narration_id = next_narration_id();
        let primary = self.primary.clone();
        let fallback = self.fallback.clone();
        let events_tx = self.events_tx.clone();

        let handle = tokio::spawn(async move {
            let _ = events_tx
                .send(SynthesisEvent::Started { narration_id })
                .await;

            match primary.narrate(&text).await {
                Ok(()) => {
                    let _ = events_tx
                        .send(SynthesisEvent::Finished { narration_id })
                        .await;
                }
                Err(primary_err) => {
                    warn!(
                        target: "tts",
                        "Primary tier '{}' failed ({}), falling back to '{}'",
                        primary.name(),
                        primary_err,
                        fallback.name()
                    );
                    match fallback.narrate(&text).await {
                        Ok(()) => {
                            let _ = events_tx
                                .send(SynthesisEvent::Finished { narration_id })
                                .await;
                        }
                        Err(fallback_err) => {
                            let _ = events_tx
                                .send(SynthesisEvent::Failed {
                                    narration_id,
                                    error: format!(
                                        "both tiers failed: {}; {}",
                                        primary_err, fallback_err
                                    ),
                                })
                                .await;
                        }
                    }
                }
            }
        });

        self.active = Some((narration_id, handle));
        narration_id
    }

    /// Cancel the active narration, if any. Never leaves a narration
    /// hanging: the narration task is aborted, which kills any child
    /// process or in-flight request it owns.
    pub fn stop(&mut self) {
        if let Some((narration_id, handle)) = self.active.take() {
            if !handle.is_finished() {
                debug!(target: "tts", "Cancelling narration {}", narration_id);
                handle.abort();
                let _ = self
                    .events_tx
                    .try_send(SynthesisEvent::Cancelled { narration_id });
            }
        }
    }

    /// Whether a narration task is currently alive.
    pub fn is_speaking(&self) -> bool {
        self.active
            .as_ref()
            .is_some_and(|(_, handle)| !handle.is_finished())
    }
}

impl Drop for Speaker {
    fn drop(&mut self) {
        self.stop();
    }
}
