//! Scripted recognition engine for tests and demos
//!
//! Replays canned event batches and lets a driver inject events at chosen
//! moments, while tracking start/stop calls so orchestration logic can be
//! asserted against without a real microphone.

use crate::types::RecognitionEvent;
use crate::{RecognitionEngine, SttResult};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Driver-side handle for a [`ScriptedEngine`].
#[derive(Clone)]
pub struct ScriptedHandle {
    events_tx: mpsc::Sender<RecognitionEvent>,
    active: Arc<AtomicBool>,
    starts: Arc<AtomicUsize>,
    stops: Arc<AtomicUsize>,
}

impl ScriptedHandle {
    /// Inject an event as if the engine produced it.
    pub async fn emit(&self, event: RecognitionEvent) {
        let _ = self.events_tx.send(event).await;
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    pub fn start_count(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }

    pub fn stop_count(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }
}

/// Recognition engine that replays scripted event batches.
///
/// Each `start` call replays the next batch from the script (if any);
/// events can also be injected through the [`ScriptedHandle`] at any time.
pub struct ScriptedEngine {
    events_tx: mpsc::Sender<RecognitionEvent>,
    active: Arc<AtomicBool>,
    available: bool,
    starts: Arc<AtomicUsize>,
    stops: Arc<AtomicUsize>,
    script: VecDeque<Vec<RecognitionEvent>>,
}

impl ScriptedEngine {
    /// Build an engine plus its driver handle and event receiver.
    pub fn new(available: bool) -> (Self, ScriptedHandle, mpsc::Receiver<RecognitionEvent>) {
        let (events_tx, events_rx) = mpsc::channel(64);
        let active = Arc::new(AtomicBool::new(false));
        let starts = Arc::new(AtomicUsize::new(0));
        let stops = Arc::new(AtomicUsize::new(0));
        let handle = ScriptedHandle {
            events_tx: events_tx.clone(),
            active: active.clone(),
            starts: starts.clone(),
            stops: stops.clone(),
        };
        (
            Self {
                events_tx,
                active,
                available,
                starts,
                stops,
                script: VecDeque::new(),
            },
            handle,
            events_rx,
        )
    }

    /// Queue event batches; the next `start` call replays the next batch.
    pub fn with_script(mut self, batches: Vec<Vec<RecognitionEvent>>) -> Self {
        self.script = batches.into();
        self
    }
}

#[async_trait::async_trait]
impl RecognitionEngine for ScriptedEngine {
    async fn start(&mut self) -> SttResult<()> {
        if !self.available || self.active.swap(true, Ordering::SeqCst) {
            // Unavailable or already active: silent no-op.
            return Ok(());
        }
        self.starts.fetch_add(1, Ordering::SeqCst);
        if let Some(batch) = self.script.pop_front() {
            for event in batch {
                let _ = self.events_tx.send(event).await;
            }
        }
        Ok(())
    }

    async fn stop(&mut self) {
        if self.active.swap(false, Ordering::SeqCst) {
            self.stops.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn is_available(&self) -> bool {
        self.available
    }
}
