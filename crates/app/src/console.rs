//! Terminal stand-in for a live recognition engine.
//!
//! Each stdin line is treated as one finalized utterance; the engine
//! re-delivers the cumulative result list the way a continuous
//! recognizer does, so the session's transcript tracking and settle
//! debounce behave exactly as they would against real speech. An empty
//! line ends the take.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use suara_stt::{RecognitionEngine, RecognitionEvent, RecognitionResult, SttResult};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

pub struct ConsoleEngine {
    events_tx: mpsc::Sender<RecognitionEvent>,
    active: Arc<AtomicBool>,
    reader: Option<JoinHandle<()>>,
}

impl ConsoleEngine {
    pub fn new() -> (Self, mpsc::Receiver<RecognitionEvent>) {
        let (events_tx, events_rx) = mpsc::channel(64);
        (
            Self {
                events_tx,
                active: Arc::new(AtomicBool::new(false)),
                reader: None,
            },
            events_rx,
        )
    }
}

#[async_trait::async_trait]
impl RecognitionEngine for ConsoleEngine {
    async fn start(&mut self) -> SttResult<()> {
        if self.active.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        let tx = self.events_tx.clone();
        let active = Arc::clone(&self.active);
        self.reader = Some(tokio::spawn(async move {
            let mut lines = BufReader::new(tokio::io::stdin()).lines();
            let mut finals: Vec<RecognitionResult> = Vec::new();
            while let Ok(Some(line)) = lines.next_line().await {
                let line = line.trim().to_string();
                if line.is_empty() {
                    let _ = tx.send(RecognitionEvent::Ended).await;
                    break;
                }
                debug!(target: "console", "Utterance line: {} chars", line.len());
                let _ = tx.send(RecognitionEvent::SpeechStart).await;
                finals.push(RecognitionResult::finalized(line));
                if tx
                    .send(RecognitionEvent::Result {
                        results: finals.clone(),
                    })
                    .await
                    .is_err()
                {
                    break;
                }
            }
            active.store(false, Ordering::SeqCst);
        }));
        Ok(())
    }

    async fn stop(&mut self) {
        if let Some(reader) = self.reader.take() {
            reader.abort();
        }
        self.active.store(false, Ordering::SeqCst);
    }

    fn is_available(&self) -> bool {
        true
    }
}
