//! Finalized-watermark transcript tracking
//!
//! The recognition engine re-delivers its full cumulative result list on
//! every event. The tracker scans only from the finalized watermark
//! forward, so already-committed segments are never reprocessed no matter
//! how often the engine repeats them.

use crate::types::RecognitionResult;

/// Outcome of absorbing one result event.
#[derive(Debug, Clone, PartialEq)]
pub struct TranscriptUpdate {
    /// Committed text plus the current interim tail, for live display.
    pub display: String,
    /// True when at least one new segment was finalized by this event.
    pub committed_changed: bool,
}

/// Accumulates finalized segments for one listening episode.
#[derive(Debug, Default)]
pub struct TranscriptTracker {
    committed: String,
    finalized_count: usize,
}

impl TranscriptTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset for a new listening episode.
    pub fn reset(&mut self) {
        self.committed.clear();
        self.finalized_count = 0;
    }

    /// Committed text so far (finalized segments, space-joined, in order).
    pub fn committed(&self) -> &str {
        &self.committed
    }

    /// Index below which results are already committed.
    pub fn finalized_count(&self) -> usize {
        self.finalized_count
    }

    /// Absorb one cumulative result list from the engine.
    pub fn absorb(&mut self, results: &[RecognitionResult]) -> TranscriptUpdate {
        let mut committed_changed = false;
        let mut interim = String::new();

        // Scan only past the watermark; everything before it was committed
        // by an earlier delivery of the same list.
        for result in results.iter().skip(self.finalized_count) {
            let transcript = result.best_transcript();
            if result.is_final {
                if !transcript.is_empty() {
                    if !self.committed.is_empty() {
                        self.committed.push(' ');
                    }
                    self.committed.push_str(transcript);
                    committed_changed = true;
                }
                self.finalized_count += 1;
            } else {
                if !interim.is_empty() {
                    interim.push(' ');
                }
                interim.push_str(transcript);
            }
        }

        let display = if interim.is_empty() {
            self.committed.clone()
        } else if self.committed.is_empty() {
            interim
        } else {
            format!("{} {}", self.committed, interim)
        };

        TranscriptUpdate {
            display,
            committed_changed,
        }
    }
}
