//! WAV playback for audio fetched from the narration service.

use async_trait::async_trait;
use std::process::Stdio;
use suara_tts::{AudioSink, TtsError, TtsResult};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, warn};

/// Pipes WAV bytes into `aplay`. When no player binary exists the sink
/// degrades to discarding audio so the session still runs headless.
pub struct AplaySink {
    command: Option<String>,
}

impl AplaySink {
    pub async fn new() -> Self {
        let command = Self::resolve_command().await;
        if command.is_none() {
            warn!(target: "playback", "No audio player found; narration will be silent");
        }
        Self { command }
    }

    async fn resolve_command() -> Option<String> {
        for candidate in ["aplay", "paplay"] {
            let probe = Command::new(candidate)
                .arg("--version")
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .status()
                .await;
            if matches!(probe, Ok(status) if status.success()) {
                return Some(candidate.to_string());
            }
        }
        None
    }
}

#[async_trait]
impl AudioSink for AplaySink {
    async fn play(&self, audio: Vec<u8>) -> TtsResult<()> {
        let Some(command) = &self.command else {
            debug!(target: "playback", "Discarding {} audio bytes", audio.len());
            return Ok(());
        };
        let mut child = Command::new(command)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()?;
        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(&audio).await?;
            stdin.shutdown().await?;
        }
        let status = child.wait().await?;
        if !status.success() {
            return Err(TtsError::AudioError(format!(
                "{command} exited with {status}"
            )));
        }
        Ok(())
    }
}
