//! On-device narration tier backed by eSpeak
//!
//! Fallback synthesis when the remote service is unreachable, and the
//! synthesis backend for the narration service itself. Shells out to
//! `espeak` / `espeak-ng`; voice selection is best-effort by locale-tag
//! substring match over the engine's enumerable voices.

use crate::engine::NarrationTier;
use crate::error::{TtsError, TtsResult};
use crate::types::{NarrationConfig, VoiceInfo};
use async_trait::async_trait;
use regex::Regex;
use std::path::Path;
use std::process::Stdio;
use std::sync::LazyLock;
use tokio::process::Command;
use tracing::{debug, warn};

// espeak voice list format: Pty Language Age/Gender VoiceName File Other
// Example: 5  id             M  indonesian         (id 5)
static VOICE_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(\d+)\s+([\w-]+)\s+([MF+-]*)\s+([\w\-_]+)\s+").unwrap());

/// eSpeak-backed narrator.
pub struct LocalNarrator {
    config: NarrationConfig,
    command: Option<String>,
    voice: Option<String>,
}

impl LocalNarrator {
    /// Probe for the engine and resolve a voice for the configured locale.
    pub async fn new(config: NarrationConfig) -> Self {
        let command = Self::resolve_command().await;
        if command.is_none() {
            warn!(target: "tts", "No espeak binary found; local narration unavailable");
        }
        let voice = match (&command, &config.voice) {
            (_, Some(explicit)) => Some(explicit.clone()),
            (Some(cmd), None) => Self::pick_voice(cmd, &config.lang).await,
            (None, None) => None,
        };
        Self {
            config,
            command,
            voice,
        }
    }

    pub fn is_available(&self) -> bool {
        self.command.is_some()
    }

    /// Get the espeak command name (espeak or espeak-ng)
    async fn resolve_command() -> Option<String> {
        for candidate in ["espeak-ng", "espeak"] {
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

    /// List the engine's voices.
    pub async fn list_voices(command: &str) -> TtsResult<Vec<VoiceInfo>> {
        let output = Command::new(command).arg("--voices").output().await?;
        let text = String::from_utf8_lossy(&output.stdout);

        let mut voices = Vec::new();
        for line in text.lines().skip(1) {
            if let Some(captures) = VOICE_LINE.captures(line) {
                let language = captures.get(2).map_or("unknown", |m| m.as_str()).to_string();
                let id = captures.get(4).map_or("unknown", |m| m.as_str()).to_string();
                voices.push(VoiceInfo {
                    name: format!("{} ({})", language, id),
                    id,
                    language,
                });
            }
        }
        Ok(voices)
    }

    /// Prefer a voice whose locale tag contains `lang` (e.g. "id" matches
    /// "id" and "id-ID"). Falls back to the bare language code.
    async fn pick_voice(command: &str, lang: &str) -> Option<String> {
        let wanted = lang.to_ascii_lowercase();
        match Self::list_voices(command).await {
            Ok(voices) => voices
                .iter()
                .find(|v| v.language.to_ascii_lowercase().contains(&wanted))
                .map(|v| v.id.clone())
                .or_else(|| Some(wanted)),
            Err(e) => {
                warn!(target: "tts", "Voice enumeration failed: {}", e);
                Some(wanted)
            }
        }
    }

    fn base_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        if let Some(voice) = &self.voice {
            args.push("-v".to_string());
            args.push(voice.clone());
        }
        let rate = if self.config.slow {
            self.config.speech_rate / 2
        } else {
            self.config.speech_rate
        };
        args.push("-s".to_string());
        args.push(rate.to_string());
        args
    }

    /// Synthesize `text` into a WAV file at `path`.
    pub async fn synthesize_to_wav(&self, text: &str, path: &Path) -> TtsResult<()> {
        let command = self
            .command
            .as_ref()
            .ok_or_else(|| TtsError::EngineNotAvailable("espeak not installed".to_string()))?;
        if text.trim().is_empty() {
            return Err(TtsError::InvalidInput("empty text".to_string()));
        }

        let mut args = self.base_args();
        args.push("-w".to_string());
        args.push(path.to_string_lossy().into_owned());
        args.push(text.to_string());

        debug!(target: "tts", "Synthesizing {} chars to {}", text.len(), path.display());
        let status = Command::new(command)
            .args(&args)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .status()
            .await?;

        if !status.success() {
            return Err(TtsError::SynthesisError(format!(
                "{} exited with {}",
                command, status
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl NarrationTier for LocalNarrator {
    fn name(&self) -> &'static str {
        "local"
    }

    async fn narrate(&self, text: &str) -> TtsResult<()> {
        let command = self
            .command
            .as_ref()
            .ok_or_else(|| TtsError::EngineNotAvailable("espeak not installed".to_string()))?;
        if text.trim().is_empty() {
            return Err(TtsError::InvalidInput("empty text".to_string()));
        }

        let mut args = self.base_args();
        args.push(text.to_string());

        // kill_on_drop ties the child to this future, so aborting the
        // narration task stops the audio as well.
        let status = Command::new(command)
            .args(&args)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .status()
            .await?;

        if !status.success() {
            return Err(TtsError::SynthesisError(format!(
                "{} exited with {}",
                command, status
            )));
        }
        Ok(())
    }
}
