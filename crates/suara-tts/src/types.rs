//! Core types for speech synthesis

use serde::{Deserialize, Serialize};

/// Narration configuration shared by both tiers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NarrationConfig {
    /// Language code passed to the synthesis backend (e.g. "id")
    pub lang: String,
    /// Speak slowly
    pub slow: bool,
    /// Preferred voice; when unset the local tier picks one whose locale
    /// tag matches `lang`
    pub voice: Option<String>,
    /// Speaking rate in words per minute for the local tier
    pub speech_rate: u32,
}

impl Default for NarrationConfig {
    fn default() -> Self {
        Self {
            lang: "id".to_string(),
            slow: false,
            voice: None,
            speech_rate: 180,
        }
    }
}

/// Voice information reported by the local engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoiceInfo {
    /// Engine voice identifier
    pub id: String,
    /// Human-readable name
    pub name: String,
    /// Language tag (e.g. "id", "en-US")
    pub language: String,
}
