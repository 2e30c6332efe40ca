//! Static model catalog
//!
//! The catalog only carries routing data: which chat backend a model id
//! resolves to. Changing the selected model takes effect on the next
//! utterance, never mid-call.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Gemini,
    OpenRouter,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Gemini => "gemini",
            Provider::OpenRouter => "openrouter",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub id: String,
    pub name: String,
    pub provider: Provider,
    pub is_free: bool,
}

/// Static list of selectable models.
#[derive(Debug, Clone)]
pub struct ModelCatalog {
    models: Vec<ModelInfo>,
}

impl Default for ModelCatalog {
    fn default() -> Self {
        Self {
            models: vec![
                ModelInfo {
                    id: "gemini-2.0-flash".to_string(),
                    name: "Gemini 2.0 Flash".to_string(),
                    provider: Provider::Gemini,
                    is_free: true,
                },
                ModelInfo {
                    id: "gemini-1.5-pro".to_string(),
                    name: "Gemini 1.5 Pro".to_string(),
                    provider: Provider::Gemini,
                    is_free: false,
                },
                ModelInfo {
                    id: "deepseek/deepseek-chat".to_string(),
                    name: "DeepSeek Chat".to_string(),
                    provider: Provider::OpenRouter,
                    is_free: true,
                },
                ModelInfo {
                    id: "meta-llama/llama-3.3-70b-instruct".to_string(),
                    name: "Llama 3.3 70B".to_string(),
                    provider: Provider::OpenRouter,
                    is_free: true,
                },
            ],
        }
    }
}

impl ModelCatalog {
    pub fn new(models: Vec<ModelInfo>) -> Self {
        Self { models }
    }

    pub fn models(&self) -> &[ModelInfo] {
        &self.models
    }

    pub fn resolve(&self, id: &str) -> Option<&ModelInfo> {
        self.models.iter().find(|m| m.id == id)
    }

    /// First catalog entry, the default selection.
    pub fn default_model(&self) -> Option<&ModelInfo> {
        self.models.first()
    }
}
