//! Chat completion client and model catalog for Suara
//!
//! One request per settled utterance: the utterance, the resolved provider
//! for the selected model, and a bounded window of conversation history.
//! Failures collapse into two outcomes the session can act on — quota
//! exhaustion (dedicated spoken apology) and everything else (generic
//! connection apology).

pub mod catalog;
pub mod client;
pub mod types;

pub use catalog::{ModelCatalog, ModelInfo, Provider};
pub use client::{is_quota_detail, ChatBackend, ChatError, HttpChatClient, EMPTY_REPLY_FALLBACK};
pub use types::{history_window, Message, Role, HISTORY_WINDOW};
