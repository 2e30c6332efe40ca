//! Conversation history types

use serde::{Deserialize, Serialize};

/// Number of trailing history entries sent as context on each chat call.
pub const HISTORY_WINDOW: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One entry in the append-only conversation log. Retained for the
/// lifetime of the session, never persisted to durable storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// The most recent [`HISTORY_WINDOW`] entries of `history`.
pub fn history_window(history: &[Message]) -> &[Message] {
    let start = history.len().saturating_sub(HISTORY_WINDOW);
    &history[start..]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_of_short_history_is_everything() {
        let history = vec![Message::user("halo"), Message::assistant("hai")];
        assert_eq!(history_window(&history).len(), 2);
    }

    #[test]
    fn window_keeps_only_the_most_recent_entries() {
        let history: Vec<Message> = (0..25).map(|i| Message::user(format!("m{i}"))).collect();
        let window = history_window(&history);
        assert_eq!(window.len(), HISTORY_WINDOW);
        assert_eq!(window[0].content, "m15");
        assert_eq!(window[9].content, "m24");
    }

    #[test]
    fn roles_serialize_lowercase() {
        let json = serde_json::to_string(&Message::user("halo")).unwrap();
        assert_eq!(json, r#"{"role":"user","content":"halo"}"#);
    }
}
