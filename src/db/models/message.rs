use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::mood::EmotionKind;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

impl ChatRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatRole::User => "user",
            ChatRole::Assistant => "assistant",
        }
    }
}

/// A chat line, tagged with the emotion on screen when it was written.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: i64,
    pub session_id: String,
    pub timestamp: DateTime<Utc>,
    pub role: ChatRole,
    pub message: String,
    pub emotion_context: Option<EmotionKind>,
}
