//! One persisted classifier observation, with the mood it produced.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::mood::{EmotionKind, MoodState};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EmotionLogEntry {
    pub id: i64,
    pub session_id: String,
    pub timestamp: DateTime<Utc>,
    pub emotion: EmotionKind,
    pub confidence: f32,
    pub mood: MoodState,
}
