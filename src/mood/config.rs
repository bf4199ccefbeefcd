use chrono::Duration;
use serde::{Deserialize, Serialize};

use super::emotion::MoodState;

/// Window size and vote thresholds for the mood smoother.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct SmootherConfig {
    /// Number of recent samples that vote on the mood
    pub capacity: usize,

    /// Negative share that must be exceeded (strictly) for DOWN
    pub down_threshold: f64,

    /// Positive share that must be exceeded (strictly) for UP
    pub up_threshold: f64,
}

impl Default for SmootherConfig {
    fn default() -> Self {
        Self {
            capacity: 10,
            down_threshold: 0.6,
            up_threshold: 0.5,
        }
    }
}

/// What the magnitude handed to the message table means.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum DurationMode {
    /// Number of target-mood entries in the whole history log. Labelled "minutes" in
    /// the message text even though it counts samples.
    #[default]
    SampleCount,
    /// Whole minutes since the oldest target-mood entry still in the history log.
    WallClockMinutes,
}

/// Trigger rules for a proactive notification.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct NotificationConfig {
    pub target: MoodState,

    /// Stored as the notification's kind column
    pub kind: String,

    /// Trailing entries inspected, also the minimum history length
    pub window: usize,

    /// Entries within the window that must carry the target mood
    pub min_matches: usize,

    pub cooldown_secs: i64,

    pub duration_mode: DurationMode,
}

impl NotificationConfig {
    pub fn cooldown(&self) -> Duration {
        Duration::seconds(self.cooldown_secs)
    }

    /// The UP-trend variant. Same scaffolding, different target and kind.
    pub fn celebration() -> Self {
        Self {
            target: MoodState::Up,
            kind: "mood_celebration".into(),
            ..Self::default()
        }
    }
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            target: MoodState::Down,
            kind: "mood_alert".into(),
            window: 5,
            min_matches: 4,
            cooldown_secs: 300,
            duration_mode: DurationMode::SampleCount,
        }
    }
}
