//! Emotion vocabulary, mood states and the per-frame sample type.

use std::fmt;
use std::str::FromStr;

use anyhow::{anyhow, Error};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Closed set of labels the classifier can emit.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum EmotionKind {
    Angry,
    Disgust,
    Fear,
    Happy,
    Sad,
    Surprise,
    Neutral,
}

impl EmotionKind {
    pub const ALL: [EmotionKind; 7] = [
        EmotionKind::Angry,
        EmotionKind::Disgust,
        EmotionKind::Fear,
        EmotionKind::Happy,
        EmotionKind::Sad,
        EmotionKind::Surprise,
        EmotionKind::Neutral,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EmotionKind::Angry => "angry",
            EmotionKind::Disgust => "disgust",
            EmotionKind::Fear => "fear",
            EmotionKind::Happy => "happy",
            EmotionKind::Sad => "sad",
            EmotionKind::Surprise => "surprise",
            EmotionKind::Neutral => "neutral",
        }
    }

    pub fn is_negative(&self) -> bool {
        matches!(
            self,
            EmotionKind::Angry | EmotionKind::Sad | EmotionKind::Fear | EmotionKind::Disgust
        )
    }

    pub fn is_positive(&self) -> bool {
        matches!(self, EmotionKind::Happy | EmotionKind::Surprise)
    }
}

impl fmt::Display for EmotionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EmotionKind {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "angry" => Ok(EmotionKind::Angry),
            "disgust" => Ok(EmotionKind::Disgust),
            "fear" => Ok(EmotionKind::Fear),
            "happy" => Ok(EmotionKind::Happy),
            "sad" => Ok(EmotionKind::Sad),
            "surprise" => Ok(EmotionKind::Surprise),
            "neutral" => Ok(EmotionKind::Neutral),
            other => Err(anyhow!("unknown emotion label '{other}'")),
        }
    }
}

/// Smoothed mood derived from the recent emotion window.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum MoodState {
    Up,
    Down,
    #[default]
    Neutral,
}

impl MoodState {
    pub const ALL: [MoodState; 3] = [MoodState::Up, MoodState::Down, MoodState::Neutral];

    pub fn as_str(&self) -> &'static str {
        match self {
            MoodState::Up => "UP",
            MoodState::Down => "DOWN",
            MoodState::Neutral => "NEUTRAL",
        }
    }
}

impl fmt::Display for MoodState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MoodState {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_uppercase().as_str() {
            "UP" => Ok(MoodState::Up),
            "DOWN" => Ok(MoodState::Down),
            "NEUTRAL" => Ok(MoodState::Neutral),
            other => Err(anyhow!("unknown mood state '{other}'")),
        }
    }
}

/// One classified face observation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EmotionSample {
    pub label: EmotionKind,
    /// Classifier confidence in [0, 1]. Display only.
    pub confidence: f32,
    pub timestamp: DateTime<Utc>,
}

impl EmotionSample {
    pub fn new(label: EmotionKind, confidence: f32, timestamp: DateTime<Utc>) -> Self {
        let confidence = if confidence.is_nan() {
            0.0
        } else {
            confidence.clamp(0.0, 1.0)
        };

        Self {
            label,
            confidence,
            timestamp,
        }
    }
}
