use std::collections::VecDeque;

use super::config::SmootherConfig;
use super::emotion::{EmotionSample, MoodState};

/// Majority-style vote over the last `capacity` samples.
///
/// The mood is a pure function of the buffer contents: every sample counts once,
/// confidence is ignored, and an empty buffer is `NEUTRAL`.
#[derive(Debug, Clone)]
pub struct MoodSmoother {
    buffer: VecDeque<EmotionSample>,
    config: SmootherConfig,
}

impl Default for MoodSmoother {
    fn default() -> Self {
        Self::new(SmootherConfig::default())
    }
}

impl MoodSmoother {
    pub fn new(mut config: SmootherConfig) -> Self {
        config.capacity = config.capacity.max(1);
        Self {
            buffer: VecDeque::with_capacity(config.capacity),
            config,
        }
    }

    /// Append a sample, evicting the oldest one first when the window is full.
    pub fn push(&mut self, sample: EmotionSample) {
        if self.buffer.len() == self.config.capacity {
            self.buffer.pop_front();
        }
        self.buffer.push_back(sample);
    }

    pub fn current_mood(&self) -> MoodState {
        if self.buffer.is_empty() {
            return MoodState::Neutral;
        }

        let (negative_ratio, positive_ratio) = self.ratios();

        // Order matters: with a short buffer both ratios can clear their thresholds.
        if negative_ratio > self.config.down_threshold {
            MoodState::Down
        } else if positive_ratio > self.config.up_threshold {
            MoodState::Up
        } else {
            MoodState::Neutral
        }
    }

    /// `(negative_ratio, positive_ratio)` over the current buffer; zeros when empty.
    pub fn ratios(&self) -> (f64, f64) {
        if self.buffer.is_empty() {
            return (0.0, 0.0);
        }

        let total = self.buffer.len() as f64;
        let negative = self.buffer.iter().filter(|s| s.label.is_negative()).count();
        let positive = self.buffer.iter().filter(|s| s.label.is_positive()).count();

        (negative as f64 / total, positive as f64 / total)
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.config.capacity
    }

    /// Oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &EmotionSample> {
        self.buffer.iter()
    }
}
