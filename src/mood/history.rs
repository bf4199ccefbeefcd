use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::emotion::{EmotionKind, MoodState};

pub const DEFAULT_HISTORY_CAPACITY: usize = 100;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MoodHistoryEntry {
    pub emotion: EmotionKind,
    pub mood: MoodState,
    pub confidence: f32,
    pub timestamp: DateTime<Utc>,
}

/// Longer rolling log kept by the session for trend detection and the history view.
#[derive(Debug, Clone)]
pub struct MoodHistoryLog {
    entries: VecDeque<MoodHistoryEntry>,
    capacity: usize,
}

impl Default for MoodHistoryLog {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_HISTORY_CAPACITY)
    }
}

impl MoodHistoryLog {
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, entry: MoodHistoryEntry) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &MoodHistoryEntry> + ExactSizeIterator {
        self.entries.iter()
    }

    /// The most recent `n` entries in append order.
    pub fn last_n(&self, n: usize) -> impl Iterator<Item = &MoodHistoryEntry> {
        let skip = self.entries.len().saturating_sub(n);
        self.entries.iter().skip(skip)
    }

    pub fn latest(&self) -> Option<&MoodHistoryEntry> {
        self.entries.back()
    }
}
