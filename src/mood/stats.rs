use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::emotion::{EmotionKind, MoodState};
use super::history::{MoodHistoryEntry, MoodHistoryLog};

/// Aggregates for the history view.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MoodStatistics {
    pub total: usize,
    pub mood_counts: BTreeMap<String, usize>,
    pub emotion_counts: BTreeMap<String, usize>,
    pub dominant_mood: Option<MoodState>,
    pub mean_confidence: Option<f32>,
}

impl MoodStatistics {
    pub fn from_history(history: &MoodHistoryLog) -> Self {
        Self::from_entries(history.iter().map(|e| (e.emotion, e.mood, e.confidence)))
    }

    pub fn from_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (EmotionKind, MoodState, f32)>,
    {
        let mut total = 0usize;
        let mut confidence_sum = 0.0f64;
        let mut per_mood: BTreeMap<MoodState, usize> = BTreeMap::new();
        let mut emotion_counts = BTreeMap::new();

        for (emotion, mood, confidence) in entries {
            total += 1;
            confidence_sum += f64::from(confidence);
            *per_mood.entry(mood).or_insert(0) += 1;
            *emotion_counts.entry(emotion.as_str().to_string()).or_insert(0) += 1;
        }

        // First mood in ALL order wins a tie.
        let mut dominant_mood = None;
        let mut best = 0;
        for mood in MoodState::ALL {
            let count = per_mood.get(&mood).copied().unwrap_or(0);
            if count > best {
                best = count;
                dominant_mood = Some(mood);
            }
        }

        let mood_counts = per_mood
            .into_iter()
            .map(|(mood, count)| (mood.as_str().to_string(), count))
            .collect();

        Self {
            total,
            mood_counts,
            emotion_counts,
            dominant_mood,
            mean_confidence: (total > 0).then(|| (confidence_sum / total as f64) as f32),
        }
    }
}

/// The `n` most recent entries, oldest first, for a table view.
pub fn recent_entries(history: &MoodHistoryLog, n: usize) -> Vec<MoodHistoryEntry> {
    history.last_n(n).copied().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn log_of(items: &[(EmotionKind, MoodState)]) -> MoodHistoryLog {
        let mut log = MoodHistoryLog::default();
        for (emotion, mood) in items {
            log.push(MoodHistoryEntry {
                emotion: *emotion,
                mood: *mood,
                confidence: 0.5,
                timestamp: Utc::now(),
            });
        }
        log
    }

    #[test]
    fn recent_entries_are_the_tail_in_order() {
        let log = log_of(&[
            (EmotionKind::Sad, MoodState::Down),
            (EmotionKind::Neutral, MoodState::Neutral),
            (EmotionKind::Happy, MoodState::Up),
        ]);

        let tail: Vec<MoodState> = recent_entries(&log, 2).iter().map(|e| e.mood).collect();
        assert_eq!(tail, vec![MoodState::Neutral, MoodState::Up]);
        assert_eq!(recent_entries(&log, 10).len(), 3);
        assert!(recent_entries(&MoodHistoryLog::default(), 5).is_empty());
    }

    #[test]
    fn empty_history_has_no_dominant_mood() {
        let stats = MoodStatistics::from_history(&MoodHistoryLog::default());
        assert_eq!(stats.total, 0);
        assert_eq!(stats.dominant_mood, None);
        assert_eq!(stats.mean_confidence, None);
    }

    #[test]
    fn counts_moods_and_emotions() {
        let log = log_of(&[
            (EmotionKind::Sad, MoodState::Down),
            (EmotionKind::Sad, MoodState::Down),
            (EmotionKind::Happy, MoodState::Neutral),
        ]);
        let stats = MoodStatistics::from_history(&log);

        assert_eq!(stats.total, 3);
        assert_eq!(stats.mood_counts.get("DOWN"), Some(&2));
        assert_eq!(stats.emotion_counts.get("sad"), Some(&2));
        assert_eq!(stats.dominant_mood, Some(MoodState::Down));
        assert_eq!(stats.mean_confidence, Some(0.5));
    }

    #[test]
    fn ties_resolve_in_declaration_order() {
        let log = log_of(&[
            (EmotionKind::Neutral, MoodState::Neutral),
            (EmotionKind::Happy, MoodState::Up),
        ]);
        assert_eq!(MoodStatistics::from_history(&log).dominant_mood, Some(MoodState::Up));
    }
}
