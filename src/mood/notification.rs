use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::config::{DurationMode, NotificationConfig};
use super::emotion::MoodState;
use super::history::MoodHistoryLog;

/// Text source for proactive alerts. Returning `None` suppresses the alert.
pub trait NotificationMessages {
    fn notification_message(&self, mood: MoodState, magnitude: u32) -> Option<String>;
}

/// A fired alert, ready to be persisted and shown.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub kind: String,
    pub mood: MoodState,
    pub magnitude: u32,
    pub message: String,
    pub fired_at: DateTime<Utc>,
}

/// Decides when a sustained mood deserves a proactive alert, with a cooldown between alerts.
///
/// Pure decision logic. `last_fired_at` only moves when a message was actually produced.
#[derive(Debug, Clone)]
pub struct NotificationPolicy {
    config: NotificationConfig,
    last_fired_at: Option<DateTime<Utc>>,
}

impl Default for NotificationPolicy {
    fn default() -> Self {
        Self::new(NotificationConfig::default())
    }
}

impl NotificationPolicy {
    pub fn new(mut config: NotificationConfig) -> Self {
        config.window = config.window.max(1);
        Self {
            config,
            last_fired_at: None,
        }
    }

    pub fn config(&self) -> &NotificationConfig {
        &self.config
    }

    pub fn last_fired_at(&self) -> Option<DateTime<Utc>> {
        self.last_fired_at
    }

    pub fn check<M>(
        &mut self,
        history: &MoodHistoryLog,
        current_mood: MoodState,
        now: DateTime<Utc>,
        messages: &M,
    ) -> Option<Notification>
    where
        M: NotificationMessages + ?Sized,
    {
        let target = self.config.target;
        if current_mood != target {
            return None;
        }

        if history.len() < self.config.window {
            return None;
        }

        let recent_matches = history
            .last_n(self.config.window)
            .filter(|entry| entry.mood == target)
            .count();
        if recent_matches < self.config.min_matches {
            return None;
        }

        if let Some(last) = self.last_fired_at {
            if now - last <= self.config.cooldown() {
                return None;
            }
        }

        let magnitude = self.magnitude(history, now);
        let message = messages.notification_message(target, magnitude)?;

        self.last_fired_at = Some(now);

        Some(Notification {
            kind: self.config.kind.clone(),
            mood: target,
            magnitude,
            message,
            fired_at: now,
        })
    }

    fn magnitude(&self, history: &MoodHistoryLog, now: DateTime<Utc>) -> u32 {
        let target = self.config.target;
        match self.config.duration_mode {
            DurationMode::SampleCount => {
                history.iter().filter(|entry| entry.mood == target).count() as u32
            }
            DurationMode::WallClockMinutes => history
                .iter()
                .find(|entry| entry.mood == target)
                .map(|first| (now - first.timestamp).num_minutes().max(0) as u32)
                .unwrap_or(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mood::emotion::EmotionKind;
    use crate::mood::history::MoodHistoryEntry;
    use chrono::{Duration, TimeZone};
    use std::cell::RefCell;

    /// Records every request; answers with a fixed reply.
    struct Recorder {
        reply: Option<String>,
        calls: RefCell<Vec<(MoodState, u32)>>,
    }

    impl Recorder {
        fn answering(reply: Option<&str>) -> Self {
            Self {
                reply: reply.map(str::to_string),
                calls: RefCell::new(Vec::new()),
            }
        }
    }

    impl NotificationMessages for Recorder {
        fn notification_message(&self, mood: MoodState, magnitude: u32) -> Option<String> {
            self.calls.borrow_mut().push((mood, magnitude));
            self.reply.clone()
        }
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 10, 14, 0, 0).unwrap()
    }

    fn history(moods: &[MoodState]) -> MoodHistoryLog {
        let mut log = MoodHistoryLog::default();
        for (i, mood) in moods.iter().enumerate() {
            log.push(MoodHistoryEntry {
                emotion: EmotionKind::Sad,
                mood: *mood,
                confidence: 0.8,
                timestamp: t0() + Duration::seconds(i as i64),
            });
        }
        log
    }

    use crate::mood::emotion::MoodState::{Down as D, Neutral as N, Up as U};

    #[test]
    fn needs_five_entries() {
        let mut policy = NotificationPolicy::default();
        let messages = Recorder::answering(Some("alert"));

        assert!(policy.check(&history(&[D, D, D, D]), D, t0(), &messages).is_none());
        assert!(messages.calls.borrow().is_empty());
        assert_eq!(policy.last_fired_at(), None);
    }

    #[test]
    fn only_evaluated_when_current_mood_is_down() {
        let mut policy = NotificationPolicy::default();
        let messages = Recorder::answering(Some("alert"));

        assert!(policy.check(&history(&[D; 6]), N, t0(), &messages).is_none());
        assert!(policy.check(&history(&[D; 6]), U, t0(), &messages).is_none());
        assert!(messages.calls.borrow().is_empty());
    }

    #[test]
    fn three_of_five_is_not_enough() {
        let mut policy = NotificationPolicy::default();
        let messages = Recorder::answering(Some("alert"));

        assert!(policy.check(&history(&[D, D, N, D, N]), D, t0(), &messages).is_none());
    }

    #[test]
    fn four_of_five_fires_and_records_time() {
        let mut policy = NotificationPolicy::default();
        let messages = Recorder::answering(Some("alert"));
        let now = t0() + Duration::minutes(1);

        let fired = policy
            .check(&history(&[D, N, D, D, D]), D, now, &messages)
            .expect("should fire");

        assert_eq!(fired.kind, "mood_alert");
        assert_eq!(fired.mood, MoodState::Down);
        assert_eq!(fired.message, "alert");
        assert_eq!(fired.fired_at, now);
        assert_eq!(policy.last_fired_at(), Some(now));
    }

    #[test]
    fn only_the_last_five_entries_vote() {
        let mut policy = NotificationPolicy::default();
        let messages = Recorder::answering(Some("alert"));

        // Plenty of DOWN overall, but only 3 in the trailing window.
        let log = history(&[D, D, D, D, D, D, N, D, N, D, D]);
        assert!(policy.check(&log, D, t0(), &messages).is_none());
    }

    #[test]
    fn magnitude_counts_all_down_entries_in_history() {
        let mut policy = NotificationPolicy::default();
        let messages = Recorder::answering(Some("alert"));

        let log = history(&[D, D, N, U, D, N, D, D, D, D]);
        let fired = policy.check(&log, D, t0(), &messages).unwrap();

        assert_eq!(fired.magnitude, 7);
        assert_eq!(*messages.calls.borrow(), vec![(MoodState::Down, 7)]);
    }

    #[test]
    fn cooldown_suppresses_then_expires() {
        let mut policy = NotificationPolicy::default();
        let messages = Recorder::answering(Some("alert"));
        let log = history(&[D, D, D, D, N]);
        let first = t0() + Duration::minutes(10);

        assert!(policy.check(&log, D, first, &messages).is_some());

        let one_second_later = first + Duration::seconds(1);
        assert!(policy.check(&log, D, one_second_later, &messages).is_none());
        assert_eq!(policy.last_fired_at(), Some(first));

        let at_boundary = first + Duration::seconds(300);
        assert!(policy.check(&log, D, at_boundary, &messages).is_none());

        let after = first + Duration::seconds(301);
        let fired = policy.check(&log, D, after, &messages);
        assert!(fired.is_some());
        assert_eq!(policy.last_fired_at(), Some(after));
    }

    #[test]
    fn empty_message_leaves_state_untouched() {
        let mut policy = NotificationPolicy::default();
        let silent = Recorder::answering(None);
        let log = history(&[D; 5]);

        assert!(policy.check(&log, D, t0(), &silent).is_none());
        assert_eq!(policy.last_fired_at(), None);
        assert_eq!(silent.calls.borrow().len(), 1);

        // A later successful message is not blocked by a phantom cooldown.
        let loud = Recorder::answering(Some("alert"));
        let now = t0() + Duration::seconds(2);
        assert!(policy.check(&log, D, now, &loud).is_some());
        assert_eq!(policy.last_fired_at(), Some(now));

        // And a suppressed message after firing keeps the earlier timestamp.
        let later = now + Duration::seconds(400);
        assert!(policy.check(&log, D, later, &silent).is_none());
        assert_eq!(policy.last_fired_at(), Some(now));
    }

    #[test]
    fn wall_clock_mode_reports_minutes_since_first_target_entry() {
        let mut policy = NotificationPolicy::new(NotificationConfig {
            duration_mode: DurationMode::WallClockMinutes,
            ..NotificationConfig::default()
        });
        let messages = Recorder::answering(Some("alert"));
        let log = history(&[N, D, D, D, D, D]);

        let fired = policy
            .check(&log, D, t0() + Duration::seconds(1) + Duration::minutes(12), &messages)
            .unwrap();
        assert_eq!(fired.magnitude, 12);
    }

    #[test]
    fn celebration_policy_targets_up() {
        let mut policy = NotificationPolicy::new(NotificationConfig::celebration());
        let messages = Recorder::answering(Some("yay"));

        assert!(policy.check(&history(&[U; 5]), D, t0(), &messages).is_none());
        let fired = policy.check(&history(&[U, U, N, U, U]), U, t0(), &messages).unwrap();
        assert_eq!(fired.kind, "mood_celebration");
        assert_eq!(fired.mood, MoodState::Up);
        assert_eq!(fired.magnitude, 4);
    }
}
