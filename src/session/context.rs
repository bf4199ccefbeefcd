use crate::mood::{
    EmotionKind, EmotionSample, MoodHistoryEntry, MoodHistoryLog, MoodSmoother, MoodState,
    Notification, NotificationMessages, NotificationPolicy,
};
use crate::settings::AppSettings;

/// Result of feeding one sample into a session.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub mood: MoodState,
    pub previous_mood: MoodState,
    pub mood_changed: bool,
    pub notifications: Vec<Notification>,
}

/// Per-user mood state. One instance per camera stream; never shared between streams.
#[derive(Debug, Clone)]
pub struct MoodSession {
    smoother: MoodSmoother,
    history: MoodHistoryLog,
    alert: NotificationPolicy,
    celebration: Option<NotificationPolicy>,
    current_emotion: Option<EmotionSample>,
    current_mood: MoodState,
}

impl Default for MoodSession {
    fn default() -> Self {
        Self::new(&AppSettings::default())
    }
}

impl MoodSession {
    pub fn new(settings: &AppSettings) -> Self {
        let celebration = settings.celebrate_up.then(|| {
            let mut config = settings.celebration.clone();
            config.target = MoodState::Up;
            NotificationPolicy::new(config)
        });

        Self {
            smoother: MoodSmoother::new(settings.smoother.clone()),
            history: MoodHistoryLog::with_capacity(settings.history_capacity),
            alert: NotificationPolicy::new(settings.alert.clone()),
            celebration,
            current_emotion: None,
            current_mood: MoodState::Neutral,
        }
    }

    /// Push a sample, recompute the mood, log it, then give each policy a chance to fire.
    ///
    /// The sample timestamp doubles as "now" for cooldowns, so replayed feeds behave the
    /// same as live ones.
    pub fn observe<M>(&mut self, sample: EmotionSample, messages: &M) -> Observation
    where
        M: NotificationMessages + ?Sized,
    {
        self.smoother.push(sample);
        let mood = self.smoother.current_mood();

        self.history.push(MoodHistoryEntry {
            emotion: sample.label,
            mood,
            confidence: sample.confidence,
            timestamp: sample.timestamp,
        });

        let previous_mood = self.current_mood;
        self.current_mood = mood;
        self.current_emotion = Some(sample);

        let now = sample.timestamp;
        let mut notifications = Vec::new();
        if let Some(fired) = self.alert.check(&self.history, mood, now, messages) {
            notifications.push(fired);
        }
        if let Some(policy) = self.celebration.as_mut() {
            if let Some(fired) = policy.check(&self.history, mood, now, messages) {
                notifications.push(fired);
            }
        }

        Observation {
            mood,
            previous_mood,
            mood_changed: previous_mood != mood,
            notifications,
        }
    }

    pub fn current_mood(&self) -> MoodState {
        self.current_mood
    }

    pub fn current_emotion(&self) -> Option<EmotionKind> {
        self.current_emotion.map(|sample| sample.label)
    }

    pub fn history(&self) -> &MoodHistoryLog {
        &self.history
    }

    pub fn smoother(&self) -> &MoodSmoother {
        &self.smoother
    }
}
