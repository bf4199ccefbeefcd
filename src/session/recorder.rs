use std::sync::Arc;

use log::{debug, error, info};
use serde::Serialize;
use tokio::sync::mpsc;

use crate::db::Database;
use crate::mood::{EmotionSample, MoodState, Notification, NotificationMessages};

use super::context::{MoodSession, Observation};

/// Emitted to whoever renders the session (terminal, tests).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SessionEvent {
    Sample { sample: EmotionSample, mood: MoodState },
    MoodChanged { from: MoodState, to: MoodState },
    Notification(Notification),
}

/// Ties a `MoodSession` to its persisted session row and an optional event stream.
///
/// Storage failures are logged and swallowed so a flaky disk never stalls capture.
pub struct SessionRecorder {
    session: MoodSession,
    db: Database,
    session_id: String,
    user_id: i64,
    messages: Arc<dyn NotificationMessages + Send + Sync>,
    events: Option<mpsc::UnboundedSender<SessionEvent>>,
    verbose: bool,
}

impl SessionRecorder {
    pub fn new(
        session: MoodSession,
        db: Database,
        session_id: String,
        user_id: i64,
        messages: Arc<dyn NotificationMessages + Send + Sync>,
    ) -> Self {
        Self {
            session,
            db,
            session_id,
            user_id,
            messages,
            events: None,
            verbose: false,
        }
    }

    pub fn with_events(mut self, events: mpsc::UnboundedSender<SessionEvent>) -> Self {
        self.events = Some(events);
        self
    }

    /// Log every sample at debug level.
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn session(&self) -> &MoodSession {
        &self.session
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub async fn record(&mut self, sample: EmotionSample) -> Observation {
        let observation = self.session.observe(sample, self.messages.as_ref());

        if self.verbose {
            debug!(
                "session {} sample {} ({:.2}) -> {}",
                self.session_id, sample.label, sample.confidence, observation.mood
            );
        }

        if let Err(err) = self
            .db
            .record_emotion_sample(&self.session_id, &sample, observation.mood)
            .await
        {
            error!("Failed to persist emotion sample for session {}: {err:?}", self.session_id);
        }

        for notification in &observation.notifications {
            match self
                .db
                .record_notification(self.user_id, &notification.kind, &notification.message)
                .await
            {
                Ok(record) => info!("Notification {} raised ({})", record.id, record.kind),
                Err(err) => error!("Failed to persist notification: {err:?}"),
            }
        }

        self.emit(SessionEvent::Sample {
            sample,
            mood: observation.mood,
        });
        if observation.mood_changed {
            self.emit(SessionEvent::MoodChanged {
                from: observation.previous_mood,
                to: observation.mood,
            });
        }
        for notification in &observation.notifications {
            self.emit(SessionEvent::Notification(notification.clone()));
        }

        observation
    }

    fn emit(&mut self, event: SessionEvent) {
        let Some(tx) = &self.events else {
            return;
        };
        if tx.send(event).is_err() {
            debug!("session event receiver dropped; no longer emitting");
            self.events = None;
        }
    }
}
