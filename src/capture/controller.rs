use anyhow::{bail, Context, Result};
use log::info;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::session::SessionRecorder;
use crate::settings::CaptureSettings;

use super::loop_worker::capture_loop;
use super::producer::SampleProducer;

/// Owns the running capture task for one session.
#[derive(Default)]
pub struct CaptureController {
    handle: Option<JoinHandle<SessionRecorder>>,
    cancel_token: Option<CancellationToken>,
}

impl CaptureController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.handle.is_some()
    }

    pub fn start_capture<P>(
        &mut self,
        producer: P,
        recorder: SessionRecorder,
        settings: CaptureSettings,
    ) -> Result<()>
    where
        P: SampleProducer,
    {
        if self.is_active() {
            bail!("capture already active");
        }

        info!("Starting capture for session {}", recorder.session_id());

        let cancel_token = CancellationToken::new();
        let handle = tokio::spawn(capture_loop(
            producer,
            recorder,
            settings,
            cancel_token.clone(),
        ));

        self.handle = Some(handle);
        self.cancel_token = Some(cancel_token);
        Ok(())
    }

    /// Cancel the loop and wait for it. Returns the recorder if a loop was running.
    pub async fn stop_capture(&mut self) -> Result<Option<SessionRecorder>> {
        if let Some(token) = self.cancel_token.take() {
            token.cancel();
        }
        self.join().await
    }

    /// Wait for the loop to finish by itself, e.g. when a replay feed runs out.
    pub async fn wait(&mut self) -> Result<Option<SessionRecorder>> {
        let result = self.join().await;
        self.cancel_token = None;
        result
    }

    // The handle stays in place until the task finishes, so an abandoned wait can be
    // followed by stop_capture.
    async fn join(&mut self) -> Result<Option<SessionRecorder>> {
        let Some(handle) = self.handle.as_mut() else {
            return Ok(None);
        };
        let result = handle.await;
        self.handle = None;
        result.context("capture loop task failed to join").map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::ReplayProducer;
    use crate::db::test_support::temp_database;
    use crate::response::StaticResponses;
    use crate::session::MoodSession;
    use std::io::Cursor;
    use std::sync::Arc;

    fn replay(lines: usize) -> ReplayProducer<Cursor<Vec<u8>>> {
        let feed = "{\"emotion\":\"sad\",\"confidence\":0.5}\n".repeat(lines);
        ReplayProducer::from_reader(Cursor::new(feed.into_bytes()))
    }

    #[tokio::test]
    async fn refuses_double_start_and_stops_cleanly() {
        let (_dir, db) = temp_database();
        let user = db.get_or_create_user("alice").await.unwrap();
        let session = db.create_session(user.id).await.unwrap();
        let make_recorder = || {
            SessionRecorder::new(
                MoodSession::default(),
                db.clone(),
                session.id.clone(),
                user.id,
                Arc::new(StaticResponses::with_seed(5)),
            )
        };
        let slow = CaptureSettings {
            interval_ms: 60_000,
            timeout_secs: 5,
        };

        let mut controller = CaptureController::new();
        controller
            .start_capture(replay(100), make_recorder(), slow.clone())
            .unwrap();
        assert!(controller.is_active());
        assert!(controller
            .start_capture(replay(1), make_recorder(), slow)
            .is_err());

        let recorder = controller.stop_capture().await.unwrap().unwrap();
        assert!(!controller.is_active());
        // The first tick fires immediately; the minute-long interval keeps it to one.
        assert!(recorder.session().history().len() <= 1);

        assert!(controller.stop_capture().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn wait_returns_after_feed_ends() {
        let (_dir, db) = temp_database();
        let user = db.get_or_create_user("alice").await.unwrap();
        let session = db.create_session(user.id).await.unwrap();
        let recorder = SessionRecorder::new(
            MoodSession::default(),
            db,
            session.id,
            user.id,
            Arc::new(StaticResponses::with_seed(5)),
        );

        let mut controller = CaptureController::new();
        let fast = CaptureSettings {
            interval_ms: 1,
            timeout_secs: 5,
        };
        controller.start_capture(replay(3), recorder, fast).unwrap();

        let recorder = controller.wait().await.unwrap().unwrap();
        assert_eq!(recorder.session().history().len(), 3);
    }
}
