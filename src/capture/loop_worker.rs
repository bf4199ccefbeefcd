use anyhow::{anyhow, Result};
use chrono::Utc;
use std::sync::{Arc, Mutex, TryLockError};
use tokio::time::{Duration, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::session::SessionRecorder;
use crate::settings::CaptureSettings;

use super::producer::{Capture, SampleProducer};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_error, log_info, log_warn};

/// Drive `producer` on a fixed cadence until cancelled or the feed runs dry.
///
/// Hands the recorder back so the caller can close the session with its final state.
pub async fn capture_loop<P>(
    producer: P,
    mut recorder: SessionRecorder,
    settings: CaptureSettings,
    cancel_token: CancellationToken,
) -> SessionRecorder
where
    P: SampleProducer,
{
    let interval = Duration::from_millis(settings.interval_ms.max(1));
    let timeout = Duration::from_secs(settings.timeout_secs.max(1));

    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let producer = Arc::new(Mutex::new(producer));
    let session_id = recorder.session_id().to_string();

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                match tokio::time::timeout(timeout, produce_once(producer.clone())).await {
                    Ok(Ok(Capture::Sample(sample))) => {
                        recorder.record(sample).await;
                    }
                    Ok(Ok(Capture::NoFace)) => {}
                    Ok(Ok(Capture::Exhausted)) => {
                        log_info!("capture feed exhausted for session {}", session_id);
                        break;
                    }
                    Ok(Err(err)) => log_error!("capture failed for session {}: {err:?}", session_id),
                    Err(_) => log_warn!("capture timeout (> {}s) session {}", timeout.as_secs(), session_id),
                }
            }
            _ = cancel_token.cancelled() => {
                log_info!("capture loop shutting down");
                break;
            }
        }
    }

    recorder
}

async fn produce_once<P: SampleProducer>(producer: Arc<Mutex<P>>) -> Result<Capture> {
    let timestamp = Utc::now();
    tokio::task::spawn_blocking(move || {
        let mut guard = match producer.try_lock() {
            Ok(guard) => guard,
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
            // A timed-out frame is still being processed.
            Err(TryLockError::WouldBlock) => return Err(anyhow!("producer busy with previous frame")),
        };
        guard.produce(timestamp)
    })
    .await
    .map_err(|err| anyhow!("capture worker join failed: {err}"))?
}
