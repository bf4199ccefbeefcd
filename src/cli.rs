use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Duration, Utc};
use clap::{Parser, Subcommand};
use log::{debug, info, warn};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use crate::capture::{CaptureController, ReplayProducer};
use crate::chat::ChatService;
use crate::db::{Database, User};
use crate::mood::stats::recent_entries;
use crate::mood::{MoodState, MoodStatistics};
use crate::response::{build_generator, OllamaGenerator, StaticResponses};
use crate::session::{MoodSession, SessionEvent, SessionRecorder};
use crate::settings::AppSettings;

#[derive(Parser)]
#[command(name = "moodwatch")]
#[command(about = "Track mood from classified webcam frames and chat about it", long_about = None)]
pub struct Cli {
    /// Whose sessions to record or inspect
    #[arg(short, long, global = true, default_value = "default")]
    pub user: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a monitoring session over a recorded classifier feed (JSON lines)
    Watch {
        #[arg(short, long)]
        replay: PathBuf,
        /// Override the capture interval
        #[arg(long)]
        interval_ms: Option<u64>,
    },
    /// Talk to the companion; the last recorded emotion sets the tone
    Chat,
    /// Aggregate the most recent emotion samples
    Stats {
        #[arg(short, long, default_value_t = 100)]
        limit: usize,
    },
    /// Show samples and chat for one session, or the latest samples overall
    History {
        #[arg(short, long)]
        session: Option<String>,
        #[arg(short, long, default_value_t = 20)]
        limit: usize,
    },
    /// List unread notifications
    Notifications {
        #[arg(long)]
        mark_read: bool,
    },
    /// List recent sessions
    Sessions {
        #[arg(short, long, default_value_t = 10)]
        limit: usize,
    },
    /// Check that the configured Ollama server answers
    PingLlm,
}

/// Mood entries listed under the watch summary.
const SUMMARY_TAIL: usize = 10;

pub struct AppContext {
    pub db: Database,
    pub settings: AppSettings,
    pub debug: bool,
}

pub async fn dispatch(cli: Cli, ctx: AppContext) -> Result<()> {
    match cli.command {
        Commands::Watch {
            replay,
            interval_ms,
        } => watch(&ctx, &cli.user, replay, interval_ms).await,
        Commands::Chat => chat(&ctx, &cli.user).await,
        Commands::Stats { limit } => stats(&ctx, &cli.user, limit).await,
        Commands::History { session, limit } => history(&ctx, &cli.user, session, limit).await,
        Commands::Notifications { mark_read } => notifications(&ctx, &cli.user, mark_read).await,
        Commands::Sessions { limit } => sessions(&ctx, &cli.user, limit).await,
        Commands::PingLlm => ping_llm(&ctx).await,
    }
}

/// Close sessions left `Active` by a crash, stamping them with their last activity.
///
/// Another process may be recording right now, so only sessions with no sample or message
/// for `stale_after` are touched.
pub async fn recover_open_sessions(
    db: &Database,
    now: DateTime<Utc>,
    stale_after: Duration,
) -> Result<usize> {
    let mut recovered = 0;
    for session in db.get_open_sessions().await? {
        let last_activity = db.last_session_activity(&session.id).await?;
        if now - last_activity < stale_after {
            debug!("Session {} is still live; leaving it open", session.id);
            continue;
        }

        let ended_at = db.mark_session_interrupted(&session.id).await?;
        warn!(
            "Recovered incomplete session {}; marked Interrupted at {}",
            session.id, ended_at
        );
        recovered += 1;
    }
    Ok(recovered)
}

async fn known_user(db: &Database, username: &str) -> Result<User> {
    match db.get_user_by_name(username).await? {
        Some(user) => Ok(user),
        None => bail!("no recorded data for user '{username}'"),
    }
}

fn response_table(ctx: &AppContext) -> StaticResponses {
    match ctx.settings.generator.seed {
        Some(seed) => StaticResponses::with_seed(seed),
        None => StaticResponses::new(),
    }
}

async fn watch(
    ctx: &AppContext,
    username: &str,
    replay: PathBuf,
    interval_ms: Option<u64>,
) -> Result<()> {
    let user = ctx.db.get_or_create_user(username).await?;
    let producer = ReplayProducer::open(&replay)?;
    let session = ctx.db.create_session(user.id).await?;
    info!("Session {} started for {}", session.id, user.username);

    let mut capture = ctx.settings.capture.clone();
    if let Some(interval_ms) = interval_ms {
        capture.interval_ms = interval_ms;
    }

    let table = Arc::new(response_table(ctx));
    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let recorder = SessionRecorder::new(
        MoodSession::new(&ctx.settings),
        ctx.db.clone(),
        session.id.clone(),
        user.id,
        table.clone(),
    )
    .with_events(events_tx)
    .verbose(ctx.debug);

    let printer = tokio::spawn(print_events(events_rx, table));

    let mut controller = CaptureController::new();
    controller.start_capture(producer, recorder, capture)?;

    let finished = tokio::select! {
        result = controller.wait() => Some(result?),
        _ = tokio::signal::ctrl_c() => None,
    };
    let recorder = match finished {
        Some(recorder) => recorder,
        None => {
            info!("Interrupted; stopping capture");
            controller.stop_capture().await?
        }
    };

    ctx.db.end_session(&session.id, Utc::now()).await?;

    if let Some(recorder) = recorder {
        let history = recorder.session().history();
        let summary = MoodStatistics::from_history(history);
        let recent = recent_entries(history, SUMMARY_TAIL);
        drop(recorder);
        if printer.await.is_err() {
            warn!("event printer task failed");
        }
        println!();
        println!("Session {} complete", session.id);
        print_statistics(&summary);
        if !recent.is_empty() {
            println!("Last {} moods:", recent.len());
            for entry in &recent {
                println!(
                    "  {}  {:<9} {}",
                    entry.timestamp.format("%H:%M:%S"),
                    entry.emotion,
                    entry.mood
                );
            }
        }
    }

    Ok(())
}

async fn print_events(
    mut events: mpsc::UnboundedReceiver<SessionEvent>,
    table: Arc<StaticResponses>,
) {
    while let Some(event) = events.recv().await {
        for line in event_lines(&event, &table) {
            println!("{line}");
        }
    }
}

/// Console rendering of one session event. Alerts are followed by a check-in question.
fn event_lines(event: &SessionEvent, table: &StaticResponses) -> Vec<String> {
    match event {
        SessionEvent::Sample { sample, mood } => vec![format!(
            "{}  {:<9} {:>4.0}%  {}",
            sample.timestamp.format("%H:%M:%S"),
            sample.label,
            sample.confidence * 100.0,
            mood
        )],
        SessionEvent::MoodChanged { from, to } => vec![format!("-- mood {from} -> {to}")],
        SessionEvent::Notification(notification) => vec![
            format!("!! {}", notification.message),
            format!("   {}", table.followup(notification.mood)),
        ],
    }
}

async fn chat(ctx: &AppContext, username: &str) -> Result<()> {
    let user = ctx.db.get_or_create_user(username).await?;
    let (mood, emotion) = match ctx.db.latest_emotion_for_user(user.id).await? {
        Some(entry) => (entry.mood, Some(entry.emotion)),
        None => (MoodState::Neutral, None),
    };

    let session = ctx.db.create_session(user.id).await?;
    let generator = build_generator(&ctx.settings.generator).await;
    let service = ChatService::new(ctx.db.clone(), generator);
    info!("Chat session {} using {} replies", session.id, service.generator_name());

    println!("{}", service.greeting(mood, emotion).await?);
    println!("(type 'quit' to leave)");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("failed to read stdin")? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if matches!(line, "quit" | "exit") {
            break;
        }
        let reply = service.reply(&session.id, mood, emotion, line).await?;
        println!("{reply}");
    }

    ctx.db.end_session(&session.id, Utc::now()).await?;
    Ok(())
}

async fn stats(ctx: &AppContext, username: &str, limit: usize) -> Result<()> {
    let user = known_user(&ctx.db, username).await?;
    let rows = ctx.db.get_user_stats(user.id, limit).await?;
    let summary = MoodStatistics::from_entries(
        rows.iter()
            .map(|row| (row.emotion, row.mood, row.confidence)),
    );
    print_statistics(&summary);
    Ok(())
}

fn print_statistics(summary: &MoodStatistics) {
    if summary.total == 0 {
        println!("No samples recorded.");
        return;
    }

    println!("Samples: {}", summary.total);
    if let Some(mood) = summary.dominant_mood {
        println!("Dominant mood: {mood}");
    }
    if let Some(confidence) = summary.mean_confidence {
        println!("Mean confidence: {:.0}%", confidence * 100.0);
    }
    for (mood, count) in &summary.mood_counts {
        println!("  {mood:<8} {count}");
    }
    for (emotion, count) in &summary.emotion_counts {
        let share = *count as f64 / summary.total as f64 * 100.0;
        println!("  {emotion:<8} {count:>4} ({share:.0}%)");
    }
}

async fn history(
    ctx: &AppContext,
    username: &str,
    session_id: Option<String>,
    limit: usize,
) -> Result<()> {
    let Some(session_id) = session_id else {
        let user = known_user(&ctx.db, username).await?;
        for entry in ctx.db.get_user_stats(user.id, limit).await?.iter().rev() {
            println!(
                "{}  {:<9} {:>4.0}%  {}",
                entry.timestamp.format("%Y-%m-%d %H:%M:%S"),
                entry.emotion,
                entry.confidence * 100.0,
                entry.mood
            );
        }
        return Ok(());
    };

    if ctx.db.get_session(&session_id).await?.is_none() {
        bail!("session {session_id} not found");
    }

    let samples = ctx.db.get_emotions_for_session(&session_id).await?;
    let skip = samples.len().saturating_sub(limit);
    for entry in samples.iter().skip(skip) {
        println!(
            "{}  {:<9} {:>4.0}%  {}",
            entry.timestamp.format("%H:%M:%S"),
            entry.emotion,
            entry.confidence * 100.0,
            entry.mood
        );
    }

    for message in ctx.db.get_conversation_history(&session_id).await? {
        println!("[{}] {}", message.role.as_str(), message.message);
    }
    Ok(())
}

async fn notifications(ctx: &AppContext, username: &str, mark_read: bool) -> Result<()> {
    let user = known_user(&ctx.db, username).await?;
    let unread = ctx.db.get_unread_notifications(user.id).await?;
    if unread.is_empty() {
        println!("No unread notifications.");
        return Ok(());
    }

    for notification in &unread {
        println!(
            "#{} {} [{}] {}",
            notification.id,
            notification.created_at.format("%Y-%m-%d %H:%M"),
            notification.kind,
            notification.message
        );
        if mark_read {
            ctx.db.mark_notification_read(notification.id).await?;
        }
    }
    Ok(())
}

async fn sessions(ctx: &AppContext, username: &str, limit: usize) -> Result<()> {
    let user = known_user(&ctx.db, username).await?;
    for session in ctx.db.list_sessions_for_user(user.id, limit).await? {
        let ended = session
            .ended_at
            .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| "-".into());
        println!(
            "{}  {:<11} {}  {}",
            session.id,
            session.status.as_str(),
            session.started_at.format("%Y-%m-%d %H:%M:%S"),
            ended
        );
    }
    Ok(())
}

async fn ping_llm(ctx: &AppContext) -> Result<()> {
    let settings = &ctx.settings.generator;
    let client = OllamaGenerator::new(
        &settings.ollama_url,
        &settings.ollama_model,
        settings.timeout_secs,
    )?;

    let models = client.list_models().await?;
    println!("Ollama reachable at {} ({} models)", settings.ollama_url, models.len());
    for model in &models {
        println!("  {model}");
    }

    let wanted = &settings.ollama_model;
    if !models.iter().any(|m| m == wanted || m.starts_with(&format!("{wanted}:"))) {
        warn!("configured model {wanted} is not installed");
    }
    if !settings.use_ollama {
        println!("Note: useOllama is off in settings; chat uses canned replies.");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::temp_database;
    use crate::db::SessionStatus;
    use crate::mood::{EmotionKind, EmotionSample, Notification};
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_watch_with_global_user() {
        let cli = Cli::try_parse_from([
            "moodwatch", "watch", "--replay", "feed.jsonl", "--user", "alice",
        ])
        .unwrap();
        assert_eq!(cli.user, "alice");
        assert!(matches!(cli.command, Commands::Watch { interval_ms: None, .. }));
    }

    #[test]
    fn alerts_are_followed_by_a_check_in() {
        let table = StaticResponses::with_seed(3);
        let notification = Notification {
            kind: "mood_alert".into(),
            mood: MoodState::Neutral,
            magnitude: 6,
            message: "You seem to have been feeling low".into(),
            fired_at: Utc::now(),
        };

        let lines = event_lines(&SessionEvent::Notification(notification), &table);
        assert_eq!(
            lines,
            vec![
                "!! You seem to have been feeling low".to_string(),
                format!("   {}", table.followup(MoodState::Neutral)),
            ]
        );

        let changed = SessionEvent::MoodChanged {
            from: MoodState::Neutral,
            to: MoodState::Down,
        };
        assert_eq!(event_lines(&changed, &table).len(), 1);
    }

    #[tokio::test]
    async fn recovery_closes_open_sessions_only() {
        let (_dir, db) = temp_database();
        let user = db.get_or_create_user("alice").await.unwrap();
        let open = db.create_session(user.id).await.unwrap();
        let done = db.create_session(user.id).await.unwrap();
        db.end_session(&done.id, Utc::now()).await.unwrap();

        let later = Utc::now() + Duration::hours(2);
        let stale_after = Duration::minutes(30);
        assert_eq!(recover_open_sessions(&db, later, stale_after).await.unwrap(), 1);
        assert_eq!(recover_open_sessions(&db, later, stale_after).await.unwrap(), 0);

        let open = db.get_session(&open.id).await.unwrap().unwrap();
        assert_eq!(open.status, SessionStatus::Interrupted);
        let done = db.get_session(&done.id).await.unwrap().unwrap();
        assert_eq!(done.status, SessionStatus::Completed);
    }

    #[tokio::test]
    async fn recovery_leaves_a_live_session_alone() {
        let (_dir, db) = temp_database();
        let user = db.get_or_create_user("alice").await.unwrap();
        let live = db.create_session(user.id).await.unwrap();

        // A watch in another process has just logged a sample.
        let sample = EmotionSample::new(EmotionKind::Neutral, 0.8, live.started_at);
        db.record_emotion_sample(&live.id, &sample, MoodState::Neutral)
            .await
            .unwrap();

        let stale_after = Duration::minutes(30);
        assert_eq!(recover_open_sessions(&db, Utc::now(), stale_after).await.unwrap(), 0);
        let stored = db.get_session(&live.id).await.unwrap().unwrap();
        assert_eq!(stored.status, SessionStatus::Active);
        assert_eq!(stored.ended_at, None);

        // Once it goes quiet for long enough it is a crash leftover.
        let much_later = sample.timestamp + Duration::hours(1);
        assert_eq!(recover_open_sessions(&db, much_later, stale_after).await.unwrap(), 1);
        let stored = db.get_session(&live.id).await.unwrap().unwrap();
        assert_eq!(stored.status, SessionStatus::Interrupted);
        assert_eq!(stored.ended_at, Some(sample.timestamp));
    }

    #[tokio::test]
    async fn watch_replays_feed_into_a_completed_session() {
        let (dir, db) = temp_database();
        let feed = dir.path().join("feed.jsonl");
        let lines: String = (0..8)
            .map(|_| "{\"emotion\":\"sad\",\"confidence\":0.9}\n")
            .collect();
        std::fs::write(&feed, lines).unwrap();

        let mut settings = AppSettings::default();
        settings.generator.seed = Some(11);
        let ctx = AppContext {
            db: db.clone(),
            settings,
            debug: false,
        };

        watch(&ctx, "alice", feed, Some(1)).await.unwrap();

        let user = db.get_user_by_name("alice").await.unwrap().unwrap();
        let sessions = db.list_sessions_for_user(user.id, 5).await.unwrap();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].status, SessionStatus::Completed);

        let samples = db.get_emotions_for_session(&sessions[0].id).await.unwrap();
        assert_eq!(samples.len(), 8);
        assert_eq!(db.get_unread_notifications(user.id).await.unwrap().len(), 1);
    }
}
