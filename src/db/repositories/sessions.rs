use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

use crate::db::{
    connection::Database,
    helpers::{db_now, format_datetime, parse_datetime, parse_optional_datetime, parse_status, to_i64},
    models::{Session, SessionStatus},
};

const SESSION_COLUMNS: &str = "id, user_id, started_at, ended_at, status";

fn row_to_session(row: &Row) -> Result<Session> {
    let started_at: String = row.get("started_at")?;
    let ended_at: Option<String> = row.get("ended_at")?;
    let status: String = row.get("status")?;

    Ok(Session {
        id: row.get("id")?,
        user_id: row.get("user_id")?,
        started_at: parse_datetime(&started_at, "started_at")?,
        ended_at: parse_optional_datetime(ended_at, "ended_at")?,
        status: parse_status(&status)?,
    })
}

/// Newest sample or message timestamp, else the start time. Raw column text.
fn last_activity_raw(conn: &Connection, session_id: &str) -> Result<String> {
    let started_at: String = conn.query_row(
        "SELECT started_at FROM sessions WHERE id = ?1",
        params![session_id],
        |row| row.get(0),
    )?;

    let last_activity: Option<String> = conn.query_row(
        "SELECT MAX(ts) FROM (
            SELECT timestamp AS ts FROM emotion_log WHERE session_id = ?1
            UNION ALL
            SELECT timestamp AS ts FROM messages WHERE session_id = ?1
         )",
        params![session_id],
        |row| row.get(0),
    )?;

    Ok(last_activity.unwrap_or(started_at))
}

impl Database {
    pub async fn create_session(&self, user_id: i64) -> Result<Session> {
        let session = Session {
            id: Uuid::new_v4().to_string(),
            user_id,
            started_at: db_now(),
            ended_at: None,
            status: SessionStatus::Active,
        };

        let record = session.clone();
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO sessions (id, user_id, started_at, ended_at, status)
                 VALUES (?1, ?2, ?3, NULL, ?4)",
                params![
                    record.id,
                    record.user_id,
                    format_datetime(&record.started_at),
                    record.status.as_str(),
                ],
            )?;
            Ok(())
        })
        .await?;

        Ok(session)
    }

    pub async fn end_session(&self, session_id: &str, ended_at: DateTime<Utc>) -> Result<()> {
        let session_id = session_id.to_string();
        self.execute(move |conn| {
            let rows_affected = conn.execute(
                "UPDATE sessions
                 SET ended_at = ?1,
                     status = ?2
                 WHERE id = ?3",
                params![
                    format_datetime(&ended_at),
                    SessionStatus::Completed.as_str(),
                    session_id,
                ],
            )?;

            if rows_affected == 0 {
                return Err(anyhow!("Session not found"));
            }
            Ok(())
        })
        .await
    }

    pub async fn get_session(&self, session_id: &str) -> Result<Option<Session>> {
        let session_id = session_id.to_string();
        self.execute(move |conn| {
            let session = conn
                .query_row(
                    &format!("SELECT {SESSION_COLUMNS} FROM sessions WHERE id = ?1"),
                    params![session_id],
                    |row| Ok(row_to_session(row)),
                )
                .optional()?
                .transpose()?;
            Ok(session)
        })
        .await
    }

    pub async fn list_sessions_for_user(&self, user_id: i64, limit: usize) -> Result<Vec<Session>> {
        let limit = to_i64(limit)?;
        self.execute(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {SESSION_COLUMNS}
                 FROM sessions
                 WHERE user_id = ?1
                 ORDER BY started_at DESC
                 LIMIT ?2"
            ))?;

            let mut rows = stmt.query(params![user_id, limit])?;
            let mut sessions = Vec::new();
            while let Some(row) = rows.next()? {
                sessions.push(row_to_session(row)?);
            }

            Ok(sessions)
        })
        .await
    }

    pub async fn get_open_sessions(&self) -> Result<Vec<Session>> {
        self.execute(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {SESSION_COLUMNS}
                 FROM sessions
                 WHERE status = 'Active'
                 ORDER BY started_at ASC"
            ))?;

            let mut rows = stmt.query([])?;
            let mut sessions = Vec::new();
            while let Some(row) = rows.next()? {
                sessions.push(row_to_session(row)?);
            }

            Ok(sessions)
        })
        .await
    }

    pub async fn last_session_activity(&self, session_id: &str) -> Result<DateTime<Utc>> {
        let session_id = session_id.to_string();
        self.execute(move |conn| {
            let raw = last_activity_raw(conn, &session_id)?;
            parse_datetime(&raw, "last_activity")
        })
        .await
    }

    /// Close a session that was left running, stamping it with its last recorded activity.
    pub async fn mark_session_interrupted(&self, session_id: &str) -> Result<DateTime<Utc>> {
        let session_id = session_id.to_string();
        self.execute(move |conn| {
            let tx = conn.transaction()?;

            let ended_raw = last_activity_raw(&tx, &session_id)?;
            let ended_at = parse_datetime(&ended_raw, "ended_at")?;

            tx.execute(
                "UPDATE sessions
                 SET ended_at = ?1,
                     status = ?2
                 WHERE id = ?3",
                params![
                    ended_raw,
                    SessionStatus::Interrupted.as_str(),
                    session_id,
                ],
            )?;

            tx.commit()?;
            Ok(ended_at)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use crate::db::models::SessionStatus;
    use crate::db::test_support::temp_database;
    use crate::mood::{EmotionKind, EmotionSample, MoodState};

    #[tokio::test]
    async fn session_lifecycle() {
        let (_dir, db) = temp_database();
        let user = db.get_or_create_user("alice").await.unwrap();

        let session = db.create_session(user.id).await.unwrap();
        assert_eq!(session.status, SessionStatus::Active);
        assert_eq!(db.get_session(&session.id).await.unwrap(), Some(session.clone()));
        assert_eq!(db.get_open_sessions().await.unwrap().len(), 1);

        let ended_at = session.started_at + Duration::minutes(3);
        db.end_session(&session.id, ended_at).await.unwrap();

        let stored = db.get_session(&session.id).await.unwrap().unwrap();
        assert_eq!(stored.status, SessionStatus::Completed);
        assert_eq!(stored.ended_at, Some(ended_at));
        assert!(db.get_open_sessions().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn ending_unknown_session_fails() {
        let (_dir, db) = temp_database();
        assert!(db.end_session("nope", chrono::Utc::now()).await.is_err());
    }

    #[tokio::test]
    async fn lists_newest_first_with_limit() {
        let (_dir, db) = temp_database();
        let user = db.get_or_create_user("alice").await.unwrap();

        let first = db.create_session(user.id).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let second = db.create_session(user.id).await.unwrap();

        let listed = db.list_sessions_for_user(user.id, 10).await.unwrap();
        let ids: Vec<_> = listed.iter().map(|s| s.id.clone()).collect();
        assert_eq!(ids, vec![second.id.clone(), first.id]);

        assert_eq!(db.list_sessions_for_user(user.id, 1).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn interrupted_session_ends_at_last_activity() {
        let (_dir, db) = temp_database();
        let user = db.get_or_create_user("alice").await.unwrap();
        let session = db.create_session(user.id).await.unwrap();

        let seen_at = session.started_at + Duration::seconds(42);
        let sample = EmotionSample::new(EmotionKind::Sad, 0.7, seen_at);
        db.record_emotion_sample(&session.id, &sample, MoodState::Neutral)
            .await
            .unwrap();

        let ended_at = db.mark_session_interrupted(&session.id).await.unwrap();
        assert_eq!(ended_at, seen_at);

        let stored = db.get_session(&session.id).await.unwrap().unwrap();
        assert_eq!(stored.status, SessionStatus::Interrupted);
        assert_eq!(stored.ended_at, Some(seen_at));
    }

    #[tokio::test]
    async fn last_activity_follows_logged_samples() {
        let (_dir, db) = temp_database();
        let user = db.get_or_create_user("alice").await.unwrap();
        let session = db.create_session(user.id).await.unwrap();
        assert_eq!(
            db.last_session_activity(&session.id).await.unwrap(),
            session.started_at
        );

        let seen_at = session.started_at + Duration::seconds(30);
        let sample = EmotionSample::new(EmotionKind::Happy, 0.9, seen_at);
        db.record_emotion_sample(&session.id, &sample, MoodState::Up)
            .await
            .unwrap();
        assert_eq!(db.last_session_activity(&session.id).await.unwrap(), seen_at);

        assert!(db.last_session_activity("nope").await.is_err());
    }

    #[tokio::test]
    async fn idle_interrupted_session_ends_at_start() {
        let (_dir, db) = temp_database();
        let user = db.get_or_create_user("alice").await.unwrap();
        let session = db.create_session(user.id).await.unwrap();

        let ended_at = db.mark_session_interrupted(&session.id).await.unwrap();
        assert_eq!(ended_at, session.started_at);
    }
}
