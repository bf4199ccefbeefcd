use anyhow::Result;
use rusqlite::{params, OptionalExtension, Row};

use crate::db::{
    connection::Database,
    helpers::{format_datetime, parse_datetime, parse_emotion, parse_mood, to_i64},
    models::EmotionLogEntry,
};
use crate::mood::{EmotionSample, MoodState};

fn row_to_entry(row: &Row) -> Result<EmotionLogEntry> {
    let timestamp: String = row.get("timestamp")?;
    let emotion: String = row.get("emotion")?;
    let mood: String = row.get("mood")?;
    let confidence: f64 = row.get("confidence")?;

    Ok(EmotionLogEntry {
        id: row.get("id")?,
        session_id: row.get("session_id")?,
        timestamp: parse_datetime(&timestamp, "timestamp")?,
        emotion: parse_emotion(&emotion)?,
        confidence: confidence as f32,
        mood: parse_mood(&mood)?,
    })
}

impl Database {
    /// Append one classified sample, tagged with the smoothed mood at that moment.
    pub async fn record_emotion_sample(
        &self,
        session_id: &str,
        sample: &EmotionSample,
        mood: MoodState,
    ) -> Result<i64> {
        let session_id = session_id.to_string();
        let timestamp = format_datetime(&sample.timestamp);
        let emotion = sample.label.as_str();
        let confidence = f64::from(sample.confidence);

        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO emotion_log (session_id, timestamp, emotion, confidence, mood)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![session_id, timestamp, emotion, confidence, mood.as_str()],
            )?;
            Ok(conn.last_insert_rowid())
        })
        .await
    }

    pub async fn get_emotions_for_session(&self, session_id: &str) -> Result<Vec<EmotionLogEntry>> {
        let session_id = session_id.to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, session_id, timestamp, emotion, confidence, mood
                 FROM emotion_log
                 WHERE session_id = ?1
                 ORDER BY timestamp ASC, id ASC",
            )?;

            let mut rows = stmt.query(params![session_id])?;
            let mut entries = Vec::new();
            while let Some(row) = rows.next()? {
                entries.push(row_to_entry(row)?);
            }

            Ok(entries)
        })
        .await
    }

    /// Most recent samples across every session belonging to the user, newest first.
    pub async fn get_user_stats(&self, user_id: i64, limit: usize) -> Result<Vec<EmotionLogEntry>> {
        let limit = to_i64(limit)?;
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT e.id, e.session_id, e.timestamp, e.emotion, e.confidence, e.mood
                 FROM emotion_log e
                 JOIN sessions s ON s.id = e.session_id
                 WHERE s.user_id = ?1
                 ORDER BY e.timestamp DESC, e.id DESC
                 LIMIT ?2",
            )?;

            let mut rows = stmt.query(params![user_id, limit])?;
            let mut entries = Vec::new();
            while let Some(row) = rows.next()? {
                entries.push(row_to_entry(row)?);
            }

            Ok(entries)
        })
        .await
    }

    pub async fn latest_emotion_for_user(&self, user_id: i64) -> Result<Option<EmotionLogEntry>> {
        self.execute(move |conn| {
            let entry = conn
                .query_row(
                    "SELECT e.id, e.session_id, e.timestamp, e.emotion, e.confidence, e.mood
                     FROM emotion_log e
                     JOIN sessions s ON s.id = e.session_id
                     WHERE s.user_id = ?1
                     ORDER BY e.timestamp DESC, e.id DESC
                     LIMIT 1",
                    params![user_id],
                    |row| Ok(row_to_entry(row)),
                )
                .optional()?
                .transpose()?;
            Ok(entry)
        })
        .await
    }
}
