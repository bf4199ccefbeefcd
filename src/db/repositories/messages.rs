use anyhow::{bail, Result};
use rusqlite::{params, Row};

use crate::db::{
    connection::Database,
    helpers::{db_now, format_datetime, parse_datetime, parse_emotion, parse_role},
    models::{ChatMessage, ChatRole},
};
use crate::mood::EmotionKind;

fn row_to_message(row: &Row) -> Result<ChatMessage> {
    let timestamp: String = row.get("timestamp")?;
    let role: String = row.get("role")?;
    let emotion_context: Option<String> = row.get("emotion_context")?;

    Ok(ChatMessage {
        id: row.get("id")?,
        session_id: row.get("session_id")?,
        timestamp: parse_datetime(&timestamp, "timestamp")?,
        role: parse_role(&role)?,
        message: row.get("message")?,
        emotion_context: emotion_context.as_deref().map(parse_emotion).transpose()?,
    })
}

impl Database {
    pub async fn log_message(
        &self,
        session_id: &str,
        role: ChatRole,
        message: &str,
        emotion_context: Option<EmotionKind>,
    ) -> Result<ChatMessage> {
        if message.trim().is_empty() {
            bail!("message must not be empty");
        }

        let mut record = ChatMessage {
            id: 0,
            session_id: session_id.to_string(),
            timestamp: db_now(),
            role,
            message: message.to_string(),
            emotion_context,
        };

        let row = record.clone();
        record.id = self
            .execute(move |conn| {
                conn.execute(
                    "INSERT INTO messages (session_id, timestamp, role, message, emotion_context)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    params![
                        row.session_id,
                        format_datetime(&row.timestamp),
                        row.role.as_str(),
                        row.message,
                        row.emotion_context.map(|e| e.as_str()),
                    ],
                )?;
                Ok(conn.last_insert_rowid())
            })
            .await?;

        Ok(record)
    }

    pub async fn get_conversation_history(&self, session_id: &str) -> Result<Vec<ChatMessage>> {
        let session_id = session_id.to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, session_id, timestamp, role, message, emotion_context
                 FROM messages
                 WHERE session_id = ?1
                 ORDER BY timestamp ASC, id ASC",
            )?;

            let mut rows = stmt.query(params![session_id])?;
            let mut messages = Vec::new();
            while let Some(row) = rows.next()? {
                messages.push(row_to_message(row)?);
            }

            Ok(messages)
        })
        .await
    }

    pub async fn count_messages(&self, session_id: &str, role: ChatRole) -> Result<usize> {
        let session_id = session_id.to_string();
        self.execute(move |conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM messages WHERE session_id = ?1 AND role = ?2",
                params![session_id, role.as_str()],
                |row| row.get(0),
            )?;
            Ok(usize::try_from(count)?)
        })
        .await
    }
}
