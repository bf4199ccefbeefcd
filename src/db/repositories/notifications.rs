use anyhow::{anyhow, Result};
use rusqlite::{params, Row};

use crate::db::{
    connection::Database,
    helpers::{db_now, format_datetime, parse_datetime},
    models::NotificationRecord,
};

fn row_to_notification(row: &Row) -> Result<NotificationRecord> {
    let created_at: String = row.get("created_at")?;
    let is_read: i64 = row.get("is_read")?;

    Ok(NotificationRecord {
        id: row.get("id")?,
        user_id: row.get("user_id")?,
        created_at: parse_datetime(&created_at, "created_at")?,
        kind: row.get("kind")?,
        message: row.get("message")?,
        is_read: is_read != 0,
    })
}

impl Database {
    pub async fn record_notification(
        &self,
        user_id: i64,
        kind: &str,
        message: &str,
    ) -> Result<NotificationRecord> {
        let mut record = NotificationRecord {
            id: 0,
            user_id,
            created_at: db_now(),
            kind: kind.to_string(),
            message: message.to_string(),
            is_read: false,
        };

        let row = record.clone();
        record.id = self
            .execute(move |conn| {
                conn.execute(
                    "INSERT INTO notifications (user_id, created_at, kind, message, is_read)
                     VALUES (?1, ?2, ?3, ?4, 0)",
                    params![row.user_id, format_datetime(&row.created_at), row.kind, row.message],
                )?;
                Ok(conn.last_insert_rowid())
            })
            .await?;

        Ok(record)
    }

    pub async fn get_unread_notifications(&self, user_id: i64) -> Result<Vec<NotificationRecord>> {
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, user_id, created_at, kind, message, is_read
                 FROM notifications
                 WHERE user_id = ?1 AND is_read = 0
                 ORDER BY created_at DESC, id DESC",
            )?;

            let mut rows = stmt.query(params![user_id])?;
            let mut notifications = Vec::new();
            while let Some(row) = rows.next()? {
                notifications.push(row_to_notification(row)?);
            }

            Ok(notifications)
        })
        .await
    }

    pub async fn mark_notification_read(&self, notification_id: i64) -> Result<()> {
        self.execute(move |conn| {
            let rows_affected = conn.execute(
                "UPDATE notifications SET is_read = 1 WHERE id = ?1",
                params![notification_id],
            )?;

            if rows_affected == 0 {
                return Err(anyhow!("Notification not found"));
            }
            Ok(())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use crate::db::test_support::temp_database;

    #[tokio::test]
    async fn unread_until_marked() {
        let (_dir, db) = temp_database();
        let user = db.get_or_create_user("alice").await.unwrap();

        let first = db
            .record_notification(user.id, "mood_alert", "first")
            .await
            .unwrap();
        let second = db
            .record_notification(user.id, "mood_alert", "second")
            .await
            .unwrap();
        assert!(!first.is_read);

        let unread = db.get_unread_notifications(user.id).await.unwrap();
        assert_eq!(unread, vec![second.clone(), first.clone()]);

        db.mark_notification_read(first.id).await.unwrap();
        let unread = db.get_unread_notifications(user.id).await.unwrap();
        assert_eq!(unread, vec![second]);
    }

    #[tokio::test]
    async fn marking_unknown_notification_fails() {
        let (_dir, db) = temp_database();
        assert!(db.mark_notification_read(404).await.is_err());
    }

    #[tokio::test]
    async fn notifications_are_per_user() {
        let (_dir, db) = temp_database();
        let alice = db.get_or_create_user("alice").await.unwrap();
        let bob = db.get_or_create_user("bob").await.unwrap();

        db.record_notification(alice.id, "mood_alert", "hi").await.unwrap();
        assert!(db.get_unread_notifications(bob.id).await.unwrap().is_empty());
    }
}
