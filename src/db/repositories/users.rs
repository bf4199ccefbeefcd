use anyhow::{bail, Result};
use rusqlite::{params, OptionalExtension, Row};

use crate::db::{
    connection::Database,
    helpers::{db_now, format_datetime, parse_datetime},
    models::User,
};

fn row_to_user(row: &Row) -> Result<User> {
    let created_at: String = row.get("created_at")?;

    Ok(User {
        id: row.get("id")?,
        username: row.get("username")?,
        created_at: parse_datetime(&created_at, "created_at")?,
    })
}

impl Database {
    /// Look a user up by name, creating the row on first sight.
    pub async fn get_or_create_user(&self, username: &str) -> Result<User> {
        let username = username.trim().to_string();
        if username.is_empty() {
            bail!("username must not be empty");
        }

        self.execute(move |conn| {
            let existing = conn
                .query_row(
                    "SELECT id, username, created_at FROM users WHERE username = ?1",
                    params![username],
                    |row| Ok(row_to_user(row)),
                )
                .optional()?
                .transpose()?;

            if let Some(user) = existing {
                return Ok(user);
            }

            let now = db_now();
            conn.execute(
                "INSERT INTO users (username, created_at) VALUES (?1, ?2)",
                params![username, format_datetime(&now)],
            )?;

            Ok(User {
                id: conn.last_insert_rowid(),
                username,
                created_at: now,
            })
        })
        .await
    }

    pub async fn get_user_by_name(&self, username: &str) -> Result<Option<User>> {
        let username = username.trim().to_string();
        self.execute(move |conn| {
            let user = conn
                .query_row(
                    "SELECT id, username, created_at FROM users WHERE username = ?1",
                    params![username],
                    |row| Ok(row_to_user(row)),
                )
                .optional()?
                .transpose()?;
            Ok(user)
        })
        .await
    }
}
