use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};

use crate::db::models::{ChatRole, SessionStatus};
use crate::mood::{EmotionKind, MoodState};

pub fn to_i64(value: usize) -> Result<i64> {
    i64::try_from(value).map_err(|_| anyhow!("value {value} exceeds SQLite INTEGER range"))
}

/// Current time at the precision the store keeps.
pub fn db_now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Fixed-width UTC timestamps so text ordering matches time ordering.
pub fn format_datetime(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn parse_datetime(value: &str, field: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .with_context(|| format!("failed to parse {field}"))
}

pub fn parse_optional_datetime(
    value: Option<String>,
    field: &str,
) -> Result<Option<DateTime<Utc>>> {
    match value {
        Some(raw) => parse_datetime(&raw, field).map(Some),
        None => Ok(None),
    }
}

pub fn parse_status(value: &str) -> Result<SessionStatus> {
    match value {
        "Active" => Ok(SessionStatus::Active),
        "Completed" => Ok(SessionStatus::Completed),
        "Interrupted" => Ok(SessionStatus::Interrupted),
        other => Err(anyhow!("unknown session status {other}")),
    }
}

pub fn parse_role(value: &str) -> Result<ChatRole> {
    match value {
        "user" => Ok(ChatRole::User),
        "assistant" => Ok(ChatRole::Assistant),
        other => Err(anyhow!("unknown chat role {other}")),
    }
}

pub fn parse_emotion(value: &str) -> Result<EmotionKind> {
    value.parse().context("invalid emotion column")
}

pub fn parse_mood(value: &str) -> Result<MoodState> {
    value.parse().context("invalid mood column")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_rfc3339_into_utc() {
        let parsed = parse_datetime("2024-06-01T10:00:00+02:00", "ts").unwrap();
        assert_eq!(parsed.to_rfc3339(), "2024-06-01T08:00:00+00:00");
        assert!(parse_datetime("yesterday", "ts").is_err());
    }

    #[test]
    fn formatted_timestamps_sort_lexically() {
        let earlier = parse_datetime("2024-06-01T08:00:00Z", "ts").unwrap();
        let later = earlier + chrono::Duration::milliseconds(1500);

        let (a, b) = (format_datetime(&earlier), format_datetime(&later));
        assert_eq!(a, "2024-06-01T08:00:00.000000Z");
        assert!(a < b);
        assert_eq!(parse_datetime(&b, "ts").unwrap(), later);
    }

    #[test]
    fn parses_enumerated_columns() {
        assert_eq!(parse_status("Interrupted").unwrap(), SessionStatus::Interrupted);
        assert!(parse_status("Running").is_err());
        assert_eq!(parse_role("assistant").unwrap(), ChatRole::Assistant);
        assert_eq!(parse_mood("DOWN").unwrap(), MoodState::Down);
        assert_eq!(parse_emotion("fear").unwrap(), EmotionKind::Fear);
    }
}
