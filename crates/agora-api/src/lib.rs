pub mod auth;
pub mod error;
pub mod middleware;
pub mod posts;
pub mod routes;
pub mod subs;
pub mod users;
pub mod votes;

use chrono::{DateTime, Utc};
use tracing::warn;
use uuid::Uuid;

pub(crate) fn parse_row_id(id: &str) -> Uuid {
    id.parse().unwrap_or_else(|e| {
        warn!("Corrupt row id '{}': {}", id, e);
        Uuid::default()
    })
}

pub(crate) fn parse_created_at(value: &str) -> DateTime<Utc> {
    value
        .parse::<DateTime<Utc>>()
        .or_else(|_| {
            // SQLite stores timestamps as "YYYY-MM-DD HH:MM:SS" without timezone.
            // Parse as naive UTC and convert.
            chrono::NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            warn!("Corrupt created_at '{}': {}", value, e);
            DateTime::default()
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_sqlite_naive_timestamps() {
        let parsed = parse_created_at("2026-03-01 12:30:00");
        assert_eq!(parsed.to_rfc3339(), "2026-03-01T12:30:00+00:00");
    }

    #[test]
    fn corrupt_timestamp_falls_back_to_default() {
        assert_eq!(parse_created_at("not a date"), DateTime::<Utc>::default());
    }
}
