//! Row-to-entity parsing helpers and timestamp formatting.
//!
//! Every timestamp is written through [`format_timestamp`], so stored values
//! share one fixed-width layout and compare correctly as text. The parser still
//! accepts `SQLite`'s own `datetime('now')` layout for rows written by hand.

use std::time::Duration;

use chrono::{DateTime, SecondsFormat, SubsecRound, TimeDelta, Utc};
use distill_core::ids::RequestId;

use crate::error::DatabaseError;

/// Current time truncated to the precision the store keeps.
#[must_use]
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

/// Render a timestamp for storage: RFC 3339, UTC, milliseconds, `Z` suffix.
#[must_use]
pub fn format_timestamp(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// `now - age`, for "older than" filters.
///
/// # Errors
///
/// Returns `DatabaseError::InvalidState` if `age` is too large to subtract
/// from the current time.
pub fn cutoff_before(now: DateTime<Utc>, age: Duration) -> Result<DateTime<Utc>, DatabaseError> {
    TimeDelta::from_std(age)
        .ok()
        .and_then(|age| now.checked_sub_signed(age))
        .ok_or_else(|| DatabaseError::InvalidState(format!("age {age:?} out of range")))
}

/// Parse a required TEXT column as `DateTime<Utc>`.
///
/// # Errors
///
/// Returns `DatabaseError::Query` if the string is neither RFC 3339 nor
/// `SQLite`'s `YYYY-MM-DD HH:MM:SS`.
pub fn parse_datetime(s: &str) -> Result<DateTime<Utc>, DatabaseError> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .map(|naive| naive.and_utc())
        .map_err(|e| DatabaseError::Query(format!("Failed to parse datetime '{s}': {e}")))
}

/// Parse an optional TEXT column as `Option<DateTime<Utc>>`.
///
/// # Errors
///
/// Returns `DatabaseError::Query` if a non-empty string cannot be parsed.
pub fn parse_optional_datetime(s: Option<&str>) -> Result<Option<DateTime<Utc>>, DatabaseError> {
    match s {
        Some(s) if !s.is_empty() => Ok(Some(parse_datetime(s)?)),
        _ => Ok(None),
    }
}

/// Parse a TEXT column into a `snake_case` serde enum such as `Stage`.
///
/// # Errors
///
/// Returns `DatabaseError::Query` if the string does not match any variant.
pub fn parse_enum<T: serde::de::DeserializeOwned>(s: &str) -> Result<T, DatabaseError> {
    serde_json::from_value(serde_json::Value::String(s.to_string()))
        .map_err(|e| DatabaseError::Query(format!("Failed to parse enum from '{s}': {e}")))
}

/// Parse a TEXT column holding a request identity.
///
/// # Errors
///
/// Returns `DatabaseError::Query` if the column is not a UUID.
pub fn parse_request_id(s: &str) -> Result<RequestId, DatabaseError> {
    s.parse()
        .map_err(|e| DatabaseError::Query(format!("Bad request id in row: {e}")))
}

/// Read a nullable TEXT column. Returns `None` for both SQL NULL and empty string.
///
/// `row.get::<String>(idx)` on a NULL column returns an error, not `""`.
///
/// # Errors
///
/// Returns `DatabaseError` if the column read fails.
pub fn get_opt_string(row: &libsql::Row, idx: i32) -> Result<Option<String>, DatabaseError> {
    match row.get::<Option<String>>(idx)? {
        Some(s) if s.is_empty() => Ok(None),
        other => Ok(other),
    }
}

/// Read a nullable TEXT column, keeping empty strings as `Some("")`.
///
/// Document content distinguishes "fetched but empty" from "absent".
///
/// # Errors
///
/// Returns `DatabaseError` if the column read fails.
pub fn get_nullable_string(row: &libsql::Row, idx: i32) -> Result<Option<String>, DatabaseError> {
    Ok(row.get::<Option<String>>(idx)?)
}

/// Read a non-negative INTEGER column as `u64`.
///
/// # Errors
///
/// Returns `DatabaseError::Query` for negative values.
pub fn get_u64(row: &libsql::Row, idx: i32) -> Result<u64, DatabaseError> {
    let value = row.get::<i64>(idx)?;
    u64::try_from(value)
        .map_err(|_| DatabaseError::Query(format!("Negative value {value} in column {idx}")))
}

/// Convert a count for binding as an SQL INTEGER, saturating at `i64::MAX`.
#[must_use]
pub fn to_sql_int(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use distill_core::enums::Stage;

    #[test]
    fn stored_timestamps_sort_as_text() {
        let earlier = parse_datetime("2026-01-01T09:59:59.999Z").unwrap();
        let later = parse_datetime("2026-01-01T10:00:00Z").unwrap();
        assert!(format_timestamp(earlier) < format_timestamp(later));
        assert_eq!(format_timestamp(later), "2026-01-01T10:00:00.000Z");
    }

    #[test]
    fn parses_sqlite_default_format() {
        let dt = parse_datetime("2026-02-09 14:30:00").unwrap();
        assert_eq!(format_timestamp(dt), "2026-02-09T14:30:00.000Z");
    }

    #[test]
    fn now_round_trips_through_storage() {
        let t = now();
        assert_eq!(parse_datetime(&format_timestamp(t)).unwrap(), t);
    }

    #[test]
    fn parse_stage_enum() {
        let stage: Stage = parse_enum("analysis_in_progress").unwrap();
        assert_eq!(stage, Stage::AnalysisInProgress);
        assert!(parse_enum::<Stage>("done").is_err());
    }

    #[test]
    fn optional_datetime_empty_is_none() {
        assert_eq!(parse_optional_datetime(Some("")).unwrap(), None);
        assert_eq!(parse_optional_datetime(None).unwrap(), None);
    }

    #[test]
    fn cutoff_subtracts_age_and_rejects_overflow() {
        let t = parse_datetime("2026-01-01T10:00:00Z").unwrap();
        let cut = cutoff_before(t, Duration::from_secs(3600)).unwrap();
        assert_eq!(format_timestamp(cut), "2026-01-01T09:00:00.000Z");
        assert!(cutoff_before(t, Duration::MAX).is_err());
    }

    #[test]
    fn sql_int_saturates() {
        assert_eq!(to_sql_int(7), 7);
        assert_eq!(to_sql_int(u64::MAX), i64::MAX);
    }
}
