use chrono::{DateTime, Datelike, Duration, FixedOffset};
use serde_json::json;

use crate::error::{EngineError, EngineResult};

pub const DEFAULT_EVENT_DURATION_MINUTES: i64 = 60;

pub fn parse_datetime(value: &str) -> EngineResult<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(value).map_err(|err| {
        EngineError::validation_with_details(
            "Invalid datetime format",
            json!({"value": value, "error": err.to_string()}),
        )
    })
}

/// Lenient parse for skip-and-continue paths; callers log the skip
pub fn parse_datetime_opt(value: &str) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(value).ok()
}

pub fn format_datetime(dt: DateTime<FixedOffset>) -> String {
    dt.to_rfc3339()
}

/// Resolve an event's effective end: the explicit end when present,
/// otherwise start plus duration (60 minutes when no duration is given).
pub fn effective_end(
    start: DateTime<FixedOffset>,
    end: Option<DateTime<FixedOffset>>,
    duration_minutes: Option<i64>,
) -> DateTime<FixedOffset> {
    match end {
        Some(end) => end,
        None => {
            start + Duration::minutes(duration_minutes.unwrap_or(DEFAULT_EVENT_DURATION_MINUTES))
        }
    }
}

/// Half-open interval overlap, with an inclusive-equality branch: when
/// `touching_counts` is set, exactly back-to-back intervals and
/// zero-length intervals landing on a boundary also count as overlapping.
pub fn overlaps(
    a_start: DateTime<FixedOffset>,
    a_end: DateTime<FixedOffset>,
    b_start: DateTime<FixedOffset>,
    b_end: DateTime<FixedOffset>,
    touching_counts: bool,
) -> bool {
    if a_start < b_end && a_end > b_start {
        return true;
    }
    touching_counts
        && (a_start == b_start || a_end == b_end || a_end == b_start || a_start == b_end)
}

/// Intersection of two intervals; meaningful only when they overlap
pub fn overlap_window(
    a_start: DateTime<FixedOffset>,
    a_end: DateTime<FixedOffset>,
    b_start: DateTime<FixedOffset>,
    b_end: DateTime<FixedOffset>,
) -> (DateTime<FixedOffset>, DateTime<FixedOffset>) {
    (a_start.max(b_start), a_end.min(b_end))
}

pub fn duration_minutes(start: DateTime<FixedOffset>, end: DateTime<FixedOffset>) -> i64 {
    end.signed_duration_since(start).num_minutes()
}

pub fn same_local_day(a: DateTime<FixedOffset>, b: DateTime<FixedOffset>) -> bool {
    a.date_naive() == b.date_naive()
}

/// Zero-padded 24-hour "HH:MM", the form work-hours windows compare against
pub fn time_of_day_string(dt: DateTime<FixedOffset>) -> String {
    dt.format("%H:%M").to_string()
}

/// 0 = Sunday .. 6 = Saturday
pub fn weekday_index(dt: DateTime<FixedOffset>) -> u8 {
    dt.weekday().num_days_from_sunday() as u8
}
