//! Fire-time computation for resolved policies.
//!
//! A reminder stores a wall-clock time ("08:00"). Local policies read it in the
//! user's current zone, anchored policies in the anchor zone.

use chrono::{DateTime, Duration, LocalResult, NaiveDateTime, NaiveTime, Offset, TimeZone, Utc};
use chrono_tz::Tz;
use thiserror::Error;

use crate::models::TimingPolicy;
use crate::resolver::TimezoneNormalizer;

/// Schedule errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("Invalid clock time: {0}")]
    InvalidClockTime(String),

    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),
}

pub type ScheduleResult<T> = Result<T, ScheduleError>;

/// Parse "HH:MM" or "HH:MM:SS".
pub fn parse_clock_time(value: &str) -> ScheduleResult<NaiveTime> {
    let trimmed = value.trim();
    NaiveTime::parse_from_str(trimmed, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(trimmed, "%H:%M:%S"))
        .map_err(|_| ScheduleError::InvalidClockTime(value.to_string()))
}

/// Parse an RFC 3339 timestamp into UTC.
pub fn parse_instant(value: &str) -> ScheduleResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value.trim())
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| ScheduleError::InvalidTimestamp(value.to_string()))
}

/// Zone whose clock the reminder follows.
pub fn fire_zone(policy: &TimingPolicy, user_timezone: &str, normalizer: &TimezoneNormalizer) -> Tz {
    match policy.anchor_timezone() {
        Some(anchor) => normalizer.resolve_zone(Some(anchor)),
        None => normalizer.resolve_zone(Some(user_timezone)),
    }
}

/// First instant strictly after `after` at which the reminder fires.
///
/// Clock times inside a DST gap fire at the equivalent instant after the jump;
/// clock times repeated by a DST overlap fire at the earlier instant.
pub fn next_fire_utc(
    policy: &TimingPolicy,
    clock_time: NaiveTime,
    user_timezone: &str,
    after: DateTime<Utc>,
    normalizer: &TimezoneNormalizer,
) -> DateTime<Utc> {
    let zone = fire_zone(policy, user_timezone, normalizer);
    let today = after.with_timezone(&zone).date_naive();

    let candidate = localize(zone, today.and_time(clock_time));
    if candidate > after {
        return candidate;
    }

    let tomorrow = today.succ_opt().unwrap_or(today);
    localize(zone, tomorrow.and_time(clock_time))
}

fn localize(zone: Tz, local: NaiveDateTime) -> DateTime<Utc> {
    match zone.from_local_datetime(&local) {
        LocalResult::Single(dt) => dt.with_timezone(&Utc),
        LocalResult::Ambiguous(earliest, _) => earliest.with_timezone(&Utc),
        LocalResult::None => {
            // Gap: read the wall time with the offset in force before the jump.
            let before = zone.offset_from_utc_datetime(&(local - Duration::days(1))).fix();
            let utc = local - Duration::seconds(i64::from(before.local_minus_utc()));
            Utc.from_utc_datetime(&utc)
        }
    }
}
