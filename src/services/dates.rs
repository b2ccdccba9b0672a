//! Local-calendar date helpers
//!
//! Every day boundary in herdbook is a local calendar day: a session at
//! 23:30 local time belongs to that day even when the UTC date has already
//! rolled over. Naive timestamps from the server are local wall-clock times.

use chrono::{
    DateTime, Duration, Local, LocalResult, NaiveDate, NaiveDateTime, TimeZone, Timelike, Utc,
};

use crate::types::{HerdbookError, Result};

/// Naive (offset-free) layouts accepted from the server
const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// Layout sent back to the server for milking times
pub const WALL_CLOCK_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Resolve a local wall-clock time to UTC.
///
/// Ambiguous times (DST fall-back) take the earlier instant; times inside a
/// spring-forward gap are shifted forward by an hour.
pub fn local_to_utc(naive: NaiveDateTime) -> DateTime<Utc> {
    match Local.from_local_datetime(&naive) {
        LocalResult::Single(dt) => dt.to_utc(),
        LocalResult::Ambiguous(earlier, _) => earlier.to_utc(),
        LocalResult::None => {
            let shifted = naive + Duration::hours(1);
            Local
                .from_local_datetime(&shifted)
                .earliest()
                .map(|dt| dt.to_utc())
                .unwrap_or_else(|| naive.and_utc())
        }
    }
}

/// Parse a server timestamp; `None` when no known layout matches
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }

    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Some(local_to_utc(naive));
        }
    }

    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(local_to_utc)
}

/// Parse a user-supplied calendar date (`YYYY-MM-DD`)
pub fn parse_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|e| HerdbookError::Parse(format!("invalid date '{}': {}", raw, e)))
}

/// Parse a user-supplied local wall-clock time into the server layout
pub fn parse_wall_clock(raw: &str) -> Result<String> {
    let s = raw.trim();
    NAIVE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(s, format).ok())
        .map(|naive| naive.format(WALL_CLOCK_FORMAT).to_string())
        .ok_or_else(|| HerdbookError::Parse(format!("invalid time '{}'", raw)))
}

/// Local calendar date of a UTC instant
pub fn local_date(ts: DateTime<Utc>) -> NaiveDate {
    ts.with_timezone(&Local).date_naive()
}

/// The viewer's current calendar date
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Inclusive ascending day range; empty when `start > end`
pub fn day_range(start: NaiveDate, end: NaiveDate) -> impl Iterator<Item = NaiveDate> {
    start.iter_days().take_while(move |d| *d <= end)
}

/// Longest trailing window, in days, that reports and the lactation policy accept
pub const MAX_WINDOW_DAYS: u32 = 3660;

/// `(start, end)` of the `days`-day window that ends on `reference`
///
/// `days` is clamped to `1..=MAX_WINDOW_DAYS`; a window reaching past the
/// earliest representable date starts at `NaiveDate::MIN`.
pub fn window_ending(reference: NaiveDate, days: u32) -> (NaiveDate, NaiveDate) {
    let span = i64::from(days.clamp(1, MAX_WINDOW_DAYS)) - 1;
    let start = reference
        .checked_sub_signed(Duration::days(span))
        .unwrap_or(NaiveDate::MIN);
    (start, reference)
}

/// Parse a user-supplied window length in `1..=MAX_WINDOW_DAYS`
pub fn parse_window_days(raw: &str) -> Result<u32> {
    let days: u32 = raw
        .trim()
        .parse()
        .map_err(|_| HerdbookError::Parse(format!("invalid number of days '{}'", raw)))?;
    if !(1..=MAX_WINDOW_DAYS).contains(&days) {
        return Err(HerdbookError::Parse(format!(
            "days must be between 1 and {}, got {}",
            MAX_WINDOW_DAYS, days
        )));
    }
    Ok(days)
}

/// Coarse part of the day, used as a search keyword
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeOfDay {
    Morning,
    Afternoon,
    Evening,
}

impl TimeOfDay {
    pub fn from_hour(hour: u32) -> Self {
        match hour {
            0..=11 => Self::Morning,
            12..=16 => Self::Afternoon,
            _ => Self::Evening,
        }
    }

    pub fn of(ts: DateTime<Utc>) -> Self {
        Self::from_hour(ts.with_timezone(&Local).hour())
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Morning => "morning",
            Self::Afternoon => "afternoon",
            Self::Evening => "evening",
        }
    }
}
