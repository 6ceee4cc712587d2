//! Calendar helpers shared by the log, event and cycle modules.
use chrono::{Datelike, Duration, NaiveDate};

use crate::error::TrackerError;

const DATE_KEY_FORMAT: &str = "%Y-%m-%d";
const DISPLAY_FORMATS: [&str; 2] = ["%d.%m.%Y", "%d.%m.%y"];

/// Parse a `YYYY-MM-DD` day key.
///
/// # Errors
///
/// Returns [`TrackerError::InvalidDateKey`] if the input is not a calendar date
/// in `YYYY-MM-DD` form.
pub fn parse_date_key(input: &str) -> Result<NaiveDate, TrackerError> {
    let trimmed = input.trim();
    if trimmed.len() != 10 {
        return Err(TrackerError::InvalidDateKey(input.to_string()));
    }
    NaiveDate::parse_from_str(trimmed, DATE_KEY_FORMAT)
        .map_err(|_| TrackerError::InvalidDateKey(input.to_string()))
}

/// Format a date as its `YYYY-MM-DD` key.
#[must_use]
pub fn date_key(date: NaiveDate) -> String {
    date.format(DATE_KEY_FORMAT).to_string()
}

/// Accepts `dd.MM.yyyy` or `dd.MM.yy`.
#[must_use]
pub fn parse_display_date(input: &str) -> Option<NaiveDate> {
    let trimmed = input.trim();
    DISPLAY_FORMATS.iter().find_map(|fmt| {
        let parsed = NaiveDate::parse_from_str(trimmed, fmt).ok()?;
        // %Y happily accepts two-digit years; keep those for the short pattern.
        if fmt.ends_with("%Y") && trimmed.rsplit('.').next().is_some_and(|y| y.len() != 4) {
            return None;
        }
        Some(parsed)
    })
}

/// Format a date the way the app displays it (`dd.MM.yyyy`).
#[must_use]
pub fn display_date(date: NaiveDate) -> String {
    date.format(DISPLAY_FORMATS[0]).to_string()
}

/// Signed calendar-day difference `to - from`.
#[must_use]
pub fn days_between(from: NaiveDate, to: NaiveDate) -> i64 {
    (to - from).num_days()
}

/// Shift a date by a signed number of days, saturating at the calendar bounds.
#[must_use]
pub fn add_days(date: NaiveDate, days: i64) -> NaiveDate {
    date.checked_add_signed(Duration::days(days))
        .unwrap_or(if days < 0 { NaiveDate::MIN } else { NaiveDate::MAX })
}

/// Sunday on or before `date`.
#[must_use]
pub fn week_start_sunday(date: NaiveDate) -> NaiveDate {
    let offset = i64::from(date.weekday().num_days_from_sunday());
    add_days(date, -offset)
}
