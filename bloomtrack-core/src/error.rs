use chrono::NaiveDate;
use thiserror::Error;

/// Errors raised when a tracker mutation or input is rejected.
///
/// A rejected mutation leaves the state untouched.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TrackerError {
    #[error("invalid date key {0:?} (expected YYYY-MM-DD)")]
    InvalidDateKey(String),
    #[error("invalid time {0:?} (expected HH:MM)")]
    InvalidTime(String),
    #[error("weight must be a positive number of kilograms (got {0})")]
    InvalidWeight(f64),
    #[error("a cycle started on {open_since} is still open")]
    CycleAlreadyOpen { open_since: NaiveDate },
    #[error("no open cycle to end")]
    NoOpenCycle,
    #[error("cycle end {end} precedes its start {start}")]
    CycleEndBeforeStart { start: NaiveDate, end: NaiveDate },
    #[error("cycle from {start} to {end} is longer than {max_days} days")]
    CycleTooLong {
        start: NaiveDate,
        end: NaiveDate,
        max_days: i64,
    },
    #[error("unknown reminder {0:?}")]
    UnknownReminder(String),
    #[error("{reward} unlocks at level {required_level}")]
    RewardLocked {
        reward: &'static str,
        required_level: u32,
    },
}
