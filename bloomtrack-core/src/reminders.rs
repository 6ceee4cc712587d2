use chrono::{NaiveTime, Timelike};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::error::TrackerError;

const TIME_FORMAT: &str = "%H:%M";

/// Wall-clock time of day, stored as `HH:MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeOfDay(NaiveTime);

impl TimeOfDay {
    #[must_use]
    pub fn new(hour: u32, minute: u32) -> Option<Self> {
        NaiveTime::from_hms_opt(hour, minute, 0).map(Self)
    }

    /// Parse a zero-padded `HH:MM` time.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::InvalidTime`] for anything else, including
    /// unpadded (`7:30`) and out-of-range (`24:00`) values.
    pub fn parse(input: &str) -> Result<Self, TrackerError> {
        let trimmed = input.trim();
        NaiveTime::parse_from_str(trimmed, TIME_FORMAT)
            .ok()
            .filter(|time| time.format(TIME_FORMAT).to_string() == trimmed)
            .map(Self)
            .ok_or_else(|| TrackerError::InvalidTime(input.to_string()))
    }

    #[must_use]
    pub fn hour(self) -> u32 {
        self.0.hour()
    }

    #[must_use]
    pub fn minute(self) -> u32 {
        self.0.minute()
    }

    #[must_use]
    pub const fn as_naive_time(self) -> NaiveTime {
        self.0
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(TIME_FORMAT))
    }
}

impl FromStr for TimeOfDay {
    type Err = TrackerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for TimeOfDay {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TimeOfDay {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

/// A user reminder. Scheduling is handled by the host's notification service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reminder {
    pub id: String,
    /// Free-form category such as `pills_morning` or `water`.
    #[serde(rename = "type")]
    pub kind: String,
    pub time: TimeOfDay,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

const fn default_enabled() -> bool {
    true
}

/// Partial reminder update.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReminderPatch {
    pub kind: Option<String>,
    pub time: Option<TimeOfDay>,
    pub enabled: Option<bool>,
}

impl ReminderPatch {
    pub fn apply(self, reminder: &mut Reminder) {
        if let Some(kind) = self.kind {
            reminder.kind = kind;
        }
        if let Some(time) = self.time {
            reminder.time = time;
        }
        if let Some(enabled) = self.enabled {
            reminder.enabled = enabled;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_strict_hh_mm() {
        assert_eq!(TimeOfDay::parse("07:30").unwrap(), TimeOfDay::new(7, 30).unwrap());
        assert_eq!(TimeOfDay::parse(" 23:59 ").unwrap().to_string(), "23:59");
        assert_eq!(
            TimeOfDay::parse("00:00").unwrap().as_naive_time(),
            NaiveTime::from_hms_opt(0, 0, 0).unwrap()
        );
        for bad in [
            "7:30", "9:5", "24:00", "12:60", "ab:cd", "12-30", "", "12:300", "12:3", "1230",
        ] {
            assert_eq!(
                TimeOfDay::parse(bad),
                Err(TrackerError::InvalidTime(bad.to_string())),
                "{bad}"
            );
        }
    }

    #[test]
    fn reminder_uses_type_key_and_time_string() {
        let reminder: Reminder =
            serde_json::from_str(r#"{"id":"r1","type":"water","time":"09:05"}"#).unwrap();
        assert!(reminder.enabled);
        assert_eq!(reminder.time.hour(), 9);
        let json = serde_json::to_value(&reminder).unwrap();
        assert_eq!(json["time"], "09:05");
        assert_eq!(json["type"], "water");
        assert!(serde_json::from_str::<Reminder>(r#"{"id":"r","type":"x","time":"9"}"#).is_err());
    }
}
