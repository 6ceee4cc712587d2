//! Rotating weekly micro-challenges.
//!
//! Which event runs in a given week is a pure function of the week's Sunday,
//! so every device and every restart agrees without a stored schedule. The
//! only persisted part is [`EventHistory`], written once per week.
use chrono::{Datelike, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::OnceLock;

use crate::constants::{
    DAYS_PER_WEEK, EVENT_BONUS_MAX, EVENT_BONUS_MIN, EVENT_HASH_MONTH_FACTOR,
    EVENT_HASH_YEAR_FACTOR, WATER_GOAL_GLASSES,
};
use crate::date::{add_days, week_start_sunday};
use crate::day::{DayRecord, DrinkFlag};
use crate::locale::Localized;
use crate::numbers::{count_percent, round_f64_to_i64};
use crate::state::TrackerState;
use crate::stats::{tracked_after, weighed_before};

const DEFAULT_EVENT_DATA: &str = include_str!("../data/events.json");

/// Sunday-to-Saturday week and its history key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeekRange {
    pub week_key: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub day_keys: [NaiveDate; 7],
}

#[must_use]
pub fn get_week_range(date: NaiveDate) -> WeekRange {
    let start = week_start_sunday(date);
    let mut day_keys = [start; 7];
    for (offset, slot) in (0_i64..).zip(day_keys.iter_mut()) {
        *slot = add_days(start, offset);
    }
    WeekRange {
        week_key: week_key(start),
        start,
        end: add_days(start, DAYS_PER_WEEK - 1),
        day_keys,
    }
}

/// `"{year}-W{n}"` where `n` counts whole weeks since January 1 of the start's year.
///
/// Not ISO week numbering; this string joins the week to its history entry.
#[must_use]
pub fn week_key(week_start: NaiveDate) -> String {
    let weeks = i64::from(week_start.ordinal0()) / DAYS_PER_WEEK;
    format!("{}-W{weeks}", week_start.year())
}

/// Catalog slot for the week containing `date`.
///
/// Hashes the week's Sunday as `year * 37 + month0 * 5 + day` (zero-based
/// month, day of month). An empty catalog maps everything to 0.
#[must_use]
pub fn event_index_for(date: NaiveDate, catalog_size: usize) -> usize {
    let Ok(size) = i64::try_from(catalog_size) else {
        return 0;
    };
    if size == 0 {
        return 0;
    }
    let start = week_start_sunday(date);
    let hash = i64::from(start.year()) * EVENT_HASH_YEAR_FACTOR
        + i64::from(start.month0()) * EVENT_HASH_MONTH_FACTOR
        + i64::from(start.day());
    usize::try_from(hash.rem_euclid(size)).unwrap_or(0)
}

const fn default_min_glasses() -> u8 {
    WATER_GOAL_GLASSES
}

/// What a weekly event counts over the seven days of its week.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum EventRule {
    WaterGoalDays {
        days: u32,
        #[serde(default = "default_min_glasses")]
        min_glasses: u8,
    },
    ComplianceDays {
        days: u32,
    },
    PerfectDays {
        days: u32,
    },
    FlagCount {
        flag: DrinkFlag,
        count: u32,
    },
    /// Tracked days with at most `max_cups` coffees.
    ///
    /// Days without a record do not count. Scoring them as zero cups would
    /// complete the event on the week's first day, since the days still ahead
    /// are untracked.
    CoffeeAtMostDays {
        max_cups: u8,
        days: u32,
    },
    WeightLogs {
        days: u32,
    },
    WeighBeforeHour {
        count: u32,
        hour: u32,
    },
    TrackAfterHour {
        count: u32,
        hour: u32,
    },
    /// Saved tips carry no day granularity; always scores 0.
    SavedTips {
        count: u32,
    },
    /// Chat history carries no day granularity; always scores 0.
    ChatMessages {
        count: u32,
    },
}

impl EventRule {
    #[must_use]
    pub const fn target(&self) -> u32 {
        match *self {
            Self::WaterGoalDays { days, .. }
            | Self::ComplianceDays { days }
            | Self::PerfectDays { days }
            | Self::CoffeeAtMostDays { days, .. }
            | Self::WeightLogs { days } => days,
            Self::FlagCount { count, .. }
            | Self::WeighBeforeHour { count, .. }
            | Self::TrackAfterHour { count, .. }
            | Self::SavedTips { count }
            | Self::ChatMessages { count } => count,
        }
    }

    fn matches(&self, record: &DayRecord) -> bool {
        match *self {
            Self::WaterGoalDays { min_glasses, .. } => record.drinks.water >= min_glasses,
            Self::ComplianceDays { .. } => record.pills.both(),
            Self::PerfectDays { .. } => record.is_perfect(),
            Self::FlagCount { flag, .. } => record.drinks.flag(flag),
            Self::CoffeeAtMostDays { max_cups, .. } => record.drinks.coffee <= max_cups,
            Self::WeightLogs { .. } => record.has_weight(),
            Self::WeighBeforeHour { hour, .. } => weighed_before(record, hour),
            Self::TrackAfterHour { hour, .. } => tracked_after(record, hour),
            Self::SavedTips { .. } | Self::ChatMessages { .. } => false,
        }
    }

    /// Number of the given days satisfying the rule.
    pub fn value<'a>(&self, days: impl IntoIterator<Item = &'a DayRecord>) -> usize {
        days.into_iter().filter(|r| self.matches(r)).count()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyEventDefinition {
    pub id: String,
    pub title: Localized,
    pub description: Localized,
    pub rule: EventRule,
    pub xp: u32,
    pub bonus_percent: f64,
}

impl WeeklyEventDefinition {
    /// `round(xp * bonus_percent)` with the percentage held to `0.05..=0.15`.
    #[must_use]
    pub fn bonus_xp(&self) -> u32 {
        let pct = if self.bonus_percent.is_finite() {
            self.bonus_percent.clamp(EVENT_BONUS_MIN, EVENT_BONUS_MAX)
        } else {
            EVENT_BONUS_MIN
        };
        let bonus = round_f64_to_i64(f64::from(self.xp) * pct);
        u32::try_from(bonus).unwrap_or(0)
    }

    #[must_use]
    pub fn total_xp(&self) -> u32 {
        self.xp.saturating_add(self.bonus_xp())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct EventCatalog {
    #[serde(default)]
    pub events: Vec<WeeklyEventDefinition>,
}

impl EventCatalog {
    #[must_use]
    pub fn load_from_static() -> Self {
        Self::from_json(DEFAULT_EVENT_DATA).unwrap_or_else(|err| {
            log::error!("bundled weekly event catalog failed to parse: {err}");
            Self::default()
        })
    }

    #[must_use]
    pub fn default_catalog() -> &'static Self {
        static CATALOG: OnceLock<EventCatalog> = OnceLock::new();
        CATALOG.get_or_init(Self::load_from_static)
    }

    /// # Errors
    ///
    /// Returns an error if the JSON cannot be parsed into an event catalog.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    #[must_use]
    pub fn event_for(&self, date: NaiveDate) -> Option<&WeeklyEventDefinition> {
        self.events.get(event_index_for(date, self.events.len()))
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&WeeklyEventDefinition> {
        self.events.iter().find(|ev| ev.id == id)
    }
}

/// The event running in the week that contains `date`.
#[must_use]
pub fn current_weekly_event(date: NaiveDate) -> Option<&'static WeeklyEventDefinition> {
    EventCatalog::default_catalog().event_for(date)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventProgress {
    pub value: usize,
    pub target: u32,
    pub percent: u8,
    pub completed: bool,
}

#[must_use]
pub fn compute_event_progress(
    day_keys: &[NaiveDate],
    state: &TrackerState,
    event: &WeeklyEventDefinition,
) -> EventProgress {
    let records = day_keys.iter().filter_map(|key| state.days.get(*key));
    let value = event.rule.value(records);
    let target = event.rule.target();
    let percent = count_percent(value, target);
    EventProgress {
        value,
        target,
        percent,
        completed: percent >= 100,
    }
}

/// Stored outcome for one week.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventHistoryEntry {
    pub id: String,
    pub completed: bool,
    /// Base XP plus bonus, fixed at completion.
    pub xp: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<NaiveDateTime>,
}

/// Week key → outcome. Completed entries are never overwritten.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventHistory(BTreeMap<String, EventHistoryEntry>);

impl EventHistory {
    #[must_use]
    pub fn get(&self, week_key: &str) -> Option<&EventHistoryEntry> {
        self.0.get(week_key)
    }

    #[must_use]
    pub fn is_completed(&self, week_key: &str) -> bool {
        self.0.get(week_key).is_some_and(|entry| entry.completed)
    }

    /// Store a completion unless the week already has one.
    ///
    /// Returns `false` (and leaves history untouched) when the week was
    /// already completed.
    pub fn record_completion(&mut self, week_key: &str, entry: EventHistoryEntry) -> bool {
        if self.is_completed(week_key) {
            return false;
        }
        self.0.insert(week_key.to_string(), entry);
        true
    }

    #[must_use]
    pub fn completed_count(&self) -> usize {
        self.0.values().filter(|entry| entry.completed).count()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &EventHistoryEntry)> {
        self.0.iter().map(|(key, entry)| (key.as_str(), entry))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn week_range_runs_sunday_to_saturday() {
        let range = get_week_range(ymd(2024, 1, 3));
        assert_eq!(range.start, ymd(2023, 12, 31));
        assert_eq!(range.end, ymd(2024, 1, 6));
        assert_eq!(range.day_keys[0], range.start);
        assert_eq!(range.day_keys[6], range.end);
        assert_eq!(range.week_key, "2023-W52");
        assert_eq!(get_week_range(ymd(2024, 1, 7)).week_key, "2024-W0");
        assert_eq!(get_week_range(ymd(2024, 1, 20)).week_key, "2024-W1");
    }

    #[test]
    fn event_index_hashes_the_week_start() {
        // 2023-12-31: 2023 * 37 + 11 * 5 + 31 = 74937, 74937 % 28 = 9
        assert_eq!(event_index_for(ymd(2024, 1, 3), 28), 9);
        for d in 0..7 {
            assert_eq!(
                event_index_for(add_days(ymd(2023, 12, 31), d), 28),
                9,
                "same week, same event"
            );
        }
        assert_eq!(event_index_for(ymd(2024, 1, 3), 0), 0);
        assert_eq!(event_index_for(ymd(2024, 1, 3), 1), 0);
    }

    #[test]
    fn bundled_catalog_is_well_formed() {
        let catalog = EventCatalog::from_json(DEFAULT_EVENT_DATA).unwrap();
        assert!(catalog.events.len() >= 20);
        for ev in &catalog.events {
            assert!(
                (EVENT_BONUS_MIN..=EVENT_BONUS_MAX).contains(&ev.bonus_percent),
                "{} bonus out of range",
                ev.id
            );
            assert!(ev.rule.target() > 0, "{} has no target", ev.id);
        }
        assert!(catalog.get("water_boost").is_some());
        assert!(catalog.get("save_tips").is_some());
        assert!(catalog.get("chat_week").is_some());
    }

    #[test]
    fn water_boost_completes_on_four_goal_days() {
        let catalog = EventCatalog::default_catalog();
        let event = catalog.get("water_boost").unwrap();
        let range = get_week_range(ymd(2024, 3, 13));
        let mut state = TrackerState::default();
        for key in &range.day_keys[..3] {
            state.days.ensure_day(*key).drinks.water = 6;
        }
        let partial = compute_event_progress(&range.day_keys, &state, event);
        assert_eq!(partial.percent, 75);
        assert!(!partial.completed);

        state.days.ensure_day(range.day_keys[5]).drinks.water = 7;
        // outside the week: must not count
        state.days.ensure_day(add_days(range.start, -1)).drinks.water = 9;
        let done = compute_event_progress(&range.day_keys, &state, event);
        assert_eq!(done.value, 4);
        assert_eq!(done.percent, 100);
        assert!(done.completed);
    }

    #[test]
    fn coffee_limit_counts_only_tracked_days() {
        let event = EventCatalog::default_catalog().get("coffee_moderation_5").unwrap();
        let range = get_week_range(ymd(2024, 3, 13));
        let mut state = TrackerState::default();
        let untracked = compute_event_progress(&range.day_keys, &state, event);
        assert_eq!(untracked.value, 0);
        assert!(!untracked.completed);

        state.days.ensure_day(range.day_keys[0]).drinks.coffee = 1;
        state.days.ensure_day(range.day_keys[1]).drinks.coffee = 3;
        state.days.ensure_day(range.day_keys[2]).drinks.coffee = 4;
        let tracked = compute_event_progress(&range.day_keys, &state, event);
        assert_eq!(tracked.value, 2);
    }

    #[test]
    fn placeholder_events_never_progress() {
        let catalog = EventCatalog::default_catalog();
        let range = get_week_range(ymd(2024, 3, 13));
        let mut state = TrackerState::default();
        for key in range.day_keys {
            state.days.ensure_day(key).drinks.water = 10;
        }
        for id in ["save_tips", "chat_week"] {
            let event = catalog.get(id).unwrap();
            let progress = compute_event_progress(&range.day_keys, &state, event);
            assert_eq!(progress.percent, 0);
            assert!(!progress.completed);
        }
    }

    #[test]
    fn bonus_is_rounded_and_clamped() {
        let mut ev = EventCatalog::default_catalog().get("water_boost").unwrap().clone();
        ev.xp = 180;
        ev.bonus_percent = 0.1;
        assert_eq!(ev.bonus_xp(), 18);
        assert_eq!(ev.total_xp(), 198);
        ev.bonus_percent = 0.9;
        assert_eq!(ev.bonus_xp(), 27);
        ev.bonus_percent = f64::NAN;
        assert_eq!(ev.bonus_xp(), 9);
    }

    #[test]
    fn history_is_first_writer_wins() {
        let mut history = EventHistory::default();
        let entry = |xp| EventHistoryEntry {
            id: "water_boost".to_string(),
            completed: true,
            xp,
            completed_at: None,
        };
        assert!(history.record_completion("2024-W10", entry(198)));
        assert!(!history.record_completion("2024-W10", entry(500)));
        assert_eq!(history.get("2024-W10").unwrap().xp, 198);
        assert_eq!(history.completed_count(), 1);
    }
}
