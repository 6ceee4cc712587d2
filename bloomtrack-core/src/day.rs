//! Daily log model: one record per calendar day plus the optional weight goal.
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::collections::BTreeMap;
use std::fmt;

use crate::constants::{DRINK_COUNTER_MAX, WATER_GOAL_GLASSES};
use crate::numbers::clamp_percent;

/// Morning/evening pill slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PillSlot {
    Morning,
    Evening,
}

/// Counted drinks; both clamp to `0..=DRINK_COUNTER_MAX`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DrinkCounter {
    Water,
    Coffee,
}

/// Boolean drink/activity flags tracked per day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DrinkFlag {
    SlimCoffee,
    GingerGarlicTea,
    WaterCure,
    Sport,
}

impl DrinkFlag {
    pub const ALL: [Self; 4] = [
        Self::SlimCoffee,
        Self::GingerGarlicTea,
        Self::WaterCure,
        Self::Sport,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SlimCoffee => "slimCoffee",
            Self::GingerGarlicTea => "gingerGarlicTea",
            Self::WaterCure => "waterCure",
            Self::Sport => "sport",
        }
    }

    #[must_use]
    pub const fn marker(self) -> XpMarker {
        match self {
            Self::SlimCoffee => XpMarker::SlimCoffee,
            Self::GingerGarlicTea => XpMarker::GingerGarlicTea,
            Self::WaterCure => XpMarker::WaterCure,
            Self::Sport => XpMarker::Sport,
        }
    }
}

impl fmt::Display for DrinkFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Field whose first false→true transition of the day has already paid XP.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum XpMarker {
    MorningPill,
    EveningPill,
    SlimCoffee,
    GingerGarlicTea,
    WaterCure,
    Sport,
    Weight,
}

impl From<PillSlot> for XpMarker {
    fn from(slot: PillSlot) -> Self {
        match slot {
            PillSlot::Morning => Self::MorningPill,
            PillSlot::Evening => Self::EveningPill,
        }
    }
}

/// Per-day "awarded XP today" markers.
///
/// Each field moves once from untouched to awarded; the set only empties when
/// a fresh [`DayRecord`] is created.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct XpMarkers(SmallVec<[XpMarker; 4]>);

impl XpMarkers {
    #[must_use]
    pub fn is_awarded(&self, marker: XpMarker) -> bool {
        self.0.contains(&marker)
    }

    /// Marks the field as awarded, returning `true` if this is the first award today.
    pub fn award(&mut self, marker: XpMarker) -> bool {
        if self.is_awarded(marker) {
            return false;
        }
        self.0.push(marker);
        true
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

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pills {
    #[serde(default)]
    pub morning: bool,
    #[serde(default)]
    pub evening: bool,
}

impl Pills {
    #[must_use]
    pub const fn get(&self, slot: PillSlot) -> bool {
        match slot {
            PillSlot::Morning => self.morning,
            PillSlot::Evening => self.evening,
        }
    }

    pub const fn set(&mut self, slot: PillSlot, taken: bool) {
        match slot {
            PillSlot::Morning => self.morning = taken,
            PillSlot::Evening => self.evening = taken,
        }
    }

    #[must_use]
    pub const fn both(&self) -> bool {
        self.morning && self.evening
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Drinks {
    #[serde(default)]
    pub water: u8,
    #[serde(default)]
    pub coffee: u8,
    #[serde(default)]
    pub slim_coffee: bool,
    #[serde(default)]
    pub ginger_garlic_tea: bool,
    #[serde(default)]
    pub water_cure: bool,
    #[serde(default)]
    pub sport: bool,
}

impl Drinks {
    #[must_use]
    pub const fn counter(&self, counter: DrinkCounter) -> u8 {
        match counter {
            DrinkCounter::Water => self.water,
            DrinkCounter::Coffee => self.coffee,
        }
    }

    /// Stores the clamped value and returns what was stored.
    pub fn set_counter(&mut self, counter: DrinkCounter, value: i32) -> u8 {
        let clamped = clamp_counter(value);
        match counter {
            DrinkCounter::Water => self.water = clamped,
            DrinkCounter::Coffee => self.coffee = clamped,
        }
        clamped
    }

    #[must_use]
    pub const fn flag(&self, flag: DrinkFlag) -> bool {
        match flag {
            DrinkFlag::SlimCoffee => self.slim_coffee,
            DrinkFlag::GingerGarlicTea => self.ginger_garlic_tea,
            DrinkFlag::WaterCure => self.water_cure,
            DrinkFlag::Sport => self.sport,
        }
    }

    pub const fn set_flag(&mut self, flag: DrinkFlag, value: bool) {
        match flag {
            DrinkFlag::SlimCoffee => self.slim_coffee = value,
            DrinkFlag::GingerGarlicTea => self.ginger_garlic_tea = value,
            DrinkFlag::WaterCure => self.water_cure = value,
            DrinkFlag::Sport => self.sport = value,
        }
    }
}

/// Clamp an arbitrary counter value into `0..=DRINK_COUNTER_MAX`.
#[must_use]
pub fn clamp_counter(value: i32) -> u8 {
    let clamped = value.clamp(0, i32::from(DRINK_COUNTER_MAX));
    u8::try_from(clamped).unwrap_or(DRINK_COUNTER_MAX)
}

/// One calendar day's tracked health actions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DayRecord {
    pub date: NaiveDate,
    #[serde(default)]
    pub pills: Pills,
    #[serde(default)]
    pub drinks: Drinks,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight_time: Option<NaiveDateTime>,
    #[serde(default, skip_serializing_if = "XpMarkers::is_empty")]
    pub xp_markers: XpMarkers,
}

impl DayRecord {
    /// Fresh record with nothing tracked and no XP markers.
    #[must_use]
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            pills: Pills::default(),
            drinks: Drinks::default(),
            weight: None,
            weight_time: None,
            xp_markers: XpMarkers::default(),
        }
    }

    /// Weight present and finite.
    #[must_use]
    pub fn weight_kg(&self) -> Option<f64> {
        self.weight.filter(|w| w.is_finite())
    }

    #[must_use]
    pub fn has_weight(&self) -> bool {
        self.weight_kg().is_some()
    }

    #[must_use]
    pub const fn met_water_goal(&self) -> bool {
        self.drinks.water >= WATER_GOAL_GLASSES
    }

    /// Both pills, water goal and a weight entry.
    #[must_use]
    pub fn is_perfect(&self) -> bool {
        self.pills.both() && self.met_water_goal() && self.has_weight()
    }
}

/// Date-ordered map of day records.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DayLog(BTreeMap<NaiveDate, DayRecord>);

impl DayLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, date: NaiveDate) -> Option<&DayRecord> {
        self.0.get(&date)
    }

    /// Existing record for `date`, or a freshly created one.
    pub fn ensure_day(&mut self, date: NaiveDate) -> &mut DayRecord {
        self.0.entry(date).or_insert_with(|| DayRecord::new(date))
    }

    /// Replace the record for its date; markers travel with the record.
    pub fn insert(&mut self, record: DayRecord) {
        self.0.insert(record.date, record);
    }

    pub fn remove(&mut self, date: NaiveDate) -> Option<DayRecord> {
        self.0.remove(&date)
    }

    /// Records in ascending date order.
    pub fn records(&self) -> impl DoubleEndedIterator<Item = &DayRecord> + ExactSizeIterator {
        self.0.values()
    }

    pub fn records_mut(&mut self) -> impl Iterator<Item = &mut DayRecord> {
        self.0.values_mut()
    }

    /// Records dated within `start..=end`.
    pub fn range(&self, start: NaiveDate, end: NaiveDate) -> impl Iterator<Item = &DayRecord> {
        let (lo, hi) = if start <= end { (start, end) } else { (end, start) };
        self.0.range(lo..=hi).map(|(_, record)| record)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Last `n` records in date order.
    #[must_use]
    pub fn last_n(&self, n: usize) -> Vec<&DayRecord> {
        let skip = self.0.len().saturating_sub(n);
        self.0.values().skip(skip).collect()
    }

    /// Rewrite each record's `date` to match its map key; returns how many moved.
    pub(crate) fn realign_dates(&mut self) -> usize {
        let mut fixed = 0;
        for (key, record) in &mut self.0 {
            if record.date != *key {
                record.date = *key;
                fixed += 1;
            }
        }
        fixed
    }

    /// Most recent finite weight entry.
    #[must_use]
    pub fn latest_weight(&self) -> Option<f64> {
        self.0.values().rev().find_map(DayRecord::weight_kg)
    }
}

impl FromIterator<DayRecord> for DayLog {
    fn from_iter<T: IntoIterator<Item = DayRecord>>(iter: T) -> Self {
        Self(iter.into_iter().map(|r| (r.date, r)).collect())
    }
}

/// Optional weight goal; progress is derived, never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Goal {
    pub target_weight: f64,
    pub target_date: NaiveDate,
    pub start_weight: f64,
    #[serde(default = "default_goal_active")]
    pub active: bool,
}

const fn default_goal_active() -> bool {
    true
}

impl Goal {
    /// Share of the way from start weight to target, using the latest weigh-in.
    ///
    /// Works for loss and gain goals alike. No weigh-in, an inactive goal or
    /// movement away from the target all score 0; a goal whose start equals its
    /// target scores 100 once any weight is recorded.
    #[must_use]
    pub fn progress_percent(&self, log: &DayLog) -> u8 {
        if !self.active {
            return 0;
        }
        let Some(current) = log.latest_weight() else {
            return 0;
        };
        let span = self.start_weight - self.target_weight;
        if !span.is_finite() || !current.is_finite() {
            return 0;
        }
        if span.abs() < f64::EPSILON {
            return 100;
        }
        clamp_percent((self.start_weight - current) / span * 100.0)
    }
}
