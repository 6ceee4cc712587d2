//! The single persisted snapshot the tracker evolves.
//!
//! Field names are part of the storage format: older snapshots must keep
//! loading, so every field defaults when absent.
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::constants::{DRINK_COUNTER_MAX, MAX_PERIOD_LENGTH_DAYS};
use crate::cycle::{CycleDayLog, CycleInterval};
use crate::date::add_days;
use crate::day::{DayLog, Goal};
use crate::events::EventHistory;
use crate::locale::Language;
use crate::reminders::Reminder;
use crate::xp::{XpLedger, XpSource, level};

const NOTE_RECONCILED_BALANCE: &str = "reconciled balance";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatSender {
    User,
    Bot,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: String,
    pub sender: ChatSender,
    pub text: String,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedMessage {
    pub id: String,
    pub title: String,
    pub text: String,
    pub created_at: NaiveDateTime,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThemeName {
    #[default]
    PinkDefault,
    PinkPastel,
    PinkVibrant,
    GoldenPink,
}

impl ThemeName {
    /// Level reward that must be reached before the theme can be picked.
    #[must_use]
    pub const fn required_reward(self) -> Option<&'static str> {
        match self {
            Self::GoldenPink => Some("golden_pink_theme"),
            Self::PinkDefault | Self::PinkPastel | Self::PinkVibrant => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackerState {
    #[serde(default)]
    pub days: DayLog,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub goal: Option<Goal>,
    #[serde(default)]
    pub reminders: Vec<Reminder>,
    #[serde(default)]
    pub chat: Vec<ChatMessage>,
    #[serde(default)]
    pub saved: Vec<SavedMessage>,
    #[serde(default)]
    pub achievements_unlocked: BTreeSet<String>,
    /// Cached running total of `xp_log`.
    #[serde(default)]
    pub xp: i64,
    #[serde(default)]
    pub language: Language,
    #[serde(default)]
    pub theme: ThemeName,
    #[serde(default)]
    pub event_history: EventHistory,
    #[serde(default)]
    pub rewards_seen: BTreeMap<String, bool>,
    #[serde(default)]
    pub xp_log: XpLedger,
    #[serde(default)]
    pub cycles: Vec<CycleInterval>,
    #[serde(default)]
    pub cycle_logs: BTreeMap<NaiveDate, CycleDayLog>,
}

/// What [`TrackerState::normalize`] had to repair.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizeReport {
    pub realigned_days: usize,
    pub clamped_counters: usize,
    pub dropped_weights: usize,
    pub clamped_cycle_logs: usize,
    pub closed_cycles: usize,
    pub fixed_cycle_ends: usize,
    /// Difference booked to the ledger so the cached total matches it.
    pub reconciled_xp: i64,
}

impl NormalizeReport {
    #[must_use]
    pub const fn is_clean(&self) -> bool {
        self.realigned_days == 0
            && self.clamped_counters == 0
            && self.dropped_weights == 0
            && self.clamped_cycle_logs == 0
            && self.closed_cycles == 0
            && self.fixed_cycle_ends == 0
            && self.reconciled_xp == 0
    }
}

impl TrackerState {
    #[must_use]
    pub fn level(&self) -> u32 {
        level(self.xp)
    }

    /// Cached total equals the ledger sum.
    #[must_use]
    pub fn ledger_consistent(&self) -> bool {
        self.xp == self.xp_log.total()
    }

    #[must_use]
    pub fn open_cycle(&self) -> Option<&CycleInterval> {
        crate::cycle::open_interval(&self.cycles)
    }

    /// Repair a snapshot loaded from storage.
    ///
    /// Clamps drink counters and cycle scales, drops non-finite weights,
    /// closes every open cycle except the newest (the day before the next
    /// start), and books any gap between the cached XP and the ledger as a
    /// single ledger entry stamped `now`. A healthy snapshot is left as is.
    pub fn normalize(&mut self, now: NaiveDateTime) -> NormalizeReport {
        let mut report = NormalizeReport {
            realigned_days: self.days.realign_dates(),
            ..NormalizeReport::default()
        };
        for record in self.days.records_mut() {
            for counter in [&mut record.drinks.water, &mut record.drinks.coffee] {
                if *counter > DRINK_COUNTER_MAX {
                    *counter = DRINK_COUNTER_MAX;
                    report.clamped_counters += 1;
                }
            }
            if record.weight.is_some() && record.weight_kg().is_none() {
                record.weight = None;
                record.weight_time = None;
                report.dropped_weights += 1;
            }
        }
        for log in self.cycle_logs.values_mut() {
            if log.clamp_in_place() {
                report.clamped_cycle_logs += 1;
            }
        }
        self.repair_cycles(&mut report);

        let ledger_total = self.xp_log.total();
        if self.xp != ledger_total {
            report.reconciled_xp = self.xp - ledger_total;
            self.xp_log.append(
                now,
                report.reconciled_xp,
                XpSource::Other,
                Some(NOTE_RECONCILED_BALANCE.to_string()),
            );
            self.xp = self.xp_log.total();
        }

        if !report.is_clean() {
            log::warn!("snapshot repaired on load: {report:?}");
        }
        report
    }

    fn repair_cycles(&mut self, report: &mut NormalizeReport) {
        self.cycles.sort_by_key(|c| c.start);
        for cycle in &mut self.cycles {
            if cycle.end.is_some_and(|end| end < cycle.start) {
                cycle.end = Some(cycle.start);
                report.fixed_cycle_ends += 1;
            }
            let longest = latest_period_end(cycle.start);
            if cycle.end.is_some_and(|end| end > longest) {
                cycle.end = Some(longest);
                report.fixed_cycle_ends += 1;
            }
        }
        let last = self.cycles.len().saturating_sub(1);
        let next_starts: Vec<Option<NaiveDate>> = (0..self.cycles.len())
            .map(|idx| self.cycles.get(idx + 1).map(|c| c.start))
            .collect();
        for (idx, cycle) in self.cycles.iter_mut().enumerate() {
            if idx == last || !cycle.is_open() {
                continue;
            }
            let end = next_starts[idx].map_or(cycle.start, |next| add_days(next, -1));
            cycle.end = Some(end.clamp(cycle.start, latest_period_end(cycle.start)));
            report.closed_cycles += 1;
        }
    }
}

fn latest_period_end(start: NaiveDate) -> NaiveDate {
    add_days(start, MAX_PERIOD_LENGTH_DAYS - 1)
}
