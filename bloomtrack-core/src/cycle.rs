//! Cycle intervals, predictions derived from them, and the per-day cycle diary.
//!
//! Predictions only look at start dates: the average is taken over the most
//! recent start-to-start gaps, so one irregular cycle years ago does not skew
//! the next estimate. Every function falls back to fixed defaults when the
//! history is too thin.
use chrono::{Datelike, Months, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::constants::{
    CYCLE_AVERAGE_WINDOW, CYCLE_FLOW_MAX, CYCLE_LOG_EDIT_WINDOW_DAYS, CYCLE_SCALE_MAX,
    CYCLE_SCALE_MIN, DEFAULT_CYCLE_LENGTH_DAYS, DEFAULT_PERIOD_LENGTH_DAYS,
    FERTILE_WINDOW_LEAD_DAYS, LUTEAL_PHASE_DAYS,
};
use crate::date::{add_days, days_between};
use crate::numbers::{count_to_f64, i64_to_f64, round_f64_to_i64};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleInterval {
    pub start: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<NaiveDate>,
}

impl CycleInterval {
    #[must_use]
    pub const fn open(start: NaiveDate) -> Self {
        Self { start, end: None }
    }

    #[must_use]
    pub const fn is_open(&self) -> bool {
        self.end.is_none()
    }

    /// Inclusive day count for a closed interval.
    #[must_use]
    pub fn length_days(&self) -> Option<i64> {
        self.end
            .map(|end| (days_between(self.start, end) + 1).max(1))
    }
}

/// The interval still waiting for an end date.
#[must_use]
pub fn open_interval(cycles: &[CycleInterval]) -> Option<&CycleInterval> {
    cycles.iter().rev().find(|c| c.is_open())
}

fn sorted_starts(cycles: &[CycleInterval]) -> Vec<NaiveDate> {
    let mut starts: Vec<NaiveDate> = cycles.iter().map(|c| c.start).collect();
    starts.sort_unstable();
    starts
}

fn rounded_mean_of_last(values: &[i64], window: usize) -> Option<i64> {
    let tail = &values[values.len().saturating_sub(window)..];
    if tail.is_empty() {
        return None;
    }
    let sum: i64 = tail.iter().sum();
    Some(round_f64_to_i64(i64_to_f64(sum) / count_to_f64(tail.len())))
}

/// Mean of the last three positive start-to-start gaps, or 28.
#[must_use]
pub fn average_cycle_length_days(cycles: &[CycleInterval]) -> i64 {
    let starts = sorted_starts(cycles);
    let diffs: Vec<i64> = starts
        .windows(2)
        .map(|pair| days_between(pair[0], pair[1]))
        .filter(|diff| *diff > 0)
        .collect();
    match rounded_mean_of_last(&diffs, CYCLE_AVERAGE_WINDOW) {
        Some(avg) if avg > 0 => avg,
        _ => DEFAULT_CYCLE_LENGTH_DAYS,
    }
}

/// Mean inclusive length of the last three closed intervals, or 5.
#[must_use]
pub fn average_period_length_days(cycles: &[CycleInterval]) -> i64 {
    let mut closed: Vec<&CycleInterval> = cycles.iter().filter(|c| !c.is_open()).collect();
    closed.sort_by_key(|c| c.start);
    let lengths: Vec<i64> = closed.iter().filter_map(|c| c.length_days()).collect();
    rounded_mean_of_last(&lengths, CYCLE_AVERAGE_WINDOW)
        .map_or(DEFAULT_PERIOD_LENGTH_DAYS, |avg| avg.max(1))
}

#[must_use]
pub fn predict_next_start(cycles: &[CycleInterval]) -> Option<NaiveDate> {
    let last = cycles.iter().map(|c| c.start).max()?;
    Some(add_days(last, average_cycle_length_days(cycles)))
}

/// Predicted next start minus the luteal phase.
#[must_use]
pub fn ovulation_date(cycles: &[CycleInterval]) -> Option<NaiveDate> {
    predict_next_start(cycles).map(|next| add_days(next, -LUTEAL_PHASE_DAYS))
}

/// Inclusive date range; the ovulation day itself lies just after it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FertileWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl FertileWindow {
    #[must_use]
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

/// Ovulation −5 through ovulation −1.
#[must_use]
pub fn fertile_window(cycles: &[CycleInterval]) -> Option<FertileWindow> {
    ovulation_date(cycles).map(|ov| FertileWindow {
        start: add_days(ov, -FERTILE_WINDOW_LEAD_DAYS),
        end: add_days(ov, -1),
    })
}

/// Period days inside `first..=last`, open intervals spanning `period_length`
/// days. Only the overlap of each interval with the range is walked.
#[must_use]
pub fn period_days(
    cycles: &[CycleInterval],
    period_length: i64,
    first: NaiveDate,
    last: NaiveDate,
) -> BTreeSet<NaiveDate> {
    let mut days = BTreeSet::new();
    for cycle in cycles {
        let end = cycle
            .end
            .unwrap_or_else(|| add_days(cycle.start, period_length.max(1) - 1));
        days.extend(days_in(cycle.start.max(first), end.min(last)));
    }
    days
}

fn days_in(from: NaiveDate, to: NaiveDate) -> impl Iterator<Item = NaiveDate> {
    from.iter_days().take_while(move |day| *day <= to)
}

/// First and last day of `month` (1-based), `None` for an invalid month.
fn month_bounds(year: i32, month: u32) -> Option<(NaiveDate, NaiveDate)> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let last = first
        .checked_add_months(Months::new(1))
        .map_or(NaiveDate::MAX, |next| add_days(next, -1));
    Some((first, last))
}

/// Calendar markers for one month view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthMarkers {
    /// Period days on or before today.
    pub period: BTreeSet<NaiveDate>,
    /// Period days after today.
    pub upcoming_period: BTreeSet<NaiveDate>,
    pub fertile: BTreeSet<NaiveDate>,
    pub ovulation: Option<NaiveDate>,
    pub expected: Option<NaiveDate>,
    pub avg_cycle_len: i64,
    pub avg_period_len: i64,
    pub expected_next: Option<NaiveDate>,
}

/// Markers for `month` (1-based) of `year`. An invalid month yields empty sets.
#[must_use]
pub fn month_markers(
    year: i32,
    month: u32,
    cycles: &[CycleInterval],
    today: NaiveDate,
) -> MonthMarkers {
    let avg_cycle_len = average_cycle_length_days(cycles);
    let avg_period_len = average_period_length_days(cycles);
    let expected_next = predict_next_start(cycles);
    let ovulation = ovulation_date(cycles);
    let fertile = fertile_window(cycles);
    let in_month = |d: &NaiveDate| d.year() == year && d.month() == month;

    let (period, upcoming_period, fertile_days) = match month_bounds(year, month) {
        Some((first, last)) => {
            let (period, upcoming): (BTreeSet<NaiveDate>, BTreeSet<NaiveDate>) =
                period_days(cycles, avg_period_len, first, last)
                    .into_iter()
                    .partition(|d| *d <= today);
            let fertile_days = fertile.map_or_else(BTreeSet::new, |window| {
                days_in(window.start.max(first), window.end.min(last)).collect()
            });
            (period, upcoming, fertile_days)
        }
        None => (BTreeSet::new(), BTreeSet::new(), BTreeSet::new()),
    };

    MonthMarkers {
        period,
        upcoming_period,
        fertile: fertile_days,
        ovulation: ovulation.filter(in_month),
        expected: expected_next.filter(in_month),
        avg_cycle_len,
        avg_period_len,
        expected_next,
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymptomFlags {
    #[serde(default)]
    pub sex: bool,
    #[serde(default)]
    pub cramps: bool,
    #[serde(default)]
    pub headache: bool,
    #[serde(default)]
    pub bloating: bool,
    #[serde(default)]
    pub acne: bool,
    #[serde(default)]
    pub cravings: bool,
}

/// Wellness diary for one cycle day. Scales run 1..=10, flow 0..=10.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleDayLog {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mood: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub energy: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pain: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sleep: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flow: Option<u8>,
    #[serde(default)]
    pub symptoms: SymptomFlags,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

fn clamp_scale(value: i32) -> u8 {
    let clamped = value.clamp(i32::from(CYCLE_SCALE_MIN), i32::from(CYCLE_SCALE_MAX));
    u8::try_from(clamped).unwrap_or(CYCLE_SCALE_MIN)
}

fn clamp_flow(value: i32) -> u8 {
    let clamped = value.clamp(0, i32::from(CYCLE_FLOW_MAX));
    u8::try_from(clamped).unwrap_or(0)
}

impl CycleDayLog {
    /// Bring every scale back into range; reports whether anything changed.
    pub fn clamp_in_place(&mut self) -> bool {
        let before = self.clone();
        for scale in [
            &mut self.mood,
            &mut self.energy,
            &mut self.pain,
            &mut self.sleep,
        ] {
            *scale = scale.map(|v| clamp_scale(i32::from(v)));
        }
        self.flow = self.flow.map(|v| clamp_flow(i32::from(v)));
        *self != before
    }

    /// Nothing recorded at all.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        *self == Self::default()
    }
}

/// Partial update merged into an existing [`CycleDayLog`].
///
/// Scale values arrive unclamped from the caller and are clamped on merge.
/// Empty notes clear the stored note.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleLogPatch {
    pub mood: Option<i32>,
    pub energy: Option<i32>,
    pub pain: Option<i32>,
    pub sleep: Option<i32>,
    pub flow: Option<i32>,
    pub symptoms: Option<SymptomFlags>,
    pub notes: Option<String>,
}

impl CycleLogPatch {
    pub fn apply(self, log: &mut CycleDayLog) {
        for (target, value) in [
            (&mut log.mood, self.mood),
            (&mut log.energy, self.energy),
            (&mut log.pain, self.pain),
            (&mut log.sleep, self.sleep),
        ] {
            if let Some(v) = value {
                *target = Some(clamp_scale(v));
            }
        }
        if let Some(v) = self.flow {
            log.flow = Some(clamp_flow(v));
        }
        if let Some(symptoms) = self.symptoms {
            log.symptoms = symptoms;
        }
        if let Some(notes) = self.notes {
            log.notes = if notes.trim().is_empty() {
                None
            } else {
                Some(notes)
            };
        }
    }
}

/// Today or up to seven days back. The core never enforces this itself.
#[must_use]
pub fn is_cycle_log_editable(date: NaiveDate, today: NaiveDate) -> bool {
    (0..=CYCLE_LOG_EDIT_WINDOW_DAYS).contains(&days_between(date, today))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CycleReminderKind {
    PeriodExpected,
    FertileWindowStart,
    Ovulation,
}

/// A reminder that is logically due; delivery belongs to the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CycleReminder {
    pub kind: CycleReminderKind,
    pub event_date: NaiveDate,
    pub remind_on: NaiveDate,
}

/// Upcoming cycle reminders, each due `lead_days` before its event but never
/// before `today`. Events already in the past are skipped.
#[must_use]
pub fn cycle_reminders(
    cycles: &[CycleInterval],
    today: NaiveDate,
    lead_days: u32,
) -> Vec<CycleReminder> {
    let lead = i64::from(lead_days);
    let candidates = [
        (CycleReminderKind::PeriodExpected, predict_next_start(cycles)),
        (
            CycleReminderKind::FertileWindowStart,
            fertile_window(cycles).map(|w| w.start),
        ),
        (CycleReminderKind::Ovulation, ovulation_date(cycles)),
    ];
    let mut due: Vec<CycleReminder> = candidates
        .into_iter()
        .filter_map(|(kind, date)| {
            let event_date = date.filter(|d| *d >= today)?;
            Some(CycleReminder {
                kind,
                event_date,
                remind_on: add_days(event_date, -lead).max(today),
            })
        })
        .collect();
    due.sort_by_key(|r| (r.remind_on, r.event_date));
    due
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn closed(start: NaiveDate, len: i64) -> CycleInterval {
        CycleInterval {
            start,
            end: Some(add_days(start, len - 1)),
        }
    }

    #[test]
    fn thin_history_uses_defaults() {
        assert_eq!(average_cycle_length_days(&[]), 28);
        assert_eq!(average_cycle_length_days(&[CycleInterval::open(ymd(2024, 1, 1))]), 28);
        assert_eq!(average_period_length_days(&[]), 5);
        assert!(predict_next_start(&[]).is_none());
        assert!(ovulation_date(&[]).is_none());
        assert!(fertile_window(&[]).is_none());
    }

    #[test]
    fn duplicate_starts_fall_back_to_default() {
        let cycles = [
            CycleInterval::open(ymd(2024, 1, 1)),
            closed(ymd(2024, 1, 1), 4),
        ];
        assert_eq!(average_cycle_length_days(&cycles), 28);
    }

    #[test]
    fn predictions_for_a_28_day_gap() {
        let cycles = [closed(ymd(2024, 1, 1), 5), CycleInterval::open(ymd(2024, 1, 29))];
        assert_eq!(average_cycle_length_days(&cycles), 28);
        assert_eq!(predict_next_start(&cycles), Some(ymd(2024, 2, 26)));
        assert_eq!(ovulation_date(&cycles), Some(ymd(2024, 2, 12)));
        let window = fertile_window(&cycles).unwrap();
        assert_eq!(window.start, ymd(2024, 2, 7));
        assert_eq!(window.end, ymd(2024, 2, 11));
        assert!(!window.contains(ymd(2024, 2, 12)));
    }

    #[test]
    fn average_uses_the_last_three_gaps_only() {
        // gaps: 40, 26, 28, 30 -> last three average 28
        let starts = [
            ymd(2024, 1, 1),
            ymd(2024, 2, 10),
            ymd(2024, 3, 7),
            ymd(2024, 4, 4),
            ymd(2024, 5, 4),
        ];
        let cycles: Vec<CycleInterval> = starts.iter().rev().map(|s| closed(*s, 5)).collect();
        assert_eq!(average_cycle_length_days(&cycles), 28);
    }

    #[test]
    fn period_length_uses_closed_intervals() {
        let cycles = [
            closed(ymd(2024, 1, 1), 4),
            closed(ymd(2024, 1, 29), 6),
            CycleInterval::open(ymd(2024, 2, 26)),
        ];
        assert_eq!(average_period_length_days(&cycles), 5);
        let days = period_days(&cycles, 3, ymd(2024, 1, 1), ymd(2024, 3, 31));
        assert!(days.contains(&ymd(2024, 1, 4)));
        assert!(!days.contains(&ymd(2024, 1, 5)));
        assert!(days.contains(&ymd(2024, 2, 28)));
        assert!(!days.contains(&ymd(2024, 2, 29)));
    }

    #[test]
    fn month_markers_split_confirmed_and_upcoming() {
        let cycles = [closed(ymd(2024, 1, 1), 5), CycleInterval::open(ymd(2024, 1, 29))];
        let markers = month_markers(2024, 2, &cycles, ymd(2024, 1, 30));
        // open interval spans the average period length (5): Jan 29 - Feb 2
        assert_eq!(markers.upcoming_period.len(), 2);
        assert!(markers.period.is_empty());
        assert_eq!(markers.ovulation, Some(ymd(2024, 2, 12)));
        assert_eq!(markers.expected, Some(ymd(2024, 2, 26)));
        assert_eq!(markers.fertile.len(), 5);
        let january = month_markers(2024, 1, &cycles, ymd(2024, 1, 30));
        assert_eq!(january.period.len(), 7);
        assert!(january.expected.is_none());
    }

    #[test]
    fn unbounded_end_only_walks_the_requested_range() {
        let cycles = [CycleInterval {
            start: ymd(2024, 1, 1),
            end: Some(NaiveDate::MAX),
        }];
        let days = period_days(&cycles, 5, ymd(2024, 1, 20), ymd(2024, 2, 3));
        assert_eq!(days.len(), 15);
        assert_eq!(days.first(), Some(&ymd(2024, 1, 20)));
        assert_eq!(days.last(), Some(&ymd(2024, 2, 3)));

        let tail = period_days(&cycles, 5, add_days(NaiveDate::MAX, -2), NaiveDate::MAX);
        assert!(tail.len() <= 3);

        let markers = month_markers(2024, 1, &cycles, ymd(2024, 1, 10));
        assert_eq!(markers.period.len(), 10);
        assert_eq!(markers.upcoming_period.len(), 21);
    }

    #[test]
    fn month_bounds_cover_leap_february_and_reject_bad_months() {
        assert_eq!(
            month_bounds(2024, 2),
            Some((ymd(2024, 2, 1), ymd(2024, 2, 29)))
        );
        assert_eq!(
            month_bounds(2023, 12),
            Some((ymd(2023, 12, 1), ymd(2023, 12, 31)))
        );
        assert!(month_bounds(2024, 13).is_none());
        let open = [CycleInterval::open(ymd(2024, 1, 1))];
        let markers = month_markers(2024, 0, &open, ymd(2024, 1, 2));
        assert!(markers.period.is_empty() && markers.fertile.is_empty());
    }

    #[test]
    fn patches_clamp_and_merge() {
        let mut log = CycleDayLog::default();
        CycleLogPatch {
            mood: Some(14),
            pain: Some(-2),
            flow: Some(11),
            notes: Some("tired".into()),
            ..CycleLogPatch::default()
        }
        .apply(&mut log);
        assert_eq!(log.mood, Some(10));
        assert_eq!(log.pain, Some(1));
        assert_eq!(log.flow, Some(10));
        assert!(log.energy.is_none());
        CycleLogPatch {
            notes: Some("  ".into()),
            ..CycleLogPatch::default()
        }
        .apply(&mut log);
        assert!(log.notes.is_none());
        assert_eq!(log.mood, Some(10));

        let mut corrupt = CycleDayLog {
            sleep: Some(0),
            ..CycleDayLog::default()
        };
        assert!(corrupt.clamp_in_place());
        assert_eq!(corrupt.sleep, Some(1));
        assert!(!corrupt.clamp_in_place());
    }

    #[test]
    fn edit_window_is_seven_days_without_future() {
        let today = ymd(2024, 3, 10);
        assert!(is_cycle_log_editable(today, today));
        assert!(is_cycle_log_editable(ymd(2024, 3, 3), today));
        assert!(!is_cycle_log_editable(ymd(2024, 3, 2), today));
        assert!(!is_cycle_log_editable(ymd(2024, 3, 11), today));
    }

    #[test]
    fn reminders_are_ordered_and_skip_past_events() {
        let cycles = [closed(ymd(2024, 1, 1), 5), CycleInterval::open(ymd(2024, 1, 29))];
        let reminders = cycle_reminders(&cycles, ymd(2024, 2, 1), 2);
        let kinds: Vec<_> = reminders.iter().map(|r| r.kind).collect();
        assert_eq!(
            kinds,
            vec![
                CycleReminderKind::FertileWindowStart,
                CycleReminderKind::Ovulation,
                CycleReminderKind::PeriodExpected,
            ]
        );
        assert_eq!(reminders[0].remind_on, ymd(2024, 2, 5));

        let late = cycle_reminders(&cycles, ymd(2024, 2, 20), 2);
        assert_eq!(late.len(), 1);
        assert_eq!(late[0].remind_on, ymd(2024, 2, 24));
    }
}
