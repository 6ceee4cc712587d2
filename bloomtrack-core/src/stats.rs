//! Windowed aggregates over the daily log.
//!
//! Every function here is total: an empty or weight-less log yields zero
//! rather than NaN, so achievement and event rules can consume the results
//! without further guarding.
use chrono::{Datelike, NaiveDate, Timelike};
use serde::{Deserialize, Serialize};

use crate::constants::{
    OUTLIER_HIGH_FACTOR, OUTLIER_LOW_FACTOR, OUTLIER_MIN_SAMPLES, OUTLIER_WINDOW_DAYS,
    WEIGHT_EWMA_ALPHA,
};
use crate::date::days_between;
use crate::day::{DayLog, DayRecord, DrinkCounter};
use crate::numbers::{clamp_percent, count_to_f64};

/// Number of records satisfying `pred`.
pub fn count_days(log: &DayLog, pred: impl Fn(&DayRecord) -> bool) -> usize {
    log.records().filter(|r| pred(r)).count()
}

/// Days with both pills taken.
#[must_use]
pub fn compliance_days(log: &DayLog) -> usize {
    count_days(log, |r| r.pills.both())
}

#[must_use]
pub fn water_goal_days(log: &DayLog, min_glasses: u8) -> usize {
    count_days(log, |r| r.drinks.water >= min_glasses)
}

/// Days strictly under `limit` coffees.
#[must_use]
pub fn coffee_under_days(log: &DayLog, limit: u8) -> usize {
    count_days(log, |r| r.drinks.coffee < limit)
}

#[must_use]
pub fn perfect_days(log: &DayLog) -> usize {
    count_days(log, DayRecord::is_perfect)
}

#[must_use]
pub fn weight_log_days(log: &DayLog) -> usize {
    count_days(log, DayRecord::has_weight)
}

/// Weighed with a capture time before `hour` (local clock).
#[must_use]
pub fn weighed_before_hour(log: &DayLog, hour: u32) -> usize {
    count_days(log, |r| weighed_before(r, hour))
}

/// Weight captured at or after `hour` (local clock).
#[must_use]
pub fn tracked_after_hour(log: &DayLog, hour: u32) -> usize {
    count_days(log, |r| tracked_after(r, hour))
}

pub(crate) fn weighed_before(record: &DayRecord, hour: u32) -> bool {
    record.has_weight() && record.weight_time.is_some_and(|t| t.hour() < hour)
}

pub(crate) fn tracked_after(record: &DayRecord, hour: u32) -> bool {
    record.weight_time.is_some_and(|t| t.hour() >= hour)
}

/// Longest run of calendar-consecutive days satisfying `pred`.
pub fn longest_streak(log: &DayLog, pred: impl Fn(&DayRecord) -> bool) -> usize {
    let mut best = 0;
    let mut current = 0;
    let mut previous: Option<NaiveDate> = None;
    for record in log.records() {
        if pred(record) {
            let continues = previous.is_some_and(|p| days_between(p, record.date) == 1);
            current = if continues { current + 1 } else { 1 };
            best = best.max(current);
            previous = Some(record.date);
        } else {
            current = 0;
            previous = None;
        }
    }
    best
}

/// Run of consecutive days satisfying `pred` ending at `today` (or yesterday
/// when today has not been satisfied yet).
pub fn current_streak(log: &DayLog, today: NaiveDate, pred: impl Fn(&DayRecord) -> bool) -> usize {
    let mut day = if log.get(today).is_some_and(&pred) {
        Some(today)
    } else {
        today.pred_opt()
    };
    let mut streak = 0;
    while let Some(current) = day.filter(|d| log.get(*d).is_some_and(&pred)) {
        streak += 1;
        day = current.pred_opt();
    }
    streak
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / count_to_f64(values.len())
}

fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    sorted[sorted.len() / 2]
}

/// Mean of a drink counter over the last `n` records.
#[must_use]
pub fn average_last(log: &DayLog, n: usize, counter: DrinkCounter) -> f64 {
    let values: Vec<f64> = log
        .last_n(n)
        .iter()
        .map(|r| f64::from(r.drinks.counter(counter)))
        .collect();
    mean(&values)
}

/// Share of tracked days with both pills, in `0.0..=1.0`.
#[must_use]
pub fn compliance_rate(log: &DayLog) -> f64 {
    if log.is_empty() {
        return 0.0;
    }
    count_to_f64(compliance_days(log)) / count_to_f64(log.len())
}

/// Pill compliance over the last `n` records, in `0.0..=1.0`.
#[must_use]
pub fn recent_compliance_rate(log: &DayLog, n: usize) -> f64 {
    let recent = log.last_n(n);
    if recent.is_empty() {
        return 0.0;
    }
    let taken = recent.iter().filter(|r| r.pills.both()).count();
    count_to_f64(taken) / count_to_f64(recent.len())
}

/// Weights in date order.
#[must_use]
pub fn weight_series(log: &DayLog) -> Vec<f64> {
    log.records().filter_map(DayRecord::weight_kg).collect()
}

/// Last minus first recorded weight; zero with fewer than two entries.
#[must_use]
pub fn weight_delta(log: &DayLog) -> f64 {
    match weight_series(log).as_slice() {
        [first, .., last] => last - first,
        _ => 0.0,
    }
}

/// Average change per weigh-in (negative means losing).
#[must_use]
pub fn weight_trend_per_day(log: &DayLog) -> f64 {
    let series = weight_series(log);
    match series.as_slice() {
        [first, .., last] => (last - first) / count_to_f64(series.len() - 1),
        _ => 0.0,
    }
}

/// Exponentially weighted moving average of the weight series.
#[must_use]
pub fn weight_ewma(log: &DayLog, alpha: f64) -> Option<f64> {
    let series = weight_series(log);
    let (first, rest) = series.split_first()?;
    let alpha = alpha.clamp(0.0, 1.0);
    Some(
        rest.iter()
            .fold(*first, |acc, w| alpha.mul_add(*w, (1.0 - alpha) * acc)),
    )
}

/// Linear projection `days_ahead` weigh-ins past the latest weight.
#[must_use]
pub fn weight_forecast(log: &DayLog, days_ahead: u32) -> Option<f64> {
    let series = weight_series(log);
    if series.len() < 2 {
        return None;
    }
    let last = *series.last()?;
    Some(weight_trend_per_day(log).mul_add(f64::from(days_ahead), last))
}

/// Water days far from the recent median.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WaterOutliers {
    pub median: f64,
    pub high_threshold: f64,
    pub low_threshold: f64,
    pub high_days: usize,
    pub low_days: usize,
}

/// Outliers among the last 14 water counts; `None` with fewer than 5 samples.
#[must_use]
pub fn water_outliers(log: &DayLog) -> Option<WaterOutliers> {
    let recent: Vec<f64> = log
        .last_n(OUTLIER_WINDOW_DAYS)
        .iter()
        .map(|r| f64::from(r.drinks.water))
        .collect();
    if recent.len() < OUTLIER_MIN_SAMPLES {
        return None;
    }
    let med = median(&recent);
    let high_threshold = med * OUTLIER_HIGH_FACTOR;
    let low_threshold = med * OUTLIER_LOW_FACTOR;
    Some(WaterOutliers {
        median: med,
        high_threshold,
        low_threshold,
        high_days: recent.iter().filter(|w| **w > high_threshold).count(),
        low_days: recent.iter().filter(|w| **w < low_threshold).count(),
    })
}

fn day_adherence(record: &DayRecord) -> f64 {
    let mut score = 0.0;
    if record.pills.both() {
        score += 40.0;
    }
    score += (f64::from(record.drinks.water) * 5.0).min(30.0);
    if record.has_weight() {
        score += 15.0;
    }
    if record.drinks.sport {
        score += 15.0;
    }
    score
}

/// Average daily adherence score (0..=100) over the last `window` records.
#[must_use]
pub fn adherence_score(log: &DayLog, window: usize) -> u8 {
    let scores: Vec<f64> = log.last_n(window).into_iter().map(day_adherence).collect();
    clamp_percent(mean(&scores))
}

/// Mean water per weekday, Sunday first.
#[must_use]
pub fn weekday_water_averages(log: &DayLog) -> [f64; 7] {
    let mut sums = [0.0_f64; 7];
    let mut counts = [0_usize; 7];
    for record in log.records() {
        let idx = usize::try_from(record.date.weekday().num_days_from_sunday()).unwrap_or(0);
        sums[idx] += f64::from(record.drinks.water);
        counts[idx] += 1;
    }
    let mut out = [0.0; 7];
    for (idx, slot) in out.iter_mut().enumerate() {
        if counts[idx] > 0 {
            *slot = sums[idx] / count_to_f64(counts[idx]);
        }
    }
    out
}

/// Dashboard statistics bundle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtendedStats {
    pub water_avg_7: f64,
    pub water_avg_30: f64,
    pub weight_trend_per_day: f64,
    pub compliance_rate: f64,
    pub best_perfect_streak: usize,
    pub weight_ewma: Option<f64>,
}

#[must_use]
pub fn compute_extended_stats(log: &DayLog) -> ExtendedStats {
    ExtendedStats {
        water_avg_7: average_last(log, 7, DrinkCounter::Water),
        water_avg_30: average_last(log, 30, DrinkCounter::Water),
        weight_trend_per_day: weight_trend_per_day(log),
        compliance_rate: compliance_rate(log),
        best_perfect_streak: longest_streak(log, DayRecord::is_perfect),
        weight_ewma: weight_ewma(log, WEIGHT_EWMA_ALPHA),
    }
}
