//! Compact read-only digest of the snapshot for the chat/insights collaborator.
use chrono::NaiveDate;
use serde::Serialize;

use crate::constants::{SUMMARY_ADHERENCE_WINDOW_DAYS, SUMMARY_DRINK_WINDOW_DAYS};
use crate::cycle::predict_next_start;
use crate::day::DrinkCounter;
use crate::events::{compute_event_progress, current_weekly_event, get_week_range};
use crate::numbers::clamp_percent;
use crate::state::TrackerState;
use crate::stats;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyEventSummary {
    pub id: String,
    pub title: String,
    pub percent: u8,
    pub completed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompactSummary {
    pub water_avg_14: f64,
    pub coffee_avg_14: f64,
    /// Days with both pills among the last seven tracked days, in percent.
    pub pill_adherence_7: u8,
    pub last_weight: Option<f64>,
    pub weight_trend_per_day: f64,
    pub level: u32,
    pub xp: i64,
    pub weekly_event: Option<WeeklyEventSummary>,
    pub next_cycle_start: Option<NaiveDate>,
}

#[must_use]
pub fn build_compact_summary(state: &TrackerState, today: NaiveDate) -> CompactSummary {
    let days = &state.days;
    let range = get_week_range(today);
    let weekly_event = current_weekly_event(today).map(|event| {
        let progress = compute_event_progress(&range.day_keys, state, event);
        WeeklyEventSummary {
            id: event.id.clone(),
            title: event.title.get(state.language).to_string(),
            percent: progress.percent,
            completed: state.event_history.is_completed(&range.week_key),
        }
    });
    CompactSummary {
        water_avg_14: stats::average_last(days, SUMMARY_DRINK_WINDOW_DAYS, DrinkCounter::Water),
        coffee_avg_14: stats::average_last(days, SUMMARY_DRINK_WINDOW_DAYS, DrinkCounter::Coffee),
        pill_adherence_7: clamp_percent(
            stats::recent_compliance_rate(days, SUMMARY_ADHERENCE_WINDOW_DAYS) * 100.0,
        ),
        last_weight: days.latest_weight(),
        weight_trend_per_day: stats::weight_trend_per_day(days),
        level: state.level(),
        xp: state.xp,
        weekly_event,
        next_cycle_start: predict_next_start(&state.cycles),
    }
}
