use std::collections::{BTreeMap, BTreeSet};

use anyhow::{Context, Result, ensure};
use bloomtrack_core::constants::DRINK_COUNTER_MAX;
use bloomtrack_core::{TrackerState, XpSource, compute_achievements, predict_next_start};

use crate::logic::simulation::{SimulationPlan, SimulationSummary};

pub fn tracked_some_days(summary: &SimulationSummary) -> Result<()> {
    ensure!(!summary.days.is_empty(), "simulation produced no days");
    ensure!(
        !summary.final_state.days.is_empty(),
        "no day records were written"
    );
    Ok(())
}

pub fn ledger_matches_total(summary: &SimulationSummary) -> Result<()> {
    let state = &summary.final_state;
    ensure!(
        state.ledger_consistent(),
        "cached xp {} differs from ledger sum {}",
        state.xp,
        state.xp_log.total()
    );
    let entries = state.xp_log.entries();
    ensure!(
        entries.iter().all(|e| e.amount != 0),
        "ledger holds a zero entry"
    );
    ensure!(
        entries.windows(2).all(|w| w[0].id < w[1].id),
        "ledger ids are not increasing"
    );
    let day_total: i64 = summary.days.iter().map(|d| d.xp_delta).sum();
    ensure!(
        day_total == state.xp,
        "per-day deltas sum to {day_total}, state holds {}",
        state.xp
    );
    Ok(())
}

pub fn achievements_only_grow(summary: &SimulationSummary) -> Result<()> {
    for pair in summary.days.windows(2) {
        ensure!(
            pair[1].unlocked_total >= pair[0].unlocked_total,
            "unlock count dropped on {}",
            pair[1].date
        );
    }
    let mut seen = BTreeSet::new();
    for day in &summary.days {
        for id in &day.newly_unlocked {
            ensure!(seen.insert(id.clone()), "{id} unlocked twice (again on {})", day.date);
        }
    }
    let fresh = compute_achievements(&summary.final_state);
    ensure!(
        fresh.unlocked == summary.final_state.achievements_unlocked,
        "stored unlock set differs from a fresh evaluation"
    );
    Ok(())
}

pub fn events_pay_once_per_week(summary: &SimulationSummary) -> Result<()> {
    let state = &summary.final_state;
    let mut per_week: BTreeMap<String, usize> = BTreeMap::new();
    for entry in state.xp_log.entries().iter().filter(|e| e.source == XpSource::Event) {
        let week = entry
            .note
            .as_deref()
            .and_then(|note| note.rsplit(' ').next())
            .context("event entry without week note")?;
        *per_week.entry(week.to_string()).or_default() += 1;
    }
    if let Some((week, count)) = per_week.iter().find(|(_, count)| **count > 1) {
        anyhow::bail!("week {week} paid {count} times");
    }
    ensure!(
        per_week.len() == state.event_history.completed_count(),
        "{} paid weeks but {} completions recorded",
        per_week.len(),
        state.event_history.completed_count()
    );
    for (week, entry) in state.event_history.iter() {
        ensure!(per_week.contains_key(week), "completion {week} ({}) was never paid", entry.id);
    }
    Ok(())
}

pub fn penalties_were_booked(summary: &SimulationSummary) -> Result<()> {
    ensure!(
        summary.metrics.penalty_entries > 0,
        "no coffee penalty in {} days",
        summary.days.len()
    );
    ensure!(
        summary
            .final_state
            .days
            .records()
            .all(|r| r.drinks.coffee <= DRINK_COUNTER_MAX),
        "coffee counter escaped its clamp"
    );
    Ok(())
}

pub fn cycle_history_is_well_formed(summary: &SimulationSummary) -> Result<()> {
    let cycles = &summary.final_state.cycles;
    ensure!(cycles.len() >= 2, "only {} cycles started", cycles.len());
    ensure!(
        cycles.iter().filter(|c| c.is_open()).count() <= 1,
        "more than one open cycle"
    );
    for pair in cycles.windows(2) {
        ensure!(pair[0].start < pair[1].start, "cycles out of order");
        let end = pair[0].end.context("only the newest cycle may stay open")?;
        ensure!(end >= pair[0].start, "cycle ends before it starts");
        ensure!(end < pair[1].start, "cycles overlap");
    }
    let last = cycles.iter().map(|c| c.start).max().context("no cycles")?;
    let next = predict_next_start(cycles).context("no prediction")?;
    ensure!(next > last, "prediction {next} not after {last}");
    Ok(())
}

pub fn snapshot_survives_roundtrip(summary: &SimulationSummary) -> Result<()> {
    let json = serde_json::to_string(&summary.final_state).context("serialize snapshot")?;
    let mut loaded: TrackerState = serde_json::from_str(&json).context("parse snapshot")?;
    ensure!(loaded == summary.final_state, "snapshot changed across JSON");
    let now = summary
        .start
        .and_hms_opt(12, 0, 0)
        .context("invalid timestamp")?;
    let report = loaded.normalize(now);
    ensure!(report.is_clean(), "healthy snapshot needed repairs: {report:?}");
    Ok(())
}

pub fn rerun_is_identical(summary: &SimulationSummary) -> Result<()> {
    let days = u32::try_from(summary.days.len())?;
    let mut plan = SimulationPlan::new(summary.profile).with_days(days);
    plan.start = summary.start;
    let again = plan.run(summary.seed);
    ensure!(
        again.final_state == summary.final_state,
        "seed {} diverged on replay",
        summary.seed
    );
    Ok(())
}
