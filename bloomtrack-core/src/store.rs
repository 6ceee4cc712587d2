//! State transitions.
//!
//! Every public function here takes the snapshot, the XP tuning and the
//! timestamp explicitly and performs one user action. XP-bearing steps move
//! the cached total and append exactly one ledger entry each; data mutations
//! end with an achievement recomputation before returning, so a caller always
//! reads levels and unlocks that already reflect the action. Rejected actions
//! return an error before touching the snapshot.
use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;
use smallvec::SmallVec;

use crate::achievements::{AchievementCatalog, compute_achievements_with};
use crate::constants::MAX_PERIOD_LENGTH_DAYS;
use crate::cycle::{CycleInterval, CycleLogPatch};
use crate::date::days_between;
use crate::day::{DrinkCounter, DrinkFlag, Goal, PillSlot, XpMarker};
use crate::error::TrackerError;
use crate::events::{
    EventCatalog, EventHistoryEntry, WeeklyEventDefinition, compute_event_progress,
    get_week_range,
};
use crate::locale::Language;
use crate::reminders::{Reminder, ReminderPatch};
use crate::state::{ChatMessage, SavedMessage, ThemeName, TrackerState};
use crate::xp::{
    XpConfig, XpLedgerEntry, XpSource, is_reward_unlocked, reward_tier, rewards_crossed,
};

/// What one action changed on the XP side.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MutationOutcome {
    pub entries: SmallVec<[XpLedgerEntry; 4]>,
    pub newly_unlocked: Vec<String>,
    pub level_before: u32,
    pub level_after: u32,
    pub rewards_reached: Vec<&'static str>,
}

impl MutationOutcome {
    #[must_use]
    pub fn xp_delta(&self) -> i64 {
        self.entries.iter().map(|entry| entry.amount).sum()
    }

    #[must_use]
    pub const fn leveled_up(&self) -> bool {
        self.level_after > self.level_before
    }
}

struct Transition<'a> {
    state: &'a mut TrackerState,
    config: &'a XpConfig,
    now: NaiveDateTime,
    level_before: u32,
    entries: SmallVec<[XpLedgerEntry; 4]>,
    newly_unlocked: Vec<String>,
}

impl<'a> Transition<'a> {
    fn begin(state: &'a mut TrackerState, config: &'a XpConfig, now: NaiveDateTime) -> Self {
        let level_before = state.level();
        Self {
            state,
            config,
            now,
            level_before,
            entries: SmallVec::new(),
            newly_unlocked: Vec::new(),
        }
    }

    fn award(&mut self, amount: i64, source: XpSource, note: Option<String>) {
        if let Some(entry) = self.state.xp_log.append(self.now, amount, source, note) {
            self.state.xp = self.state.xp.saturating_add(entry.amount);
            self.entries.push(entry);
        }
    }

    fn recompute_achievements(&mut self) {
        let catalog = AchievementCatalog::default_catalog();
        let report = compute_achievements_with(self.state, catalog);
        let fresh = report.newly_unlocked(&self.state.achievements_unlocked);
        self.state.achievements_unlocked = report.unlocked;
        if fresh.is_empty() {
            return;
        }
        for id in &fresh {
            log::debug!("achievement unlocked: {id}");
        }
        let unlock_xp: i64 = fresh.iter().map(|id| i64::from(catalog.xp_for(id))).sum();
        self.award(unlock_xp, XpSource::Achievement, Some(fresh.join(",")));
        let combo = self.config.combo_bonus(fresh.len());
        self.award(
            combo,
            XpSource::Combo,
            Some(format!("{} unlocks at once", fresh.len())),
        );
        self.newly_unlocked.extend(fresh);
    }

    fn finish(self) -> MutationOutcome {
        let level_after = self.state.level();
        let rewards_reached: Vec<&'static str> = rewards_crossed(self.level_before, level_after)
            .map(|tier| tier.id)
            .collect();
        if level_after > self.level_before {
            log::info!("level up: {} -> {level_after}", self.level_before);
        }
        MutationOutcome {
            entries: self.entries,
            newly_unlocked: self.newly_unlocked,
            level_before: self.level_before,
            level_after,
            rewards_reached,
        }
    }

    fn finish_recomputed(mut self) -> MutationOutcome {
        self.recompute_achievements();
        self.finish()
    }
}

/// Flip a pill slot. The first flip to taken on a day pays pill XP.
pub fn toggle_pill(
    state: &mut TrackerState,
    config: &XpConfig,
    date: NaiveDate,
    slot: PillSlot,
    now: NaiveDateTime,
) -> MutationOutcome {
    let mut tx = Transition::begin(state, config, now);
    let record = tx.state.days.ensure_day(date);
    let taken = !record.pills.get(slot);
    record.pills.set(slot, taken);
    if taken && record.xp_markers.award(XpMarker::from(slot)) {
        let note = format!("pill {slot:?} {date}").to_lowercase();
        tx.award(config.pill_xp, XpSource::Other, Some(note));
    }
    tx.finish_recomputed()
}

/// Move a drink counter by `delta`; the stored value is clamped.
pub fn adjust_drink(
    state: &mut TrackerState,
    config: &XpConfig,
    date: NaiveDate,
    counter: DrinkCounter,
    delta: i32,
    now: NaiveDateTime,
) -> MutationOutcome {
    let current = state
        .days
        .get(date)
        .map_or(0, |record| record.drinks.counter(counter));
    set_drink(
        state,
        config,
        date,
        counter,
        i32::from(current).saturating_add(delta),
        now,
    )
}

/// Set a drink counter outright; XP follows the change in count.
pub fn set_drink(
    state: &mut TrackerState,
    config: &XpConfig,
    date: NaiveDate,
    counter: DrinkCounter,
    value: i32,
    now: NaiveDateTime,
) -> MutationOutcome {
    let mut tx = Transition::begin(state, config, now);
    let record = tx.state.days.ensure_day(date);
    let old = record.drinks.counter(counter);
    let new = record.drinks.set_counter(counter, value);
    let delta = match counter {
        DrinkCounter::Water => config.water_xp_delta(old, new),
        DrinkCounter::Coffee => config.coffee_xp_delta(old, new),
    };
    let note = match counter {
        DrinkCounter::Water => format!("water {old}->{new}"),
        DrinkCounter::Coffee => format!("coffee {old}->{new}"),
    };
    tx.award(delta, XpSource::Other, Some(note));
    tx.finish_recomputed()
}

/// Flip a drink/activity flag. Only the first false→true flip of the day pays.
pub fn toggle_flag(
    state: &mut TrackerState,
    config: &XpConfig,
    date: NaiveDate,
    flag: DrinkFlag,
    now: NaiveDateTime,
) -> MutationOutcome {
    let mut tx = Transition::begin(state, config, now);
    let record = tx.state.days.ensure_day(date);
    let value = !record.drinks.flag(flag);
    record.drinks.set_flag(flag, value);
    if value && record.xp_markers.award(flag.marker()) {
        tx.award(config.flag_xp, XpSource::Other, Some(format!("{flag} {date}")));
    }
    tx.finish_recomputed()
}

/// Record a weigh-in captured at `now`.
///
/// # Errors
///
/// Returns [`TrackerError::InvalidWeight`] for non-finite or non-positive values.
pub fn set_weight(
    state: &mut TrackerState,
    config: &XpConfig,
    date: NaiveDate,
    weight_kg: f64,
    now: NaiveDateTime,
) -> Result<MutationOutcome, TrackerError> {
    if !weight_kg.is_finite() || weight_kg <= 0.0 {
        log::warn!("rejected weight {weight_kg} for {date}");
        return Err(TrackerError::InvalidWeight(weight_kg));
    }
    let mut tx = Transition::begin(state, config, now);
    let record = tx.state.days.ensure_day(date);
    record.weight = Some(weight_kg);
    record.weight_time = Some(now);
    if record.xp_markers.award(XpMarker::Weight) {
        tx.award(config.weight_xp, XpSource::Other, Some(format!("weight {date}")));
    }
    Ok(tx.finish_recomputed())
}

pub fn set_goal(
    state: &mut TrackerState,
    config: &XpConfig,
    goal: Goal,
    now: NaiveDateTime,
) -> MutationOutcome {
    let tx = Transition::begin(state, config, now);
    tx.state.goal = Some(goal);
    tx.finish_recomputed()
}

pub fn remove_goal(
    state: &mut TrackerState,
    config: &XpConfig,
    now: NaiveDateTime,
) -> MutationOutcome {
    let tx = Transition::begin(state, config, now);
    tx.state.goal = None;
    tx.finish_recomputed()
}

/// Open a new cycle interval on `date`.
///
/// # Errors
///
/// Returns [`TrackerError::CycleAlreadyOpen`] while another interval is open.
pub fn start_cycle(
    state: &mut TrackerState,
    config: &XpConfig,
    date: NaiveDate,
    now: NaiveDateTime,
) -> Result<MutationOutcome, TrackerError> {
    if let Some(open) = state.open_cycle() {
        log::warn!("cycle start {date} rejected: interval from {} still open", open.start);
        return Err(TrackerError::CycleAlreadyOpen {
            open_since: open.start,
        });
    }
    let tx = Transition::begin(state, config, now);
    tx.state.cycles.push(CycleInterval::open(date));
    Ok(tx.finish_recomputed())
}

/// Close the open cycle interval on `date`.
///
/// # Errors
///
/// Returns [`TrackerError::NoOpenCycle`] without an open interval,
/// [`TrackerError::CycleEndBeforeStart`] when `date` precedes its start and
/// [`TrackerError::CycleTooLong`] when the interval would exceed
/// [`MAX_PERIOD_LENGTH_DAYS`].
pub fn end_cycle(
    state: &mut TrackerState,
    config: &XpConfig,
    date: NaiveDate,
    now: NaiveDateTime,
) -> Result<MutationOutcome, TrackerError> {
    let Some(idx) = state.cycles.iter().rposition(CycleInterval::is_open) else {
        log::warn!("cycle end {date} rejected: nothing open");
        return Err(TrackerError::NoOpenCycle);
    };
    let start = state.cycles[idx].start;
    if date < start {
        log::warn!("cycle end {date} rejected: before start {start}");
        return Err(TrackerError::CycleEndBeforeStart { start, end: date });
    }
    if days_between(start, date) >= MAX_PERIOD_LENGTH_DAYS {
        log::warn!("cycle end {date} rejected: longer than {MAX_PERIOD_LENGTH_DAYS} days");
        return Err(TrackerError::CycleTooLong {
            start,
            end: date,
            max_days: MAX_PERIOD_LENGTH_DAYS,
        });
    }
    let tx = Transition::begin(state, config, now);
    tx.state.cycles[idx].end = Some(date);
    Ok(tx.finish_recomputed())
}

/// Merge a diary patch into the day's cycle log. A log left blank is removed.
pub fn set_cycle_log(
    state: &mut TrackerState,
    config: &XpConfig,
    date: NaiveDate,
    patch: CycleLogPatch,
    now: NaiveDateTime,
) -> MutationOutcome {
    let tx = Transition::begin(state, config, now);
    let log = tx.state.cycle_logs.entry(date).or_default();
    patch.apply(log);
    if log.is_blank() {
        tx.state.cycle_logs.remove(&date);
    }
    tx.finish_recomputed()
}

pub fn clear_cycle_log(
    state: &mut TrackerState,
    config: &XpConfig,
    date: NaiveDate,
    now: NaiveDateTime,
) -> MutationOutcome {
    let tx = Transition::begin(state, config, now);
    tx.state.cycle_logs.remove(&date);
    tx.finish_recomputed()
}

/// Record a weekly event completion; the first completion of a week wins.
///
/// Later calls for the same week change nothing and return an empty outcome.
pub fn complete_event(
    state: &mut TrackerState,
    config: &XpConfig,
    week_key: &str,
    event: &WeeklyEventDefinition,
    now: NaiveDateTime,
) -> MutationOutcome {
    let mut tx = Transition::begin(state, config, now);
    if tx.state.event_history.is_completed(week_key) {
        log::debug!("event for {week_key} already completed");
        return tx.finish();
    }
    let xp = event.total_xp();
    tx.state.event_history.record_completion(
        week_key,
        EventHistoryEntry {
            id: event.id.clone(),
            completed: true,
            xp,
            completed_at: Some(now),
        },
    );
    log::info!("weekly event {} completed for {week_key} (+{xp} xp)", event.id);
    tx.award(
        i64::from(xp),
        XpSource::Event,
        Some(format!("{} {week_key}", event.id)),
    );
    tx.finish_recomputed()
}

/// Complete this week's event if its progress has reached 100 %.
pub fn sync_weekly_event(
    state: &mut TrackerState,
    config: &XpConfig,
    today: NaiveDate,
    now: NaiveDateTime,
) -> MutationOutcome {
    let range = get_week_range(today);
    let ready = EventCatalog::default_catalog()
        .event_for(today)
        .filter(|event| !state.event_history.is_completed(&range.week_key))
        .filter(|event| compute_event_progress(&range.day_keys, state, event).completed);
    match ready {
        Some(event) => complete_event(state, config, &range.week_key, event, now),
        None => Transition::begin(state, config, now).finish(),
    }
}

pub fn add_reminder(
    state: &mut TrackerState,
    config: &XpConfig,
    reminder: Reminder,
    now: NaiveDateTime,
) -> MutationOutcome {
    let tx = Transition::begin(state, config, now);
    tx.state.reminders.insert(0, reminder);
    tx.finish_recomputed()
}

/// # Errors
///
/// Returns [`TrackerError::UnknownReminder`] if no reminder has `id`.
pub fn update_reminder(
    state: &mut TrackerState,
    config: &XpConfig,
    id: &str,
    patch: ReminderPatch,
    now: NaiveDateTime,
) -> Result<MutationOutcome, TrackerError> {
    let Some(idx) = state.reminders.iter().position(|r| r.id == id) else {
        return Err(TrackerError::UnknownReminder(id.to_string()));
    };
    let tx = Transition::begin(state, config, now);
    patch.apply(&mut tx.state.reminders[idx]);
    Ok(tx.finish_recomputed())
}

/// # Errors
///
/// Returns [`TrackerError::UnknownReminder`] if no reminder has `id`.
pub fn delete_reminder(
    state: &mut TrackerState,
    config: &XpConfig,
    id: &str,
    now: NaiveDateTime,
) -> Result<MutationOutcome, TrackerError> {
    let Some(idx) = state.reminders.iter().position(|r| r.id == id) else {
        return Err(TrackerError::UnknownReminder(id.to_string()));
    };
    let tx = Transition::begin(state, config, now);
    tx.state.reminders.remove(idx);
    Ok(tx.finish_recomputed())
}

pub fn add_chat(
    state: &mut TrackerState,
    config: &XpConfig,
    message: ChatMessage,
    now: NaiveDateTime,
) -> MutationOutcome {
    let tx = Transition::begin(state, config, now);
    tx.state.chat.push(message);
    tx.finish_recomputed()
}

pub fn add_saved(
    state: &mut TrackerState,
    config: &XpConfig,
    saved: SavedMessage,
    now: NaiveDateTime,
) -> MutationOutcome {
    let tx = Transition::begin(state, config, now);
    tx.state.saved.insert(0, saved);
    tx.finish_recomputed()
}

/// Unknown ids are ignored.
pub fn delete_saved(
    state: &mut TrackerState,
    config: &XpConfig,
    id: &str,
    now: NaiveDateTime,
) -> MutationOutcome {
    let tx = Transition::begin(state, config, now);
    tx.state.saved.retain(|s| s.id != id);
    tx.finish_recomputed()
}

pub const fn set_language(state: &mut TrackerState, language: Language) {
    state.language = language;
}

/// # Errors
///
/// Returns [`TrackerError::RewardLocked`] for a theme whose level reward has
/// not been reached.
pub fn set_theme(
    state: &mut TrackerState,
    config: &XpConfig,
    theme: ThemeName,
    now: NaiveDateTime,
) -> Result<MutationOutcome, TrackerError> {
    if let Some(reward) = theme.required_reward().and_then(reward_tier) {
        if !is_reward_unlocked(reward.id, state.xp) {
            return Err(TrackerError::RewardLocked {
                reward: reward.id,
                required_level: reward.level,
            });
        }
    }
    let tx = Transition::begin(state, config, now);
    tx.state.theme = theme;
    Ok(tx.finish_recomputed())
}

/// Remember that the user has seen a level reward. Returns `false` for unknown ids.
pub fn mark_reward_seen(state: &mut TrackerState, id: &str) -> bool {
    if reward_tier(id).is_none() {
        return false;
    }
    state.rewards_seen.insert(id.to_string(), true);
    true
}
