//! Clock-bound wrapper around the pure transitions in [`crate::store`].
use chrono::{NaiveDate, NaiveDateTime};

use crate::Clock;
use crate::achievements::{AchievementReport, compute_achievements};
use crate::chains::{ChainStatus, compute_chains};
use crate::cycle::CycleLogPatch;
use crate::day::{DrinkCounter, DrinkFlag, Goal, PillSlot};
use crate::error::TrackerError;
use crate::events::{EventProgress, WeeklyEventDefinition, compute_event_progress, get_week_range};
use crate::locale::Language;
use crate::reminders::{Reminder, ReminderPatch};
use crate::state::{ChatMessage, NormalizeReport, SavedMessage, ThemeName, TrackerState};
use crate::store::{self, MutationOutcome};
use crate::summary::{CompactSummary, build_compact_summary};
use crate::xp::{XpConfig, XpConfigError};

/// One user's tracker: the snapshot, the XP tuning and the clock that stamps
/// every mutation.
#[derive(Debug, Clone)]
pub struct Tracker<C: Clock> {
    state: TrackerState,
    config: XpConfig,
    clock: C,
}

impl<C: Clock> Tracker<C> {
    #[must_use]
    pub fn new(clock: C) -> Self {
        Self {
            state: TrackerState::default(),
            config: XpConfig::default(),
            clock,
        }
    }

    /// Wrap a loaded snapshot, repairing it first.
    #[must_use]
    pub fn from_state(mut state: TrackerState, clock: C) -> (Self, NormalizeReport) {
        let report = state.normalize(clock.now());
        let tracker = Self {
            state,
            config: XpConfig::default(),
            clock,
        };
        (tracker, report)
    }

    /// Swap the XP tuning.
    ///
    /// # Errors
    ///
    /// Returns the validation error and keeps the current tuning if `config`
    /// is rejected.
    pub fn with_config(mut self, config: XpConfig) -> Result<Self, XpConfigError> {
        config.validate()?;
        self.config = config;
        Ok(self)
    }

    #[must_use]
    pub const fn state(&self) -> &TrackerState {
        &self.state
    }

    #[must_use]
    pub fn into_state(self) -> TrackerState {
        self.state
    }

    #[must_use]
    pub const fn config(&self) -> &XpConfig {
        &self.config
    }

    #[must_use]
    pub const fn clock(&self) -> &C {
        &self.clock
    }

    pub const fn clock_mut(&mut self) -> &mut C {
        &mut self.clock
    }

    fn now(&self) -> NaiveDateTime {
        self.clock.now()
    }

    #[must_use]
    pub fn today(&self) -> NaiveDate {
        self.now().date()
    }

    pub fn toggle_pill(&mut self, date: NaiveDate, slot: PillSlot) -> MutationOutcome {
        let now = self.now();
        store::toggle_pill(&mut self.state, &self.config, date, slot, now)
    }

    pub fn adjust_drink(
        &mut self,
        date: NaiveDate,
        counter: DrinkCounter,
        delta: i32,
    ) -> MutationOutcome {
        let now = self.now();
        store::adjust_drink(&mut self.state, &self.config, date, counter, delta, now)
    }

    pub fn set_drink(
        &mut self,
        date: NaiveDate,
        counter: DrinkCounter,
        value: i32,
    ) -> MutationOutcome {
        let now = self.now();
        store::set_drink(&mut self.state, &self.config, date, counter, value, now)
    }

    pub fn toggle_flag(&mut self, date: NaiveDate, flag: DrinkFlag) -> MutationOutcome {
        let now = self.now();
        store::toggle_flag(&mut self.state, &self.config, date, flag, now)
    }

    /// # Errors
    ///
    /// See [`store::set_weight`].
    pub fn set_weight(
        &mut self,
        date: NaiveDate,
        weight_kg: f64,
    ) -> Result<MutationOutcome, TrackerError> {
        let now = self.now();
        store::set_weight(&mut self.state, &self.config, date, weight_kg, now)
    }

    pub fn set_goal(&mut self, goal: Goal) -> MutationOutcome {
        let now = self.now();
        store::set_goal(&mut self.state, &self.config, goal, now)
    }

    pub fn remove_goal(&mut self) -> MutationOutcome {
        let now = self.now();
        store::remove_goal(&mut self.state, &self.config, now)
    }

    /// # Errors
    ///
    /// See [`store::start_cycle`].
    pub fn start_cycle(&mut self, date: NaiveDate) -> Result<MutationOutcome, TrackerError> {
        let now = self.now();
        store::start_cycle(&mut self.state, &self.config, date, now)
    }

    /// # Errors
    ///
    /// See [`store::end_cycle`].
    pub fn end_cycle(&mut self, date: NaiveDate) -> Result<MutationOutcome, TrackerError> {
        let now = self.now();
        store::end_cycle(&mut self.state, &self.config, date, now)
    }

    pub fn set_cycle_log(&mut self, date: NaiveDate, patch: CycleLogPatch) -> MutationOutcome {
        let now = self.now();
        store::set_cycle_log(&mut self.state, &self.config, date, patch, now)
    }

    pub fn clear_cycle_log(&mut self, date: NaiveDate) -> MutationOutcome {
        let now = self.now();
        store::clear_cycle_log(&mut self.state, &self.config, date, now)
    }

    pub fn complete_event(
        &mut self,
        week_key: &str,
        event: &WeeklyEventDefinition,
    ) -> MutationOutcome {
        let now = self.now();
        store::complete_event(&mut self.state, &self.config, week_key, event, now)
    }

    /// Complete the current week's event when it is ready.
    pub fn sync_weekly_event(&mut self) -> MutationOutcome {
        let now = self.now();
        store::sync_weekly_event(&mut self.state, &self.config, now.date(), now)
    }

    pub fn add_reminder(&mut self, reminder: Reminder) -> MutationOutcome {
        let now = self.now();
        store::add_reminder(&mut self.state, &self.config, reminder, now)
    }

    /// # Errors
    ///
    /// See [`store::update_reminder`].
    pub fn update_reminder(
        &mut self,
        id: &str,
        patch: ReminderPatch,
    ) -> Result<MutationOutcome, TrackerError> {
        let now = self.now();
        store::update_reminder(&mut self.state, &self.config, id, patch, now)
    }

    /// # Errors
    ///
    /// See [`store::delete_reminder`].
    pub fn delete_reminder(&mut self, id: &str) -> Result<MutationOutcome, TrackerError> {
        let now = self.now();
        store::delete_reminder(&mut self.state, &self.config, id, now)
    }

    pub fn add_chat(&mut self, message: ChatMessage) -> MutationOutcome {
        let now = self.now();
        store::add_chat(&mut self.state, &self.config, message, now)
    }

    pub fn add_saved(&mut self, saved: SavedMessage) -> MutationOutcome {
        let now = self.now();
        store::add_saved(&mut self.state, &self.config, saved, now)
    }

    pub fn delete_saved(&mut self, id: &str) -> MutationOutcome {
        let now = self.now();
        store::delete_saved(&mut self.state, &self.config, id, now)
    }

    pub const fn set_language(&mut self, language: Language) {
        store::set_language(&mut self.state, language);
    }

    /// # Errors
    ///
    /// See [`store::set_theme`].
    pub fn set_theme(&mut self, theme: ThemeName) -> Result<MutationOutcome, TrackerError> {
        let now = self.now();
        store::set_theme(&mut self.state, &self.config, theme, now)
    }

    pub fn mark_reward_seen(&mut self, id: &str) -> bool {
        store::mark_reward_seen(&mut self.state, id)
    }

    #[must_use]
    pub fn achievements(&self) -> AchievementReport {
        compute_achievements(&self.state)
    }

    #[must_use]
    pub fn chains(&self) -> Vec<ChainStatus> {
        compute_chains(&self.state)
    }

    /// Progress of `event` over the week containing today.
    #[must_use]
    pub fn event_progress(&self, event: &WeeklyEventDefinition) -> EventProgress {
        let range = get_week_range(self.today());
        compute_event_progress(&range.day_keys, &self.state, event)
    }

    #[must_use]
    pub fn summary(&self) -> CompactSummary {
        build_compact_summary(&self.state, self.today())
    }
}
