//! Bloomtrack Tracking Engine
//!
//! Platform-agnostic core logic for the Bloomtrack health and cycle tracker:
//! daily logs, statistics, achievements, weekly events, the XP ledger and
//! cycle predictions. This crate has no UI, storage or platform dependencies.

pub mod achievements;
pub mod chains;
pub mod constants;
pub mod cycle;
pub mod date;
pub mod day;
pub mod error;
pub mod events;
pub mod locale;
pub mod numbers;
pub mod reminders;
pub mod session;
pub mod state;
pub mod stats;
pub mod store;
pub mod summary;
pub mod xp;

use chrono::{Duration, Local, NaiveDateTime};

// Re-export commonly used types
pub use achievements::{
    AchievementCatalog, AchievementDefinition, AchievementProgress, AchievementReport,
    AchievementRule, compute_achievements,
};
pub use chains::{ChainCatalog, ChainDefinition, ChainStatus, compute_chains};
pub use cycle::{
    CycleDayLog, CycleInterval, CycleLogPatch, CycleReminder, CycleReminderKind, FertileWindow,
    SymptomFlags, cycle_reminders, fertile_window, ovulation_date, predict_next_start,
};
pub use date::{date_key, parse_date_key, week_start_sunday};
pub use day::{DayLog, DayRecord, DrinkCounter, DrinkFlag, Goal, PillSlot};
pub use error::TrackerError;
pub use events::{
    EventCatalog, EventHistory, EventHistoryEntry, EventProgress, EventRule, WeekRange,
    WeeklyEventDefinition, compute_event_progress, current_weekly_event, event_index_for,
    get_week_range,
};
pub use locale::{Language, Localized};
pub use reminders::{Reminder, ReminderPatch, TimeOfDay};
pub use session::Tracker;
pub use state::{ChatMessage, ChatSender, NormalizeReport, SavedMessage, ThemeName, TrackerState};
pub use stats::{ExtendedStats, compute_extended_stats};
pub use store::MutationOutcome;
pub use summary::{CompactSummary, build_compact_summary};
pub use xp::{
    RewardTier, XpConfig, XpConfigError, XpLedger, XpLedgerEntry, XpSource, level, level_progress,
};

/// Source of the current local date and time.
pub trait Clock {
    fn now(&self) -> NaiveDateTime;
}

/// Wall clock in the device's local time zone.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// Clock that only moves when told to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedClock {
    now: NaiveDateTime,
}

impl FixedClock {
    #[must_use]
    pub const fn new(now: NaiveDateTime) -> Self {
        Self { now }
    }

    pub const fn set(&mut self, now: NaiveDateTime) {
        self.now = now;
    }

    pub fn advance(&mut self, by: Duration) {
        self.now = self.now.checked_add_signed(by).unwrap_or(self.now);
    }

    pub fn advance_days(&mut self, days: i64) {
        self.advance(Duration::days(days));
    }
}

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.now
    }
}

/// Trait for abstracting snapshot persistence.
/// Platform-specific implementations should provide this
pub trait TrackerStorage {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Save a tracker snapshot
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot cannot be saved.
    fn save_snapshot(&self, profile: &str, state: &TrackerState) -> Result<(), Self::Error>;

    /// Load a tracker snapshot
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot cannot be loaded.
    fn load_snapshot(&self, profile: &str) -> Result<Option<TrackerState>, Self::Error>;

    /// Delete a saved snapshot
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot cannot be deleted.
    fn delete_snapshot(&self, profile: &str) -> Result<(), Self::Error>;
}

/// Opens and persists trackers through a platform storage.
pub struct TrackerEngine<S>
where
    S: TrackerStorage,
{
    storage: S,
}

impl<S> TrackerEngine<S>
where
    S: TrackerStorage,
{
    pub const fn new(storage: S) -> Self {
        Self { storage }
    }

    /// Save a tracker's snapshot under `profile`
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot cannot be saved.
    pub fn save<C: Clock>(&self, profile: &str, tracker: &Tracker<C>) -> Result<(), S::Error> {
        self.storage.save_snapshot(profile, tracker.state())
    }

    /// Load and repair the snapshot stored under `profile`.
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot cannot be loaded.
    pub fn load<C: Clock>(
        &self,
        profile: &str,
        clock: C,
    ) -> Result<Option<Tracker<C>>, anyhow::Error>
    where
        S::Error: Into<anyhow::Error>,
    {
        let Some(state) = self.storage.load_snapshot(profile).map_err(Into::into)? else {
            return Ok(None);
        };
        let (tracker, report) = Tracker::from_state(state, clock);
        if !report.is_clean() {
            log::info!("profile {profile} repaired on load");
        }
        Ok(Some(tracker))
    }

    /// Load `profile`, or start a fresh tracker if nothing is stored.
    ///
    /// # Errors
    ///
    /// Returns an error if a stored snapshot cannot be loaded.
    pub fn open<C: Clock + Clone>(
        &self,
        profile: &str,
        clock: C,
    ) -> Result<Tracker<C>, anyhow::Error>
    where
        S::Error: Into<anyhow::Error>,
    {
        Ok(self
            .load(profile, clock.clone())?
            .unwrap_or_else(|| Tracker::new(clock)))
    }

    /// Delete the snapshot stored under `profile`
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot cannot be deleted.
    pub fn delete(&self, profile: &str) -> Result<(), S::Error> {
        self.storage.delete_snapshot(profile)
    }
}
