use std::sync::Arc;

use anyhow::Result;
use bloomtrack_core::cycle::CycleLogPatch;
use bloomtrack_core::{
    DrinkCounter, DrinkFlag, FixedClock, MutationOutcome, PillSlot, Tracker, TrackerState,
    XpSource, date_key,
};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use serde::Serialize;

pub const DEFAULT_SIM_DAYS: u32 = 120;

/// Simulated user habits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum UserProfile {
    Diligent,
    Casual,
    CoffeeLover,
    CycleTracker,
}

#[derive(Debug, Clone, Copy)]
struct Habits {
    skip_day: f64,
    pill: f64,
    water: (i32, i32),
    coffee: (i32, i32),
    flag: f64,
    weigh: f64,
    late_tracking: f64,
    tracks_cycle: bool,
}

impl UserProfile {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Diligent => "Diligent",
            Self::Casual => "Casual",
            Self::CoffeeLover => "Coffee Lover",
            Self::CycleTracker => "Cycle Tracker",
        }
    }

    const fn habits(self) -> Habits {
        match self {
            Self::Diligent => Habits {
                skip_day: 0.0,
                pill: 0.97,
                water: (5, 10),
                coffee: (0, 3),
                flag: 0.6,
                weigh: 0.9,
                late_tracking: 0.05,
                tracks_cycle: false,
            },
            Self::Casual => Habits {
                skip_day: 0.35,
                pill: 0.7,
                water: (1, 7),
                coffee: (0, 5),
                flag: 0.2,
                weigh: 0.3,
                late_tracking: 0.3,
                tracks_cycle: false,
            },
            Self::CoffeeLover => Habits {
                skip_day: 0.1,
                pill: 0.85,
                water: (2, 6),
                coffee: (4, 12),
                flag: 0.3,
                weigh: 0.5,
                late_tracking: 0.2,
                tracks_cycle: false,
            },
            Self::CycleTracker => Habits {
                skip_day: 0.05,
                pill: 0.9,
                water: (4, 9),
                coffee: (0, 4),
                flag: 0.4,
                weigh: 0.6,
                late_tracking: 0.1,
                tracks_cycle: true,
            },
        }
    }
}

/// What one simulated day produced.
#[derive(Debug, Clone, Serialize)]
pub struct DayOutcome {
    pub date: String,
    pub xp_delta: i64,
    pub newly_unlocked: Vec<String>,
    pub unlocked_total: usize,
    pub leveled_up: bool,
    pub event_completed: bool,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SimulationMetrics {
    pub final_xp: i64,
    pub final_level: u32,
    pub unlocked: usize,
    pub events_completed: usize,
    pub ledger_entries: usize,
    pub penalty_entries: usize,
    pub level_ups: usize,
    pub cycles: usize,
    pub rejected_cycle_ops: usize,
}

/// Complete record of a simulation run.
#[derive(Debug, Clone)]
pub struct SimulationSummary {
    pub seed: u64,
    pub profile: UserProfile,
    pub start: NaiveDate,
    pub days: Vec<DayOutcome>,
    pub metrics: SimulationMetrics,
    pub final_state: TrackerState,
}

/// Assertion hook run after a simulation completes.
type SimulationExpectationFn =
    Arc<dyn Fn(&SimulationSummary) -> Result<()> + Send + Sync + 'static>;

#[derive(Clone)]
pub struct SimulationExpectation(SimulationExpectationFn);

impl std::fmt::Debug for SimulationExpectation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimulationExpectation").finish()
    }
}

impl SimulationExpectation {
    pub fn evaluate(&self, summary: &SimulationSummary) -> Result<()> {
        (self.0)(summary)
    }
}

impl<F> From<F> for SimulationExpectation
where
    F: Fn(&SimulationSummary) -> Result<()> + Send + Sync + 'static,
{
    fn from(f: F) -> Self {
        Self(Arc::new(f))
    }
}

#[derive(Debug, Clone)]
pub struct SimulationPlan {
    pub profile: UserProfile,
    pub days: u32,
    pub start: NaiveDate,
    pub expectations: Vec<SimulationExpectation>,
}

impl SimulationPlan {
    #[must_use]
    pub fn new(profile: UserProfile) -> Self {
        Self {
            profile,
            days: DEFAULT_SIM_DAYS,
            start: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap_or_default(),
            expectations: Vec::new(),
        }
    }

    #[must_use]
    pub const fn with_days(mut self, days: u32) -> Self {
        self.days = days;
        self
    }

    #[must_use]
    pub fn with_expectation(mut self, expectation: impl Into<SimulationExpectation>) -> Self {
        self.expectations.push(expectation.into());
        self
    }

    #[must_use]
    pub fn run(&self, seed: u64) -> SimulationSummary {
        let mut session = SimulationSession::new(self.profile, self.start, seed);
        for _ in 0..self.days {
            session.simulate_day();
        }
        session.finish()
    }
}

/// Deterministic day-by-day driver over a [`Tracker`].
pub struct SimulationSession {
    tracker: Tracker<FixedClock>,
    rng: ChaCha20Rng,
    profile: UserProfile,
    seed: u64,
    start: NaiveDate,
    today: NaiveDate,
    days: Vec<DayOutcome>,
    metrics: SimulationMetrics,
}

fn stamp(date: NaiveDate, hour: u32, minute: u32) -> NaiveDateTime {
    date.and_time(NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or_default())
}

impl SimulationSession {
    #[must_use]
    pub fn new(profile: UserProfile, start: NaiveDate, seed: u64) -> Self {
        Self {
            tracker: Tracker::new(FixedClock::new(stamp(start, 7, 0))),
            rng: ChaCha20Rng::seed_from_u64(seed),
            profile,
            seed,
            start,
            today: start,
            days: Vec::new(),
            metrics: SimulationMetrics::default(),
        }
    }

    fn at(&mut self, hour: u32) {
        let minute = self.rng.gen_range(0..60);
        self.tracker.clock_mut().set(stamp(self.today, hour, minute));
    }

    fn absorb(&mut self, outcome: &MutationOutcome, day: &mut DayOutcome) {
        day.xp_delta += outcome.xp_delta();
        day.newly_unlocked.extend(outcome.newly_unlocked.iter().cloned());
        day.leveled_up |= outcome.leveled_up();
        if outcome.leveled_up() {
            self.metrics.level_ups += 1;
        }
        day.event_completed |= outcome.entries.iter().any(|e| e.source == XpSource::Event);
    }

    pub fn simulate_day(&mut self) -> &DayOutcome {
        let habits = self.profile.habits();
        let date = self.today;
        let mut day = DayOutcome {
            date: date_key(date),
            xp_delta: 0,
            newly_unlocked: Vec::new(),
            unlocked_total: 0,
            leveled_up: false,
            event_completed: false,
        };

        if !self.rng.gen_bool(habits.skip_day) {
            let morning = self.rng.gen_range(6..10);
            self.at(morning);
            if self.rng.gen_bool(habits.pill) {
                let outcome = self.tracker.toggle_pill(date, PillSlot::Morning);
                self.absorb(&outcome, &mut day);
            }
            if self.rng.gen_bool(habits.weigh) {
                let kg = 72.0 - f64::from(self.rng.gen_range(0..16_u32)) * 0.25;
                if let Ok(outcome) = self.tracker.set_weight(date, kg) {
                    self.absorb(&outcome, &mut day);
                }
            }

            self.at(13);
            let water = self.rng.gen_range(habits.water.0..=habits.water.1);
            let outcome = self.tracker.set_drink(date, DrinkCounter::Water, water);
            self.absorb(&outcome, &mut day);
            let coffee = self.rng.gen_range(habits.coffee.0..=habits.coffee.1);
            for _ in 0..coffee {
                let outcome = self.tracker.adjust_drink(date, DrinkCounter::Coffee, 1);
                self.absorb(&outcome, &mut day);
            }
            for flag in DrinkFlag::ALL {
                if self.rng.gen_bool(habits.flag) {
                    let outcome = self.tracker.toggle_flag(date, flag);
                    self.absorb(&outcome, &mut day);
                }
            }

            let evening = if self.rng.gen_bool(habits.late_tracking) { 23 } else { 20 };
            self.at(evening);
            if self.rng.gen_bool(habits.pill) {
                let outcome = self.tracker.toggle_pill(date, PillSlot::Evening);
                self.absorb(&outcome, &mut day);
            }
            if habits.tracks_cycle {
                self.track_cycle(date, &mut day);
            }
        }

        let outcome = self.tracker.sync_weekly_event();
        self.absorb(&outcome, &mut day);
        day.unlocked_total = self.tracker.state().achievements_unlocked.len();

        self.today = self.today.succ_opt().unwrap_or(self.today);
        self.days.push(day);
        let last = self.days.len() - 1;
        &self.days[last]
    }

    fn track_cycle(&mut self, date: NaiveDate, day: &mut DayOutcome) {
        let open = self.tracker.state().open_cycle().copied();
        let last_start = self.tracker.state().cycles.last().map(|c| c.start);
        let gap = 27 + self.rng.gen_range(0..4);
        match open {
            Some(interval) if (date - interval.start).num_days() >= 4 => {
                match self.tracker.end_cycle(date) {
                    Ok(outcome) => self.absorb(&outcome, day),
                    Err(err) => {
                        log::debug!("cycle end rejected: {err}");
                        self.metrics.rejected_cycle_ops += 1;
                    }
                }
            }
            None if last_start.is_none_or(|s| (date - s).num_days() >= gap) => {
                match self.tracker.start_cycle(date) {
                    Ok(outcome) => self.absorb(&outcome, day),
                    Err(err) => {
                        log::debug!("cycle start rejected: {err}");
                        self.metrics.rejected_cycle_ops += 1;
                    }
                }
            }
            _ => {}
        }
        if self.rng.gen_bool(0.5) {
            let patch = CycleLogPatch {
                mood: Some(self.rng.gen_range(1..=10)),
                energy: Some(self.rng.gen_range(1..=10)),
                ..CycleLogPatch::default()
            };
            let outcome = self.tracker.set_cycle_log(date, patch);
            self.absorb(&outcome, day);
        }
        // a second start while one is open must bounce off
        if self.tracker.state().open_cycle().is_some()
            && self.rng.gen_bool(0.05)
            && self.tracker.start_cycle(date).is_err()
        {
            self.metrics.rejected_cycle_ops += 1;
        }
    }

    #[must_use]
    pub fn finish(mut self) -> SimulationSummary {
        let state = self.tracker.into_state();
        self.metrics.final_xp = state.xp;
        self.metrics.final_level = state.level();
        self.metrics.unlocked = state.achievements_unlocked.len();
        self.metrics.events_completed = state.event_history.completed_count();
        self.metrics.ledger_entries = state.xp_log.len();
        self.metrics.cycles = state.cycles.len();
        self.metrics.penalty_entries =
            state.xp_log.entries().iter().filter(|e| e.amount < 0).count();
        SimulationSummary {
            seed: self.seed,
            profile: self.profile,
            start: self.start,
            days: self.days,
            metrics: self.metrics,
            final_state: state,
        }
    }
}
