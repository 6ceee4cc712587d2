//! Centralized tuning constants for Bloomtrack tracking logic.
//!
//! These values define the deterministic math for XP, levels, weekly events
//! and cycle predictions. `XpConfig` defaults are sourced from here.

// Daily log -----------------------------------------------------------------
pub const DRINK_COUNTER_MAX: u8 = 18;
pub const WATER_GOAL_GLASSES: u8 = 6;
pub const COFFEE_DAILY_LIMIT: u8 = 6;
pub const HIGH_WATER_GLASSES: u8 = 10;
pub const EARLY_WEIGH_HOUR: u32 = 8;
pub const LATE_TRACK_HOUR: u32 = 22;

// XP rewards ----------------------------------------------------------------
pub const XP_PER_LEVEL: i64 = 100;
pub const PILL_XP: i64 = 15;
pub const WATER_XP_PER_GLASS: i64 = 5;
pub const COFFEE_FREE_UNITS: u8 = 6;
pub const COFFEE_PENALTY_PER_UNIT: i64 = 10;
pub const FLAG_XP: i64 = 10;
pub const WEIGHT_XP: i64 = 10;
pub const COMBO_XP_PER_EXTRA_UNLOCK: i64 = 50;

// Weekly events -------------------------------------------------------------
pub const EVENT_HASH_YEAR_FACTOR: i64 = 37;
pub const EVENT_HASH_MONTH_FACTOR: i64 = 5;
pub const EVENT_BONUS_MIN: f64 = 0.05;
pub const EVENT_BONUS_MAX: f64 = 0.15;
pub const DAYS_PER_WEEK: i64 = 7;

// Cycle model ---------------------------------------------------------------
pub const DEFAULT_CYCLE_LENGTH_DAYS: i64 = 28;
pub const DEFAULT_PERIOD_LENGTH_DAYS: i64 = 5;
pub const CYCLE_AVERAGE_WINDOW: usize = 3;
pub const LUTEAL_PHASE_DAYS: i64 = 14;
pub const FERTILE_WINDOW_LEAD_DAYS: i64 = 5;
pub const CYCLE_LOG_EDIT_WINDOW_DAYS: i64 = 7;
/// Longest closed period interval, inclusive of both ends.
pub const MAX_PERIOD_LENGTH_DAYS: i64 = 31;
pub const CYCLE_SCALE_MIN: u8 = 1;
pub const CYCLE_SCALE_MAX: u8 = 10;
pub const CYCLE_FLOW_MAX: u8 = 10;

// Statistics ----------------------------------------------------------------
pub const WEIGHT_EWMA_ALPHA: f64 = 0.3;
pub const OUTLIER_WINDOW_DAYS: usize = 14;
pub const OUTLIER_MIN_SAMPLES: usize = 5;
pub const OUTLIER_HIGH_FACTOR: f64 = 1.5;
pub const OUTLIER_LOW_FACTOR: f64 = 0.5;

// Insights summary ----------------------------------------------------------
pub const SUMMARY_DRINK_WINDOW_DAYS: usize = 14;
pub const SUMMARY_ADHERENCE_WINDOW_DAYS: usize = 7;
