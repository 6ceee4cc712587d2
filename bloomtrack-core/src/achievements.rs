//! Achievement catalog and the progress engine evaluated after every mutation.
//!
//! The catalog ships as `data/achievements.json`, is parsed once and shared by
//! reference. Each entry carries an [`AchievementRule`]; rules are pure and
//! total, so a half-filled snapshot scores 0 instead of failing.
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::OnceLock;

use crate::constants::WATER_GOAL_GLASSES;
use crate::day::{DayRecord, DrinkFlag};
use crate::locale::Localized;
use crate::numbers::count_percent;
use crate::state::{ChatSender, ThemeName, TrackerState};
use crate::stats;

const DEFAULT_ACHIEVEMENT_DATA: &str = include_str!("../data/achievements.json");

const fn default_min_glasses() -> u8 {
    WATER_GOAL_GLASSES
}

/// Pure progress rule; `progress` always lands in `0..=100`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum AchievementRule {
    UsageDays {
        days: u32,
    },
    ComplianceDays {
        days: u32,
    },
    ComplianceStreak {
        days: u32,
    },
    WaterGoalDays {
        days: u32,
        #[serde(default = "default_min_glasses")]
        min_glasses: u8,
    },
    WaterStreak {
        days: u32,
    },
    /// Days strictly under `limit` coffees.
    CoffeeUnderDays {
        days: u32,
        limit: u8,
    },
    PerfectDays {
        days: u32,
    },
    PerfectStreak {
        days: u32,
    },
    FlagDays {
        flag: DrinkFlag,
        days: u32,
    },
    FlagStreak {
        flag: DrinkFlag,
        days: u32,
    },
    WeightLogDays {
        days: u32,
    },
    WeighedBeforeHour {
        count: u32,
        hour: u32,
    },
    TrackedAfterHour {
        count: u32,
        hour: u32,
    },
    /// Loss between the first and latest weigh-in.
    WeightLossKg {
        kg: f64,
    },
    GoalSet,
    GoalReached,
    ChatMessages {
        count: u32,
    },
    SavedMessages {
        count: u32,
    },
    EnabledReminders {
        count: u32,
    },
    CycleStarts {
        count: u32,
    },
    CycleLogs {
        count: u32,
    },
    EventsCompleted {
        count: u32,
    },
    ThemeChanged,
}

impl AchievementRule {
    #[must_use]
    pub fn progress(&self, state: &TrackerState) -> u8 {
        let days = &state.days;
        match *self {
            Self::UsageDays { days: target } => count_percent(days.len(), target),
            Self::ComplianceDays { days: target } => {
                count_percent(stats::compliance_days(days), target)
            }
            Self::ComplianceStreak { days: target } => {
                count_percent(stats::longest_streak(days, |r| r.pills.both()), target)
            }
            Self::WaterGoalDays {
                days: target,
                min_glasses,
            } => count_percent(stats::water_goal_days(days, min_glasses), target),
            Self::WaterStreak { days: target } => count_percent(
                stats::longest_streak(days, DayRecord::met_water_goal),
                target,
            ),
            Self::CoffeeUnderDays {
                days: target,
                limit,
            } => count_percent(stats::coffee_under_days(days, limit), target),
            Self::PerfectDays { days: target } => count_percent(stats::perfect_days(days), target),
            Self::PerfectStreak { days: target } => {
                count_percent(stats::longest_streak(days, DayRecord::is_perfect), target)
            }
            Self::FlagDays { flag, days: target } => {
                count_percent(stats::count_days(days, |r| r.drinks.flag(flag)), target)
            }
            Self::FlagStreak { flag, days: target } => count_percent(
                stats::longest_streak(days, |r| r.drinks.flag(flag)),
                target,
            ),
            Self::WeightLogDays { days: target } => {
                count_percent(stats::weight_log_days(days), target)
            }
            Self::WeighedBeforeHour { count, hour } => {
                count_percent(stats::weighed_before_hour(days, hour), count)
            }
            Self::TrackedAfterHour { count, hour } => {
                count_percent(stats::tracked_after_hour(days, hour), count)
            }
            Self::WeightLossKg { kg } => weight_loss_percent(stats::weight_delta(days), kg),
            Self::GoalSet => binary(state.goal.is_some()),
            Self::GoalReached => state
                .goal
                .as_ref()
                .map_or(0, |goal| goal.progress_percent(days)),
            Self::ChatMessages { count } => count_percent(
                state
                    .chat
                    .iter()
                    .filter(|m| m.sender == ChatSender::User)
                    .count(),
                count,
            ),
            Self::SavedMessages { count } => count_percent(state.saved.len(), count),
            Self::EnabledReminders { count } => {
                count_percent(state.reminders.iter().filter(|r| r.enabled).count(), count)
            }
            Self::CycleStarts { count } => count_percent(state.cycles.len(), count),
            Self::CycleLogs { count } => count_percent(state.cycle_logs.len(), count),
            Self::EventsCompleted { count } => {
                count_percent(state.event_history.completed_count(), count)
            }
            Self::ThemeChanged => binary(state.theme != ThemeName::default()),
        }
    }
}

const fn binary(done: bool) -> u8 {
    if done { 100 } else { 0 }
}

/// Signed weight delta scored against a loss target in kilograms.
///
/// Gains and an unchanged weight score 0.
#[must_use]
pub fn weight_loss_percent(delta: f64, kg: f64) -> u8 {
    if !delta.is_finite() || !kg.is_finite() || kg <= 0.0 || delta >= 0.0 {
        return 0;
    }
    if delta <= -kg {
        return 100;
    }
    crate::numbers::ratio_percent(delta.abs(), kg)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AchievementDefinition {
    pub id: String,
    pub xp: u32,
    pub rule: AchievementRule,
    pub title: Localized,
    pub description: Localized,
    /// Ids that must be unlocked before this entry makes any progress.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub requires: Vec<String>,
}

impl AchievementDefinition {
    #[must_use]
    pub fn prerequisites_met(&self, unlocked: &BTreeSet<String>) -> bool {
        self.requires.iter().all(|id| unlocked.contains(id))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct AchievementCatalog {
    #[serde(default)]
    pub achievements: Vec<AchievementDefinition>,
}

impl AchievementCatalog {
    #[must_use]
    pub fn load_from_static() -> Self {
        Self::from_json(DEFAULT_ACHIEVEMENT_DATA).unwrap_or_else(|err| {
            log::error!("bundled achievement catalog failed to parse: {err}");
            Self::default()
        })
    }

    #[must_use]
    pub fn default_catalog() -> &'static Self {
        static CATALOG: OnceLock<AchievementCatalog> = OnceLock::new();
        CATALOG.get_or_init(Self::load_from_static)
    }

    /// # Errors
    ///
    /// Returns an error if the JSON cannot be parsed into an achievement catalog.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&AchievementDefinition> {
        self.achievements.iter().find(|def| def.id == id)
    }

    /// XP for an id; unknown ids are worth nothing.
    #[must_use]
    pub fn xp_for(&self, id: &str) -> u32 {
        self.get(id).map_or(0, |def| def.xp)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.achievements.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.achievements.is_empty()
    }
}

/// One catalog entry evaluated against a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AchievementProgress {
    pub id: String,
    pub title: String,
    pub description: String,
    pub percent: u8,
    pub xp: u32,
    /// Currently at 100 %.
    pub completed: bool,
    /// Completed now or at any earlier evaluation.
    pub unlocked: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AchievementReport {
    pub list: Vec<AchievementProgress>,
    pub unlocked: BTreeSet<String>,
    /// Catalog XP summed over `unlocked`; informational only.
    pub xp: u64,
}

impl AchievementReport {
    /// Ids unlocked by this evaluation and absent from `previous`, in catalog order.
    #[must_use]
    pub fn newly_unlocked(&self, previous: &BTreeSet<String>) -> Vec<String> {
        self.list
            .iter()
            .filter(|entry| entry.completed && !previous.contains(&entry.id))
            .map(|entry| entry.id.clone())
            .collect()
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&AchievementProgress> {
        self.list.iter().find(|entry| entry.id == id)
    }
}

#[must_use]
pub fn compute_achievements(state: &TrackerState) -> AchievementReport {
    compute_achievements_with(state, AchievementCatalog::default_catalog())
}

/// Evaluate every catalog entry and union the completions into the unlock set.
///
/// The set never shrinks: ids in `state.achievements_unlocked` stay unlocked
/// even when their progress has since regressed, and ids the catalog no longer
/// knows are carried along at zero XP.
///
/// An entry with unmet `requires` scores 0. Gating is re-checked until no
/// further unlock happens, so a prerequisite completed in the same evaluation
/// opens its dependants immediately and a second evaluation is a no-op.
#[must_use]
pub fn compute_achievements_with(
    state: &TrackerState,
    catalog: &AchievementCatalog,
) -> AchievementReport {
    let language = state.language;
    let raw: Vec<u8> = catalog
        .achievements
        .iter()
        .map(|def| def.rule.progress(state).min(100))
        .collect();

    let mut unlocked = state.achievements_unlocked.clone();
    loop {
        let before = unlocked.len();
        for (def, percent) in catalog.achievements.iter().zip(&raw) {
            if *percent >= 100 && def.prerequisites_met(&unlocked) {
                unlocked.insert(def.id.clone());
            }
        }
        if unlocked.len() == before {
            break;
        }
    }

    let list: Vec<AchievementProgress> = catalog
        .achievements
        .iter()
        .zip(raw)
        .map(|(def, raw_percent)| {
            let percent = if def.prerequisites_met(&unlocked) {
                raw_percent
            } else {
                0
            };
            let completed = percent >= 100;
            AchievementProgress {
                id: def.id.clone(),
                title: def.title.get(language).to_string(),
                description: def.description.get(language).to_string(),
                percent,
                xp: def.xp,
                completed,
                unlocked: completed || state.achievements_unlocked.contains(&def.id),
            }
        })
        .collect();
    let xp = unlocked
        .iter()
        .map(|id| u64::from(catalog.xp_for(id)))
        .sum();
    AchievementReport { list, unlocked, xp }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::day::{DayRecord, Goal, PillSlot};
    use chrono::NaiveDate;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn pills_day(date: NaiveDate) -> DayRecord {
        let mut r = DayRecord::new(date);
        r.pills.set(PillSlot::Morning, true);
        r.pills.set(PillSlot::Evening, true);
        r
    }

    #[test]
    fn bundled_catalog_parses_with_unique_ids() {
        let catalog = AchievementCatalog::from_json(DEFAULT_ACHIEVEMENT_DATA).unwrap();
        assert!(catalog.len() >= 60);
        let ids: BTreeSet<&str> = catalog.achievements.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids.len(), catalog.len());
        assert!(catalog.achievements.iter().all(|d| d.xp > 0));
    }

    #[test]
    fn empty_state_scores_zero_everywhere() {
        let report = compute_achievements(&TrackerState::default());
        assert!(report.unlocked.is_empty());
        assert_eq!(report.xp, 0);
        assert!(report.list.iter().all(|a| a.percent == 0 && !a.completed));
    }

    #[test]
    fn counting_rules_round_against_threshold() {
        let mut state = TrackerState::default();
        for d in 1..=3 {
            state.days.insert(pills_day(ymd(2024, 3, d)));
        }
        let report = compute_achievements(&state);
        assert_eq!(report.get("pillen_profi_7").unwrap().percent, 43);
        assert!(report.get("erste_pille_1").unwrap().completed);
        assert!(report.unlocked.contains("erste_pille_1"));
        assert!(report.unlocked.contains("first_day_1"));
    }

    #[test]
    fn weight_loss_ignores_gains_and_missing_data() {
        assert_eq!(weight_loss_percent(0.0, 2.0), 0);
        assert_eq!(weight_loss_percent(1.5, 2.0), 0);
        assert_eq!(weight_loss_percent(-1.0, 2.0), 50);
        assert_eq!(weight_loss_percent(-2.5, 2.0), 100);
        assert_eq!(weight_loss_percent(f64::NAN, 2.0), 0);
    }

    #[test]
    fn unlocks_survive_regression_and_unknown_ids_carry_zero_xp() {
        let mut state = TrackerState::default();
        state.days.insert(pills_day(ymd(2024, 3, 1)));
        let first = compute_achievements(&state);
        state.achievements_unlocked = first.unlocked.clone();
        state.achievements_unlocked.insert("retired_badge".to_string());
        state.days = crate::day::DayLog::new();

        let second = compute_achievements(&state);
        assert!(second.unlocked.is_superset(&first.unlocked));
        assert!(second.unlocked.contains("retired_badge"));
        assert_eq!(second.xp, first.xp);
        assert!(second.get("erste_pille_1").unwrap().unlocked);
        assert!(!second.get("erste_pille_1").unwrap().completed);
    }

    fn gated_catalog() -> AchievementCatalog {
        let entry = |id: &str, days: u32, requires: &[&str]| {
            serde_json::json!({
                "id": id,
                "xp": 10,
                "rule": { "kind": "usageDays", "days": days },
                "title": { "de": id, "en": id },
                "description": { "de": id, "en": id },
                "requires": requires,
            })
        };
        let json = serde_json::json!({
            "achievements": [
                entry("dependant", 1, &["base"]),
                entry("base", 1, &[]),
                entry("distant", 99, &[]),
                entry("blocked", 1, &["distant"]),
            ]
        });
        AchievementCatalog::from_json(&json.to_string()).unwrap()
    }

    #[test]
    fn prerequisites_gate_progress_until_unlocked() {
        let catalog = gated_catalog();
        let mut state = TrackerState::default();
        state.days.insert(pills_day(ymd(2024, 3, 1)));

        let report = compute_achievements_with(&state, &catalog);
        assert!(report.unlocked.contains("base"));
        // unlocked in the same evaluation as its prerequisite
        assert!(report.get("dependant").unwrap().completed);
        assert_eq!(report.get("blocked").unwrap().percent, 0);
        assert!(!report.unlocked.contains("blocked"));

        state.achievements_unlocked = report.unlocked.clone();
        let again = compute_achievements_with(&state, &catalog);
        assert_eq!(again.unlocked, report.unlocked);
        assert!(again.newly_unlocked(&state.achievements_unlocked).is_empty());

        state.achievements_unlocked.insert("distant".to_string());
        let opened = compute_achievements_with(&state, &catalog);
        assert!(opened.get("blocked").unwrap().completed);
    }

    #[test]
    fn perfect_week_waits_for_its_prerequisites() {
        let catalog = AchievementCatalog::default_catalog();
        let perfect_week = catalog.get("perfekte_woche_7").unwrap();
        assert_eq!(
            perfect_week.requires,
            ["first_steps_7", "pillen_profi_7", "wasserdrache_5", "kaffee_kontrolle_7"]
        );
        let mut state = TrackerState::default();
        for d in 1..=3 {
            let mut record = pills_day(ymd(2024, 3, d));
            record.drinks.water = 8;
            record.weight = Some(70.0);
            state.days.insert(record);
        }
        let report = compute_achievements(&state);
        assert!(!report.unlocked.contains("first_steps_7"));
        assert_eq!(report.get("perfekte_woche_7").unwrap().percent, 0);
    }

    #[test]
    fn goal_rules_use_goal_progress() {
        let mut state = TrackerState::default();
        state.goal = Some(Goal {
            target_weight: 70.0,
            target_date: ymd(2024, 12, 31),
            start_weight: 72.0,
            active: true,
        });
        state.days.ensure_day(ymd(2024, 4, 1)).weight = Some(71.0);
        let report = compute_achievements(&state);
        assert!(report.get("ziel_gesetzt").unwrap().completed);
        assert_eq!(report.get("ziel_erreicht").unwrap().percent, 50);
    }

    #[test]
    fn newly_unlocked_diffs_against_previous_set() {
        let mut state = TrackerState::default();
        state.days.insert(pills_day(ymd(2024, 3, 1)));
        let report = compute_achievements(&state);
        let mut previous = BTreeSet::new();
        previous.insert("first_day_1".to_string());
        assert_eq!(report.newly_unlocked(&previous), vec!["erste_pille_1".to_string()]);
    }
}
