use crate::logic::simulation::{SimulationPlan, UserProfile};

pub mod catalog;

use catalog::{
    achievements_only_grow, cycle_history_is_well_formed, events_pay_once_per_week,
    ledger_matches_total, penalties_were_booked, rerun_is_identical, snapshot_survives_roundtrip,
    tracked_some_days,
};

/// A named simulation plus the invariants checked after every run.
#[derive(Debug, Clone)]
pub struct TestScenario {
    pub key: &'static str,
    pub name: String,
    pub description: &'static str,
    pub plan: SimulationPlan,
}

impl TestScenario {
    #[must_use]
    pub fn simulation(
        key: &'static str,
        name: impl Into<String>,
        description: &'static str,
        plan: SimulationPlan,
    ) -> Self {
        Self {
            key,
            name: name.into(),
            description,
            plan,
        }
    }
}

#[must_use]
pub fn all_scenarios() -> Vec<TestScenario> {
    vec![
        TestScenario::simulation(
            "smoke",
            "Smoke",
            "Two weeks of a diligent user; ledger and unlocks stay consistent",
            SimulationPlan::new(UserProfile::Diligent)
                .with_days(14)
                .with_expectation(tracked_some_days)
                .with_expectation(ledger_matches_total),
        ),
        TestScenario::simulation(
            "ledger-audit",
            "Ledger Audit",
            "Casual user over four months; every XP change is in the ledger",
            SimulationPlan::new(UserProfile::Casual).with_expectation(ledger_matches_total),
        ),
        TestScenario::simulation(
            "achievement-monotonicity",
            "Achievement Monotonicity",
            "Unlocked achievements never disappear and match a fresh evaluation",
            SimulationPlan::new(UserProfile::Diligent).with_expectation(achievements_only_grow),
        ),
        TestScenario::simulation(
            "weekly-events",
            "Weekly Events",
            "Each calendar week pays its event at most once",
            SimulationPlan::new(UserProfile::Diligent)
                .with_days(180)
                .with_expectation(events_pay_once_per_week),
        ),
        TestScenario::simulation(
            "coffee-penalties",
            "Coffee Penalties",
            "Heavy coffee days book negative XP and keep the ledger balanced",
            SimulationPlan::new(UserProfile::CoffeeLover)
                .with_days(60)
                .with_expectation(penalties_were_booked)
                .with_expectation(ledger_matches_total),
        ),
        TestScenario::simulation(
            "cycle-tracking",
            "Cycle Tracking",
            "Cycle intervals stay ordered with at most one open interval",
            SimulationPlan::new(UserProfile::CycleTracker)
                .with_expectation(cycle_history_is_well_formed),
        ),
        TestScenario::simulation(
            "snapshot-roundtrip",
            "Snapshot Roundtrip",
            "Final snapshot survives JSON persistence and needs no repair",
            SimulationPlan::new(UserProfile::CycleTracker)
                .with_days(60)
                .with_expectation(snapshot_survives_roundtrip),
        ),
        TestScenario::simulation(
            "determinism",
            "Deterministic Replay",
            "Replaying a seed reproduces the exact same snapshot",
            SimulationPlan::new(UserProfile::Casual)
                .with_days(45)
                .with_expectation(rerun_is_identical),
        ),
    ]
}

#[must_use]
pub fn get_scenario(key: &str) -> Option<TestScenario> {
    all_scenarios().into_iter().find(|s| s.key == key)
}

#[must_use]
pub fn list_scenarios() -> Vec<(&'static str, &'static str)> {
    all_scenarios()
        .into_iter()
        .map(|s| (s.key, s.description))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn scenario_keys_are_unique_and_resolvable() {
        let keys: BTreeSet<&str> = list_scenarios().into_iter().map(|(k, _)| k).collect();
        assert_eq!(keys.len(), all_scenarios().len());
        for key in keys {
            assert!(get_scenario(key).is_some());
        }
        assert!(get_scenario("nope").is_none());
    }
}
