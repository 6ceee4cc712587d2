//! Sequential achievement chains.
//!
//! A chain only advances through its steps in order: a later step that is
//! already complete does not count until every step before it is.
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

use crate::achievements::{AchievementReport, compute_achievements};
use crate::locale::{Language, Localized};
use crate::state::TrackerState;

const DEFAULT_CHAIN_DATA: &str = include_str!("../data/chains.json");

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainDefinition {
    pub id: String,
    pub title: Localized,
    pub steps: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ChainCatalog {
    #[serde(default)]
    pub chains: Vec<ChainDefinition>,
}

impl ChainCatalog {
    #[must_use]
    pub fn load_from_static() -> Self {
        Self::from_json(DEFAULT_CHAIN_DATA).unwrap_or_else(|err| {
            log::error!("bundled chain catalog failed to parse: {err}");
            Self::default()
        })
    }

    #[must_use]
    pub fn default_catalog() -> &'static Self {
        static CATALOG: OnceLock<ChainCatalog> = OnceLock::new();
        CATALOG.get_or_init(Self::load_from_static)
    }

    /// # Errors
    ///
    /// Returns an error if the JSON cannot be parsed into a chain catalog.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainStatus {
    pub id: String,
    pub title: String,
    pub total: usize,
    /// Length of the completed prefix.
    pub completed: usize,
    /// First incomplete step; `None` once every step is done.
    pub next_index: Option<usize>,
    pub next_percent: u8,
    pub next_id: Option<String>,
    pub next_title: Option<String>,
}

impl ChainStatus {
    #[must_use]
    pub const fn is_finished(&self) -> bool {
        self.next_index.is_none()
    }
}

#[must_use]
pub fn compute_chains(state: &TrackerState) -> Vec<ChainStatus> {
    let report = compute_achievements(state);
    chain_status_from(&report, ChainCatalog::default_catalog(), state.language)
}

/// Walk each chain against an already computed achievement report.
///
/// A step counts as done while its achievement is currently at 100 %; a sticky
/// unlock whose progress has since regressed does not advance the chain.
/// Steps missing from the report count as incomplete at 0 %.
#[must_use]
pub fn chain_status_from(
    report: &AchievementReport,
    catalog: &ChainCatalog,
    language: Language,
) -> Vec<ChainStatus> {
    catalog
        .chains
        .iter()
        .map(|def| {
            let step_done = |id: &str| report.get(id).is_some_and(|a| a.completed);
            let completed = def.steps.iter().take_while(|id| step_done(id)).count();
            let next = def.steps.get(completed);
            let next_entry = next.and_then(|id| report.get(id));
            ChainStatus {
                id: def.id.clone(),
                title: def.title.get(language).to_string(),
                total: def.steps.len(),
                completed,
                next_index: next.map(|_| completed),
                next_percent: next_entry.map_or(0, |a| a.percent),
                next_id: next.cloned(),
                next_title: next_entry.map(|a| a.title.clone()),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::achievements::{AchievementCatalog, AchievementProgress};
    use std::collections::BTreeSet;

    fn progress(id: &str, percent: u8) -> AchievementProgress {
        AchievementProgress {
            id: id.to_string(),
            title: id.to_uppercase(),
            description: String::new(),
            percent,
            xp: 10,
            completed: percent >= 100,
            unlocked: percent >= 100,
        }
    }

    fn report(entries: Vec<AchievementProgress>) -> AchievementReport {
        let unlocked: BTreeSet<String> = entries
            .iter()
            .filter(|a| a.unlocked)
            .map(|a| a.id.clone())
            .collect();
        AchievementReport {
            list: entries,
            unlocked,
            xp: 0,
        }
    }

    fn chain(steps: &[&str]) -> ChainCatalog {
        ChainCatalog {
            chains: vec![ChainDefinition {
                id: "abc".to_string(),
                title: Localized {
                    de: "ABC".to_string(),
                    en: "ABC".to_string(),
                },
                steps: steps.iter().map(|s| (*s).to_string()).collect(),
            }],
        }
    }

    #[test]
    fn chain_counts_only_the_completed_prefix() {
        let rep = report(vec![progress("a", 100), progress("b", 40), progress("c", 100)]);
        let status = &chain_status_from(&rep, &chain(&["a", "b", "c"]), Language::En)[0];
        assert_eq!(status.completed, 1);
        assert_eq!(status.next_index, Some(1));
        assert_eq!(status.next_percent, 40);
        assert_eq!(status.next_id.as_deref(), Some("b"));
        assert_eq!(status.next_title.as_deref(), Some("B"));
    }

    #[test]
    fn regressed_unlock_does_not_count_as_done() {
        let mut regressed = progress("a", 0);
        regressed.unlocked = true;
        let rep = report(vec![regressed, progress("b", 100)]);
        let status = &chain_status_from(&rep, &chain(&["a", "b"]), Language::En)[0];
        assert_eq!(status.completed, 0);
        assert_eq!(status.next_index, Some(0));
        assert_eq!(status.next_id.as_deref(), Some("a"));
    }

    #[test]
    fn sticky_first_pill_with_empty_log_leaves_chain_at_start() {
        let mut state = TrackerState::default();
        state.achievements_unlocked.insert("erste_pille_1".to_string());
        let report = compute_achievements(&state);
        assert!(report.get("erste_pille_1").unwrap().unlocked);
        assert!(!report.get("erste_pille_1").unwrap().completed);
        let statuses = chain_status_from(&report, ChainCatalog::default_catalog(), Language::En);
        let with_first_pill: Vec<_> = ChainCatalog::default_catalog()
            .chains
            .iter()
            .zip(&statuses)
            .filter(|(def, _)| def.steps.first().is_some_and(|s| s == "erste_pille_1"))
            .collect();
        assert!(!with_first_pill.is_empty());
        for (_, status) in with_first_pill {
            assert_eq!(status.completed, 0, "{}", status.id);
        }
    }

    #[test]
    fn finished_chain_has_no_next_step() {
        let rep = report(vec![progress("a", 100), progress("b", 100)]);
        let status = &chain_status_from(&rep, &chain(&["a", "b"]), Language::De)[0];
        assert_eq!(status.completed, 2);
        assert!(status.is_finished());
        assert_eq!(status.next_percent, 0);
    }

    #[test]
    fn unknown_step_blocks_the_chain_at_zero() {
        let rep = report(vec![progress("a", 100)]);
        let status = &chain_status_from(&rep, &chain(&["a", "ghost", "a"]), Language::De)[0];
        assert_eq!(status.completed, 1);
        assert_eq!(status.next_index, Some(1));
        assert_eq!(status.next_percent, 0);
        assert!(status.next_title.is_none());
    }

    #[test]
    fn bundled_chains_reference_catalog_achievements() {
        let achievements = AchievementCatalog::default_catalog();
        let chains = ChainCatalog::from_json(DEFAULT_CHAIN_DATA).unwrap();
        assert!(!chains.chains.is_empty());
        for def in &chains.chains {
            assert!(!def.steps.is_empty(), "{} has no steps", def.id);
            for step in &def.steps {
                assert!(achievements.get(step).is_some(), "{} -> {step}", def.id);
            }
        }
    }

    #[test]
    fn empty_state_leaves_every_chain_at_step_zero() {
        let statuses = compute_chains(&TrackerState::default());
        assert!(statuses.iter().all(|s| s.completed == 0 && s.next_index == Some(0)));
    }
}
