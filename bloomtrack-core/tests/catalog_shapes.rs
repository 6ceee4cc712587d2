use std::collections::{BTreeMap, BTreeSet};
use std::hash::Hasher;

use bloomtrack_core::constants::{EVENT_BONUS_MAX, EVENT_BONUS_MIN};
use bloomtrack_core::{AchievementCatalog, ChainCatalog, EventCatalog};
use serde_json::{Map, Value};
use twox_hash::XxHash64;

const ACHIEVEMENTS_JSON: &str = include_str!("../data/achievements.json");
const CHAINS_JSON: &str = include_str!("../data/chains.json");
const EVENTS_JSON: &str = include_str!("../data/events.json");

#[test]
fn bundled_catalogs_parse_and_are_populated() {
    let achievements = AchievementCatalog::from_json(ACHIEVEMENTS_JSON).unwrap();
    let chains = ChainCatalog::from_json(CHAINS_JSON).unwrap();
    let events = EventCatalog::from_json(EVENTS_JSON).unwrap();
    assert!(achievements.len() >= 60, "only {} achievements", achievements.len());
    assert!(!chains.chains.is_empty());
    assert!(!events.events.is_empty());
    assert_eq!(&achievements, AchievementCatalog::default_catalog());
    assert_eq!(&events, EventCatalog::default_catalog());
}

#[test]
fn catalog_ids_are_unique() {
    let achievements = AchievementCatalog::default_catalog();
    let ids: BTreeSet<&str> = achievements.achievements.iter().map(|a| a.id.as_str()).collect();
    assert_eq!(ids.len(), achievements.len());

    let events = EventCatalog::default_catalog();
    let ids: BTreeSet<&str> = events.events.iter().map(|e| e.id.as_str()).collect();
    assert_eq!(ids.len(), events.events.len());

    let chains = ChainCatalog::default_catalog();
    let ids: BTreeSet<&str> = chains.chains.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(ids.len(), chains.chains.len());
}

#[test]
fn chain_steps_reference_known_achievements() {
    let achievements = AchievementCatalog::default_catalog();
    for chain in &ChainCatalog::default_catalog().chains {
        assert!(!chain.steps.is_empty(), "chain {} has no steps", chain.id);
        for step in &chain.steps {
            assert!(
                achievements.get(step).is_some(),
                "chain {} references unknown step {step}",
                chain.id
            );
        }
    }
}

#[test]
fn prerequisites_reference_known_achievements() {
    let achievements = AchievementCatalog::default_catalog();
    let gated: Vec<_> = achievements
        .achievements
        .iter()
        .filter(|def| !def.requires.is_empty())
        .collect();
    assert!(!gated.is_empty());
    for def in gated {
        for required in &def.requires {
            assert_ne!(required, &def.id, "{} requires itself", def.id);
            assert!(
                achievements.get(required).is_some(),
                "{} requires unknown {required}",
                def.id
            );
        }
    }
}

#[test]
fn event_bonuses_stay_in_band() {
    for event in &EventCatalog::default_catalog().events {
        assert!(
            (EVENT_BONUS_MIN..=EVENT_BONUS_MAX).contains(&event.bonus_percent),
            "{} bonus {}",
            event.id,
            event.bonus_percent
        );
        assert!(event.xp > 0, "{} pays nothing", event.id);
        assert!(event.total_xp() >= event.xp);
    }
}

#[test]
fn every_achievement_has_both_languages() {
    for def in &AchievementCatalog::default_catalog().achievements {
        assert!(!def.title.de.is_empty() && !def.title.en.is_empty(), "{}", def.id);
        assert!(
            !def.description.de.is_empty() && !def.description.en.is_empty(),
            "{}",
            def.id
        );
    }
}

#[test]
fn catalog_snapshot_is_stable_across_reserialization() {
    let first = catalog_digest();
    let reparsed = AchievementCatalog::from_json(
        &serde_json::to_string(AchievementCatalog::default_catalog()).unwrap(),
    )
    .unwrap();
    assert_eq!(&reparsed, AchievementCatalog::default_catalog());
    assert_eq!(first, catalog_digest(), "catalog serialization is not deterministic");
}

fn catalog_digest() -> u64 {
    let mut snapshot = BTreeMap::new();
    snapshot.insert(
        "achievements",
        canonicalize_value(serde_json::to_value(AchievementCatalog::default_catalog()).unwrap()),
    );
    snapshot.insert(
        "chains",
        canonicalize_value(serde_json::to_value(ChainCatalog::default_catalog()).unwrap()),
    );
    snapshot.insert(
        "events",
        canonicalize_value(serde_json::to_value(EventCatalog::default_catalog()).unwrap()),
    );
    let canonical = serde_json::to_string_pretty(&snapshot).unwrap();
    let mut hasher = XxHash64::with_seed(0);
    hasher.write(canonical.as_bytes());
    hasher.finish()
}

fn canonicalize_value(value: Value) -> Value {
    match value {
        Value::Array(items) => Value::Array(items.into_iter().map(canonicalize_value).collect()),
        Value::Object(map) => {
            let mut result = Map::with_capacity(map.len());
            let mut entries: Vec<_> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            for (key, value) in entries {
                result.insert(key, canonicalize_value(value));
            }
            Value::Object(result)
        }
        other => other,
    }
}
