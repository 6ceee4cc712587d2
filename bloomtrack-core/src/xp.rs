//! Experience ledger, level curve, XP tuning and level-gated rewards.
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use thiserror::Error;

use crate::constants::{
    COFFEE_FREE_UNITS, COFFEE_PENALTY_PER_UNIT, COMBO_XP_PER_EXTRA_UNLOCK, DRINK_COUNTER_MAX,
    FLAG_XP, PILL_XP, WATER_XP_PER_GLASS, WEIGHT_XP, XP_PER_LEVEL,
};
use crate::locale::Language;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum XpSource {
    Achievement,
    Event,
    Combo,
    Other,
}

impl XpSource {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Achievement => "achievement",
            Self::Event => "event",
            Self::Combo => "combo",
            Self::Other => "other",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct XpLedgerEntry {
    pub id: u64,
    pub timestamp: NaiveDateTime,
    pub amount: i64,
    pub source: XpSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// Append-only audit log backing the cached XP total.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct XpLedger(Vec<XpLedgerEntry>);

impl XpLedger {
    /// Append one entry and return a copy of it. Zero amounts are not recorded.
    pub fn append(
        &mut self,
        timestamp: NaiveDateTime,
        amount: i64,
        source: XpSource,
        note: Option<String>,
    ) -> Option<XpLedgerEntry> {
        if amount == 0 {
            return None;
        }
        let entry = XpLedgerEntry {
            id: self.next_id(),
            timestamp,
            amount,
            source,
            note,
        };
        log::debug!(
            "xp ledger #{} {:+} ({})",
            entry.id,
            entry.amount,
            entry.source.as_str()
        );
        self.0.push(entry.clone());
        Some(entry)
    }

    fn next_id(&self) -> u64 {
        self.0
            .iter()
            .map(|entry| entry.id)
            .max()
            .map_or(1, |id| id.saturating_add(1))
    }

    #[must_use]
    pub fn total(&self) -> i64 {
        self.0
            .iter()
            .fold(0_i64, |acc, entry| acc.saturating_add(entry.amount))
    }

    #[must_use]
    pub fn entries(&self) -> &[XpLedgerEntry] {
        &self.0
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Sum of ledger amounts stamped within `from..to`.
#[must_use]
pub fn xp_in_range(ledger: &XpLedger, from: NaiveDateTime, to: NaiveDateTime) -> i64 {
    ledger
        .entries()
        .iter()
        .filter(|entry| entry.timestamp >= from && entry.timestamp < to)
        .fold(0_i64, |acc, entry| acc.saturating_add(entry.amount))
}

/// `floor(xp / 100) + 1`, uncapped. Negative totals sit at level 1.
#[must_use]
pub fn level(xp: i64) -> u32 {
    let steps = xp.max(0) / XP_PER_LEVEL;
    u32::try_from(steps).map_or(u32::MAX, |s| s.saturating_add(1))
}

/// XP earned inside the current level and still needed for the next one.
#[must_use]
pub fn level_progress(xp: i64) -> (i64, i64) {
    let into = xp.max(0) % XP_PER_LEVEL;
    (into, XP_PER_LEVEL - into)
}

/// XP rewards for daily actions and combos.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct XpConfig {
    #[serde(default = "XpConfig::default_pill_xp")]
    pub pill_xp: i64,
    #[serde(default = "XpConfig::default_water_xp_per_glass")]
    pub water_xp_per_glass: i64,
    #[serde(default = "XpConfig::default_coffee_free_units")]
    pub coffee_free_units: u8,
    #[serde(default = "XpConfig::default_coffee_penalty_per_unit")]
    pub coffee_penalty_per_unit: i64,
    #[serde(default = "XpConfig::default_flag_xp")]
    pub flag_xp: i64,
    #[serde(default = "XpConfig::default_weight_xp")]
    pub weight_xp: i64,
    #[serde(default = "XpConfig::default_combo_xp_per_extra_unlock")]
    pub combo_xp_per_extra_unlock: i64,
}

impl XpConfig {
    #[must_use]
    pub const fn default_pill_xp() -> i64 {
        PILL_XP
    }

    #[must_use]
    pub const fn default_water_xp_per_glass() -> i64 {
        WATER_XP_PER_GLASS
    }

    #[must_use]
    pub const fn default_coffee_free_units() -> u8 {
        COFFEE_FREE_UNITS
    }

    #[must_use]
    pub const fn default_coffee_penalty_per_unit() -> i64 {
        COFFEE_PENALTY_PER_UNIT
    }

    #[must_use]
    pub const fn default_flag_xp() -> i64 {
        FLAG_XP
    }

    #[must_use]
    pub const fn default_weight_xp() -> i64 {
        WEIGHT_XP
    }

    #[must_use]
    pub const fn default_combo_xp_per_extra_unlock() -> i64 {
        COMBO_XP_PER_EXTRA_UNLOCK
    }

    #[must_use]
    pub fn default_config() -> &'static Self {
        static CONFIG: OnceLock<XpConfig> = OnceLock::new();
        CONFIG.get_or_init(Self::default)
    }

    /// Validate reward magnitudes.
    ///
    /// # Errors
    ///
    /// Returns `XpConfigError` when a reward or penalty is negative or the
    /// free coffee tier exceeds the counter range.
    pub fn validate(&self) -> Result<(), XpConfigError> {
        let rewards = [
            ("pill_xp", self.pill_xp),
            ("water_xp_per_glass", self.water_xp_per_glass),
            ("coffee_penalty_per_unit", self.coffee_penalty_per_unit),
            ("flag_xp", self.flag_xp),
            ("weight_xp", self.weight_xp),
            ("combo_xp_per_extra_unlock", self.combo_xp_per_extra_unlock),
        ];
        if let Some((field, value)) = rewards.into_iter().find(|(_, value)| *value < 0) {
            return Err(XpConfigError::Negative { field, value });
        }
        if self.coffee_free_units > DRINK_COUNTER_MAX {
            return Err(XpConfigError::CoffeeFreeUnits {
                value: self.coffee_free_units,
                max: DRINK_COUNTER_MAX,
            });
        }
        Ok(())
    }

    /// Flat XP per glass, signed by direction.
    #[must_use]
    pub fn water_xp_delta(&self, old: u8, new: u8) -> i64 {
        (i64::from(new) - i64::from(old)) * self.water_xp_per_glass
    }

    /// Penalty for coffees beyond the free tier; lowering the count refunds it.
    #[must_use]
    pub fn coffee_xp_delta(&self, old: u8, new: u8) -> i64 {
        let penalized = |count: u8| i64::from(count.saturating_sub(self.coffee_free_units));
        -(penalized(new) - penalized(old)) * self.coffee_penalty_per_unit
    }

    /// `(count - 1) * per_extra` for two or more unlocks in one pass.
    #[must_use]
    pub fn combo_bonus(&self, unlock_count: usize) -> i64 {
        if unlock_count < 2 {
            return 0;
        }
        i64::try_from(unlock_count - 1)
            .map_or(i64::MAX, |extra| extra.saturating_mul(self.combo_xp_per_extra_unlock))
    }
}

impl Default for XpConfig {
    fn default() -> Self {
        Self {
            pill_xp: Self::default_pill_xp(),
            water_xp_per_glass: Self::default_water_xp_per_glass(),
            coffee_free_units: Self::default_coffee_free_units(),
            coffee_penalty_per_unit: Self::default_coffee_penalty_per_unit(),
            flag_xp: Self::default_flag_xp(),
            weight_xp: Self::default_weight_xp(),
            combo_xp_per_extra_unlock: Self::default_combo_xp_per_extra_unlock(),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum XpConfigError {
    #[error("{field} must not be negative (got {value})")]
    Negative { field: &'static str, value: i64 },
    #[error("coffee_free_units must be at most {max} (got {value})")]
    CoffeeFreeUnits { value: u8, max: u8 },
}

/// Feature unlocked on reaching a level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RewardTier {
    pub id: &'static str,
    pub level: u32,
    pub title_de: &'static str,
    pub title_en: &'static str,
}

impl RewardTier {
    #[must_use]
    pub const fn title(&self, language: Language) -> &'static str {
        match language {
            Language::De => self.title_de,
            Language::En => self.title_en,
        }
    }
}

pub static REWARD_TIERS: [RewardTier; 5] = [
    RewardTier {
        id: "extended_stats",
        level: 10,
        title_de: "Erweiterte Statistiken",
        title_en: "Extended statistics",
    },
    RewardTier {
        id: "golden_pink_theme",
        level: 25,
        title_de: "Golden-Pink-Design",
        title_en: "Golden pink theme",
    },
    RewardTier {
        id: "vip_chat",
        level: 50,
        title_de: "VIP-Chat",
        title_en: "VIP chat",
    },
    RewardTier {
        id: "premium_insights",
        level: 75,
        title_de: "Premium-Einblicke",
        title_en: "Premium insights",
    },
    RewardTier {
        id: "legendary_status",
        level: 100,
        title_de: "Legendärer Status",
        title_en: "Legendary status",
    },
];

#[must_use]
pub fn reward_tier(id: &str) -> Option<&'static RewardTier> {
    REWARD_TIERS.iter().find(|tier| tier.id == id)
}

/// Lowest reward above `level`.
#[must_use]
pub fn next_reward(level: u32) -> Option<&'static RewardTier> {
    REWARD_TIERS.iter().find(|tier| tier.level > level)
}

pub fn unlocked_rewards(level: u32) -> impl Iterator<Item = &'static RewardTier> {
    REWARD_TIERS.iter().filter(move |tier| tier.level <= level)
}

/// Unknown reward ids are never unlocked.
#[must_use]
pub fn is_reward_unlocked(id: &str, xp: i64) -> bool {
    reward_tier(id).is_some_and(|tier| level(xp) >= tier.level)
}

/// Rewards whose level lies in `before+1..=after`.
pub fn rewards_crossed(before: u32, after: u32) -> impl Iterator<Item = &'static RewardTier> {
    REWARD_TIERS
        .iter()
        .filter(move |tier| tier.level > before && tier.level <= after)
}
