//! Immutable run configuration.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{ConfigError, Tier};

/// Smallest meaningful target: tier 2 is generated directly.
pub const MIN_TARGET_TIER: Tier = 3;
pub const DEFAULT_MAX_STAGES: u64 = 50_000;
pub const DEFAULT_FALLBACK_PROBABILITY: f64 = 0.3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimConfig {
    pub target_tier: Tier,
    #[serde(default = "default_start_stage")]
    pub start_stage: u64,
    /// Safety bound on stages played before the run is declared timed out.
    #[serde(default = "default_max_stages")]
    pub max_stages: u64,
    /// Secondary-generation probability keyed by the highest tier reached.
    #[serde(default)]
    pub secondary_probabilities: BTreeMap<Tier, f64>,
    #[serde(default = "default_fallback_probability")]
    pub fallback_secondary_probability: f64,
    /// One-time bonus items granted when a tier is first reached (ledger only).
    #[serde(default)]
    pub bonuses: BTreeMap<Tier, u32>,
}

fn default_start_stage() -> u64 {
    1
}

fn default_max_stages() -> u64 {
    DEFAULT_MAX_STAGES
}

fn default_fallback_probability() -> f64 {
    DEFAULT_FALLBACK_PROBABILITY
}

impl SimConfig {
    /// Config with the default probability table and no bonuses.
    pub fn new(target_tier: Tier) -> Self {
        Self {
            target_tier,
            start_stage: default_start_stage(),
            max_stages: DEFAULT_MAX_STAGES,
            secondary_probabilities: default_secondary_table(target_tier),
            fallback_secondary_probability: DEFAULT_FALLBACK_PROBABILITY,
            bonuses: BTreeMap::new(),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.target_tier < MIN_TARGET_TIER {
            return Err(ConfigError::TargetTierTooLow {
                min: MIN_TARGET_TIER,
                found: self.target_tier,
            });
        }
        if self.start_stage == 0 {
            return Err(ConfigError::StartStageZero);
        }
        if self.max_stages == 0 {
            return Err(ConfigError::MaxStagesZero);
        }
        for (&tier, &value) in &self.secondary_probabilities {
            if !is_probability(value) {
                return Err(ConfigError::ProbabilityOutOfRange { tier, value });
            }
        }
        if !is_probability(self.fallback_secondary_probability) {
            return Err(ConfigError::FallbackProbabilityOutOfRange(
                self.fallback_secondary_probability,
            ));
        }
        if let Some(&tier) = self
            .bonuses
            .keys()
            .find(|&&tier| tier == 0 || tier > self.target_tier)
        {
            return Err(ConfigError::BonusTierOutOfRange {
                tier,
                target: self.target_tier,
            });
        }
        Ok(())
    }

    /// Probability the secondary tier is rolled right after a reset, given the
    /// highest tier reached. Unconfigured tiers fall back to the entry for
    /// `target_tier - 1`, then to `fallback_secondary_probability`.
    pub fn secondary_probability_for(&self, max_tier: Tier) -> f64 {
        self.secondary_probabilities
            .get(&max_tier)
            .or_else(|| {
                self.secondary_probabilities
                    .get(&self.target_tier.saturating_sub(1))
            })
            .copied()
            .unwrap_or(self.fallback_secondary_probability)
    }
}

/// Tier at which the default table reaches its 30% cap.
const DEFAULT_TABLE_CAP_TIER: Tier = 10;

/// Default table for tiers `5..target`: 5% at tier 5, +5% per tier, capped at
/// 30%. Tiers past the cap are left to the `target - 1` entry, which the
/// lookup falls back to.
pub fn default_secondary_table(target_tier: Tier) -> BTreeMap<Tier, f64> {
    let unlock = crate::generation::SECONDARY_UNLOCK_TIER;
    let below_target = target_tier.saturating_sub(1);
    (unlock..target_tier)
        .take_while(|&tier| tier <= DEFAULT_TABLE_CAP_TIER)
        .chain((below_target > DEFAULT_TABLE_CAP_TIER).then_some(below_target))
        .map(|tier| {
            let percent = 5 + (tier - unlock).min(DEFAULT_TABLE_CAP_TIER - unlock) * 5;
            (tier, f64::from(percent) / 100.0)
        })
        .collect()
}

fn is_probability(value: f64) -> bool {
    (0.0..=1.0).contains(&value)
}
