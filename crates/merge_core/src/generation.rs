//! Generation policy: which tier each unit of energy produces.
//!
//! Only the primary tier is produced until tier 5 has been reached. After
//! that, every primary roll raises the chance of a secondary item by
//! [`SECONDARY_STEP`]; a secondary roll resets it from the configured table
//! and forces the next roll to primary.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::{SimConfig, Tier};

pub const PRIMARY_TIER: Tier = 1;
pub const SECONDARY_TIER: Tier = 2;
/// Highest-tier threshold at which secondary generation unlocks.
pub const SECONDARY_UNLOCK_TIER: Tier = 5;
pub const SECONDARY_STEP: f64 = 0.10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationState {
    pub max_tier_achieved: Tier,
    pub last_was_secondary: bool,
    pub secondary_probability: f64,
}

impl GenerationState {
    pub fn new(max_tier_achieved: Tier) -> Self {
        Self {
            max_tier_achieved,
            last_was_secondary: false,
            secondary_probability: 0.0,
        }
    }

    pub fn secondary_unlocked(&self) -> bool {
        self.max_tier_achieved >= SECONDARY_UNLOCK_TIER
    }

    /// Draws the tier for one unit of energy. The RNG is consulted only when
    /// a secondary item is possible.
    pub fn next_tier(&mut self, config: &SimConfig, rng: &mut impl Rng) -> Tier {
        let eligible = self.secondary_unlocked() && !self.last_was_secondary;
        if eligible && rng.gen::<f64>() < self.secondary_probability {
            self.last_was_secondary = true;
            self.secondary_probability = config.secondary_probability_for(self.max_tier_achieved);
            return SECONDARY_TIER;
        }

        self.last_was_secondary = false;
        if self.secondary_unlocked() {
            self.secondary_probability = (self.secondary_probability + SECONDARY_STEP).min(1.0);
        }
        PRIMARY_TIER
    }

    /// Syncs the highest tier after merges settle. A secondary item that
    /// pushed the maximum higher re-reads the reset probability for it.
    pub fn observe(&mut self, max_tier: Tier, config: &SimConfig) {
        self.max_tier_achieved = self.max_tier_achieved.max(max_tier);
        if self.last_was_secondary && self.secondary_unlocked() {
            self.secondary_probability = config.secondary_probability_for(self.max_tier_achieved);
        }
    }
}
