//! Tier ledger: per-tier item counts with cascade resolution, no geometry.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{Event, Fault, Progress, Tier};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierLedger {
    target_tier: Tier,
    /// `counts[tier - 1]` for every tier touched so far. Grows on demand and
    /// never past the target tier, whose slot never merges.
    counts: Vec<u32>,
    /// Bonus items not yet granted, keyed by the tier that unlocks them.
    pending_bonuses: BTreeMap<Tier, u32>,
}

impl TierLedger {
    pub fn new(target_tier: Tier, bonuses: &BTreeMap<Tier, u32>) -> Self {
        Self {
            target_tier,
            counts: Vec::new(),
            pending_bonuses: bonuses
                .iter()
                .filter(|(_, &count)| count > 0)
                .map(|(&tier, &count)| (tier, count))
                .collect(),
        }
    }

    /// Highest tier the ledger can hold.
    pub fn capacity(&self) -> Tier {
        self.target_tier
    }

    pub fn count(&self, tier: Tier) -> u32 {
        if tier == 0 {
            return 0;
        }
        self.counts.get(tier as usize - 1).copied().unwrap_or(0)
    }

    /// Counts for tiers `1..=n`, where `n` is the highest tier touched so far.
    pub fn counts(&self) -> &[u32] {
        &self.counts
    }

    pub fn pending_bonuses(&self) -> &BTreeMap<Tier, u32> {
        &self.pending_bonuses
    }

    pub fn item_count(&self) -> u64 {
        self.counts.iter().map(|&c| u64::from(c)).sum()
    }

    /// Highest tier currently held, 0 when empty.
    pub fn max_tier(&self) -> Tier {
        self.counts
            .iter()
            .rposition(|&c| c > 0)
            .map_or(0, tier_at)
    }

    /// Adds one item at `tier`, then resolves every cascade it triggers.
    pub fn deposit(
        &mut self,
        tier: Tier,
        stage: u64,
        progress: &mut Progress,
        events: &mut Vec<Event>,
    ) -> Result<(), Fault> {
        if tier == 0 || tier > self.capacity() {
            return Err(Fault::TierOutOfRange {
                tier,
                capacity: self.capacity(),
            });
        }
        *self.slot_mut(tier) += 1;
        self.resolve_cascades(stage, progress, events);
        Ok(())
    }

    /// Merges pairs until every slot below the top holds fewer than two items.
    ///
    /// Always restarts from the lowest tier after a conversion. A new maximum
    /// tier records a milestone and releases that tier's pending bonus into
    /// its own slot, where it can cascade further.
    pub fn resolve_cascades(
        &mut self,
        stage: u64,
        progress: &mut Progress,
        events: &mut Vec<Event>,
    ) {
        while let Some(index) = self.first_mergeable() {
            let pairs = self.counts[index] / 2;
            self.counts[index] -= 2 * pairs;
            let produced = tier_at(index + 1);
            *self.slot_mut(produced) += pairs;
            events.push(Event::Merged {
                tier: produced,
                mv: None,
                count: pairs,
            });

            if progress.raise(produced, stage) {
                tracing::debug!(tier = produced, stage, "ledger reached new tier");
                events.push(Event::MilestoneReached { tier: produced });
                self.grant_bonus(produced, events);
            }
        }
    }

    fn first_mergeable(&self) -> Option<usize> {
        let top = (self.target_tier as usize).saturating_sub(1);
        self.counts.iter().take(top).position(|&c| c >= 2)
    }

    fn slot_mut(&mut self, tier: Tier) -> &mut u32 {
        let index = tier as usize - 1;
        if self.counts.len() <= index {
            self.counts.resize(index + 1, 0);
        }
        &mut self.counts[index]
    }

    fn grant_bonus(&mut self, tier: Tier, events: &mut Vec<Event>) {
        let Some(count) = self.pending_bonuses.remove(&tier) else {
            return;
        };
        *self.slot_mut(tier) += count;
        tracing::debug!(tier, count, "bonus items granted");
        events.push(Event::BonusGranted { tier, count });
    }
}

#[allow(clippy::cast_possible_truncation)] // ledger length never exceeds a u32 target tier
fn tier_at(index: usize) -> Tier {
    (index + 1) as Tier
}
