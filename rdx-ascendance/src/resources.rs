//! The resource ledger: every scalar currency plus the bookkeeping that the
//! production and reward formulas read from.

use std::collections::BTreeMap;

use crate::catalog::{GeneratorId, UpgradeId};

/// A temporary Energy buff granted by completing a medium or hard task.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnergyMultiplier {
    /// Factor applied to passive Energy while active. Always above 1.
    pub multiplier: f64,
    pub remaining_ms: f64,
}

/// Ownership of one generator type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GeneratorState {
    pub count: u32,
}

/// All mutable game currencies and progression counters.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceState {
    /// Never clamped; purchases check affordability first.
    pub energy: f64,
    /// Clamped to zero on every tick.
    pub discipline_points: f64,
    /// Only Refocus adds and only upgrade purchases spend.
    pub focus_points: f64,
    pub active_energy_multipliers: Vec<EnergyMultiplier>,
    pub current_streak: u32,
    /// Epoch milliseconds of the last task completion, 0 when never.
    pub last_completion_timestamp: i64,
    /// Derived from `current_streak`; see [`ResourceState::recompute_streak_multiplier`].
    pub streak_energy_multiplier: f64,
    pub focus_upgrades_purchased: BTreeMap<UpgradeId, u32>,
    pub generators: BTreeMap<GeneratorId, GeneratorState>,
}

impl Default for ResourceState {
    fn default() -> Self {
        Self {
            energy: 0.0,
            discipline_points: 0.0,
            focus_points: 0.0,
            active_energy_multipliers: Vec::new(),
            current_streak: 0,
            last_completion_timestamp: 0,
            streak_energy_multiplier: 1.0,
            focus_upgrades_purchased: BTreeMap::new(),
            generators: GeneratorId::ALL
                .into_iter()
                .map(|id| (id, GeneratorState::default()))
                .collect(),
        }
    }
}

impl ResourceState {
    pub fn generator_count(&self, id: GeneratorId) -> u32 {
        self.generators.get(&id).map_or(0, |g| g.count)
    }

    pub fn total_generator_count(&self) -> u64 {
        self.generators.values().map(|g| u64::from(g.count)).sum()
    }

    pub fn upgrade_level(&self, id: UpgradeId) -> u32 {
        self.focus_upgrades_purchased.get(&id).copied().unwrap_or(0)
    }

    pub fn has_upgrade(&self, id: UpgradeId) -> bool {
        self.upgrade_level(id) > 0
    }

    /// Sets `streak_energy_multiplier = 1 + min(streak * per_day, cap)`.
    pub fn recompute_streak_multiplier(&mut self, per_day: f64, cap: f64) {
        let bonus = (f64::from(self.current_streak) * per_day).min(cap);
        self.streak_energy_multiplier = 1.0 + bonus;
    }

    /// Ages every buff by `elapsed_ms`, drops the expired ones and returns
    /// the product of the survivors along with how many expired.
    pub fn decay_multipliers(&mut self, elapsed_ms: f64) -> (f64, usize) {
        let before = self.active_energy_multipliers.len();
        let mut combined = 1.0;
        self.active_energy_multipliers.retain_mut(|buff| {
            buff.remaining_ms -= elapsed_ms;
            if buff.remaining_ms > 0.0 {
                combined *= buff.multiplier;
                true
            } else {
                false
            }
        });
        (combined, before - self.active_energy_multipliers.len())
    }

    /// Zeroes the run-scoped currencies and generator counts. Focus Points,
    /// upgrades, buffs and streak survive.
    pub fn reset_for_prestige(&mut self) {
        self.energy = 0.0;
        self.discipline_points = 0.0;
        for generator in self.generators.values_mut() {
            generator.count = 0;
        }
    }
}
