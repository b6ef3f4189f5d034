//! The Focus layer: Refocus (prestige) and the upgrade tree it pays for.

use tracing::info;

use crate::catalog::UpgradeId;
use crate::common::Currency;
use crate::error::{ActionResult, Rejection};
use crate::game::Game;

/// Outcome of a successful Refocus.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PrestigeReport {
    pub focus_points_gained: u64,
    pub energy_spent: f64,
    pub total_focus_points: f64,
}

impl Game {
    pub fn prestige_requirement(&self) -> f64 {
        self.rules.prestige_requirement
    }

    pub fn can_prestige(&self) -> bool {
        self.resources.energy >= self.rules.prestige_requirement
    }

    /// One Focus Point per full requirement of Energy; 0 below the requirement.
    pub fn focus_points_gain(&self) -> u64 {
        if !self.can_prestige() {
            return 0;
        }
        (self.resources.energy / self.rules.prestige_requirement).floor() as u64
    }

    /// Converts Energy into Focus Points and resets the run.
    ///
    /// Energy, Discipline and generator counts go to 0. Focus Points,
    /// upgrades, buffs, streak and tasks carry over.
    pub fn attempt_prestige(&mut self) -> ActionResult<PrestigeReport> {
        if !self.can_prestige() {
            return Err(Rejection::PrestigeLocked {
                required: self.rules.prestige_requirement,
                available: self.resources.energy,
            });
        }
        let gain = self.focus_points_gain();
        let energy_spent = self.resources.energy;

        self.resources.focus_points += gain as f64;
        self.resources.reset_for_prestige();

        info!("Refocused: gained {} Focus Points", gain);
        Ok(PrestigeReport {
            focus_points_gained: gain,
            energy_spent,
            total_focus_points: self.resources.focus_points,
        })
    }

    pub fn can_afford_upgrade(&self, id: UpgradeId) -> bool {
        self.resources.focus_points >= id.definition().cost
    }

    pub fn is_upgrade_maxed(&self, id: UpgradeId) -> bool {
        self.resources.upgrade_level(id) >= id.definition().max_level
    }

    /// Buys one level of a focus upgrade. Returns the new level.
    pub fn buy_focus_upgrade(&mut self, id: UpgradeId) -> ActionResult<u32> {
        let def = id.definition();
        if self.is_upgrade_maxed(id) {
            return Err(Rejection::MaxLevel(id));
        }
        if !self.can_afford_upgrade(id) {
            return Err(Rejection::InsufficientFunds {
                currency: Currency::FocusPoints,
                needed: def.cost,
                available: self.resources.focus_points,
            });
        }
        self.resources.focus_points -= def.cost;
        let level = self.resources.focus_upgrades_purchased.entry(id).or_insert(0);
        *level += 1;
        let level = *level;
        info!("Purchased upgrade: {} (Level {})", def.name, level);
        Ok(level)
    }
}
