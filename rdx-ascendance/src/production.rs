//! Generator pricing and passive production.

use tracing::info;

use crate::catalog::{GeneratorId, UpgradeId};
use crate::common::Currency;
use crate::error::{ActionResult, Rejection};
use crate::game::Game;

/// Cost factor applied to Student Interns once Intern Referral is owned.
const INTERN_DISCOUNT: f64 = 0.9;

/// Production factor applied to Manual Clicks once Click Training is owned.
const CLICK_TRAINING_BOOST: f64 = 2.0;

impl Game {
    /// `ceil(base_cost * cost_scale^count * discount)`.
    pub fn generator_cost(&self, id: GeneratorId) -> u64 {
        let def = id.definition();
        let count = self.resources.generator_count(id);
        let discount = if id == GeneratorId::StudentIntern
            && self.resources.has_upgrade(UpgradeId::InternReferral)
        {
            INTERN_DISCOUNT
        } else {
            1.0
        };
        (def.base_cost * def.cost_scale.powi(count as i32) * discount).ceil() as u64
    }

    /// Upgrade-driven production factor for a single generator type.
    fn production_multiplier(&self, id: GeneratorId) -> f64 {
        if id == GeneratorId::ManualClick && self.resources.has_upgrade(UpgradeId::ClickTraining) {
            CLICK_TRAINING_BOOST
        } else {
            1.0
        }
    }

    /// Energy per second currently produced by all units of `id`.
    pub fn generator_production(&self, id: GeneratorId) -> f64 {
        f64::from(self.resources.generator_count(id))
            * id.definition().base_production
            * self.production_multiplier(id)
    }

    /// Energy per second from every owned generator, before buffs.
    pub fn passive_energy_per_second(&self) -> f64 {
        GeneratorId::ALL
            .into_iter()
            .map(|id| self.generator_production(id))
            .sum()
    }

    pub fn discipline_drain_per_second(&self) -> f64 {
        self.resources.total_generator_count() as f64 * self.rules.discipline_drain_per_generator
    }

    pub fn can_afford_generator(&self, id: GeneratorId) -> bool {
        self.resources.energy >= self.generator_cost(id) as f64
    }

    /// Buys one unit of `id`. Nothing changes if Energy is short.
    /// Returns the new unit count.
    pub fn buy_generator(&mut self, id: GeneratorId) -> ActionResult<u32> {
        let cost = self.generator_cost(id) as f64;
        if self.resources.energy < cost {
            return Err(Rejection::InsufficientFunds {
                currency: Currency::Energy,
                needed: cost,
                available: self.resources.energy,
            });
        }
        self.resources.energy -= cost;
        let generator = self.resources.generators.entry(id).or_default();
        generator.count += 1;
        let count = generator.count;
        info!("Bought {}, new count: {}", id, count);
        Ok(count)
    }
}
