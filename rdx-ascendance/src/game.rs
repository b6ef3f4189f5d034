//! The synchronous game context: resource ledger, task store and rules.
//!
//! `Game` owns every piece of mutable game state and is only ever mutated
//! through `&mut self`, one operation at a time. The production, reward and
//! prestige rules are implemented as further `impl Game` blocks in their own
//! modules. The async engine wraps a `Game` and drives `tick` from its clock.

use chrono::{DateTime, Utc};
use tracing::{debug, trace};

use crate::config::GameRules;
use crate::resources::ResourceState;
use crate::tasks::TaskStore;

/// What a single tick did to the ledger.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickReport {
    /// Passive Energy added this tick (0 while Discipline is exhausted).
    pub energy_gained: f64,
    pub discipline_drained: f64,
    /// Product of all temporary buffs and the streak multiplier.
    pub combined_multiplier: f64,
    pub buffs_expired: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Game {
    pub(crate) rules: GameRules,
    pub(crate) resources: ResourceState,
    pub(crate) tasks: TaskStore,
}

impl Game {
    /// A fresh game with empty ledger and no tasks.
    pub fn new(rules: GameRules) -> Self {
        Self {
            rules,
            resources: ResourceState::default(),
            tasks: TaskStore::new(),
        }
    }

    /// Rebuilds a game from restored parts, re-deriving the streak multiplier.
    pub fn from_parts(rules: GameRules, resources: ResourceState, tasks: TaskStore) -> Self {
        let mut game = Self {
            rules,
            resources,
            tasks,
        };
        game.recompute_streak_multiplier();
        game
    }

    pub fn rules(&self) -> &GameRules {
        &self.rules
    }

    pub fn resources(&self) -> &ResourceState {
        &self.resources
    }

    pub fn tasks(&self) -> &TaskStore {
        &self.tasks
    }

    /// Advances the simulation by `delta_secs` seconds.
    ///
    /// Buffs decay first, then Discipline drains; passive Energy only
    /// accrues if some Discipline is left afterwards.
    pub fn tick(&mut self, delta_secs: f64) -> TickReport {
        let dt = if delta_secs.is_finite() && delta_secs > 0.0 {
            delta_secs
        } else {
            0.0
        };

        let (temp_multiplier, buffs_expired) = self.resources.decay_multipliers(dt * 1000.0);
        if buffs_expired > 0 {
            debug!("{} energy multiplier(s) expired", buffs_expired);
        }
        let combined_multiplier = temp_multiplier * self.resources.streak_energy_multiplier;

        let passive_gain = self.passive_energy_per_second();

        let discipline_before = self.resources.discipline_points;
        self.resources.discipline_points -= self.discipline_drain_per_second() * dt;
        if self.resources.discipline_points < 0.0 {
            self.resources.discipline_points = 0.0;
        }
        let discipline_drained = discipline_before - self.resources.discipline_points;

        let energy_gained = if self.resources.discipline_points > 0.0 {
            passive_gain * combined_multiplier * dt
        } else {
            0.0
        };
        self.resources.energy += energy_gained;

        trace!(
            "tick dt={:.4}s gain={:.4} drain={:.4} x{:.3}",
            dt,
            energy_gained,
            discipline_drained,
            combined_multiplier
        );
        TickReport {
            energy_gained,
            discipline_drained,
            combined_multiplier,
            buffs_expired,
        }
    }

    /// Resets a broken streak after loading: if the last completion was
    /// neither today nor yesterday the streak drops to 0. The multiplier is
    /// always re-derived.
    pub fn refresh_streak(&mut self, now: DateTime<Utc>) {
        let last = self.resources.last_completion_timestamp;
        if last == 0 {
            self.resources.current_streak = 0;
        } else {
            let days = self.days_since_last_completion(now);
            if !matches!(days, Some(0) | Some(1)) {
                debug!(
                    "Streak of {} broken (last completion {:?} days ago)",
                    self.resources.current_streak, days
                );
                self.resources.current_streak = 0;
            }
        }
        self.recompute_streak_multiplier();
    }

    pub(crate) fn recompute_streak_multiplier(&mut self) {
        self.resources
            .recompute_streak_multiplier(self.rules.streak_bonus_per_day, self.rules.streak_bonus_cap);
    }

    /// Test and tooling hook for seeding the ledger.
    pub fn resources_mut(&mut self) -> &mut ResourceState {
        &mut self.resources
    }
}

impl Default for Game {
    fn default() -> Self {
        Self::new(GameRules::default())
    }
}
