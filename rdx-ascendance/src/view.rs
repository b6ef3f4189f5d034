//! Read-only snapshots of the game for presentation code.
//!
//! Every view is computed on demand from a `&Game`; nothing here mutates
//! state or caches derived values.

use chrono::{DateTime, Utc};
use std::time::Duration;

use crate::catalog::{GeneratorId, UpgradeId};
use crate::common::{Difficulty, TaskId};
use crate::game::Game;
use crate::tasks::{DueDate, Task};

#[derive(Debug, Clone, PartialEq)]
pub struct BuffView {
    pub multiplier: f64,
    pub remaining_secs: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResourceSummary {
    pub energy: f64,
    pub discipline: f64,
    pub focus_points: f64,
    pub energy_per_second: f64,
    pub current_streak: u32,
    pub streak_multiplier: f64,
    pub buffs: Vec<BuffView>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GeneratorView {
    pub id: GeneratorId,
    pub name: &'static str,
    pub count: u32,
    pub current_cost: u64,
    pub current_production: f64,
    pub can_afford: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UpgradeView {
    pub id: UpgradeId,
    pub name: &'static str,
    pub description: &'static str,
    pub current_level: u32,
    pub max_level: u32,
    pub cost: f64,
    pub can_afford: bool,
    pub is_max_level: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PrestigeView {
    pub requirement: f64,
    pub can_prestige: bool,
    pub gain: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DueStatus {
    Ok,
    DueSoon,
    Overdue,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TaskView {
    pub id: TaskId,
    pub text: String,
    pub difficulty: Difficulty,
    pub due_date: Option<DueDate>,
    pub due_status: Option<DueStatus>,
    /// Time left until the deadline; zero once overdue.
    pub remaining: Option<Duration>,
    pub reward_preview: u64,
    pub can_break_down: bool,
    pub is_subtask: bool,
    pub is_collapsed: bool,
    pub subtasks: Vec<TaskView>,
}

impl Game {
    pub fn resource_summary(&self) -> ResourceSummary {
        let res = &self.resources;
        ResourceSummary {
            energy: res.energy,
            discipline: res.discipline_points,
            focus_points: res.focus_points,
            energy_per_second: self.passive_energy_per_second(),
            current_streak: res.current_streak,
            streak_multiplier: res.streak_energy_multiplier,
            buffs: res
                .active_energy_multipliers
                .iter()
                .map(|m| BuffView {
                    multiplier: m.multiplier,
                    remaining_secs: (m.remaining_ms / 1000.0).max(0.0),
                })
                .collect(),
        }
    }

    pub fn generator_view(&self, id: GeneratorId) -> GeneratorView {
        GeneratorView {
            id,
            name: id.definition().name,
            count: self.resources.generator_count(id),
            current_cost: self.generator_cost(id),
            current_production: self.generator_production(id),
            can_afford: self.can_afford_generator(id),
        }
    }

    pub fn generator_views(&self) -> Vec<GeneratorView> {
        GeneratorId::ALL.into_iter().map(|id| self.generator_view(id)).collect()
    }

    pub fn upgrade_view(&self, id: UpgradeId) -> UpgradeView {
        let def = id.definition();
        UpgradeView {
            id,
            name: def.name,
            description: def.description,
            current_level: self.resources.upgrade_level(id),
            max_level: def.max_level,
            cost: def.cost,
            can_afford: self.can_afford_upgrade(id),
            is_max_level: self.is_upgrade_maxed(id),
        }
    }

    pub fn upgrade_views(&self) -> Vec<UpgradeView> {
        UpgradeId::ALL.into_iter().map(|id| self.upgrade_view(id)).collect()
    }

    pub fn prestige_view(&self) -> PrestigeView {
        PrestigeView {
            requirement: self.prestige_requirement(),
            can_prestige: self.can_prestige(),
            gain: self.focus_points_gain(),
        }
    }

    /// Classifies a due date relative to `now`.
    pub fn due_status(&self, due: DueDate, now: DateTime<Utc>) -> (DueStatus, Duration) {
        let left = due.deadline(&self.rules.timezone) - now;
        if left <= chrono::Duration::zero() {
            return (DueStatus::Overdue, Duration::ZERO);
        }
        let remaining = left.to_std().unwrap_or(Duration::ZERO);
        let status = if left < chrono::Duration::hours(self.rules.due_soon_hours) {
            DueStatus::DueSoon
        } else {
            DueStatus::Ok
        };
        (status, remaining)
    }

    fn task_view(&self, task: &Task, now: DateTime<Utc>) -> TaskView {
        let due = task.due_date.map(|d| self.due_status(d, now));
        TaskView {
            id: task.id,
            text: task.text.clone(),
            difficulty: task.difficulty,
            due_date: task.due_date,
            due_status: due.map(|(status, _)| status),
            remaining: due.map(|(_, left)| left),
            reward_preview: self.preview_reward(task, now),
            can_break_down: task.can_break_down(),
            is_subtask: task.is_subtask,
            is_collapsed: task.is_collapsed,
            subtasks: self
                .tasks
                .subtasks_of(task)
                .map(|child| self.task_view(child, now))
                .collect(),
        }
    }

    /// Top-level tasks in insertion order, each with its children nested.
    pub fn task_views(&self, now: DateTime<Utc>) -> Vec<TaskView> {
        self.tasks
            .top_level()
            .map(|task| self.task_view(task, now))
            .collect()
    }
}
