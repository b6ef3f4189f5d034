//! Task completion: streak bookkeeping and the reward formula.
//!
//! The reward for a task is built in three steps:
//! 1. a base (10 top-level, 4 sub-task) plus the Efficient Tasking bonus,
//! 2. a due-date bonus of half the base when the task is done on or before
//!    its due day,
//! 3. a difficulty multiplier applied to the sum, rounded up.
//!
//! The result is credited to both Energy and Discipline. Medium and hard
//! tasks also queue a temporary Energy buff.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use tracing::{debug, info};

use crate::catalog::UpgradeId;
use crate::common::{Difficulty, TaskId};
use crate::error::ActionResult;
use crate::game::Game;
use crate::resources::EnergyMultiplier;
use crate::tasks::Task;

const TOP_LEVEL_BASE_REWARD: u64 = 10;
const SUBTASK_BASE_REWARD: u64 = 4;
const TOP_LEVEL_UPGRADE_BONUS: u64 = 5;
const SUBTASK_UPGRADE_BONUS: u64 = 2;
const DUE_DATE_BONUS_RATE: f64 = 0.5;

/// Reward multiplier and optional buff attached to a difficulty.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DifficultyProfile {
    pub reward_multiplier: f64,
    pub buff: Option<EnergyMultiplier>,
}

impl Difficulty {
    pub fn profile(self) -> DifficultyProfile {
        match self {
            Difficulty::Easy => DifficultyProfile {
                reward_multiplier: 1.0,
                buff: None,
            },
            Difficulty::Medium => DifficultyProfile {
                reward_multiplier: 1.5,
                buff: Some(EnergyMultiplier {
                    multiplier: 1.1,
                    remaining_ms: 15_000.0,
                }),
            },
            Difficulty::Hard => DifficultyProfile {
                reward_multiplier: 2.0,
                buff: Some(EnergyMultiplier {
                    multiplier: 1.25,
                    remaining_ms: 30_000.0,
                }),
            },
        }
    }
}

/// How a completion moved the streak.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreakChange {
    /// Another completion on the same day.
    Unchanged,
    /// First completion the day after the previous one.
    Extended,
    /// A gap (or no history) started a new streak at 1.
    Restarted,
}

/// Breakdown of everything a completion awarded.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionReport {
    pub task: Task,
    pub base_reward: u64,
    pub due_date_bonus: u64,
    /// Credited to both Energy and Discipline.
    pub reward: u64,
    pub buff: Option<EnergyMultiplier>,
    pub streak_change: StreakChange,
    pub current_streak: u32,
    /// The parent removed because this was its last sub-task.
    pub parent_removed: Option<TaskId>,
}

impl Game {
    /// Local calendar day of `instant` in the game timezone.
    pub(crate) fn local_day(&self, instant: DateTime<Utc>) -> NaiveDate {
        instant.with_timezone(&self.rules.timezone).date_naive()
    }

    /// Whole calendar days between the last completion and `now`, or `None`
    /// if nothing was ever completed.
    pub(crate) fn days_since_last_completion(&self, now: DateTime<Utc>) -> Option<i64> {
        let last = self.resources.last_completion_timestamp;
        if last == 0 {
            return None;
        }
        let last = Utc.timestamp_millis_opt(last).single()?;
        Some((self.local_day(now) - self.local_day(last)).num_days())
    }

    fn update_streak(&mut self, now: DateTime<Utc>) -> StreakChange {
        let change = match self.days_since_last_completion(now) {
            Some(0) => StreakChange::Unchanged,
            Some(1) => {
                self.resources.current_streak += 1;
                StreakChange::Extended
            }
            _ => {
                self.resources.current_streak = 1;
                StreakChange::Restarted
            }
        };
        self.recompute_streak_multiplier();
        self.resources.last_completion_timestamp = now.timestamp_millis();
        match change {
            StreakChange::Unchanged => {
                debug!("Completed another task today. Streak remains {}", self.resources.current_streak)
            }
            StreakChange::Extended => info!("Streak continued! Current streak: {}", self.resources.current_streak),
            StreakChange::Restarted => info!("New streak started"),
        }
        change
    }

    /// Base reward for `task` including the Efficient Tasking bonus.
    pub fn base_reward(&self, task: &Task) -> u64 {
        let level = u64::from(self.resources.upgrade_level(UpgradeId::EfficientTasking));
        if task.is_subtask {
            SUBTASK_BASE_REWARD + SUBTASK_UPGRADE_BONUS * level
        } else {
            TOP_LEVEL_BASE_REWARD + TOP_LEVEL_UPGRADE_BONUS * level
        }
    }

    /// `ceil(base * 0.5)` when today is on or before the due day.
    ///
    /// Only calendar days are compared, so a date-time due earlier today
    /// still qualifies.
    pub fn due_date_bonus(&self, task: &Task, base_reward: u64, now: DateTime<Utc>) -> u64 {
        match task.due_date {
            Some(due) if self.local_day(now) <= due.calendar_day() => {
                (base_reward as f64 * DUE_DATE_BONUS_RATE).ceil() as u64
            }
            _ => 0,
        }
    }

    /// The reward `task` would pay if completed at `now`.
    pub fn preview_reward(&self, task: &Task, now: DateTime<Utc>) -> u64 {
        let base = self.base_reward(task);
        let bonus = self.due_date_bonus(task, base, now);
        ((base + bonus) as f64 * task.difficulty.profile().reward_multiplier).ceil() as u64
    }

    /// Completes a task, paying out its reward.
    ///
    /// Refused without any change if the task is unknown or still has
    /// sub-tasks. Completing the last sub-task also removes its parent.
    pub fn complete_task(&mut self, id: TaskId, now: DateTime<Utc>) -> ActionResult<CompletionReport> {
        let detached = self.tasks.detach_completed(id)?;
        let task = detached.task;

        let streak_change = self.update_streak(now);

        let base_reward = self.base_reward(&task);
        let due_date_bonus = self.due_date_bonus(&task, base_reward, now);
        let profile = task.difficulty.profile();
        let reward =
            ((base_reward + due_date_bonus) as f64 * profile.reward_multiplier).ceil() as u64;

        self.resources.energy += reward as f64;
        self.resources.discipline_points += reward as f64;
        if let Some(buff) = profile.buff {
            self.resources.active_energy_multipliers.push(buff);
            debug!("Added energy multiplier: {}x for {}s", buff.multiplier, buff.remaining_ms / 1000.0);
        }

        info!(
            "Task completed: {} (subtask: {}, difficulty: {}). Awarded {} Discipline & Energy",
            task.id, task.is_subtask, task.difficulty, reward
        );
        if let Some(parent) = detached.parent_removed {
            info!("All sub-tasks of {} completed; parent removed", parent);
        }

        Ok(CompletionReport {
            task,
            base_reward,
            due_date_bonus,
            reward,
            buff: profile.buff,
            streak_change,
            current_streak: self.resources.current_streak,
            parent_removed: detached.parent_removed,
        })
    }
}
