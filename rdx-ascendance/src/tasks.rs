//! The task store: creation, deletion, collapse and breakdown of tasks.
//!
//! Tasks live in one flat list in insertion order. Parents reference their
//! children through `sub_task_ids` (display order) and children point back
//! through `parent_task_id`. Completed tasks are removed, never archived;
//! see `rewards` for the completion path.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, warn};

use crate::common::{Difficulty, TaskId};
use crate::error::{ActionResult, Rejection};
use crate::game::Game;

/// When a task is due.
///
/// A bare calendar day is due at the very end of that day. A date-time is
/// due at that local instant. Both are read in the game timezone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum DueDate {
    Day(NaiveDate),
    At(NaiveDateTime),
}

impl DueDate {
    /// The calendar day the task is due on.
    pub fn calendar_day(&self) -> NaiveDate {
        match self {
            DueDate::Day(day) => *day,
            DueDate::At(at) => at.date(),
        }
    }

    /// The exact instant the task becomes overdue.
    pub fn deadline(&self, tz: &Tz) -> DateTime<Utc> {
        let local = match self {
            DueDate::Day(day) => day.and_time(end_of_day()),
            DueDate::At(at) => *at,
        };
        localize(tz, local)
    }
}

fn end_of_day() -> NaiveTime {
    NaiveTime::from_hms_milli_opt(23, 59, 59, 999).unwrap_or_default()
}

/// Resolves a wall-clock time in `tz`, picking the earlier instant on a DST
/// overlap and skipping forward past a DST gap.
pub(crate) fn localize(tz: &Tz, local: NaiveDateTime) -> DateTime<Utc> {
    tz.from_local_datetime(&local)
        .earliest()
        .or_else(|| {
            tz.from_local_datetime(&(local + chrono::Duration::hours(1)))
                .earliest()
        })
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|| Utc.from_utc_datetime(&local))
}

impl FromStr for DueDate {
    type Err = Rejection;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let text = s.trim();
        if text.contains('T') {
            NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M")
                .or_else(|_| NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S"))
                .map(DueDate::At)
                .map_err(|_| Rejection::InvalidDueDate(s.to_string()))
        } else {
            NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .map(DueDate::Day)
                .map_err(|_| Rejection::InvalidDueDate(s.to_string()))
        }
    }
}

impl TryFrom<String> for DueDate {
    type Error = Rejection;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<DueDate> for String {
    fn from(value: DueDate) -> Self {
        value.to_string()
    }
}

impl fmt::Display for DueDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DueDate::Day(day) => write!(f, "{}", day.format("%Y-%m-%d")),
            DueDate::At(at) => write!(f, "{}", at.format("%Y-%m-%dT%H:%M")),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Task {
    pub id: TaskId,
    pub text: String,
    pub due_date: Option<DueDate>,
    pub difficulty: Difficulty,
    pub is_breakable: bool,
    pub is_subtask: bool,
    pub parent_task_id: Option<TaskId>,
    pub sub_task_ids: Vec<TaskId>,
    pub is_collapsed: bool,
}

impl Task {
    pub fn has_subtasks(&self) -> bool {
        !self.sub_task_ids.is_empty()
    }

    /// Only hard, still-breakable top-level tasks without children qualify.
    pub fn can_break_down(&self) -> bool {
        !self.is_subtask
            && self.is_breakable
            && self.difficulty == Difficulty::Hard
            && self.sub_task_ids.is_empty()
    }
}

/// One child requested by a breakdown.
#[derive(Debug, Clone, PartialEq)]
pub struct SubtaskSpec {
    pub name: String,
    pub due_date: Option<DueDate>,
}

impl SubtaskSpec {
    pub fn new(name: impl Into<String>, due_date: Option<DueDate>) -> Self {
        Self {
            name: name.into(),
            due_date,
        }
    }
}

/// Result of removing a completed task from the store.
#[derive(Debug, Clone, PartialEq)]
pub struct Detached {
    pub task: Task,
    /// Set when the completed task was the last child of its parent and the
    /// parent was removed with it.
    pub parent_removed: Option<TaskId>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskStore {
    tasks: Vec<Task>,
    last_task_id: u64,
}

impl TaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds a store from loaded tasks. The id counter resumes after the
    /// highest id present, and links that point nowhere are repaired.
    pub fn from_tasks(tasks: Vec<Task>) -> Self {
        let last_task_id = tasks.iter().map(|t| t.id.0).max().unwrap_or(0);
        let mut store = Self {
            tasks,
            last_task_id,
        };
        store.repair_links();
        store
    }

    fn repair_links(&mut self) {
        let parents: Vec<TaskId> = self
            .tasks
            .iter()
            .filter(|t| !t.is_subtask)
            .map(|t| t.id)
            .collect();
        for task in self.tasks.iter_mut().filter(|t| t.is_subtask) {
            let parent_ok = task.parent_task_id.is_some_and(|p| parents.contains(&p));
            if !parent_ok {
                warn!("Sub-task {} has no parent; promoting it to a top-level task", task.id);
                task.is_subtask = false;
                task.parent_task_id = None;
            }
        }

        let children: Vec<(TaskId, Option<TaskId>)> = self
            .tasks
            .iter()
            .map(|t| (t.id, t.parent_task_id))
            .collect();
        for task in self.tasks.iter_mut() {
            let id = task.id;
            task.sub_task_ids.retain(|child| {
                let linked = children
                    .iter()
                    .any(|(cid, parent)| cid == child && *parent == Some(id));
                if !linked {
                    warn!("Dropping dangling sub-task link {} from task {}", child, id);
                }
                linked
            });
        }

        for (child, parent) in children {
            let Some(parent_id) = parent else { continue };
            if let Some(parent) = self.get_mut(parent_id) {
                if !parent.sub_task_ids.contains(&child) {
                    parent.sub_task_ids.push(child);
                }
            }
        }
    }

    pub fn last_task_id(&self) -> u64 {
        self.last_task_id
    }

    fn next_id(&mut self) -> TaskId {
        self.last_task_id += 1;
        TaskId(self.last_task_id)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// All live tasks in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Task> {
        self.tasks.iter()
    }

    pub fn top_level(&self) -> impl Iterator<Item = &Task> {
        self.tasks.iter().filter(|t| !t.is_subtask)
    }

    pub fn get(&self, id: TaskId) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    fn get_mut(&mut self, id: TaskId) -> Option<&mut Task> {
        self.tasks.iter_mut().find(|t| t.id == id)
    }

    fn position(&self, id: TaskId) -> Option<usize> {
        self.tasks.iter().position(|t| t.id == id)
    }

    /// Children of `parent` in display order.
    pub fn subtasks_of<'a>(&'a self, parent: &'a Task) -> impl Iterator<Item = &'a Task> + 'a {
        parent.sub_task_ids.iter().filter_map(move |id| self.get(*id))
    }

    pub fn add(
        &mut self,
        text: &str,
        due_date: Option<DueDate>,
        difficulty: Difficulty,
    ) -> ActionResult<TaskId> {
        let text = text.trim();
        if text.is_empty() {
            return Err(Rejection::EmptyDescription);
        }
        let id = self.next_id();
        self.tasks.push(Task {
            id,
            text: text.to_string(),
            due_date,
            difficulty,
            is_breakable: difficulty == Difficulty::Hard,
            is_subtask: false,
            parent_task_id: None,
            sub_task_ids: Vec::new(),
            is_collapsed: false,
        });
        debug!("Task added: {} '{}' [{}]", id, text, difficulty);
        Ok(id)
    }

    /// Deletes a task. A parent takes its children with it; a child is
    /// unlinked from its parent. Returns every removed id, target first.
    pub fn delete(&mut self, id: TaskId) -> ActionResult<Vec<TaskId>> {
        let task = self.get(id).ok_or(Rejection::UnknownTask(id))?;
        let mut removed = vec![id];

        if task.has_subtasks() {
            removed.extend(
                self.tasks
                    .iter()
                    .filter(|t| t.parent_task_id == Some(id))
                    .map(|t| t.id),
            );
        } else if let Some(parent_id) = task.parent_task_id.filter(|_| task.is_subtask) {
            if let Some(parent) = self.get_mut(parent_id) {
                parent.sub_task_ids.retain(|child| *child != id);
            }
        }

        self.tasks.retain(|t| !removed.contains(&t.id));
        debug!("Deleted tasks {:?}", removed);
        Ok(removed)
    }

    /// Flips the collapsed flag and returns its new value.
    pub fn toggle_collapse(&mut self, id: TaskId) -> ActionResult<bool> {
        let task = self.get_mut(id).ok_or(Rejection::UnknownTask(id))?;
        task.is_collapsed = !task.is_collapsed;
        Ok(task.is_collapsed)
    }

    /// Splits a hard task into at least two medium sub-tasks. Nothing is
    /// changed unless every precondition holds.
    pub fn breakdown(&mut self, parent_id: TaskId, specs: &[SubtaskSpec]) -> ActionResult<Vec<TaskId>> {
        let parent = self.get(parent_id).ok_or(Rejection::UnknownTask(parent_id))?;
        if !parent.can_break_down() {
            return Err(Rejection::NotBreakable(parent_id));
        }
        if specs.len() < 2 {
            return Err(Rejection::TooFewSubtasks(specs.len()));
        }

        let total = specs.len();
        let mut created = Vec::with_capacity(total);
        for (index, spec) in specs.iter().enumerate() {
            let name = spec.name.trim();
            let text = if name.is_empty() {
                format!("Sub-task {}/{}", index + 1, total)
            } else {
                name.to_string()
            };
            let id = self.next_id();
            self.tasks.push(Task {
                id,
                text,
                due_date: spec.due_date,
                difficulty: Difficulty::Medium,
                is_breakable: false,
                is_subtask: true,
                parent_task_id: Some(parent_id),
                sub_task_ids: Vec::new(),
                is_collapsed: false,
            });
            created.push(id);
        }

        if let Some(parent) = self.get_mut(parent_id) {
            parent.is_breakable = false;
            parent.is_collapsed = false;
            parent.sub_task_ids = created.clone();
        }
        debug!("Task {} broken down into {:?}", parent_id, created);
        Ok(created)
    }

    /// Removes a task that is being completed. Completing a parent with live
    /// children is refused. When the last child of a parent goes, the parent
    /// goes too.
    pub(crate) fn detach_completed(&mut self, id: TaskId) -> ActionResult<Detached> {
        let index = self.position(id).ok_or(Rejection::UnknownTask(id))?;
        if self.tasks[index].has_subtasks() {
            return Err(Rejection::HasSubtasks(id));
        }
        let task = self.tasks.remove(index);

        let mut parent_removed = None;
        if let Some(parent_id) = task.parent_task_id.filter(|_| task.is_subtask) {
            match self.get_mut(parent_id) {
                Some(parent) => {
                    parent.sub_task_ids.retain(|child| *child != id);
                    if parent.sub_task_ids.is_empty() {
                        self.tasks.retain(|t| t.id != parent_id);
                        parent_removed = Some(parent_id);
                    }
                }
                None => warn!("Parent {} of completed sub-task {} is missing", parent_id, id),
            }
        }
        Ok(Detached {
            task,
            parent_removed,
        })
    }
}

/// Task-list operations exposed on the game itself.
impl Game {
    pub fn add_task(
        &mut self,
        text: &str,
        due_date: Option<DueDate>,
        difficulty: Difficulty,
    ) -> ActionResult<TaskId> {
        self.tasks.add(text, due_date, difficulty)
    }

    pub fn delete_task(&mut self, id: TaskId) -> ActionResult<Vec<TaskId>> {
        self.tasks.delete(id)
    }

    pub fn toggle_collapse(&mut self, id: TaskId) -> ActionResult<bool> {
        self.tasks.toggle_collapse(id)
    }

    pub fn breakdown_task(&mut self, parent: TaskId, specs: &[SubtaskSpec]) -> ActionResult<Vec<TaskId>> {
        self.tasks.breakdown(parent, specs)
    }
}
