//! Rejections returned by engine operations.
//!
//! Every player-facing operation either fully succeeds or returns one of
//! these without touching game state. None of them are fatal; the message
//! text is written to be shown to the player as-is.

use thiserror::Error;

use crate::catalog::UpgradeId;
use crate::common::{Currency, TaskId};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum Rejection {
    #[error("not enough {currency}: need {needed:.0}, have {available:.0}")]
    InsufficientFunds {
        currency: Currency,
        needed: f64,
        available: f64,
    },

    #[error("task {0} not found")]
    UnknownTask(TaskId),

    #[error("'{0}' is not a valid task id")]
    InvalidTaskId(String),

    #[error("unknown generator '{0}'")]
    UnknownGenerator(String),

    #[error("unknown focus upgrade '{0}'")]
    UnknownUpgrade(String),

    #[error("unknown difficulty '{0}' (expected easy, medium or hard)")]
    UnknownDifficulty(String),

    #[error("could not read due date '{0}' (expected YYYY-MM-DD or YYYY-MM-DDTHH:MM)")]
    InvalidDueDate(String),

    #[error("please enter a task description")]
    EmptyDescription,

    #[error("complete all sub-tasks of task {0} first")]
    HasSubtasks(TaskId),

    #[error("task {0} cannot be broken down")]
    NotBreakable(TaskId),

    #[error("a breakdown needs at least 2 sub-tasks, got {0}")]
    TooFewSubtasks(usize),

    #[error("{0} is already at max level")]
    MaxLevel(UpgradeId),

    #[error("refocusing requires {required:.0} Energy, have {available:.0}")]
    PrestigeLocked { required: f64, available: f64 },
}

impl Rejection {
    /// True when the request named something that does not exist or could
    /// not be parsed, as opposed to a gameplay refusal.
    pub fn is_invalid_reference(&self) -> bool {
        matches!(
            self,
            Rejection::UnknownTask(_)
                | Rejection::InvalidTaskId(_)
                | Rejection::UnknownGenerator(_)
                | Rejection::UnknownUpgrade(_)
                | Rejection::UnknownDifficulty(_)
                | Rejection::InvalidDueDate(_)
        )
    }
}

pub type ActionResult<T> = Result<T, Rejection>;
