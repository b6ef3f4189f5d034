//! Contains common, primitive types shared across the engine.
//!
//! This module defines the identifier types for tasks and listeners along
//! with the small value enums (difficulty, currency) that the reward and
//! production formulas branch on. Using distinct types keeps ids from
//! different domains from being mixed up.

use serde::{Deserialize, Serialize};
use slotmap::new_key_type;
use std::fmt;
use std::str::FromStr;

use crate::error::Rejection;

new_key_type! {
    /// Uniquely and safely identifies a registered interval listener within the engine.
    ///
    /// This key is returned when a new listener is added to the engine. It is
    /// guaranteed to be unique and will not be reused, preventing stale ID bugs.
    pub struct ListenerId;
}

/// Identifies a task in the task store.
///
/// Task ids are allocated from a monotonic counter and are never reused, even
/// after the task they named has been completed or deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub u64);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl FromStr for TaskId {
    type Err = Rejection;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .trim_start_matches('#')
            .parse::<u64>()
            .map(TaskId)
            .map_err(|_| Rejection::InvalidTaskId(s.to_string()))
    }
}

/// How demanding a task is. Drives the reward multiplier and the temporary
/// Energy buff granted on completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard];

    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Difficulty {
    type Err = Rejection;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "easy" | "e" => Ok(Difficulty::Easy),
            "medium" | "m" => Ok(Difficulty::Medium),
            "hard" | "h" => Ok(Difficulty::Hard),
            _ => Err(Rejection::UnknownDifficulty(s.to_string())),
        }
    }
}

/// The spendable currencies, used when reporting an unaffordable purchase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Currency {
    Energy,
    FocusPoints,
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Currency::Energy => f.write_str("Energy"),
            Currency::FocusPoints => f.write_str("Focus Points"),
        }
    }
}
