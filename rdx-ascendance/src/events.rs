//! Defines all public event types broadcast by the Ascendance engine.
//!
//! Presentation code subscribes to these streams and re-reads engine state
//! when something changed. Events carry just enough detail for a status
//! line; the accessors in `view` are the source of truth.

use crate::catalog::{GeneratorId, UpgradeId};
use crate::common::{ListenerId, TaskId};
use crate::error::Rejection;
use crate::game::TickReport;
use crate::prestige::PrestigeReport;
use crate::rewards::CompletionReport;
use chrono::NaiveDate;
use std::time::Duration;
use tokio::time::Instant;

/// A clock frame, broadcast once the dispatcher has applied it to the game.
///
/// Reading engine state after receiving a frame always observes that
/// frame's production.
#[derive(Debug, Clone)]
pub struct FrameEvent {
    pub tick_count: u64,
    /// Simulated time the frame advanced the game by.
    pub delta: Duration,
    pub report: TickReport,
}

/// Events related to the lifecycle and state of the engine itself.
#[derive(Debug, Clone)]
pub enum SystemEvent {
    /// Fired once when the engine's `run` loop begins.
    EngineStarted { timestamp: Instant },
    /// Fired once when the engine's `run` loop is about to exit.
    EngineShutdown,
    /// Fired when a new listener is successfully added to the engine.
    ListenerAdded { id: ListenerId },
    /// Fired when a listener is removed from the engine.
    ListenerRemoved { id: ListenerId },
}

/// Notifications emitted after every state change of the game.
///
/// Per-frame progress is not repeated here; subscribe to the frame stream
/// for that.
#[derive(Debug, Clone)]
pub enum GameEvent {
    /// The calendar day rolled over in the configured timezone.
    DayChanged { date: NaiveDate },
    /// One or more temporary Energy buffs ran out during a tick.
    BuffExpired { count: usize },
    TaskAdded { id: TaskId },
    TaskCompleted(Box<CompletionReport>),
    /// Every removed id, the target first.
    TaskDeleted { removed: Vec<TaskId> },
    TaskCollapseToggled { id: TaskId, collapsed: bool },
    TaskBrokenDown { parent: TaskId, subtasks: Vec<TaskId> },
    GeneratorPurchased { id: GeneratorId, count: u32 },
    UpgradePurchased { id: UpgradeId, level: u32 },
    Refocused(PrestigeReport),
    /// A player action was refused; state is unchanged.
    ActionRejected(Rejection),
    /// The game was written to the save store.
    Saved,
}

impl GameEvent {
    /// True for events that follow a mutation the player asked for.
    pub fn is_player_action(&self) -> bool {
        !matches!(
            self,
            GameEvent::DayChanged { .. }
                | GameEvent::BuffExpired { .. }
                | GameEvent::ActionRejected(_)
                | GameEvent::Saved
        )
    }
}
