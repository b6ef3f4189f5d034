//! # Ascendance
//!
//! The progression engine behind an idle productivity game.
//!
//! Real-world tasks pay out Energy and Discipline when completed. Energy
//! buys generators that produce more Energy every second, as long as there
//! is Discipline left to burn. Enough Energy can be converted into Focus
//! Points through a Refocus, which resets the run and pays for permanent
//! upgrades.
//!
//! ## Core Concepts
//!
//! - **Game**: The synchronous game state. Every rule (production, rewards,
//!   streaks, prestige, task hierarchy) is a method on `Game`, so the whole
//!   simulation can be driven without a runtime.
//! - **SystemClock**: A ticker at a configurable resolution. Each tick
//!   carries the real elapsed delta and advances the game by that much.
//! - **Event-Driven**: Every successful or rejected operation is broadcast
//!   as a `GameEvent`. Front ends subscribe and re-read the `view` accessors.
//! - **Persistence**: The game is saved as versioned JSON through a
//!   `SaveStore` on a timer and after every change.
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use ascendance::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = AscendanceConfig::load(Some(std::path::Path::new("ascendance.toml")))?;
//!     let engine = AscendanceEngine::new(config);
//!
//!     let mut events = engine.subscribe_game_events();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("Game event: {:?}", event);
//!         }
//!     });
//!
//!     engine.add_task("Write report", None, Difficulty::Hard).await?;
//!
//!     // Runs until Ctrl+C, then saves.
//!     engine.run().await?;
//!     Ok(())
//! }
//! ```

pub const ENGINE_NAME: &str = "Ascendance Engine";
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// Declare all the modules in the crate.
pub mod catalog;
pub mod common;
mod components;
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod format;
pub mod game;
pub mod persistence;
pub mod prestige;
pub mod production;
pub mod resources;
pub mod rewards;
pub mod tasks;
pub mod time;
pub mod view;

/// A prelude module for easy importing of the most common Ascendance types.
pub mod prelude {
    pub use crate::catalog::{GeneratorId, UpgradeId};
    pub use crate::common::{Currency, Difficulty, ListenerId, TaskId};
    pub use crate::config::{AscendanceConfig, ClockResolution, GameRules};
    pub use crate::engine::AscendanceEngine;
    pub use crate::error::{ActionResult, Rejection};
    pub use crate::events::{FrameEvent, GameEvent, SystemEvent};
    pub use crate::game::Game;
    pub use crate::persistence::{FileStore, MemoryStore, SaveStore};
    pub use crate::tasks::{DueDate, SubtaskSpec};
    pub use crate::time::{ManualTimeSource, SystemTimeSource, TimeSource};
}
