//! Defines all configuration structures for the Ascendance engine.
//!
//! These structs are deserialized with `serde`, usually from a TOML file
//! layered with `ASCENDANCE__*` environment overrides through the `config`
//! crate. Every field has a default, so an empty or missing file yields a
//! playable setup.

use chrono_tz::Tz;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// The top-level configuration for the `AscendanceEngine`.
#[derive(Debug, Clone, Deserialize)]
pub struct AscendanceConfig {
    /// The tick speed of the master `SystemClock`.
    #[serde(default)]
    pub resolution: ClockResolution,

    /// Seconds between automatic saves. Saves also happen after every
    /// successful player action.
    #[serde(default = "default_autosave_interval_secs")]
    pub autosave_interval_secs: u64,

    /// Directory used by the file-backed save store.
    #[serde(default = "default_save_dir")]
    pub save_dir: PathBuf,

    /// Balance knobs for the progression formulas.
    #[serde(default)]
    pub rules: GameRules,
}

/// Defines the operational speed of the `SystemClock`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClockResolution {
    /// ~60 ticks per second. Matches a browser animation frame.
    High,
    /// ~30 ticks per second. Plenty for a terminal view.
    #[default]
    Medium,
    /// ~1 tick per second. Suitable for headless play.
    Low,
    /// A user-defined speed in ticks per second.
    Custom { ticks_per_second: u64 },
}

impl ClockResolution {
    /// The wall-clock period between two ticks.
    pub fn period(&self) -> Duration {
        let ticks_per_second = match self {
            ClockResolution::High => 60,
            ClockResolution::Medium => 30,
            ClockResolution::Low => 1,
            ClockResolution::Custom { ticks_per_second } => (*ticks_per_second).max(1),
        };
        Duration::from_nanos(1_000_000_000 / ticks_per_second)
    }
}

/// Tunable constants of the progression formulas.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct GameRules {
    /// Energy required to Refocus; also the Energy per Focus Point.
    pub prestige_requirement: f64,
    /// Discipline drained per second by each owned generator.
    pub discipline_drain_per_generator: f64,
    /// Energy multiplier bonus per streak day.
    pub streak_bonus_per_day: f64,
    /// Upper bound on the streak bonus.
    pub streak_bonus_cap: f64,
    /// Remaining time under which a task counts as due soon.
    pub due_soon_hours: i64,
    /// Timezone that defines calendar days for streaks and due dates.
    /// Uses IANA names (e.g., "Europe/Berlin").
    pub timezone: Tz,
}

impl Default for GameRules {
    fn default() -> Self {
        Self {
            prestige_requirement: 1000.0,
            discipline_drain_per_generator: 0.1,
            streak_bonus_per_day: 0.01,
            streak_bonus_cap: 0.5,
            due_soon_hours: 48,
            timezone: Tz::UTC,
        }
    }
}

impl Default for AscendanceConfig {
    fn default() -> Self {
        Self {
            resolution: ClockResolution::default(),
            autosave_interval_secs: default_autosave_interval_secs(),
            save_dir: default_save_dir(),
            rules: GameRules::default(),
        }
    }
}

impl AscendanceConfig {
    /// Loads the configuration from an optional TOML file, then applies
    /// `ASCENDANCE__*` environment variables on top
    /// (e.g. `ASCENDANCE__RULES__TIMEZONE=Europe/Paris`).
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(false));
        }
        let settings = builder
            .add_source(config::Environment::with_prefix("ASCENDANCE").separator("__"))
            .build()?;
        Ok(settings.try_deserialize()?)
    }

    pub fn autosave_interval(&self) -> Duration {
        Duration::from_secs(self.autosave_interval_secs.max(1))
    }
}

// --- Default value functions for serde ---

fn default_autosave_interval_secs() -> u64 {
    30
}

fn default_save_dir() -> PathBuf {
    PathBuf::from("saves")
}
