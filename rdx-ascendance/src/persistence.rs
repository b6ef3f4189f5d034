//! Persistence boundary: an abstract blob store and the save file schema.
//!
//! The engine serializes the ledger and task list to JSON and hands the
//! text to a `SaveStore` under a fixed key. Loading is forgiving: every
//! field has a default, unknown catalog ids are dropped, and a blob that
//! cannot be parsed at all yields a fresh game instead of an error.

use anyhow::Context;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::catalog::{GeneratorId, UpgradeId};
use crate::common::{Difficulty, TaskId};
use crate::config::GameRules;
use crate::game::Game;
use crate::resources::{EnergyMultiplier, GeneratorState, ResourceState};
use crate::tasks::{Task, TaskStore};

/// Key the game is stored under.
pub const SAVE_KEY: &str = "productivityAscendanceSave";

/// Schema version written by this build.
pub const SAVE_VERSION: u32 = 1;

/// A key/value store for opaque save blobs.
pub trait SaveStore: Send + Sync {
    /// Returns `None` if nothing was ever saved under `key`.
    fn read(&self, key: &str) -> anyhow::Result<Option<String>>;
    fn write(&self, key: &str, blob: &str) -> anyhow::Result<()>;
}

/// Stores each key as `<dir>/<key>.json`.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

impl SaveStore for FileStore {
    fn read(&self, key: &str) -> anyhow::Result<Option<String>> {
        let path = self.path_for(key);
        if !path.exists() {
            return Ok(None);
        }
        let blob = fs::read_to_string(&path)
            .with_context(|| format!("reading save file {}", path.display()))?;
        Ok(Some(blob))
    }

    fn write(&self, key: &str, blob: &str) -> anyhow::Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("creating save directory {}", self.dir.display()))?;
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, blob).with_context(|| format!("writing {}", tmp.display()))?;
        fs::rename(&tmp, &path).with_context(|| format!("replacing {}", path.display()))?;
        Ok(())
    }
}

/// In-process store, handy for tests and embedding.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that already holds `blob` under [`SAVE_KEY`].
    pub fn with_save(blob: impl Into<String>) -> Self {
        let store = Self::default();
        if let Ok(mut entries) = store.entries.lock() {
            entries.insert(SAVE_KEY.to_string(), blob.into());
        }
        store
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().ok()?.get(key).cloned()
    }
}

impl SaveStore for MemoryStore {
    fn read(&self, key: &str) -> anyhow::Result<Option<String>> {
        let entries = self
            .entries
            .lock()
            .map_err(|_| anyhow::anyhow!("memory store lock poisoned"))?;
        Ok(entries.get(key).cloned())
    }

    fn write(&self, key: &str, blob: &str) -> anyhow::Result<()> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| anyhow::anyhow!("memory store lock poisoned"))?;
        entries.insert(key.to_string(), blob.to_string());
        Ok(())
    }
}

// --- Schema ---

/// Treats an explicit `null` the same as a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveFile {
    #[serde(default, deserialize_with = "null_as_default")]
    pub version: u32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub energy: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub focus_points: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub discipline_points: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub generators: BTreeMap<String, GeneratorRecord>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub focus_upgrades_purchased: BTreeMap<String, u32>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub active_energy_multipliers: Vec<MultiplierRecord>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub current_streak: u32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub last_completion_timestamp: i64,
    /// Informational only; the multiplier is re-derived from the streak.
    #[serde(default)]
    pub streak_energy_multiplier: Option<f64>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tasks: Vec<TaskRecord>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeneratorRecord {
    #[serde(default, deserialize_with = "null_as_default")]
    pub count: u32,
}

fn neutral_multiplier() -> f64 {
    1.0
}

/// Treats an explicit `null` multiplier as neutral.
fn null_as_neutral<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or_else(neutral_multiplier))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultiplierRecord {
    #[serde(default = "neutral_multiplier", deserialize_with = "null_as_neutral")]
    pub multiplier: f64,
    /// Remaining milliseconds.
    #[serde(default, deserialize_with = "null_as_default")]
    pub duration: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskRecord {
    #[serde(default, deserialize_with = "null_as_default")]
    pub id: u64,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub due_date: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub completed: bool,
    #[serde(default)]
    pub difficulty: Option<String>,
    /// Missing means "breakable if hard".
    #[serde(default)]
    pub is_breakable: Option<bool>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub is_subtask: bool,
    #[serde(default)]
    pub parent_task_id: Option<u64>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub sub_task_ids: Vec<u64>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub is_collapsed: bool,
}

impl From<&Task> for TaskRecord {
    fn from(task: &Task) -> Self {
        Self {
            id: task.id.0,
            text: Some(task.text.clone()),
            due_date: task.due_date.map(String::from),
            completed: false,
            difficulty: Some(task.difficulty.as_str().to_string()),
            is_breakable: Some(task.is_breakable),
            is_subtask: task.is_subtask,
            parent_task_id: task.parent_task_id.map(|id| id.0),
            sub_task_ids: task.sub_task_ids.iter().map(|id| id.0).collect(),
            is_collapsed: task.is_collapsed,
        }
    }
}

impl TaskRecord {
    fn into_task(self) -> Task {
        let difficulty = match self.difficulty.as_deref() {
            None => Difficulty::default(),
            Some(raw) => raw.parse().unwrap_or_else(|_| {
                warn!("Task {} has unknown difficulty '{}', using medium", self.id, raw);
                Difficulty::default()
            }),
        };
        let due_date = self.due_date.as_deref().and_then(|raw| match raw.parse() {
            Ok(due) => Some(due),
            Err(_) => {
                warn!("Task {} has unreadable due date '{}', dropping it", self.id, raw);
                None
            }
        });
        let text = self
            .text
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| "Unnamed Task".to_string());

        Task {
            id: TaskId(self.id),
            text,
            due_date,
            difficulty,
            is_breakable: self.is_breakable.unwrap_or(difficulty == Difficulty::Hard),
            is_subtask: self.is_subtask,
            parent_task_id: self.parent_task_id.filter(|_| self.is_subtask).map(TaskId),
            sub_task_ids: self.sub_task_ids.into_iter().map(TaskId).collect(),
            is_collapsed: self.is_collapsed,
        }
    }
}

impl SaveFile {
    pub fn from_game(game: &Game) -> Self {
        let res = game.resources();
        Self {
            version: SAVE_VERSION,
            energy: res.energy,
            focus_points: res.focus_points,
            discipline_points: res.discipline_points,
            generators: res
                .generators
                .iter()
                .map(|(id, g)| (id.key().to_string(), GeneratorRecord { count: g.count }))
                .collect(),
            focus_upgrades_purchased: res
                .focus_upgrades_purchased
                .iter()
                .map(|(id, level)| (id.key().to_string(), *level))
                .collect(),
            active_energy_multipliers: res
                .active_energy_multipliers
                .iter()
                .map(|m| MultiplierRecord {
                    multiplier: m.multiplier,
                    duration: m.remaining_ms,
                })
                .collect(),
            current_streak: res.current_streak,
            last_completion_timestamp: res.last_completion_timestamp,
            streak_energy_multiplier: Some(res.streak_energy_multiplier),
            tasks: game.tasks().iter().map(TaskRecord::from).collect(),
        }
    }

    /// Validates and fills the loaded data into a playable game.
    pub fn into_game(self, rules: GameRules) -> Game {
        if self.version > SAVE_VERSION {
            warn!(
                "Save file version {} is newer than supported version {}; loading what we can",
                self.version, SAVE_VERSION
            );
        }

        let mut resources = ResourceState {
            energy: finite_or_zero(self.energy),
            focus_points: finite_or_zero(self.focus_points).max(0.0),
            discipline_points: finite_or_zero(self.discipline_points).max(0.0),
            current_streak: self.current_streak,
            last_completion_timestamp: self.last_completion_timestamp.max(0),
            ..ResourceState::default()
        };

        for (key, record) in self.generators {
            match GeneratorId::from_key(&key) {
                Some(id) => {
                    resources.generators.insert(id, GeneratorState { count: record.count });
                }
                None => warn!("Ignoring unknown generator '{}' in save", key),
            }
        }
        for (key, level) in self.focus_upgrades_purchased {
            match UpgradeId::from_key(&key) {
                Some(id) => {
                    let level = level.min(id.definition().max_level);
                    resources.focus_upgrades_purchased.insert(id, level);
                }
                None => warn!("Ignoring unknown focus upgrade '{}' in save", key),
            }
        }
        resources.active_energy_multipliers = self
            .active_energy_multipliers
            .into_iter()
            .filter(|m| {
                if !(m.multiplier.is_finite() && m.multiplier > 1.0) {
                    warn!("Dropping Energy buff with multiplier {} from save", m.multiplier);
                    return false;
                }
                m.duration.is_finite() && m.duration > 0.0
            })
            .map(|m| EnergyMultiplier {
                multiplier: m.multiplier,
                remaining_ms: m.duration,
            })
            .collect();

        let mut seen = HashSet::new();
        let tasks: Vec<Task> = self
            .tasks
            .into_iter()
            .filter(|record| {
                if record.completed {
                    debug!("Skipping completed task {} in save", record.id);
                    return false;
                }
                if !seen.insert(record.id) {
                    warn!("Skipping duplicate task id {} in save", record.id);
                    return false;
                }
                true
            })
            .map(TaskRecord::into_task)
            .collect();

        Game::from_parts(rules, resources, TaskStore::from_tasks(tasks))
    }
}

fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

/// Serializes the game into a save blob.
pub fn encode(game: &Game) -> anyhow::Result<String> {
    serde_json::to_string(&SaveFile::from_game(game)).context("serializing save file")
}

/// Parses a save blob. Fails only if the text is not a JSON object of the
/// expected shape; missing fields are filled with defaults.
pub fn decode(blob: &str, rules: GameRules) -> anyhow::Result<Game> {
    let file: SaveFile = serde_json::from_str(blob).context("parsing save file")?;
    Ok(file.into_game(rules))
}

/// Writes the game to `store` under [`SAVE_KEY`].
pub fn save(store: &dyn SaveStore, game: &Game) -> anyhow::Result<()> {
    let blob = encode(game)?;
    store.write(SAVE_KEY, &blob)?;
    debug!("Game saved ({} bytes)", blob.len());
    Ok(())
}

/// Loads the game from `store`. Never fails: a missing save starts a new
/// game, and an unreadable one is logged and replaced by a new game.
pub fn load(store: &dyn SaveStore, rules: &GameRules) -> Game {
    match store.read(SAVE_KEY) {
        Ok(Some(blob)) => match decode(&blob, rules.clone()) {
            Ok(game) => {
                info!("Game loaded successfully");
                game
            }
            Err(err) => {
                error!("Error loading game: {:#}. Starting a new game.", err);
                Game::new(rules.clone())
            }
        },
        Ok(None) => {
            info!("No save file found, starting new game");
            Game::new(rules.clone())
        }
        Err(err) => {
            error!("Error reading save store: {:#}. Starting a new game.", err);
            Game::new(rules.clone())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    use crate::tasks::SubtaskSpec;

    fn sample_game() -> Game {
        let mut game = Game::default();
        game.resources_mut().energy = 1234.5;
        game.resources_mut().focus_points = 3.0;
        game.resources_mut().focus_upgrades_purchased.insert(UpgradeId::EfficientTasking, 2);
        game.resources_mut().generators.insert(GeneratorId::CoffeeMachine, GeneratorState { count: 3 });

        let easy = game.tasks.add("inbox zero", None, Difficulty::Medium).unwrap();
        game.complete_task(easy, Utc.with_ymd_and_hms(2026, 5, 1, 9, 0, 0).unwrap())
            .unwrap();

        let hard = game.tasks.add("ship release", "2026-06-01".parse().ok(), Difficulty::Hard).unwrap();
        game.tasks
            .breakdown(
                hard,
                &[
                    SubtaskSpec::new("tag", "2026-05-30T10:00".parse().ok()),
                    SubtaskSpec::new("announce", None),
                ],
            )
            .unwrap();
        game.tasks.add("stretch", None, Difficulty::Easy).unwrap();
        game
    }

    #[test]
    fn round_trip_preserves_state() {
        let game = sample_game();
        let blob = encode(&game).unwrap();
        let restored = decode(&blob, GameRules::default()).unwrap();
        assert_eq!(restored, game);
        assert_eq!(restored.tasks().last_task_id(), game.tasks().last_task_id());
    }

    #[test]
    fn blob_uses_camel_case_field_names() {
        let blob = encode(&sample_game()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&blob).unwrap();
        assert_eq!(value["generators"]["gen3"]["count"], 3);
        assert_eq!(value["focusUpgradesPurchased"]["taskEnergyBoost"], 2);
        assert_eq!(value["activeEnergyMultipliers"][0]["duration"], 15000.0);
        assert_eq!(value["tasks"][0]["dueDate"], "2026-06-01");
        assert_eq!(value["tasks"][1]["dueDate"], "2026-05-30T10:00");
        assert_eq!(value["tasks"][1]["parentTaskId"], 2);
        assert_eq!(value["version"], SAVE_VERSION);
    }

    #[test]
    fn sparse_blob_is_filled_with_defaults() {
        let blob = r#"{
            "energy": 50,
            "disciplinePoints": null,
            "generators": { "gen1": { "count": 2 }, "gen9": { "count": 4 } },
            "focusUpgradesPurchased": { "gen1Boost": 1, "timeTravel": 3 },
            "tasks": [
                { "id": 4, "difficulty": "hard" },
                { "id": 2, "text": "old", "isBreakable": false, "difficulty": "hard" },
                { "id": 6, "text": "done already", "completed": true }
            ]
        }"#;
        let game = decode(blob, GameRules::default()).unwrap();
        let res = game.resources();
        assert_eq!(res.energy, 50.0);
        assert_eq!(res.discipline_points, 0.0);
        assert_eq!(res.generator_count(GeneratorId::ManualClick), 2);
        assert_eq!(res.generator_count(GeneratorId::StudentIntern), 0);
        assert_eq!(res.upgrade_level(UpgradeId::ClickTraining), 1);
        assert_eq!(res.focus_upgrades_purchased.len(), 1);
        assert_eq!(res.streak_energy_multiplier, 1.0);

        let first = game.tasks().get(TaskId(4)).unwrap();
        assert_eq!(first.text, "Unnamed Task");
        assert!(first.is_breakable);
        assert!(!game.tasks().get(TaskId(2)).unwrap().is_breakable);
        assert!(game.tasks().get(TaskId(6)).is_none());
        assert_eq!(game.tasks().last_task_id(), 4);
    }

    #[test]
    fn sparse_buff_records_never_scale_income_down() {
        let blob = r#"{
            "disciplinePoints": 100,
            "generators": { "gen2": { "count": 1 } },
            "activeEnergyMultipliers": [
                { "duration": 5000 },
                { "multiplier": null, "duration": 5000 },
                { "multiplier": 0.5, "duration": 5000 },
                { "multiplier": 1.5, "duration": 5000 }
            ]
        }"#;
        let record: MultiplierRecord = serde_json::from_str(r#"{ "duration": 5000 }"#).unwrap();
        assert_eq!(record.multiplier, 1.0);

        let mut game = decode(blob, GameRules::default()).unwrap();
        assert_eq!(
            game.resources().active_energy_multipliers,
            vec![EnergyMultiplier { multiplier: 1.5, remaining_ms: 5000.0 }]
        );
        let tick = game.tick(1.0);
        assert!((tick.combined_multiplier - 1.5).abs() < 1e-9);
        assert!((tick.energy_gained - 1.5).abs() < 1e-9);
    }

    #[test]
    fn streak_multiplier_is_rederived_not_trusted() {
        let blob = r#"{ "currentStreak": 5, "streakEnergyMultiplier": 9.0 }"#;
        let game = decode(blob, GameRules::default()).unwrap();
        assert!((game.resources().streak_energy_multiplier - 1.05).abs() < 1e-9);
    }

    #[test]
    fn corrupt_blob_falls_back_to_new_game() {
        let store = MemoryStore::with_save("{ this is not json");
        let game = load(&store, &GameRules::default());
        assert_eq!(game, Game::default());

        let store = MemoryStore::with_save("[1, 2, 3]");
        assert_eq!(load(&store, &GameRules::default()), Game::default());
    }

    #[test]
    fn missing_save_starts_fresh() {
        let store = MemoryStore::new();
        assert_eq!(load(&store, &GameRules::default()), Game::default());
    }

    #[test]
    fn file_store_round_trip() {
        let dir = std::env::temp_dir().join("ascendance_persistence_tests").join("file_store");
        if dir.exists() {
            fs::remove_dir_all(&dir).ok();
        }
        let store = FileStore::new(&dir);
        assert_eq!(store.read(SAVE_KEY).unwrap(), None);

        let game = sample_game();
        save(&store, &game).unwrap();
        assert!(dir.join(format!("{}.json", SAVE_KEY)).exists());
        assert_eq!(load(&store, &GameRules::default()), game);
    }
}
