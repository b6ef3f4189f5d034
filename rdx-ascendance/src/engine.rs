//! The async engine that drives a `Game` in real time.

use chrono::{DateTime, Utc};
use slotmap::SlotMap;
use std::future::Future;
use std::ops::Deref;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, Mutex, RwLock};
use tracing::{debug, error, info, trace, warn};

use crate::catalog::{GeneratorId, UpgradeId};
use crate::common::{Difficulty, ListenerId, TaskId};
use crate::components::watcher::{DayWatcher, IntervalWatcher, WatcherAction};
use crate::config::AscendanceConfig;
use crate::error::{ActionResult, Rejection};
use crate::events::{FrameEvent, GameEvent, SystemEvent};
use crate::game::{Game, TickReport};
use crate::persistence::{self, FileStore, SaveStore, SAVE_KEY};
use crate::prestige::PrestigeReport;
use crate::rewards::CompletionReport;
use crate::tasks::{DueDate, SubtaskSpec};
use crate::time::{SystemClock, SystemTimeSource, TickEvent, TimeSource};

/// The main Ascendance engine.
///
/// Owns the game behind a lock, drives it from the `SystemClock`, persists
/// it, and broadcasts what changed. The engine is cheap to clone; every
/// clone is a handle to the same running instance, so a front end can keep
/// one while the loop runs on another task.
#[derive(Clone)]
pub struct AscendanceEngine {
    config: Arc<AscendanceConfig>,
    game: Arc<RwLock<Game>>,
    store: Arc<dyn SaveStore>,
    /// Held from encoding until the blob is written, so saves land in order.
    save_lock: Arc<Mutex<()>>,
    time_source: Arc<dyn TimeSource>,
    tick_sender: broadcast::Sender<Arc<TickEvent>>,
    frame_sender: broadcast::Sender<Arc<FrameEvent>>,
    system_event_sender: broadcast::Sender<SystemEvent>,
    game_event_sender: broadcast::Sender<GameEvent>,
    interval_watchers: Arc<RwLock<SlotMap<ListenerId, IntervalWatcher>>>,
    day_watcher: Arc<RwLock<DayWatcher>>,
}

// Core implementation block for internal logic.
impl AscendanceEngine {
    /// Creates an engine that saves to `config.save_dir` and reads the
    /// system clock.
    pub fn new(config: AscendanceConfig) -> Self {
        let store = Arc::new(FileStore::new(config.save_dir.clone()));
        Self::with_parts(config, store, Arc::new(SystemTimeSource))
    }

    /// Creates an engine over an explicit store and time source, loading any
    /// existing save. A broken streak is reset straight away.
    pub fn with_parts(
        config: AscendanceConfig,
        store: Arc<dyn SaveStore>,
        time_source: Arc<dyn TimeSource>,
    ) -> Self {
        const CHANNEL_CAPACITY: usize = 256;
        let (tick_sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        let (frame_sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        let (system_event_sender, _) = broadcast::channel(64);
        let (game_event_sender, _) = broadcast::channel(CHANNEL_CAPACITY);

        let now = time_source.now();
        let mut game = persistence::load(store.as_ref(), &config.rules);
        game.refresh_streak(now);

        let mut interval_watchers = SlotMap::with_key();
        interval_watchers.insert(IntervalWatcher::new(
            config.autosave_interval(),
            WatcherAction::AutoSave,
        ));
        let day_watcher = DayWatcher::new(config.rules.timezone, now);

        Self {
            config: Arc::new(config),
            game: Arc::new(RwLock::new(game)),
            store,
            save_lock: Arc::new(Mutex::new(())),
            time_source,
            tick_sender,
            frame_sender,
            system_event_sender,
            game_event_sender,
            interval_watchers: Arc::new(RwLock::new(interval_watchers)),
            day_watcher: Arc::new(RwLock::new(day_watcher)),
        }
    }

    /// Runs the engine's main loop until Ctrl+C is received.
    pub async fn run(&self) -> anyhow::Result<()> {
        self.run_until(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                error!("Unable to listen for Ctrl+C: {}", err);
            }
        })
        .await
    }

    /// Runs the engine's main loop until `shutdown` completes.
    ///
    /// This method will:
    /// 1. Spawn the `SystemClock` task.
    /// 2. Spawn the dispatcher task that applies ticks to the game.
    /// 3. Wait for `shutdown`, stop both tasks and write a final save.
    pub async fn run_until(&self, shutdown: impl Future<Output = ()>) -> anyhow::Result<()> {
        info!("AscendanceEngine starting up...");
        let (shutdown_tx, _) = broadcast::channel(1);

        let clock = SystemClock::new(self.config.resolution.clone(), self.tick_sender.clone());
        let clock_shutdown_rx = shutdown_tx.subscribe();
        let clock_handle = tokio::spawn(async move { clock.run(clock_shutdown_rx).await });

        let dispatcher = self.clone();
        let dispatcher_shutdown_rx = shutdown_tx.subscribe();
        let dispatcher_handle =
            tokio::spawn(async move { dispatcher.dispatcher_loop(dispatcher_shutdown_rx).await });

        info!("Engine running at {:?}.", self.config.resolution);
        shutdown.await;

        info!("Shutdown signal received. Broadcasting to all tasks...");
        if shutdown_tx.send(()).is_err() {
            error!("Failed to send shutdown signal. Some tasks may not terminate gracefully.");
        }
        clock_handle.await?;
        dispatcher_handle.await?;

        self.save().await?;
        self.system_event_sender
            .send(SystemEvent::EngineShutdown)
            .ok();
        info!("AscendanceEngine has shut down.");
        Ok(())
    }

    #[doc(hidden)]
    async fn dispatcher_loop(self, mut shutdown_rx: broadcast::Receiver<()>) {
        let mut tick_rx = self.tick_sender.subscribe();
        self.system_event_sender
            .send(SystemEvent::EngineStarted {
                timestamp: tokio::time::Instant::now(),
            })
            .ok();
        let mut last_applied = None;
        loop {
            tokio::select! {
                biased;
                _ = shutdown_rx.recv() => break,
                received = tick_rx.recv() => match received {
                    Ok(tick) => {
                        let delta = tick.elapsed_since(last_applied);
                        last_applied = Some(tick.timestamp);
                        trace!("Tick #{} received, applying {:?}.", tick.tick_count, delta);
                        let report = self.apply_tick(delta).await;
                        self.process_day_watcher().await;
                        self.process_interval_watchers(delta).await;
                        self.frame_sender
                            .send(Arc::new(FrameEvent {
                                tick_count: tick.tick_count,
                                delta,
                                report,
                            }))
                            .ok();
                    }
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        warn!("Dispatcher fell behind by {} ticks; the next tick covers them", missed);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
            }
        }
    }

    #[doc(hidden)]
    async fn apply_tick(&self, delta: Duration) -> TickReport {
        let report = self.game.write().await.tick(delta.as_secs_f64());
        if report.buffs_expired > 0 {
            self.game_event_sender
                .send(GameEvent::BuffExpired {
                    count: report.buffs_expired,
                })
                .ok();
        }
        report
    }

    #[doc(hidden)]
    async fn process_day_watcher(&self) {
        let now = self.time_source.now();
        let Some(date) = self.day_watcher.write().await.check(now) else {
            return;
        };
        debug!("Calendar day changed to {}", date);
        let mut game = self.game.write().await;
        game.refresh_streak(now);
        self.game_event_sender
            .send(GameEvent::DayChanged { date })
            .ok();
        self.persist(game).await;
    }

    #[doc(hidden)]
    async fn process_interval_watchers(&self, delta: Duration) {
        let mut autosave_due = false;
        {
            let mut watchers = self.interval_watchers.write().await;
            for (_id, watcher) in watchers.iter_mut() {
                if !watcher.advance(delta) {
                    continue;
                }
                match &mut watcher.action {
                    WatcherAction::AutoSave => autosave_due = true,
                    WatcherAction::Callback(task_logic) => task_logic(),
                }
            }
        }
        if autosave_due {
            debug!("Auto-saving");
            self.persist(self.game.read().await).await;
        }
    }

    /// Encodes the game behind `game` and releases that lock before the
    /// store write, which runs on the blocking pool.
    async fn write_save(&self, game: impl Deref<Target = Game>) -> anyhow::Result<()> {
        let blob = persistence::encode(&*game)?;
        let _in_order = self.save_lock.lock().await;
        drop(game);

        let store = Arc::clone(&self.store);
        let size = blob.len();
        tokio::task::spawn_blocking(move || store.write(SAVE_KEY, &blob)).await??;
        debug!("Game saved ({} bytes)", size);
        self.game_event_sender.send(GameEvent::Saved).ok();
        Ok(())
    }

    /// Like `write_save`, but failures are logged, never propagated.
    async fn persist(&self, game: impl Deref<Target = Game>) {
        if let Err(err) = self.write_save(game).await {
            error!("Failed to save game: {:#}", err);
        }
    }

    fn reject(&self, rejection: &Rejection) {
        if rejection.is_invalid_reference() {
            warn!("Action rejected: {}", rejection);
        } else {
            info!("Action rejected: {}", rejection);
        }
        self.game_event_sender
            .send(GameEvent::ActionRejected(rejection.clone()))
            .ok();
    }

    /// Runs one player operation under the write lock. On success the game
    /// is saved and `event` is broadcast; on rejection nothing changes.
    async fn apply<T>(
        &self,
        op: impl FnOnce(&mut Game, DateTime<Utc>) -> ActionResult<T>,
        event: impl FnOnce(&T) -> GameEvent,
    ) -> ActionResult<T> {
        let now = self.time_source.now();
        let mut game = self.game.write().await;
        match op(&mut *game, now) {
            Ok(value) => {
                self.game_event_sender.send(event(&value)).ok();
                self.persist(game).await;
                Ok(value)
            }
            Err(rejection) => {
                self.reject(&rejection);
                Err(rejection)
            }
        }
    }
}

// Public API implementation block.
impl AscendanceEngine {
    pub fn config(&self) -> &AscendanceConfig {
        &self.config
    }

    /// The current wall-clock time as seen by the game.
    pub fn now(&self) -> DateTime<Utc> {
        self.time_source.now()
    }

    /// Runs `f` against the current game state under the read lock.
    pub async fn read<R>(&self, f: impl FnOnce(&Game) -> R) -> R {
        let game = self.game.read().await;
        f(&*game)
    }

    /// A copy of the current game state.
    pub async fn snapshot(&self) -> Game {
        self.game.read().await.clone()
    }

    /// Advances the simulation by `delta` outside the clock loop. No frame
    /// is broadcast for a manual tick.
    pub async fn tick(&self, delta: Duration) -> TickReport {
        self.apply_tick(delta).await
    }

    /// Saves immediately.
    pub async fn save(&self) -> anyhow::Result<()> {
        self.write_save(self.game.read().await).await
    }

    pub async fn add_task(
        &self,
        text: &str,
        due_date: Option<DueDate>,
        difficulty: Difficulty,
    ) -> ActionResult<TaskId> {
        self.apply(
            |game, _| game.add_task(text, due_date, difficulty),
            |id| GameEvent::TaskAdded { id: *id },
        )
        .await
    }

    pub async fn complete_task(&self, id: TaskId) -> ActionResult<CompletionReport> {
        self.apply(
            |game, now| game.complete_task(id, now),
            |report| GameEvent::TaskCompleted(Box::new(report.clone())),
        )
        .await
    }

    pub async fn delete_task(&self, id: TaskId) -> ActionResult<Vec<TaskId>> {
        self.apply(
            |game, _| game.delete_task(id),
            |removed| GameEvent::TaskDeleted {
                removed: removed.clone(),
            },
        )
        .await
    }

    pub async fn toggle_collapse(&self, id: TaskId) -> ActionResult<bool> {
        self.apply(
            |game, _| game.toggle_collapse(id),
            |collapsed| GameEvent::TaskCollapseToggled {
                id,
                collapsed: *collapsed,
            },
        )
        .await
    }

    pub async fn breakdown(&self, parent: TaskId, specs: &[SubtaskSpec]) -> ActionResult<Vec<TaskId>> {
        self.apply(
            |game, _| game.breakdown_task(parent, specs),
            |subtasks| GameEvent::TaskBrokenDown {
                parent,
                subtasks: subtasks.clone(),
            },
        )
        .await
    }

    pub async fn buy_generator(&self, id: GeneratorId) -> ActionResult<u32> {
        self.apply(
            |game, _| game.buy_generator(id),
            |count| GameEvent::GeneratorPurchased { id, count: *count },
        )
        .await
    }

    pub async fn buy_focus_upgrade(&self, id: UpgradeId) -> ActionResult<u32> {
        self.apply(
            |game, _| game.buy_focus_upgrade(id),
            |level| GameEvent::UpgradePurchased { id, level: *level },
        )
        .await
    }

    pub async fn attempt_prestige(&self) -> ActionResult<PrestigeReport> {
        self.apply(
            |game, _| game.attempt_prestige(),
            |report| GameEvent::Refocused(*report),
        )
        .await
    }

    /// Registers a closure to run every `interval` of simulated time.
    ///
    /// # Returns
    /// A `ListenerId` which can be used to later remove this watcher.
    pub async fn on_interval(
        &self,
        interval: Duration,
        task_logic: impl FnMut() + Send + Sync + 'static,
    ) -> ListenerId {
        let watcher = IntervalWatcher::new(interval, WatcherAction::Callback(Box::new(task_logic)));
        let id = self.interval_watchers.write().await.insert(watcher);
        self.system_event_sender
            .send(SystemEvent::ListenerAdded { id })
            .ok();
        id
    }

    /// Removes an interval listener. The built-in auto-save watcher cannot
    /// be removed. Returns `true` if a listener was removed.
    pub async fn remove_interval_listener(&self, id: ListenerId) -> bool {
        let mut watchers = self.interval_watchers.write().await;
        if watchers.get(id).is_some_and(|w| w.is_autosave()) {
            return false;
        }
        let was_removed = watchers.remove(id).is_some();
        if was_removed {
            self.system_event_sender
                .send(SystemEvent::ListenerRemoved { id })
                .ok();
        }
        was_removed
    }

    /// Subscribes to the per-frame stream. Each `FrameEvent` is sent after
    /// the frame was applied, so state read on receipt is current.
    pub fn subscribe_frames(&self) -> broadcast::Receiver<Arc<FrameEvent>> {
        self.frame_sender.subscribe()
    }

    /// Subscribes to the `SystemEvent` stream.
    pub fn subscribe_system_events(&self) -> broadcast::Receiver<SystemEvent> {
        self.system_event_sender.subscribe()
    }

    /// Subscribes to the `GameEvent` stream.
    pub fn subscribe_game_events(&self) -> broadcast::Receiver<GameEvent> {
        self.game_event_sender.subscribe()
    }
}
