//! Async engine tests. The tokio clock is paused so ticks and sleeps are
//! deterministic, and calendar time comes from a `ManualTimeSource`.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use ascendance::persistence::{SaveStore, SAVE_KEY};
use ascendance::prelude::*;
use chrono::{DateTime, Duration as ChronoDuration, TimeZone, Utc};
use tokio::sync::broadcast;

fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 6, 15, 10, 0, 0).unwrap()
}

fn test_config() -> AscendanceConfig {
    AscendanceConfig {
        resolution: ClockResolution::Low,
        autosave_interval_secs: 5,
        ..AscendanceConfig::default()
    }
}

fn engine_with(store: Arc<MemoryStore>, clock: ManualTimeSource) -> AscendanceEngine {
    AscendanceEngine::with_parts(test_config(), store, Arc::new(clock))
}

fn drain(rx: &mut broadcast::Receiver<GameEvent>) -> Vec<GameEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

fn saved_value(store: &MemoryStore) -> serde_json::Value {
    let blob = store.read(SAVE_KEY).unwrap().expect("nothing saved");
    serde_json::from_str(&blob).unwrap()
}

#[tokio::test]
async fn operations_broadcast_and_persist() {
    let store = Arc::new(MemoryStore::new());
    let engine = engine_with(store.clone(), ManualTimeSource::new(start_time()));
    let mut rx = engine.subscribe_game_events();

    let id = engine
        .add_task("Prepare slides", None, Difficulty::Medium)
        .await
        .unwrap();
    let events = drain(&mut rx);
    assert!(matches!(events[0], GameEvent::TaskAdded { id: added } if added == id));
    assert!(matches!(events[1], GameEvent::Saved));
    assert_eq!(saved_value(&store)["tasks"][0]["text"], "Prepare slides");

    let report = engine.complete_task(id).await.unwrap();
    assert_eq!(report.reward, 15);
    let events = drain(&mut rx);
    assert!(matches!(&events[0], GameEvent::TaskCompleted(r) if r.reward == 15));
    assert!(events[0].is_player_action());
    assert_eq!(saved_value(&store)["energy"], 15.0);
    assert_eq!(
        saved_value(&store)["lastCompletionTimestamp"],
        start_time().timestamp_millis()
    );

    assert_eq!(engine.buy_generator(GeneratorId::ManualClick).await, Ok(1));
    assert!(matches!(
        drain(&mut rx)[0],
        GameEvent::GeneratorPurchased { id: GeneratorId::ManualClick, count: 1 }
    ));
}

#[tokio::test]
async fn rejections_leave_state_and_store_untouched() {
    let store = Arc::new(MemoryStore::new());
    let engine = engine_with(store.clone(), ManualTimeSource::new(start_time()));
    let mut rx = engine.subscribe_game_events();
    let before = engine.snapshot().await;

    assert_eq!(
        engine.complete_task(TaskId(42)).await.unwrap_err(),
        Rejection::UnknownTask(TaskId(42))
    );
    assert!(matches!(
        engine.buy_generator(GeneratorId::FocusedWorkstation).await,
        Err(Rejection::InsufficientFunds { .. })
    ));
    assert_eq!(
        engine.add_task("   ", None, Difficulty::Easy).await,
        Err(Rejection::EmptyDescription)
    );

    let events = drain(&mut rx);
    assert_eq!(events.len(), 3);
    assert!(events
        .iter()
        .all(|e| matches!(e, GameEvent::ActionRejected(_)) && !e.is_player_action()));
    assert_eq!(engine.snapshot().await, before);
    assert!(store.get(SAVE_KEY).is_none());
}

#[tokio::test(start_paused = true)]
async fn clock_drives_production_and_autosave() {
    let seed = r#"{
        "energy": 0,
        "disciplinePoints": 100,
        "generators": { "gen2": { "count": 1 } }
    }"#;
    let store = Arc::new(MemoryStore::with_save(seed));
    let engine = engine_with(store.clone(), ManualTimeSource::new(start_time()));
    let mut system_rx = engine.subscribe_system_events();
    let mut game_rx = engine.subscribe_game_events();

    engine
        .run_until(tokio::time::sleep(Duration::from_millis(10_500)))
        .await
        .unwrap();

    // One Student Intern yields 1 Energy per second while Discipline lasts.
    let energy = engine.read(|game| game.resources().energy).await;
    assert!((9.5..=11.0).contains(&energy), "energy after ~10s: {}", energy);
    let discipline = engine.read(|game| game.resources().discipline_points).await;
    assert!((98.9..=99.1).contains(&discipline), "discipline: {}", discipline);

    let saves = drain(&mut game_rx)
        .into_iter()
        .filter(|e| matches!(e, GameEvent::Saved))
        .count();
    // Two interval saves plus the final save on shutdown.
    assert_eq!(saves, 3);
    let saved_energy = saved_value(&store)["energy"].as_f64().unwrap();
    assert_eq!(saved_energy, energy);

    assert!(matches!(system_rx.try_recv(), Ok(SystemEvent::EngineStarted { .. })));
    assert!(matches!(system_rx.try_recv(), Ok(SystemEvent::EngineShutdown)));
}

#[tokio::test(start_paused = true)]
async fn interval_listeners_fire_on_simulated_time() {
    let engine = engine_with(Arc::new(MemoryStore::new()), ManualTimeSource::new(start_time()));
    let fired = Arc::new(AtomicU32::new(0));
    let counter = fired.clone();
    let id = engine
        .on_interval(Duration::from_secs(3), move || {
            counter.fetch_add(1, Ordering::Relaxed);
        })
        .await;

    engine
        .run_until(tokio::time::sleep(Duration::from_millis(9_500)))
        .await
        .unwrap();
    assert_eq!(fired.load(Ordering::Relaxed), 3);

    assert!(engine.remove_interval_listener(id).await);
    assert!(!engine.remove_interval_listener(id).await);
}

#[tokio::test(start_paused = true)]
async fn day_rollover_breaks_a_stale_streak() {
    let yesterday = start_time() - ChronoDuration::days(1);
    let seed = format!(
        r#"{{ "currentStreak": 4, "lastCompletionTimestamp": {} }}"#,
        yesterday.timestamp_millis()
    );
    let clock = ManualTimeSource::new(start_time());
    let store = Arc::new(MemoryStore::with_save(seed));
    let engine = engine_with(store.clone(), clock.clone());
    assert_eq!(engine.read(|game| game.resources().current_streak).await, 4);
    let mut rx = engine.subscribe_game_events();

    let driver = clock.clone();
    engine
        .run_until(async move {
            tokio::time::sleep(Duration::from_millis(1_500)).await;
            driver.advance(ChronoDuration::days(1));
            tokio::time::sleep(Duration::from_secs(2)).await;
        })
        .await
        .unwrap();

    let events = drain(&mut rx);
    let expected = (start_time() + ChronoDuration::days(1)).date_naive();
    let rollover = events
        .iter()
        .position(|e| matches!(e, GameEvent::DayChanged { date } if *date == expected))
        .expect("no DayChanged event");
    assert!(matches!(events[rollover + 1], GameEvent::Saved));
    let (streak, multiplier) = engine
        .read(|game| {
            let res = game.resources();
            (res.current_streak, res.streak_energy_multiplier)
        })
        .await;
    assert_eq!(streak, 0);
    assert_eq!(multiplier, 1.0);
    assert_eq!(saved_value(&store)["currentStreak"], 0);
    assert_eq!(saved_value(&store)["streakEnergyMultiplier"], 1.0);
}

#[tokio::test(start_paused = true)]
async fn frames_are_broadcast_after_the_tick_is_applied() {
    let seed = r#"{ "disciplinePoints": 1000, "generators": { "gen4": { "count": 10 } } }"#;
    let engine = engine_with(
        Arc::new(MemoryStore::with_save(seed)),
        ManualTimeSource::new(start_time()),
    );
    let mut frames = engine.subscribe_frames();
    let observer = engine.clone();
    let watcher = tokio::spawn(async move {
        let mut produced = 0.0;
        let mut observed = 0;
        while observed < 5 {
            let Ok(frame) = frames.recv().await else {
                break;
            };
            produced += frame.report.energy_gained;
            observed += 1;
            let energy = observer.read(|game| game.resources().energy).await;
            assert!(
                energy + 1e-9 >= produced,
                "frame #{} read {} but {} was already produced",
                frame.tick_count,
                energy,
                produced
            );
        }
        observed
    });

    engine
        .run_until(tokio::time::sleep(Duration::from_millis(5_500)))
        .await
        .unwrap();
    assert_eq!(watcher.await.unwrap(), 5);
}

#[tokio::test]
async fn loading_checks_the_streak_against_today() {
    let clock = ManualTimeSource::new(start_time());
    let seed = |days_ago: i64| {
        format!(
            r#"{{ "currentStreak": 5, "lastCompletionTimestamp": {} }}"#,
            (start_time() - ChronoDuration::days(days_ago)).timestamp_millis()
        )
    };

    let kept = engine_with(Arc::new(MemoryStore::with_save(seed(1))), clock.clone());
    let res = kept.snapshot().await.resources().clone();
    assert_eq!(res.current_streak, 5);
    assert!((res.streak_energy_multiplier - 1.05).abs() < 1e-9);

    let broken = engine_with(Arc::new(MemoryStore::with_save(seed(3))), clock);
    let res = broken.snapshot().await.resources().clone();
    assert_eq!(res.current_streak, 0);
    assert_eq!(res.streak_energy_multiplier, 1.0);
}

#[tokio::test]
async fn corrupt_save_starts_a_fresh_playable_game() {
    let store = Arc::new(MemoryStore::with_save("{\"energy\": \"lots\""));
    let engine = engine_with(store.clone(), ManualTimeSource::new(start_time()));
    assert_eq!(engine.snapshot().await, Game::default());

    let parent = engine.add_task("Move house", None, Difficulty::Hard).await.unwrap();
    let kids = engine
        .breakdown(
            parent,
            &[SubtaskSpec::new("pack", None), SubtaskSpec::new("unpack", None)],
        )
        .await
        .unwrap();
    assert_eq!(engine.toggle_collapse(parent).await, Ok(true));
    assert_eq!(engine.delete_task(parent).await.unwrap(), vec![parent, kids[0], kids[1]]);
    assert_eq!(saved_value(&store)["tasks"], serde_json::json!([]));
}
