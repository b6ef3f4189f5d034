//! End-to-end play sessions against the synchronous `Game` API.

use ascendance::persistence::{self, MemoryStore};
use ascendance::prelude::*;
use ascendance::rewards::StreakChange;
use chrono::{DateTime, Duration as ChronoDuration, TimeZone, Utc};

fn morning(day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 2, day, 9, 0, 0).unwrap()
}

fn approx(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-9,
        "expected {}, got {}",
        expected,
        actual
    );
}

#[test]
fn first_session_from_task_to_passive_income() {
    let mut game = Game::default();

    let report = {
        let id = game.add_task("Clean the garage", None, Difficulty::Hard).unwrap();
        game.complete_task(id, morning(2)).unwrap()
    };
    assert_eq!(report.base_reward, 10);
    assert_eq!(report.reward, 20);
    assert_eq!(report.streak_change, StreakChange::Restarted);
    approx(game.resources().energy, 20.0);
    approx(game.resources().discipline_points, 20.0);
    approx(game.resources().active_energy_multipliers[0].multiplier, 1.25);
    approx(game.resources().active_energy_multipliers[0].remaining_ms, 30_000.0);

    assert_eq!(game.buy_generator(GeneratorId::ManualClick), Ok(1));
    approx(game.resources().energy, 10.0);

    // 0.1 E/s x 1.25 buff x 1.01 streak.
    let tick = game.tick(1.0);
    approx(tick.combined_multiplier, 1.25 * 1.01);
    approx(tick.energy_gained, 0.1 * 1.25 * 1.01);
    approx(game.resources().discipline_points, 19.9);

    // The buff runs out after 30 simulated seconds.
    let tick = game.tick(29.0);
    assert_eq!(tick.buffs_expired, 1);
    assert!(game.resources().active_energy_multipliers.is_empty());
    approx(game.tick(1.0).combined_multiplier, 1.01);
}

#[test]
fn generators_stall_without_discipline() {
    let mut game = Game::default();
    game.resources_mut().energy = 100.0;
    game.buy_generator(GeneratorId::StudentIntern).unwrap();
    assert_eq!(game.resources().energy, 0.0);

    let tick = game.tick(10.0);
    assert_eq!(tick.energy_gained, 0.0);
    assert_eq!(game.resources().discipline_points, 0.0);

    let id = game.add_task("Reply to emails", None, Difficulty::Easy).unwrap();
    game.complete_task(id, morning(3)).unwrap();
    approx(game.resources().discipline_points, 10.0);

    let tick = game.tick(2.0);
    approx(tick.discipline_drained, 0.2);
    approx(tick.energy_gained, 2.0 * 1.01);
}

#[test]
fn streak_follows_calendar_days() {
    let mut game = Game::default();
    let complete_on = |game: &mut Game, when: DateTime<Utc>| {
        let id = game.add_task("daily review", None, Difficulty::Easy).unwrap();
        game.complete_task(id, when).unwrap().current_streak
    };

    assert_eq!(complete_on(&mut game, morning(1)), 1);
    assert_eq!(complete_on(&mut game, morning(1) + ChronoDuration::hours(8)), 1);
    assert_eq!(complete_on(&mut game, morning(2)), 2);
    assert_eq!(complete_on(&mut game, morning(3)), 3);
    approx(game.resources().streak_energy_multiplier, 1.03);
    assert_eq!(complete_on(&mut game, morning(5)), 1);
}

#[test]
fn streak_bonus_is_capped() {
    let mut game = Game::default();
    for day in 0..80 {
        let id = game.add_task("habit", None, Difficulty::Easy).unwrap();
        game.complete_task(id, morning(1) + ChronoDuration::days(day)).unwrap();
    }
    assert_eq!(game.resources().current_streak, 80);
    approx(game.resources().streak_energy_multiplier, 1.5);
}

#[test]
fn breakdown_and_finish_a_project() {
    let mut game = Game::default();
    let project = game
        .add_task("Launch website", "2026-02-20".parse().ok(), Difficulty::Hard)
        .unwrap();

    let before = game.clone();
    assert_eq!(
        game.breakdown_task(project, &[SubtaskSpec::new("design", None)]),
        Err(Rejection::TooFewSubtasks(1))
    );
    assert_eq!(game, before);

    let steps = game
        .breakdown_task(
            project,
            &[
                SubtaskSpec::new("design", "2026-02-10".parse().ok()),
                SubtaskSpec::new("", None),
            ],
        )
        .unwrap();
    assert_eq!(steps.len(), 2);
    let parent = game.tasks().get(project).unwrap();
    assert!(!parent.is_breakable);
    assert_eq!(parent.sub_task_ids, steps);
    assert_eq!(game.tasks().get(steps[1]).unwrap().text, "Sub-task 2/2");

    assert_eq!(
        game.complete_task(project, morning(5)).unwrap_err(),
        Rejection::HasSubtasks(project)
    );

    // Sub-task on time: base 4, bonus 2, medium x1.5 = 9.
    let first = game.complete_task(steps[0], morning(5)).unwrap();
    assert_eq!(first.reward, 9);
    assert_eq!(first.parent_removed, None);
    assert!(game.tasks().get(project).is_some());

    let last = game.complete_task(steps[1], morning(5)).unwrap();
    assert_eq!(last.reward, 6);
    assert_eq!(last.parent_removed, Some(project));
    assert!(game.tasks().is_empty());
}

#[test]
fn refocus_and_spend_focus_points() {
    let mut game = Game::default();
    game.resources_mut().energy = 2500.0;
    game.buy_generator(GeneratorId::CoffeeMachine).unwrap();
    assert_eq!(game.focus_points_gain(), 1);
    game.resources_mut().energy = 2500.0;

    let report = game.attempt_prestige().unwrap();
    assert_eq!(report.focus_points_gained, 2);
    assert_eq!(game.resources().focus_points, 2.0);
    assert_eq!(game.resources().energy, 0.0);
    assert_eq!(game.resources().total_generator_count(), 0);

    assert_eq!(game.buy_focus_upgrade(UpgradeId::ClickTraining), Ok(1));
    assert!(game.is_upgrade_maxed(UpgradeId::ClickTraining));
    assert!(matches!(
        game.attempt_prestige(),
        Err(Rejection::PrestigeLocked { .. })
    ));

    // Efficient Tasking adds 5 to every top-level reward.
    game.resources_mut().focus_points = 1.0;
    game.buy_focus_upgrade(UpgradeId::EfficientTasking).unwrap();
    let id = game.add_task("stretch", None, Difficulty::Easy).unwrap();
    assert_eq!(game.complete_task(id, morning(9)).unwrap().reward, 15);
}

#[test]
fn a_saved_session_resumes_where_it_stopped() {
    let store = MemoryStore::new();
    let mut game = Game::default();
    let hard = game.add_task("Tax return", "2026-04-15".parse().ok(), Difficulty::Hard).unwrap();
    game.breakdown_task(
        hard,
        &[SubtaskSpec::new("collect receipts", None), SubtaskSpec::new("file", None)],
    )
    .unwrap();
    game.toggle_collapse(hard).unwrap();
    let chore = game.add_task("Laundry", None, Difficulty::Medium).unwrap();
    game.complete_task(chore, morning(10)).unwrap();
    game.add_task("Walk the dog", None, Difficulty::Easy).unwrap();
    game.buy_generator(GeneratorId::ManualClick).unwrap();
    game.tick(3.5);

    persistence::save(&store, &game).unwrap();
    let mut resumed = persistence::load(&store, game.rules());
    assert_eq!(resumed, game);

    // New ids continue after the highest saved id.
    let next = resumed.add_task("Call the bank", None, Difficulty::Easy).unwrap();
    assert_eq!(next, TaskId(6));
}
