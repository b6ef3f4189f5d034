use anyhow::Result;
use ascendance::format::format_number;
use ascendance::prelude::*;
use colored::Colorize;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialize structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    // 2. Load configuration from an optional file argument.
    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let config = AscendanceConfig::load(config_path.as_deref())?;
    info!("{} v{} (saves in {})", ascendance::ENGINE_NAME, ascendance::VERSION, config.save_dir.display());

    // 3. Create the engine, loading any existing save.
    let engine = AscendanceEngine::new(config);

    // 4. Spawn concurrent tasks to listen to the event streams.
    spawn_event_listeners(&engine);

    // 5. Report the ledger every few seconds.
    register_status_report(&engine).await;

    // 6. Run the engine until Ctrl+C.
    engine.run().await?;

    Ok(())
}

/// Spawns tasks that log every system and game event.
fn spawn_event_listeners(engine: &AscendanceEngine) {
    let mut system_rx = engine.subscribe_system_events();
    tokio::spawn(async move {
        while let Ok(event) = system_rx.recv().await {
            info!("{} => {:?}", "[SYSTEM]".cyan(), event);
        }
    });

    let mut game_rx = engine.subscribe_game_events();
    tokio::spawn(async move {
        loop {
            match game_rx.recv().await {
                Ok(GameEvent::Saved) => {}
                Ok(GameEvent::ActionRejected(rejection)) => {
                    info!("{} => {}", "[REJECTED]".red(), rejection)
                }
                Ok(event) => info!("{} => {:?}", "[GAME]".green(), event),
                Err(RecvError::Lagged(missed)) => warn!("Event listener missed {} events", missed),
                Err(RecvError::Closed) => break,
            }
        }
    });
}

async fn register_status_report(engine: &AscendanceEngine) {
    let handle = engine.clone();
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    engine
        .on_interval(Duration::from_secs(5), move || {
            tx.send(()).ok();
        })
        .await;
    tokio::spawn(async move {
        while rx.recv().await.is_some() {
            let summary = handle.read(|game| game.resource_summary()).await;
            info!(
                "{} => Energy {} (+{}/s) | Discipline {} | Focus {} | Streak {}",
                "[STATUS]".yellow(),
                format_number(summary.energy),
                format_number(summary.energy_per_second),
                format_number(summary.discipline),
                format_number(summary.focus_points),
                summary.current_streak
            );
        }
    });
}
