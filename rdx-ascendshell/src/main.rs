use anyhow::Result;
use ascendance::prelude::*;
use ascendance::{ENGINE_NAME, VERSION as LIB_VERSION};
use colored::Colorize;
use rustyline::highlight::Highlighter;
use rustyline::Editor;
use rustyline_derive::{Completer, Helper, Hinter, Validator};
use std::borrow::Cow;
use std::env;
use std::path::PathBuf;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::oneshot;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod commands;
mod render;

use commands::{Command, HELP};

const SHELL_VERSION: &str = env!("CARGO_PKG_VERSION");

/// A custom helper struct for rustyline that enables syntax highlighting.
#[derive(Completer, Helper, Hinter, Validator)]
struct MyHighlighter;

impl Highlighter for MyHighlighter {
    fn highlight<'l>(&self, line: &'l str, _pos: usize) -> Cow<'l, str> {
        if let Some((command, rest)) = line.split_once(' ') {
            let colored_command = command.yellow().bold();
            let colored_rest = rest.yellow();
            Cow::Owned(format!("{} {}", colored_command, colored_rest))
        } else {
            Cow::Owned(line.yellow().bold().to_string())
        }
    }
    fn highlight_char(&self, _line: &str, _pos: usize, _forced: bool) -> bool {
        true
    }
}

fn print_banner() {
    if env::var("QUIET_MODE").is_ok() {
        return;
    }
    const LOGO_TEXT: &str = include_str!("../logo.log");
    println!("{}", LOGO_TEXT.cyan());

    let version_string = format!(
        "          Shell   v{:<8} Library   v{:<8}",
        SHELL_VERSION, LIB_VERSION
    );
    println!("{}", "-".repeat(72).dimmed());
    println!("{}", version_string);
    println!("{}", "-".repeat(72).dimmed());
}

/// Prints notable game events above the prompt.
fn spawn_event_listener(engine: &AscendanceEngine) {
    let mut game_rx = engine.subscribe_game_events();
    tokio::spawn(async move {
        loop {
            match game_rx.recv().await {
                Ok(event) => {
                    if let Some(text) = render::describe_event(&event) {
                        println!("\n<-- {}", text);
                    }
                }
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => break,
            }
        }
    });
}

fn print_help() {
    println!("Available commands:");
    for (usage, description) in HELP {
        println!("  {:<46} {}", usage.bold(), description);
    }
}

/// Executes one command. Returns `false` when the shell should exit.
async fn execute(engine: &AscendanceEngine, command: Command) -> Result<bool> {
    match command {
        Command::Status => {
            let (summary, prestige) = engine
                .read(|game| (game.resource_summary(), game.prestige_view()))
                .await;
            render::print_status(&summary, &prestige);
        }
        Command::Generators => {
            let views = engine.read(|game| game.generator_views()).await;
            render::print_generators(&views);
        }
        Command::Buy(id) => {
            let count = engine.buy_generator(id).await?;
            println!("--> Bought {} (now {}).", id, count);
        }
        Command::Upgrades => {
            let views = engine.read(|game| game.upgrade_views()).await;
            render::print_upgrades(&views);
        }
        Command::Upgrade(id) => {
            let level = engine.buy_focus_upgrade(id).await?;
            println!("--> {} is now level {}.", id, level);
        }
        Command::Tasks => {
            let now = engine.now();
            let views = engine.read(|game| game.task_views(now)).await;
            render::print_tasks(&views);
        }
        Command::Add {
            difficulty,
            due_date,
            text,
        } => {
            let id = engine.add_task(&text, due_date, difficulty).await?;
            println!("--> Added task {}.", id);
        }
        Command::Complete(id) => {
            engine.complete_task(id).await?;
        }
        Command::Delete(id) => {
            let removed = engine.delete_task(id).await?;
            println!("--> Deleted {} task(s).", removed.len());
        }
        Command::Collapse(id) => {
            let collapsed = engine.toggle_collapse(id).await?;
            println!("--> Task {} {}.", id, if collapsed { "collapsed" } else { "expanded" });
        }
        Command::Breakdown { parent, subtasks } => {
            let created = engine.breakdown(parent, &subtasks).await?;
            println!("--> Task {} broken into {} sub-tasks.", parent, created.len());
        }
        Command::Refocus => {
            engine.attempt_prestige().await?;
        }
        Command::Save => {
            engine.save().await?;
            println!("--> Game saved.");
        }
        Command::Help => print_help(),
        Command::Exit => return Ok(false),
        Command::Empty => {}
    }
    Ok(true)
}

#[tokio::main]
async fn main() -> Result<()> {
    print_banner();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_target(false)
        .init();

    let config_path = env::args().nth(1).map(PathBuf::from);
    let config = AscendanceConfig::load(config_path.as_deref())?;
    let engine = AscendanceEngine::new(config);
    let engine_handle = engine.clone();

    spawn_event_listener(&engine_handle);

    info!("Spawning {} in the background...", ENGINE_NAME);
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let engine_task = tokio::spawn(async move {
        let shutdown = async {
            shutdown_rx.await.ok();
        };
        if let Err(e) = engine.run_until(shutdown).await {
            eprintln!("\nEngine stopped with an error: {:#}", e);
        }
    });

    let mut rl = Editor::new()?;
    rl.set_helper(Some(MyHighlighter));

    println!("{} is running. Type 'help' for commands or 'exit' to quit.", ENGINE_NAME.cyan());

    loop {
        let prompt = format!("{}", ">> ".cyan().bold());
        match rl.readline(&prompt) {
            Ok(line) => {
                rl.add_history_entry(line.as_str())?;
                let outcome = match commands::parse(&line) {
                    Ok(command) => execute(&engine_handle, command).await,
                    Err(e) => Err(e),
                };
                match outcome {
                    Ok(true) => {}
                    Ok(false) => break,
                    Err(e) => println!("{} {}", "Error:".red().bold(), e),
                }
            }
            Err(_) => break,
        }
    }

    println!("Saving and exiting...");
    shutdown_tx.send(()).ok();
    engine_task.await?;
    Ok(())
}
