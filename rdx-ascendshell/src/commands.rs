//! Parsing of shell input lines into engine commands.

use anyhow::{bail, Result};
use ascendance::prelude::*;

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Status,
    Generators,
    Buy(GeneratorId),
    Upgrades,
    Upgrade(UpgradeId),
    Tasks,
    Add {
        difficulty: Difficulty,
        due_date: Option<DueDate>,
        text: String,
    },
    Complete(TaskId),
    Delete(TaskId),
    Collapse(TaskId),
    Breakdown {
        parent: TaskId,
        subtasks: Vec<SubtaskSpec>,
    },
    Refocus,
    Save,
    Help,
    Exit,
    Empty,
}

pub const HELP: &[(&str, &str)] = &[
    ("status", "Shows Energy, Discipline, Focus Points and streak."),
    ("generators", "Lists generators with cost and output."),
    ("buy <generator>", "Buys one generator (e.g. 'buy gen1', 'buy coffee')."),
    ("upgrades", "Lists focus upgrades."),
    ("upgrade <upgrade>", "Buys one level of a focus upgrade."),
    ("tasks", "Shows the task list."),
    ("add <easy|medium|hard> [due:<date>] <text>", "Adds a task. Dates: YYYY-MM-DD or YYYY-MM-DDTHH:MM."),
    ("complete <id>", "Completes a task and collects its reward."),
    ("delete <id>", "Deletes a task (and its sub-tasks)."),
    ("collapse <id>", "Shows or hides a task's sub-tasks."),
    ("breakdown <id> <name> [@<due>] | <name> ...", "Splits a hard task into 2 or more sub-tasks."),
    ("refocus", "Converts Energy into Focus Points and resets the run."),
    ("save", "Saves the game now."),
    ("exit", "Saves and quits."),
];

fn task_id(arg: Option<&&str>, usage: &str) -> Result<TaskId> {
    match arg {
        Some(raw) => Ok(raw.parse()?),
        None => bail!("Usage: {}", usage),
    }
}

fn subtask_spec(piece: &str) -> Result<SubtaskSpec> {
    match piece.rsplit_once('@') {
        Some((name, due)) => Ok(SubtaskSpec::new(name.trim(), Some(due.trim().parse()?))),
        None => Ok(SubtaskSpec::new(piece.trim(), None)),
    }
}

pub fn parse(line: &str) -> Result<Command> {
    let args: Vec<&str> = line.split_whitespace().collect();
    let Some(command) = args.first() else {
        return Ok(Command::Empty);
    };
    let rest = args[1..].join(" ");

    let parsed = match command.to_ascii_lowercase().as_str() {
        "status" | "s" => Command::Status,
        "generators" | "gens" => Command::Generators,
        "buy" => {
            if rest.is_empty() {
                bail!("Usage: buy <generator>");
            }
            Command::Buy(rest.parse()?)
        }
        "upgrades" => Command::Upgrades,
        "upgrade" => {
            if rest.is_empty() {
                bail!("Usage: upgrade <upgrade>");
            }
            Command::Upgrade(rest.parse()?)
        }
        "tasks" | "t" => Command::Tasks,
        "add" => {
            let Some(difficulty) = args.get(1) else {
                bail!("Usage: add <easy|medium|hard> [due:<date>] <text>");
            };
            let difficulty: Difficulty = difficulty.parse()?;
            let mut words = &args[2..];
            let mut due_date = None;
            if let Some(due) = words.first().and_then(|w| w.strip_prefix("due:")) {
                due_date = Some(due.parse()?);
                words = &words[1..];
            }
            Command::Add {
                difficulty,
                due_date,
                text: words.join(" "),
            }
        }
        "complete" | "done" => Command::Complete(task_id(args.get(1), "complete <id>")?),
        "delete" | "rm" => Command::Delete(task_id(args.get(1), "delete <id>")?),
        "collapse" => Command::Collapse(task_id(args.get(1), "collapse <id>")?),
        "breakdown" => {
            let usage = "breakdown <id> <name> [@<due>] | <name> ...";
            let parent = task_id(args.get(1), usage)?;
            let specs = args[2..].join(" ");
            if specs.trim().is_empty() {
                bail!("Usage: {}", usage);
            }
            let subtasks = specs
                .split('|')
                .map(subtask_spec)
                .collect::<Result<Vec<_>>>()?;
            Command::Breakdown { parent, subtasks }
        }
        "refocus" | "prestige" => Command::Refocus,
        "save" => Command::Save,
        "help" | "?" => Command::Help,
        "exit" | "quit" => Command::Exit,
        other => bail!("Unknown command: '{}'. Type 'help'.", other),
    };
    Ok(parsed)
}
