//! Terminal rendering of the engine's view snapshots.

use ascendance::format::{format_number, format_time_remaining};
use ascendance::prelude::*;
use ascendance::rewards::StreakChange;
use ascendance::view::{DueStatus, GeneratorView, PrestigeView, ResourceSummary, TaskView, UpgradeView};
use colored::Colorize;

pub fn print_status(summary: &ResourceSummary, prestige: &PrestigeView) {
    println!(
        "{} {} ({}/s)",
        "Energy:".bold(),
        format_number(summary.energy).yellow(),
        format_number(summary.energy_per_second)
    );
    println!("{} {}", "Discipline:".bold(), format_number(summary.discipline).green());
    println!("{} {}", "Focus Points:".bold(), format_number(summary.focus_points).magenta());
    println!(
        "{} {} day(s), x{:.2} Energy",
        "Streak:".bold(),
        summary.current_streak,
        summary.streak_multiplier
    );
    for buff in &summary.buffs {
        println!("  buff x{:.2} ({:.0}s left)", buff.multiplier, buff.remaining_secs.ceil());
    }
    if summary.discipline <= 0.0 && summary.energy_per_second > 0.0 {
        println!("{}", "  Out of Discipline: generators are idle. Complete a task!".red());
    }
    if prestige.can_prestige {
        println!(
            "{} 'refocus' for +{} Focus Points",
            "Ready:".cyan().bold(),
            prestige.gain
        );
    } else {
        println!(
            "Refocus at {} Energy",
            format_number(prestige.requirement).dimmed()
        );
    }
}

pub fn print_generators(views: &[GeneratorView]) {
    for view in views {
        let cost = format!("cost {}", format_number(view.current_cost as f64));
        println!(
            "  {:<22} x{:<4} {:>12}/s  {}",
            view.name.bold(),
            view.count,
            format_number(view.current_production),
            if view.can_afford { cost.green() } else { cost.dimmed() }
        );
    }
}

pub fn print_upgrades(views: &[UpgradeView]) {
    for view in views {
        let state = if view.is_max_level {
            "MAX".cyan().to_string()
        } else {
            let cost = format!("cost {} FP", format_number(view.cost));
            if view.can_afford { cost.green().to_string() } else { cost.dimmed().to_string() }
        };
        println!(
            "  {:<18} Lv {}/{}  {}",
            view.name.bold(),
            view.current_level,
            view.max_level,
            state
        );
        println!("      {}", view.description.dimmed());
    }
}

pub fn print_tasks(views: &[TaskView]) {
    if views.is_empty() {
        println!("{}", "  No tasks yet. Try: add hard due:2026-12-01 Write the report".dimmed());
        return;
    }
    for view in views {
        print_task(view, 0);
    }
}

fn print_task(view: &TaskView, depth: usize) {
    let indent = "  ".repeat(depth + 1);
    let marker = if view.subtasks.is_empty() {
        " "
    } else if view.is_collapsed {
        "+"
    } else {
        "-"
    };
    let mut line = format!(
        "{}{} {:<5} {} [{}] +{}",
        indent,
        marker,
        view.id.to_string().dimmed(),
        view.text,
        view.difficulty,
        view.reward_preview
    );
    if let Some(due) = view.due_date {
        let left = view.remaining.map(format_time_remaining).unwrap_or_default();
        let due_text = match view.due_status {
            Some(DueStatus::Overdue) => format!("due {} (overdue)", due).red().to_string(),
            Some(DueStatus::DueSoon) => format!("due {} ({} left)", due, left).yellow().to_string(),
            _ => format!("due {} ({} left)", due, left).normal().to_string(),
        };
        line.push_str(&format!("  {}", due_text));
    }
    if view.can_break_down {
        line.push_str(&format!("  {}", "(breakable)".cyan()));
    }
    println!("{}", line);

    if !view.is_collapsed {
        for child in &view.subtasks {
            print_task(child, depth + 1);
        }
    } else if !view.subtasks.is_empty() {
        println!("{}  {}", indent, format!("{} hidden sub-task(s)", view.subtasks.len()).dimmed());
    }
}

/// One-line notification for a game event, or `None` if it is not worth
/// interrupting the prompt for.
pub fn describe_event(event: &GameEvent) -> Option<String> {
    let text = match event {
        GameEvent::TaskCompleted(report) => {
            let mut text = format!(
                "Completed '{}': +{} Energy & Discipline",
                report.task.text, report.reward
            );
            if report.due_date_bonus > 0 {
                text.push_str(" (on time!)");
            }
            match report.streak_change {
                StreakChange::Extended => {
                    text.push_str(&format!(", streak {} days", report.current_streak))
                }
                StreakChange::Restarted => text.push_str(", new streak started"),
                StreakChange::Unchanged => {}
            }
            text.green().to_string()
        }
        GameEvent::Refocused(report) => format!(
            "Refocused! +{} Focus Points ({} total)",
            report.focus_points_gained,
            format_number(report.total_focus_points)
        )
        .magenta()
        .to_string(),
        GameEvent::BuffExpired { count } => format!("{} Energy buff(s) expired", count).dimmed().to_string(),
        GameEvent::DayChanged { date } => format!("A new day: {}", date).cyan().to_string(),
        _ => return None,
    };
    Some(text)
}
