//! Terminal and JSON rendering of run results and task lists.

use anyhow::Result;
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;
use yawe_core::workflow::report::RunReport;
use yawe_types::state::{TaskStatus, WorkflowState, WorkflowStatus};
use yawe_types::workflow::WorkflowDefinition;

/// Longest message shown in a table cell.
const MAX_MESSAGE_CHARS: usize = 60;

fn status_cell(status: TaskStatus) -> Cell {
    let cell = Cell::new(status.to_string());
    match status {
        TaskStatus::Success => cell.fg(Color::Green),
        TaskStatus::Failed => cell.fg(Color::Red),
        TaskStatus::Running => cell.fg(Color::Yellow),
        TaskStatus::Skipped => cell.fg(Color::DarkGrey),
        TaskStatus::Pending => cell,
    }
}

fn truncate(message: Option<&str>) -> String {
    match message {
        Some(m) if m.chars().count() > MAX_MESSAGE_CHARS => {
            let head: String = m.chars().take(MAX_MESSAGE_CHARS - 3).collect();
            format!("{head}...")
        }
        Some(m) => m.to_string(),
        None => "-".to_string(),
    }
}

fn new_table(header: Vec<Cell>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header);
    table
}

// ---------------------------------------------------------------------------
// Run summary
// ---------------------------------------------------------------------------

pub fn print_report(report: &RunReport, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    let mut table = new_table(vec![
        Cell::new("#").fg(Color::Cyan),
        Cell::new("Task"),
        Cell::new("Type"),
        Cell::new("Status"),
        Cell::new("Attempts"),
        Cell::new("Message"),
    ]);
    for (idx, t) in report.tasks.iter().enumerate() {
        table.add_row(vec![
            Cell::new(idx + 1),
            Cell::new(&t.name),
            Cell::new(&t.task_type),
            status_cell(t.status),
            Cell::new(t.attempts),
            Cell::new(truncate(t.message.as_deref())),
        ]);
    }

    let headline = match report.status {
        WorkflowStatus::Success => style("succeeded").green().bold(),
        _ => style("failed").red().bold(),
    };
    println!();
    println!(
        "  Workflow {} {}  {}",
        style(&report.identity).cyan(),
        headline,
        style(format!("run {}", report.run_id)).dim()
    );
    println!();
    println!("{table}");

    if let Some(halt) = &report.halted_by {
        println!();
        println!(
            "  {} halted by '{}': {}",
            style("Stopped:").red().bold(),
            style(&halt.task).cyan(),
            halt.message
        );
    }
    if report.status != WorkflowStatus::Success {
        println!();
        println!(
            "  {}",
            style("Fix the cause and continue with `workflow-run --resume`.").dim()
        );
    }
    println!();
    Ok(())
}

// ---------------------------------------------------------------------------
// Task list
// ---------------------------------------------------------------------------

pub fn print_task_list(
    definition: &WorkflowDefinition,
    identity: &str,
    state: Option<&WorkflowState>,
    json: bool,
) -> Result<()> {
    let status_of = |name: &str| {
        state
            .and_then(|s| s.task(name))
            .map_or(TaskStatus::Pending, |t| t.status)
    };

    if json {
        let tasks: Vec<_> = definition
            .tasks
            .iter()
            .map(|t| {
                serde_json::json!({
                    "name": t.name,
                    "type": t.task_type,
                    "enabled": t.enabled,
                    "status": status_of(&t.name),
                })
            })
            .collect();
        let out = serde_json::json!({
            "identity": identity,
            "status": state.map(|s| s.status),
            "updated_at": state.map(|s| s.updated_at.to_rfc3339()),
            "tasks": tasks,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    let mut table = new_table(vec![
        Cell::new("#").fg(Color::Cyan),
        Cell::new("Task"),
        Cell::new("Type"),
        Cell::new("Executor"),
        Cell::new("Enabled"),
        Cell::new("Status"),
    ]);
    for (idx, t) in definition.tasks.iter().enumerate() {
        table.add_row(vec![
            Cell::new(idx + 1),
            Cell::new(&t.name),
            Cell::new(&t.task_type),
            Cell::new(format!("{:?}", t.executor).to_lowercase()),
            Cell::new(if t.enabled { "yes" } else { "no" }),
            status_cell(status_of(&t.name)),
        ]);
    }

    println!();
    println!("  Tasks for workflow '{}'", style(identity).cyan());
    match state {
        Some(s) => println!(
            "  Saved state: {} (updated {})",
            s.status,
            s.updated_at.format("%Y-%m-%d %H:%M:%S")
        ),
        None => println!("  {}", style("No saved state.").dim()),
    }
    println!();
    println!("{table}");
    println!();
    Ok(())
}

// ---------------------------------------------------------------------------
// Messages
// ---------------------------------------------------------------------------

pub fn print_error(message: &str, json: bool) {
    if json {
        println!("{}", serde_json::json!({ "error": message }));
    } else {
        eprintln!("  {} {message}", style("Error:").red().bold());
    }
}

pub fn print_notice(message: &str, json: bool, value: serde_json::Value) {
    if json {
        println!("{value}");
    } else {
        println!("  {} {message}", style("*").green().bold());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn long_messages_are_truncated() {
        let long = "x".repeat(100);
        let out = truncate(Some(&long));
        assert_eq!(out.chars().count(), MAX_MESSAGE_CHARS);
        assert!(out.ends_with("..."));
        assert_eq!(truncate(Some("short")), "short");
        assert_eq!(truncate(None), "-");
    }
}
