//! Utility functions for CLI handlers
//!
//! Status badges, one-line task rendering, analytics summaries and the
//! shared JSON printer.

use serde::Serialize;

use crate::analytics::Analytics;
use crate::annotation::AnnotatedTask;
use crate::error::Result;
use crate::models::TaskStatus;

/// Get a status badge icon for task status
pub fn get_status_badge(status: TaskStatus) -> &'static str {
    match status {
        TaskStatus::Done => "✓",
        TaskStatus::InProgress => "→",
        TaskStatus::ToDo => "○",
        TaskStatus::Unrecognized => "?",
    }
}

/// `true` when `format` asks for JSON output
pub fn is_json(format: &str) -> bool {
    format.eq_ignore_ascii_case("json")
}

/// Parse an optional `--status` value
pub fn parse_status(status: Option<&str>) -> Result<Option<TaskStatus>> {
    status.map(str::parse).transpose()
}

/// One line per task: badge, id, title, assignee and annotation tags.
pub fn format_task_line(task: &AnnotatedTask) -> String {
    let fields = task.fields();
    let mut line = format!(
        "{} {}  {}",
        get_status_badge(fields.status),
        task.id(),
        fields.title
    );
    if !fields.assigned_user_id.is_empty() {
        line.push_str(&format!("  @{}", fields.assigned_user_id));
    }
    if task.is_priority() {
        line.push_str("  [priority]");
    }
    if task.is_frozen() {
        line.push_str("  [frozen]");
    }
    line
}

/// Multi-line task detail block.
pub fn format_task_detail(task: &AnnotatedTask) -> String {
    let fields = task.fields();
    let mut out = format!(
        "{} {}\n  ID: {}\n  Status: {}\n",
        get_status_badge(fields.status),
        fields.title,
        task.id(),
        fields.status
    );
    if !fields.assigned_user_id.is_empty() {
        out.push_str(&format!("  Assignee: {}\n", fields.assigned_user_id));
    }
    out.push_str(&format!("  Description: {}\n", fields.description));
    let style = task.render().style;
    if !style.is_empty() {
        let rendered: Vec<String> = style.iter().map(|(k, v)| format!("{}: {}", k, v)).collect();
        out.push_str(&format!("  Style: {}\n", rendered.join("; ")));
    }
    out
}

pub fn format_analytics(analytics: &Analytics) -> String {
    let histogram = &analytics.status_histogram;
    format!(
        "Total: {}\n  ○ to_do: {}\n  → in_progress: {}\n  ✓ done: {}\nPriority: {}\nFrozen: {}",
        analytics.total_count,
        histogram.to_do,
        histogram.in_progress,
        histogram.done,
        analytics.priority_count,
        analytics.frozen_count
    )
}

/// Print the task list in the requested format
pub fn print_tasks(tasks: &[AnnotatedTask], format: &str) -> Result<()> {
    if is_json(format) {
        let views: Vec<_> = tasks.iter().map(AnnotatedTask::to_view).collect();
        return print_json(&views);
    }

    if tasks.is_empty() {
        println!("No tasks");
        return Ok(());
    }
    for task in tasks {
        println!("{}", format_task_line(task));
    }
    Ok(())
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
