//! `te shell`: an interactive session on one live collection.
//!
//! The collection, its annotations and its undo history exist only for the
//! lifetime of the session, so this is where toggles and local undo/redo
//! are actually useful.

use std::io::{IsTerminal, Write};
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};

use crate::cli_handlers::task_commands::build_controller;
use crate::cli_handlers::utils::{format_analytics, format_task_detail, format_task_line};
use crate::config::EngineConfig;
use crate::controller::{CollectionController, HistoryOutcome};
use crate::error::{Result, TaskError};
use crate::models::{NewTask, TaskPatch, TaskStatus};
use crate::service::TaskService;
use crate::sort::SortStrategy;
use crate::subscriber::NotificationSubscriber;

const HELP: &str = "\
Commands:
  list                                   Show the collection in the active order
  show <id>                              Show one task
  stats                                  Analytics for the collection
  add <title> | <description> [| <assignee> [| <status>]]
  update <id> <title|description|assignee|status> <value>
  delete <id>
  priority <id>                          Toggle the priority annotation
  frozen <id>                            Toggle the frozen annotation
  undo | redo
  sort <none|title|status|assignee>
  refresh                                Reload from the service
  help
  quit";

/// One parsed shell line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    List,
    Show(String),
    Stats,
    Add(NewTask),
    Update { id: String, patch: TaskPatch },
    Delete(String),
    Priority(String),
    Frozen(String),
    Undo,
    Redo,
    Sort(SortStrategy),
    Refresh,
    Help,
    Quit,
}

/// Parse one input line. Blank lines yield `None`.
pub fn parse_shell_line(line: &str) -> Result<Option<ShellCommand>> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }

    let (verb, rest) = match line.split_once(char::is_whitespace) {
        Some((verb, rest)) => (verb, rest.trim()),
        None => (line, ""),
    };

    let command = match verb.to_lowercase().as_str() {
        "list" | "ls" => ShellCommand::List,
        "show" => ShellCommand::Show(required_id(rest)?),
        "stats" => ShellCommand::Stats,
        "add" => ShellCommand::Add(parse_new_task(rest)?),
        "update" => parse_update(rest)?,
        "delete" | "rm" => ShellCommand::Delete(required_id(rest)?),
        "priority" => ShellCommand::Priority(required_id(rest)?),
        "frozen" | "freeze" => ShellCommand::Frozen(required_id(rest)?),
        "undo" => ShellCommand::Undo,
        "redo" => ShellCommand::Redo,
        "sort" => ShellCommand::Sort(rest.parse()?),
        "refresh" => ShellCommand::Refresh,
        "help" | "?" => ShellCommand::Help,
        "quit" | "exit" => ShellCommand::Quit,
        other => {
            return Err(TaskError::Validation(format!(
                "Unknown command '{}'. Type 'help' for the command list",
                other
            )))
        },
    };
    Ok(Some(command))
}

fn required_id(rest: &str) -> Result<String> {
    match rest.split_whitespace().next() {
        Some(id) => Ok(id.to_string()),
        None => Err(TaskError::Validation("Missing task id".into())),
    }
}

fn parse_new_task(rest: &str) -> Result<NewTask> {
    let parts: Vec<&str> = rest.split('|').map(str::trim).collect();
    if parts.len() < 2 || parts.len() > 4 {
        return Err(TaskError::Validation(
            "Usage: add <title> | <description> [| <assignee> [| <status>]]".into(),
        ));
    }

    let mut task = NewTask::new(parts[0], parts[1]);
    if let Some(assignee) = parts.get(2).filter(|a| !a.is_empty()) {
        task = task.with_assignee(*assignee);
    }
    if let Some(status) = parts.get(3).filter(|s| !s.is_empty()) {
        task = task.with_status(status.parse()?);
    }
    Ok(task)
}

fn parse_update(rest: &str) -> Result<ShellCommand> {
    let mut parts = rest.splitn(3, char::is_whitespace);
    let (Some(id), Some(field), Some(value)) = (parts.next(), parts.next(), parts.next()) else {
        return Err(TaskError::Validation(
            "Usage: update <id> <title|description|assignee|status> <value>".into(),
        ));
    };

    let value = value.trim().to_string();
    let mut patch = TaskPatch::default();
    match field.to_lowercase().as_str() {
        "title" => patch.title = Some(value),
        "description" => patch.description = Some(value),
        "assignee" => patch.assigned_user_id = Some(value),
        "status" => patch.status = Some(value.parse::<TaskStatus>()?),
        other => {
            return Err(TaskError::Validation(format!(
                "Unknown field '{}'. Valid fields: title, description, assignee, status",
                other
            )))
        },
    }

    Ok(ShellCommand::Update {
        id: id.to_string(),
        patch,
    })
}

/// Run one command against `controller`. Returns `false` on `quit`.
pub async fn execute<S: TaskService>(
    controller: &CollectionController<S>,
    command: ShellCommand,
    out: &mut impl Write,
) -> Result<bool> {
    match command {
        ShellCommand::List => {
            let view = controller.view().await;
            if view.is_empty() {
                writeln!(out, "No tasks")?;
            }
            for task in &view {
                writeln!(out, "{}", format_task_line(task))?;
            }
        },
        ShellCommand::Show(id) => {
            let collection = controller.collection().await;
            let task = collection
                .iter()
                .find(|t| t.id() == id)
                .ok_or(TaskError::TaskNotFound(id))?;
            write!(out, "{}", format_task_detail(task))?;
        },
        ShellCommand::Stats => {
            writeln!(out, "{}", format_analytics(&controller.analytics().await))?;
        },
        ShellCommand::Add(task) => {
            let record = controller.create_task(task).await?;
            writeln!(out, "Created task {}", record.id)?;
        },
        ShellCommand::Update { id, patch } => {
            let record = controller.update_task(&id, patch).await?;
            writeln!(out, "Updated task {}", record.id)?;
        },
        ShellCommand::Delete(id) => {
            controller.delete_task(&id).await?;
            writeln!(out, "Deleted task {}", id)?;
        },
        ShellCommand::Priority(id) => {
            let task = controller.toggle_priority(&id).await?;
            writeln!(out, "{}", format_task_line(&task))?;
        },
        ShellCommand::Frozen(id) => {
            let task = controller.toggle_frozen(&id).await?;
            writeln!(out, "{}", format_task_line(&task))?;
        },
        ShellCommand::Undo => match controller.undo().await? {
            HistoryOutcome::Applied => writeln!(out, "Undone")?,
            _ => writeln!(out, "Nothing to undo")?,
        },
        ShellCommand::Redo => match controller.redo().await? {
            HistoryOutcome::Applied => writeln!(out, "Redone")?,
            _ => writeln!(out, "Nothing to redo")?,
        },
        ShellCommand::Sort(strategy) => {
            controller.set_sort_strategy(strategy).await;
            writeln!(out, "Sorting by {}", strategy)?;
        },
        ShellCommand::Refresh => {
            let count = controller.refresh().await?;
            writeln!(out, "Loaded {} tasks", count)?;
        },
        ShellCommand::Help => writeln!(out, "{}", HELP)?,
        ShellCommand::Quit => return Ok(false),
    }
    Ok(true)
}

pub async fn handle_shell(
    config: &EngineConfig,
    notify_url: Option<String>,
    no_listen: bool,
) -> Result<()> {
    let controller = Arc::new(build_controller(config));
    if let Err(e) = controller.refresh().await {
        eprintln!("Warning: initial load failed: {}", e);
    }

    let mut subscriber = NotificationSubscriber::with_reconnect_delay(config.reconnect_delay);
    if !no_listen {
        let endpoint = notify_url.unwrap_or_else(|| config.notify_url.clone());
        if let Err(e) = controller.listen(endpoint, &mut subscriber).await {
            eprintln!("Warning: {} (retrying in the background)", e);
        }
    }

    let interactive = std::io::stdin().is_terminal();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = std::io::stdout();

    loop {
        if interactive {
            write!(stdout, "te> ")?;
            stdout.flush()?;
        }
        let Some(line) = lines.next_line().await? else {
            break;
        };

        let command = match parse_shell_line(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(e) => {
                eprintln!("Error: {}", e);
                continue;
            },
        };

        match execute(&*controller, command, &mut stdout).await {
            Ok(true) => {},
            Ok(false) => break,
            Err(e) => eprintln!("Error: {}", e),
        }
    }

    subscriber.stop().await;
    Ok(())
}
