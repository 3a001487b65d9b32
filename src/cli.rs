use clap::{Parser, Subcommand};

const LONG_ABOUT: &str = r#"
Task-Engine - client-side task list state engine

Keeps a local copy of the task service's collection, lets you annotate
tasks (priority, frozen) without touching the service, orders and
summarizes the collection, and follows live change notifications.

Workflow:
  te list         ← Fetch and print the collection
  te add          ← Create a task on the service
  te watch        ← Follow notifications, print stats after every refresh
  te shell        ← Interactive session with annotations and undo/redo

Configuration (environment):
  TASK_ENGINE_API_URL, TASK_ENGINE_NOTIFY_URL, TASK_ENGINE_SORT,
  TASK_ENGINE_ANNOTATIONS, TASK_ENGINE_HISTORY_SOURCE, ...
"#;

#[derive(Parser, Clone)]
#[command(name = "task-engine")]
#[command(about = "Task list state engine - annotations, analytics, undo/redo, live refresh")]
#[command(long_about = LONG_ABOUT)]
#[command(version)]
pub struct Cli {
    /// Enable verbose output (-v)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output (-q)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Output logs in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Task service base URL (overrides TASK_ENGINE_API_URL)
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Clone)]
pub enum Commands {
    /// List all tasks
    List {
        /// Order: none, title, status, assignee
        #[arg(long)]
        sort: Option<String>,

        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },

    /// Show one task by id
    Show {
        id: String,

        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },

    /// Create a task
    ///
    /// Examples:
    ///   te add --title "Write docs" --description "User guide"
    ///   te add --title "Fix login" --description "500 on submit" --assignee alice --status in_progress
    Add {
        #[arg(long)]
        title: String,

        #[arg(long)]
        description: String,

        #[arg(long)]
        assignee: Option<String>,

        /// to_do, in_progress or done (service default when omitted)
        #[arg(long)]
        status: Option<String>,

        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },

    /// Update fields of a task
    Update {
        id: String,

        #[arg(long)]
        title: Option<String>,

        #[arg(long)]
        description: Option<String>,

        #[arg(long)]
        assignee: Option<String>,

        #[arg(long)]
        status: Option<String>,

        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },

    /// Delete a task
    Delete { id: String },

    /// Print analytics for the current collection
    Stats {
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },

    /// Follow change notifications and print stats after each refresh
    Watch {
        /// Notification WebSocket URL (overrides TASK_ENGINE_NOTIFY_URL)
        #[arg(long)]
        notify_url: Option<String>,
    },

    /// Interactive session on one live collection
    ///
    /// Type `help` inside the shell for the command list.
    Shell {
        /// Notification WebSocket URL (overrides TASK_ENGINE_NOTIFY_URL)
        #[arg(long)]
        notify_url: Option<String>,

        /// Do not subscribe to change notifications
        #[arg(long)]
        no_listen: bool,
    },
}
