// CLI command handlers module
//
// One-shot commands build a fresh controller per invocation; `watch` and
// `shell` keep one controller alive and feed it from the notification
// channel.

pub mod shell;
pub mod task_commands;
pub mod utils;
pub mod watch;

// Re-export handlers for main.rs
pub use shell::handle_shell;
pub use task_commands::{
    handle_add, handle_delete, handle_list, handle_show, handle_stats, handle_update,
};
pub use watch::handle_watch;
