//! Logging initialization writes to the configured file.
//!
//! Kept in its own test binary: the global subscriber can only be installed
//! once per process.

use task_engine::logging::{init_logging, ApplicationMode, LoggingConfig};
use tempfile::TempDir;

#[test]
fn test_file_output_receives_engine_events() {
    std::env::remove_var("RUST_LOG");
    let temp_dir = TempDir::new().unwrap();
    let log_file = temp_dir.path().join("watch.log");

    let mut config = LoggingConfig::for_mode(ApplicationMode::Watch);
    config.file_output = Some(log_file.clone());
    init_logging(config).unwrap();

    tracing::info!(target: "task_engine::subscriber", "Notification channel connected");
    tracing::debug!(target: "task_engine::subscriber", "below the watch level");

    let contents = std::fs::read_to_string(&log_file).unwrap();
    assert!(contents.contains("Notification channel connected"));
    assert!(contents.contains("INFO"));
    assert!(!contents.contains("below the watch level"));

    // A second global subscriber is refused rather than silently replacing the first
    assert!(init_logging(LoggingConfig::default()).is_err());
}
