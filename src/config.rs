use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{Result, TaskError};
use crate::service::http::DEFAULT_API_URL;
use crate::service::DEFAULT_PAGE_LIMIT;
use crate::sort::SortStrategy;
use crate::subscriber::{DEFAULT_NOTIFY_URL, DEFAULT_RECONNECT_DELAY};

/// What happens to client-local annotations when the collection is
/// refreshed from the service.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AnnotationMode {
    /// Annotations live only on the current chains and are dropped by a
    /// refresh.
    #[default]
    ClientLocal,
    /// Annotations are remembered by task id and re-applied after a refresh.
    RetainAcrossRefresh,
}

impl FromStr for AnnotationMode {
    type Err = TaskError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "local" | "client_local" => Ok(AnnotationMode::ClientLocal),
            "retain" | "retain_across_refresh" => Ok(AnnotationMode::RetainAcrossRefresh),
            other => Err(TaskError::Config(format!(
                "Invalid annotation mode '{}'. Valid values: local, retain",
                other
            ))),
        }
    }
}

impl fmt::Display for AnnotationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AnnotationMode::ClientLocal => "local",
            AnnotationMode::RetainAcrossRefresh => "retain",
        })
    }
}

/// Which side owns undo/redo.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum HistorySource {
    /// Local snapshots are authoritative; the service is not consulted.
    #[default]
    Local,
    /// `POST /undo` / `POST /redo` on the service, followed by a refresh.
    Remote,
}

impl FromStr for HistorySource {
    type Err = TaskError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "local" => Ok(HistorySource::Local),
            "remote" | "server" => Ok(HistorySource::Remote),
            other => Err(TaskError::Config(format!(
                "Invalid history source '{}'. Valid values: local, remote",
                other
            ))),
        }
    }
}

impl fmt::Display for HistorySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            HistorySource::Local => "local",
            HistorySource::Remote => "remote",
        })
    }
}

/// Engine configuration parsed from environment variables.
///
/// All optional:
///   TASK_ENGINE_API_URL                 task service base URL
///   TASK_ENGINE_NOTIFY_URL              push-notification WebSocket
///   TASK_ENGINE_RECONNECT_DELAY_MS      fixed reconnect delay (3000)
///   TASK_ENGINE_REQUEST_TIMEOUT_MS      HTTP timeout (10000)
///   TASK_ENGINE_PAGE_SIZE               page size used by refresh (100)
///   TASK_ENGINE_HISTORY_LIMIT           undo depth cap, unset = unbounded
///   TASK_ENGINE_ANNOTATIONS             local | retain
///   TASK_ENGINE_HISTORY_SOURCE          local | remote
///   TASK_ENGINE_SORT                    none | title | status | assignee
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub api_url: String,
    pub notify_url: String,
    pub reconnect_delay: Duration,
    pub request_timeout: Duration,
    pub page_size: usize,
    pub history_limit: Option<usize>,
    pub annotation_mode: AnnotationMode,
    pub history_source: HistorySource,
    pub sort: SortStrategy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            notify_url: DEFAULT_NOTIFY_URL.to_string(),
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
            request_timeout: Duration::from_secs(10),
            page_size: DEFAULT_PAGE_LIMIT,
            history_limit: None,
            annotation_mode: AnnotationMode::default(),
            history_source: HistorySource::default(),
            sort: SortStrategy::default(),
        }
    }
}

impl EngineConfig {
    /// Parse configuration from environment variables, falling back to
    /// defaults for anything unset.
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let api_url = std::env::var("TASK_ENGINE_API_URL").unwrap_or(defaults.api_url);
        let notify_url = std::env::var("TASK_ENGINE_NOTIFY_URL").unwrap_or(defaults.notify_url);

        let reconnect_delay = env_parsed::<u64>("TASK_ENGINE_RECONNECT_DELAY_MS")?
            .map(Duration::from_millis)
            .unwrap_or(defaults.reconnect_delay);
        let request_timeout = env_parsed::<u64>("TASK_ENGINE_REQUEST_TIMEOUT_MS")?
            .map(Duration::from_millis)
            .unwrap_or(defaults.request_timeout);
        let page_size = env_parsed::<usize>("TASK_ENGINE_PAGE_SIZE")?.unwrap_or(defaults.page_size);
        if page_size == 0 {
            return Err(TaskError::Config(
                "TASK_ENGINE_PAGE_SIZE must be at least 1".into(),
            ));
        }
        let history_limit = env_parsed::<usize>("TASK_ENGINE_HISTORY_LIMIT")?;

        let annotation_mode = match std::env::var("TASK_ENGINE_ANNOTATIONS") {
            Ok(v) => v.parse()?,
            Err(_) => defaults.annotation_mode,
        };
        let history_source = match std::env::var("TASK_ENGINE_HISTORY_SOURCE") {
            Ok(v) => v.parse()?,
            Err(_) => defaults.history_source,
        };
        let sort = match std::env::var("TASK_ENGINE_SORT") {
            Ok(v) => v
                .parse()
                .map_err(|e: TaskError| TaskError::Config(e.to_string()))?,
            Err(_) => defaults.sort,
        };

        Ok(Self {
            api_url,
            notify_url,
            reconnect_delay,
            request_timeout,
            page_size,
            history_limit,
            annotation_mode,
            history_source,
            sort,
        })
    }
}

fn env_parsed<T: FromStr>(key: &str) -> Result<Option<T>> {
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| TaskError::Config(format!("{} has invalid value '{}'", key, raw))),
        Err(_) => Ok(None),
    }
}
