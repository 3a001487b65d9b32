//! Collection controller: the single owner of the live task collection.
//!
//! Every entry point takes the same lock for the whole
//! "read collection → call service → write collection" sequence, so user
//! commands and notification-triggered refreshes never interleave.

use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, Mutex};

use crate::analytics::{self, Analytics};
use crate::annotation::{AnnotatedTask, AnnotationKind, Annotations};
use crate::config::{AnnotationMode, EngineConfig, HistorySource};
use crate::error::{Result, TaskError};
use crate::history::{HistoryManager, Snapshot};
use crate::models::{NewTask, TaskPatch, TaskRecord};
use crate::service::{self, TaskService, DEFAULT_PAGE_LIMIT};
use crate::sort::{SortStrategy, TaskSorter};
use crate::subscriber::NotificationSubscriber;

/// Buffered refresh summaries per receiver before it starts lagging.
const REFRESH_CHANNEL_CAPACITY: usize = 64;

/// Result of an undo or redo request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryOutcome {
    Applied,
    NothingToUndo,
    NothingToRedo,
}

/// Controller behavior switches.
#[derive(Debug, Clone)]
pub struct ControllerOptions {
    pub annotation_mode: AnnotationMode,
    pub history_source: HistorySource,
    pub history_limit: Option<usize>,
    pub page_size: usize,
    pub sort: SortStrategy,
}

impl Default for ControllerOptions {
    fn default() -> Self {
        Self {
            annotation_mode: AnnotationMode::default(),
            history_source: HistorySource::default(),
            history_limit: None,
            page_size: DEFAULT_PAGE_LIMIT,
            sort: SortStrategy::default(),
        }
    }
}

impl From<&EngineConfig> for ControllerOptions {
    fn from(config: &EngineConfig) -> Self {
        Self {
            annotation_mode: config.annotation_mode,
            history_source: config.history_source,
            history_limit: config.history_limit,
            page_size: config.page_size,
            sort: config.sort,
        }
    }
}

#[derive(Debug)]
struct CollectionState {
    collection: Snapshot,
    history: HistoryManager,
    sorter: TaskSorter,
}

pub struct CollectionController<S> {
    service: S,
    options: ControllerOptions,
    state: Mutex<CollectionState>,
    refreshes: broadcast::Sender<Analytics>,
}

impl<S: TaskService> CollectionController<S> {
    pub fn new(service: S) -> Self {
        Self::with_options(service, ControllerOptions::default())
    }

    pub fn with_options(service: S, options: ControllerOptions) -> Self {
        let state = CollectionState {
            collection: Vec::new(),
            history: HistoryManager::with_limit(options.history_limit),
            sorter: TaskSorter::new(options.sort),
        };
        let (refreshes, _) = broadcast::channel(REFRESH_CHANNEL_CAPACITY);
        Self {
            service,
            options,
            state: Mutex::new(state),
            refreshes,
        }
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    pub fn options(&self) -> &ControllerOptions {
        &self.options
    }

    // ── Queries ─────────────────────────────────────────────────────

    /// The live collection in service order.
    pub async fn collection(&self) -> Snapshot {
        self.state.lock().await.collection.clone()
    }

    /// The live collection ordered by the active sort strategy.
    pub async fn view(&self) -> Snapshot {
        let state = self.state.lock().await;
        state.sorter.sort(&state.collection)
    }

    pub async fn analytics(&self) -> Analytics {
        analytics::compute(&self.state.lock().await.collection)
    }

    pub async fn sort_strategy(&self) -> SortStrategy {
        self.state.lock().await.sorter.strategy()
    }

    pub async fn set_sort_strategy(&self, strategy: SortStrategy) {
        self.state.lock().await.sorter.set_strategy(strategy);
        tracing::debug!(strategy = %strategy, "Sort strategy changed");
    }

    /// Whether the local history holds a step to undo.
    ///
    /// Only meaningful for `HistorySource::Local`. With `Remote` the service
    /// owns the history, nothing is recorded locally and this is always
    /// false; `undo()` reports `NothingToUndo` instead.
    pub async fn can_undo(&self) -> bool {
        self.state.lock().await.history.can_undo()
    }

    /// Local counterpart of [`can_undo`](Self::can_undo) for redo.
    pub async fn can_redo(&self) -> bool {
        self.state.lock().await.history.can_redo()
    }

    // ── Refresh ─────────────────────────────────────────────────────

    /// Replace the collection with the service's current task set.
    pub async fn refresh(&self) -> Result<usize> {
        let mut state = self.state.lock().await;
        self.refresh_locked(&mut state).await
    }

    /// Receive the analytics of every completed refresh, one message per
    /// refresh even when the numbers did not change.
    pub fn subscribe_refreshes(&self) -> broadcast::Receiver<Analytics> {
        self.refreshes.subscribe()
    }

    async fn refresh_locked(&self, state: &mut CollectionState) -> Result<usize> {
        let records = service::list_all(&self.service, self.options.page_size).await?;
        state.collection = self.decorate(records, &state.collection);
        tracing::debug!(count = state.collection.len(), "Collection refreshed");
        // No receivers is fine
        let _ = self.refreshes.send(analytics::compute(&state.collection));
        Ok(state.collection.len())
    }

    fn decorate(&self, records: Vec<TaskRecord>, previous: &[AnnotatedTask]) -> Snapshot {
        let retained: HashMap<&str, Annotations> = match self.options.annotation_mode {
            AnnotationMode::ClientLocal => HashMap::new(),
            AnnotationMode::RetainAcrossRefresh => previous
                .iter()
                .map(|t| (t.id(), t.annotations()))
                .filter(|(_, a)| !a.is_empty())
                .collect(),
        };

        records
            .into_iter()
            .map(|record| {
                let annotations = retained
                    .get(record.id.as_str())
                    .copied()
                    .unwrap_or_default();
                AnnotatedTask::build(record, annotations)
            })
            .collect()
    }

    // ── Mutations ───────────────────────────────────────────────────

    pub async fn create_task(&self, task: NewTask) -> Result<TaskRecord> {
        task.validate()?;
        let mut state = self.state.lock().await;
        let record = self.service.create_task(&task).await.inspect_err(|e| {
            tracing::warn!(error = %e, "Create task failed");
        })?;

        self.record_history(&mut state);
        state.collection.push(AnnotatedTask::new(record.clone()));
        crate::log_task_operation!("create", record.id.as_str());
        Ok(record)
    }

    pub async fn update_task(&self, id: &str, patch: TaskPatch) -> Result<TaskRecord> {
        patch.validate()?;
        let mut state = self.state.lock().await;
        let record = self
            .service
            .update_task(id, &patch)
            .await
            .inspect_err(|e| tracing::warn!(error = %e, task_id = id, "Update task failed"))?;

        self.record_history(&mut state);
        let position = state.collection.iter().position(|t| t.id() == id);
        match position {
            Some(index) => {
                let updated = state.collection[index].with_record(record.clone());
                state.collection[index] = updated;
            },
            None => state.collection.push(AnnotatedTask::new(record.clone())),
        }
        crate::log_task_operation!("update", id);
        Ok(record)
    }

    pub async fn delete_task(&self, id: &str) -> Result<()> {
        let mut state = self.state.lock().await;
        self.service
            .delete_task(id)
            .await
            .inspect_err(|e| tracing::warn!(error = %e, task_id = id, "Delete task failed"))?;

        self.record_history(&mut state);
        state.collection.retain(|t| t.id() != id);
        crate::log_task_operation!("delete", id);
        Ok(())
    }

    /// Snapshot the collection before a mutation. Remote history lives on
    /// the service, so nothing is kept here.
    fn record_history(&self, state: &mut CollectionState) {
        if matches!(self.options.history_source, HistorySource::Local) {
            let before = state.collection.clone();
            state.history.record_snapshot(before);
        }
    }

    // ── Annotations ─────────────────────────────────────────────────

    pub async fn toggle_priority(&self, id: &str) -> Result<AnnotatedTask> {
        self.toggle(id, AnnotationKind::Priority).await
    }

    pub async fn toggle_frozen(&self, id: &str) -> Result<AnnotatedTask> {
        self.toggle(id, AnnotationKind::Frozen).await
    }

    /// Rebuild the chain of one task; the rest of the collection and the
    /// history are left alone, and the service is not called.
    async fn toggle(&self, id: &str, kind: AnnotationKind) -> Result<AnnotatedTask> {
        let mut state = self.state.lock().await;
        let slot = state
            .collection
            .iter_mut()
            .find(|t| t.id() == id)
            .ok_or_else(|| TaskError::TaskNotFound(id.to_string()))?;
        *slot = slot.toggle(kind);
        tracing::debug!(task_id = id, annotation = ?kind, "Annotation toggled");
        Ok(slot.clone())
    }

    // ── History ─────────────────────────────────────────────────────

    pub async fn undo(&self) -> Result<HistoryOutcome> {
        match self.options.history_source {
            HistorySource::Local => {
                let mut state = self.state.lock().await;
                let current = state.collection.clone();
                let Some(previous) = state.history.undo(current) else {
                    tracing::debug!("Nothing to undo");
                    return Ok(HistoryOutcome::NothingToUndo);
                };
                state.collection = previous;
                tracing::info!(count = state.collection.len(), "Undo applied");
                Ok(HistoryOutcome::Applied)
            },
            HistorySource::Remote => {
                let mut state = self.state.lock().await;
                match self.service.undo().await {
                    Ok(()) => {
                        self.refresh_locked(&mut state).await?;
                        Ok(HistoryOutcome::Applied)
                    },
                    Err(TaskError::RemoteCall { status: 409, .. }) => {
                        Ok(HistoryOutcome::NothingToUndo)
                    },
                    Err(e) => Err(e),
                }
            },
        }
    }

    pub async fn redo(&self) -> Result<HistoryOutcome> {
        match self.options.history_source {
            HistorySource::Local => {
                let mut state = self.state.lock().await;
                let current = state.collection.clone();
                let Some(next) = state.history.redo(current) else {
                    tracing::debug!("Nothing to redo");
                    return Ok(HistoryOutcome::NothingToRedo);
                };
                state.collection = next;
                tracing::info!(count = state.collection.len(), "Redo applied");
                Ok(HistoryOutcome::Applied)
            },
            HistorySource::Remote => {
                let mut state = self.state.lock().await;
                match self.service.redo().await {
                    Ok(()) => {
                        self.refresh_locked(&mut state).await?;
                        Ok(HistoryOutcome::Applied)
                    },
                    Err(TaskError::RemoteCall { status: 409, .. }) => {
                        Ok(HistoryOutcome::NothingToRedo)
                    },
                    Err(e) => Err(e),
                }
            },
        }
    }
}

impl<S: TaskService + 'static> CollectionController<S> {
    /// Subscribe to `endpoint` and refresh the collection on every
    /// notification. Refresh failures are logged; the next notification
    /// tries again.
    ///
    /// The returned subscriber owns the connection; dropping or stopping
    /// it also ends the refresh worker.
    pub async fn listen(
        self: &Arc<Self>,
        endpoint: impl Into<String>,
        subscriber: &mut NotificationSubscriber,
    ) -> Result<()> {
        let (tx, mut rx) = mpsc::unbounded_channel::<String>();

        let controller = Arc::clone(self);
        tokio::spawn(async move {
            while let Some(message) = rx.recv().await {
                tracing::debug!(%message, "Refreshing after notification");
                if let Err(e) = controller.refresh().await {
                    crate::log_error!(e, "refresh after notification");
                }
            }
        });

        subscriber
            .subscribe(endpoint, move |message| {
                let _ = tx.send(message);
            })
            .await
    }
}
