//! In-process task service.
//!
//! Behaves like the reference mock store: UUID ids, insertion-ordered
//! listing, offset/limit pagination with a default page, and a
//! command-based undo/redo lane behind `undo`/`redo`.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

use super::{TaskService, DEFAULT_PAGE_LIMIT};
use crate::error::{Result, TaskError};
use crate::models::{NewTask, TaskFields, TaskPatch, TaskRecord};

/// A reversible change applied to the store.
#[derive(Debug, Clone)]
enum Command {
    Create {
        record: TaskRecord,
    },
    Update {
        id: String,
        before: TaskFields,
        after: TaskFields,
    },
    Delete {
        record: TaskRecord,
        index: usize,
    },
}

#[derive(Debug, Default)]
struct Store {
    tasks: Vec<TaskRecord>,
    undo_stack: Vec<Command>,
    redo_stack: Vec<Command>,
}

impl Store {
    fn position(&self, id: &str) -> Result<usize> {
        self.tasks
            .iter()
            .position(|t| t.id == id)
            .ok_or_else(not_found)
    }

    fn apply(&mut self, command: &Command) -> Result<()> {
        match command {
            Command::Create { record } => self.tasks.push(record.clone()),
            Command::Update { id, after, .. } => {
                let index = self.position(id)?;
                self.tasks[index].task = after.clone();
            },
            Command::Delete { record, .. } => {
                let index = self.position(&record.id)?;
                self.tasks.remove(index);
            },
        }
        Ok(())
    }

    fn revert(&mut self, command: &Command) -> Result<()> {
        match command {
            Command::Create { record } => {
                let index = self.position(&record.id)?;
                self.tasks.remove(index);
            },
            Command::Update { id, before, .. } => {
                let index = self.position(id)?;
                self.tasks[index].task = before.clone();
            },
            Command::Delete { record, index } => {
                let index = (*index).min(self.tasks.len());
                self.tasks.insert(index, record.clone());
            },
        }
        Ok(())
    }

    fn execute(&mut self, command: Command) -> Result<()> {
        self.apply(&command)?;
        self.undo_stack.push(command);
        self.redo_stack.clear();
        Ok(())
    }
}

/// Thread-safe in-memory implementation of [`TaskService`].
#[derive(Debug, Default)]
pub struct InMemoryTaskService {
    store: Mutex<Store>,
    pending_failures: AtomicUsize,
    calls: AtomicUsize,
}

impl InMemoryTaskService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store without recording commands.
    pub fn with_tasks(tasks: impl IntoIterator<Item = TaskRecord>) -> Self {
        let service = Self::new();
        service.lock().tasks.extend(tasks);
        service
    }

    /// Make the next call fail with a 500, as if the backing store errored.
    pub fn fail_next(&self) {
        self.fail_times(1);
    }

    pub fn fail_times(&self, count: usize) {
        self.pending_failures.store(count, Ordering::SeqCst);
    }

    /// Number of service calls made so far, failed ones included.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Current records in insertion order.
    pub fn snapshot(&self) -> Vec<TaskRecord> {
        self.lock().tasks.clone()
    }

    fn lock(&self) -> MutexGuard<'_, Store> {
        // A poisoned store still holds consistent data: every mutation
        // validates before touching `tasks`.
        self.store.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn begin_call(&self) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let injected = self
            .pending_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if injected {
            return Err(TaskError::RemoteCall {
                status: 500,
                message: "DB exception".to_string(),
            });
        }
        Ok(())
    }

    pub async fn list_tasks(
        &self,
        offset: Option<usize>,
        limit: Option<usize>,
    ) -> Result<Vec<TaskRecord>> {
        self.begin_call()?;
        let offset = offset.unwrap_or(0);
        let limit = limit.unwrap_or(DEFAULT_PAGE_LIMIT);
        Ok(self
            .lock()
            .tasks
            .iter()
            .skip(offset)
            .take(limit)
            .cloned()
            .collect())
    }

    pub async fn get_task(&self, id: &str) -> Result<TaskRecord> {
        self.begin_call()?;
        let store = self.lock();
        let index = store.position(id)?;
        Ok(store.tasks[index].clone())
    }

    pub async fn create_task(&self, task: &NewTask) -> Result<TaskRecord> {
        self.begin_call()?;
        let record = TaskRecord::new(uuid::Uuid::new_v4().to_string(), task.clone().into_fields());
        self.lock().execute(Command::Create {
            record: record.clone(),
        })?;
        Ok(record)
    }

    pub async fn update_task(&self, id: &str, patch: &TaskPatch) -> Result<TaskRecord> {
        self.begin_call()?;
        let mut store = self.lock();
        let index = store.position(id)?;
        let before = store.tasks[index].task.clone();
        let mut after = before.clone();
        patch.apply_to(&mut after);
        store.execute(Command::Update {
            id: id.to_string(),
            before,
            after,
        })?;
        Ok(store.tasks[index].clone())
    }

    pub async fn delete_task(&self, id: &str) -> Result<()> {
        self.begin_call()?;
        let mut store = self.lock();
        let index = store.position(id)?;
        let record = store.tasks[index].clone();
        store.execute(Command::Delete { record, index })
    }

    pub async fn undo(&self) -> Result<()> {
        self.begin_call()?;
        let mut store = self.lock();
        let command = store
            .undo_stack
            .pop()
            .ok_or_else(|| conflict("No commands to undo."))?;
        store.revert(&command)?;
        store.redo_stack.push(command);
        Ok(())
    }

    pub async fn redo(&self) -> Result<()> {
        self.begin_call()?;
        let mut store = self.lock();
        let command = store
            .redo_stack
            .pop()
            .ok_or_else(|| conflict("No commands to redo."))?;
        store.apply(&command)?;
        store.undo_stack.push(command);
        Ok(())
    }
}

fn not_found() -> TaskError {
    TaskError::RemoteCall {
        status: 404,
        message: "Task not found".to_string(),
    }
}

fn conflict(message: &str) -> TaskError {
    TaskError::RemoteCall {
        status: 409,
        message: message.to_string(),
    }
}

impl TaskService for InMemoryTaskService {
    fn list_tasks(
        &self,
        offset: Option<usize>,
        limit: Option<usize>,
    ) -> impl std::future::Future<Output = Result<Vec<TaskRecord>>> + Send {
        self.list_tasks(offset, limit)
    }

    fn get_task(&self, id: &str) -> impl std::future::Future<Output = Result<TaskRecord>> + Send {
        self.get_task(id)
    }

    fn create_task(
        &self,
        task: &NewTask,
    ) -> impl std::future::Future<Output = Result<TaskRecord>> + Send {
        self.create_task(task)
    }

    fn update_task(
        &self,
        id: &str,
        patch: &TaskPatch,
    ) -> impl std::future::Future<Output = Result<TaskRecord>> + Send {
        self.update_task(id, patch)
    }

    fn delete_task(&self, id: &str) -> impl std::future::Future<Output = Result<()>> + Send {
        self.delete_task(id)
    }

    fn undo(&self) -> impl std::future::Future<Output = Result<()>> + Send {
        self.undo()
    }

    fn redo(&self) -> impl std::future::Future<Output = Result<()>> + Send {
        self.redo()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TaskStatus;
    use crate::service::list_all;

    #[tokio::test]
    async fn test_create_assigns_id_and_default_status() {
        let service = InMemoryTaskService::new();
        let record = service.create_task(&NewTask::new("A", "d")).await.unwrap();
        assert!(!record.id.is_empty());
        assert_eq!(record.task.status, TaskStatus::ToDo);
        assert_eq!(service.get_task(&record.id).await.unwrap(), record);
    }

    #[tokio::test]
    async fn test_pagination() {
        let service = InMemoryTaskService::new();
        for i in 0..5 {
            service
                .create_task(&NewTask::new(format!("T{}", i), "d"))
                .await
                .unwrap();
        }
        let page = service.list_tasks(Some(1), Some(2)).await.unwrap();
        let titles: Vec<_> = page.iter().map(|t| t.task.title.as_str()).collect();
        assert_eq!(titles, vec!["T1", "T2"]);

        let all = list_all(&service, 2).await.unwrap();
        assert_eq!(all.len(), 5);
    }

    #[tokio::test]
    async fn test_update_and_delete_unknown_id() {
        let service = InMemoryTaskService::new();
        let err = service
            .update_task("missing", &TaskPatch::default())
            .await
            .unwrap_err();
        assert!(matches!(err, TaskError::RemoteCall { status: 404, .. }));
        assert!(service.delete_task("missing").await.is_err());
    }

    #[tokio::test]
    async fn test_server_side_undo_redo() {
        let service = InMemoryTaskService::new();
        let a = service.create_task(&NewTask::new("A", "d")).await.unwrap();
        let patch = TaskPatch {
            title: Some("A2".into()),
            ..TaskPatch::default()
        };
        service.update_task(&a.id, &patch).await.unwrap();
        service.delete_task(&a.id).await.unwrap();
        assert!(service.snapshot().is_empty());

        service.undo().await.unwrap();
        assert_eq!(service.snapshot()[0].task.title, "A2");
        service.undo().await.unwrap();
        assert_eq!(service.snapshot()[0].task.title, "A");
        service.undo().await.unwrap();
        assert!(service.snapshot().is_empty());
        assert!(service.undo().await.is_err());

        service.redo().await.unwrap();
        assert_eq!(service.snapshot()[0].id, a.id);

        // new command clears redo lane
        service.create_task(&NewTask::new("B", "d")).await.unwrap();
        assert!(matches!(
            service.redo().await,
            Err(TaskError::RemoteCall { status: 409, .. })
        ));
    }

    #[tokio::test]
    async fn test_injected_failure_leaves_store_untouched() {
        let service = InMemoryTaskService::new();
        service.fail_next();
        assert!(service.create_task(&NewTask::new("A", "d")).await.is_err());
        assert!(service.snapshot().is_empty());
        assert!(service.create_task(&NewTask::new("A", "d")).await.is_ok());
        assert_eq!(service.call_count(), 2);
    }
}
