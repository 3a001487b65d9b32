//! The remote task service the controller synchronizes with.
//!
//! `TaskService` is the seam: the controller only sees this trait.
//! `HttpTaskService` talks to the real REST service; `InMemoryTaskService`
//! keeps records in process for tests, benches and offline use.

use std::collections::HashSet;
use std::future::Future;

use crate::error::Result;
use crate::models::{NewTask, TaskPatch, TaskRecord};

pub mod http;
pub mod memory;

pub use http::HttpTaskService;
pub use memory::InMemoryTaskService;

/// Page size the reference service applies when no limit is given.
pub const DEFAULT_PAGE_LIMIT: usize = 100;

/// Create/read/update/delete over the remote task collection.
pub trait TaskService: Send + Sync {
    // ── Read ────────────────────────────────────────────────────────

    fn list_tasks(
        &self,
        offset: Option<usize>,
        limit: Option<usize>,
    ) -> impl Future<Output = Result<Vec<TaskRecord>>> + Send;

    fn get_task(&self, id: &str) -> impl Future<Output = Result<TaskRecord>> + Send;

    // ── Write ───────────────────────────────────────────────────────

    fn create_task(&self, task: &NewTask) -> impl Future<Output = Result<TaskRecord>> + Send;

    fn update_task(
        &self,
        id: &str,
        patch: &TaskPatch,
    ) -> impl Future<Output = Result<TaskRecord>> + Send;

    fn delete_task(&self, id: &str) -> impl Future<Output = Result<()>> + Send;

    // ── Server-side history ─────────────────────────────────────────

    fn undo(&self) -> impl Future<Output = Result<()>> + Send;

    fn redo(&self) -> impl Future<Output = Result<()>> + Send;
}

/// Fetch every task by walking pages of `page_size`.
///
/// The service must honor `limit`: a short page is taken as the last one.
/// Paging also stops on an empty page or a page with no unseen ids, so a
/// service that ignores `offset` yields one page instead of looping.
pub async fn list_all<S: TaskService>(
    service: &S,
    page_size: usize,
) -> Result<Vec<TaskRecord>> {
    let page_size = page_size.max(1);
    let mut tasks = Vec::new();
    let mut seen = HashSet::new();
    let mut offset = 0;
    loop {
        let page = service.list_tasks(Some(offset), Some(page_size)).await?;
        let fetched = page.len();
        let before = tasks.len();
        tasks.extend(page.into_iter().filter(|t| seen.insert(t.id.clone())));
        if fetched < page_size || tasks.len() == before {
            break;
        }
        offset += fetched;
    }
    Ok(tasks)
}
