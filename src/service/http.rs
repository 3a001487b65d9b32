/// HTTP client for the REST task service
///
/// Every call maps a non-success status to `TaskError::RemoteCall` so the
/// controller never tries to parse an error body as task data.
use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;

use super::TaskService;
use crate::error::{Result, TaskError};
use crate::models::{NewTask, TaskPatch, TaskRecord};

/// Default service location
pub const DEFAULT_API_URL: &str = "http://localhost:9000/api";

/// Default per-request timeout
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Error body shape of the reference service (`{"detail": "..."}`)
#[derive(Debug, Deserialize)]
struct ErrorBody {
    detail: serde_json::Value,
}

/// REST task service client
#[derive(Debug, Clone)]
pub struct HttpTaskService {
    base_url: String,
    client: reqwest::Client,
}

impl HttpTaskService {
    /// Create a client for `base_url` (e.g. `http://localhost:9000/api`)
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_timeout(base_url, DEFAULT_TIMEOUT)
    }

    /// Create a client with a custom request timeout
    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self { base_url, client }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn list_tasks(
        &self,
        offset: Option<usize>,
        limit: Option<usize>,
    ) -> Result<Vec<TaskRecord>> {
        let mut query = Vec::new();
        if let Some(offset) = offset {
            query.push(("offset", offset));
        }
        if let Some(limit) = limit {
            query.push(("limit", limit));
        }

        let response = self
            .client
            .get(self.url("/tasks"))
            .query(&query)
            .send()
            .await?;
        parse_json(response).await
    }

    pub async fn get_task(&self, id: &str) -> Result<TaskRecord> {
        let response = self
            .client
            .get(self.url(&format!("/tasks/{}", id)))
            .send()
            .await?;
        parse_json(response).await
    }

    pub async fn create_task(&self, task: &NewTask) -> Result<TaskRecord> {
        let response = self
            .client
            .post(self.url("/tasks"))
            .json(task)
            .send()
            .await?;
        parse_json(response).await
    }

    pub async fn update_task(&self, id: &str, patch: &TaskPatch) -> Result<TaskRecord> {
        let response = self
            .client
            .patch(self.url(&format!("/tasks/{}", id)))
            .json(patch)
            .send()
            .await?;
        parse_json(response).await
    }

    pub async fn delete_task(&self, id: &str) -> Result<()> {
        let response = self
            .client
            .delete(self.url(&format!("/tasks/{}", id)))
            .send()
            .await?;
        ensure_success(response).await.map(drop)
    }

    /// Ask the service to revert its most recent command
    pub async fn undo(&self) -> Result<()> {
        let response = self.client.post(self.url("/undo")).send().await?;
        ensure_success(response).await.map(drop)
    }

    /// Ask the service to re-apply its most recently reverted command
    pub async fn redo(&self) -> Result<()> {
        let response = self.client.post(self.url("/redo")).send().await?;
        ensure_success(response).await.map(drop)
    }
}

async fn ensure_success(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = error_message(status, &body);
    tracing::debug!(status = status.as_u16(), %message, "Task service returned an error");
    Err(TaskError::RemoteCall {
        status: status.as_u16(),
        message,
    })
}

async fn parse_json<T: DeserializeOwned>(response: Response) -> Result<T> {
    let response = ensure_success(response).await?;
    Ok(response.json::<T>().await?)
}

fn error_message(status: StatusCode, body: &str) -> String {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(ErrorBody {
            detail: serde_json::Value::String(detail),
        }) => detail,
        Ok(ErrorBody { detail }) => detail.to_string(),
        Err(_) if !body.trim().is_empty() => body.trim().to_string(),
        Err(_) => status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string(),
    }
}

impl TaskService for HttpTaskService {
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
