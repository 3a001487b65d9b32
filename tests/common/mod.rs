//! Common utilities for integration tests
//!
//! Binary helpers for CLI tests, fixtures for task records, and two local
//! servers bound to ephemeral ports: a REST task API backed by
//! `InMemoryTaskService`, and a notification WebSocket whose close behavior
//! is scripted per test.

#![allow(dead_code)] // Not every test file uses every helper

use assert_cmd::Command;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Response;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use std::future::Future;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use task_engine::error::TaskError;
use task_engine::models::{NewTask, TaskPatch, TaskRecord, TaskStatus};
use task_engine::service::InMemoryTaskService;

const ENV_KEYS: &[&str] = &[
    "TASK_ENGINE_API_URL",
    "TASK_ENGINE_NOTIFY_URL",
    "TASK_ENGINE_RECONNECT_DELAY_MS",
    "TASK_ENGINE_REQUEST_TIMEOUT_MS",
    "TASK_ENGINE_PAGE_SIZE",
    "TASK_ENGINE_HISTORY_LIMIT",
    "TASK_ENGINE_ANNOTATIONS",
    "TASK_ENGINE_HISTORY_SOURCE",
    "TASK_ENGINE_SORT",
    "TASK_ENGINE_WATCH_LOG_FILE",
    "RUST_LOG",
];

/// Get the path to the `te` binary
///
/// Checks `CARGO_BIN_EXE_te` first (set by cargo for integration tests,
/// including custom target directories) and falls back to `cargo_bin`.
#[allow(deprecated)] // cargo_bin() is deprecated but needed for fallback
pub fn te_binary() -> PathBuf {
    std::env::var("CARGO_BIN_EXE_te")
        .map(PathBuf::from)
        .unwrap_or_else(|_| assert_cmd::cargo::cargo_bin("te"))
}

/// Create a Command for `te` with environment isolation
///
/// Every `TASK_ENGINE_*` variable is removed so the developer's shell does
/// not leak into the test, and HOME points nowhere.
pub fn te_command() -> Command {
    let mut cmd = Command::new(te_binary());
    for key in ENV_KEYS {
        cmd.env_remove(key);
    }
    cmd.env("HOME", "/nonexistent");
    cmd
}

pub fn record(id: &str, title: &str, status: TaskStatus, assignee: &str) -> TaskRecord {
    TaskRecord::new(
        id,
        NewTask::new(title, format!("{} description", title))
            .with_assignee(assignee)
            .with_status(status)
            .into_fields(),
    )
}

/// Poll `check` every 25ms until it holds or `timeout` passes.
pub async fn eventually<F, Fut>(timeout: Duration, mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if check().await {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
}

// ── REST task API ───────────────────────────────────────────────────

type ApiState = Arc<InMemoryTaskService>;
type ApiResult<T> = Result<Json<T>, (StatusCode, Json<Value>)>;

#[derive(Debug, Deserialize)]
struct Page {
    offset: Option<usize>,
    limit: Option<usize>,
}

fn api_error(error: TaskError) -> (StatusCode, Json<Value>) {
    let (status, detail) = match error {
        TaskError::RemoteCall { status, message } => (
            StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            message,
        ),
        other => (StatusCode::INTERNAL_SERVER_ERROR, other.to_string()),
    };
    (status, Json(json!({ "detail": detail })))
}

async fn list_tasks(
    State(service): State<ApiState>,
    Query(page): Query<Page>,
) -> ApiResult<Vec<TaskRecord>> {
    service
        .list_tasks(page.offset, page.limit)
        .await
        .map(Json)
        .map_err(api_error)
}

async fn get_task(
    State(service): State<ApiState>,
    Path(id): Path<String>,
) -> ApiResult<TaskRecord> {
    service.get_task(&id).await.map(Json).map_err(api_error)
}

async fn create_task(
    State(service): State<ApiState>,
    Json(task): Json<NewTask>,
) -> ApiResult<TaskRecord> {
    service.create_task(&task).await.map(Json).map_err(api_error)
}

async fn update_task(
    State(service): State<ApiState>,
    Path(id): Path<String>,
    Json(patch): Json<TaskPatch>,
) -> ApiResult<TaskRecord> {
    service
        .update_task(&id, &patch)
        .await
        .map(Json)
        .map_err(api_error)
}

async fn delete_task(
    State(service): State<ApiState>,
    Path(id): Path<String>,
) -> ApiResult<Value> {
    service
        .delete_task(&id)
        .await
        .map(|_| Json(json!({ "message": "Task deleted successfully" })))
        .map_err(api_error)
}

async fn undo(State(service): State<ApiState>) -> ApiResult<Value> {
    service
        .undo()
        .await
        .map(|_| Json(json!({ "message": "Undo successful" })))
        .map_err(api_error)
}

async fn redo(State(service): State<ApiState>) -> ApiResult<Value> {
    service
        .redo()
        .await
        .map(|_| Json(json!({ "message": "Redo successful" })))
        .map_err(api_error)
}

/// Serve `service` over REST; returns the base URL (`http://127.0.0.1:port/api`).
pub async fn spawn_task_api(service: Arc<InMemoryTaskService>) -> String {
    let api = Router::new()
        .route("/tasks", get(list_tasks).post(create_task))
        .route(
            "/tasks/:id",
            get(get_task).patch(update_task).delete(delete_task),
        )
        .route("/undo", post(undo))
        .route("/redo", post(redo))
        .with_state(service);
    let app = Router::new().nest("/api", api);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}/api", addr)
}

// ── Notification WebSocket ──────────────────────────────────────────

/// How the notification server treats each connection.
#[derive(Debug, Clone, Copy)]
pub struct WsScript {
    /// The first `close_first` connections are closed by the server right
    /// after their messages are sent; later ones stay open.
    pub close_first: usize,
    /// Messages sent on every connection, `"changed <conn> <n>"`.
    pub messages_per_connection: usize,
    /// Pause between messages on one connection.
    pub message_gap: Duration,
}

impl Default for WsScript {
    fn default() -> Self {
        Self {
            close_first: 0,
            messages_per_connection: 1,
            message_gap: Duration::from_millis(0),
        }
    }
}

#[derive(Clone)]
struct WsState {
    connections: Arc<AtomicUsize>,
    script: WsScript,
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<WsState>) -> Response {
    ws.on_upgrade(move |socket| serve_socket(socket, state))
}

async fn serve_socket(mut socket: WebSocket, state: WsState) {
    let connection = state.connections.fetch_add(1, Ordering::SeqCst) + 1;

    for n in 1..=state.script.messages_per_connection {
        if n > 1 {
            tokio::time::sleep(state.script.message_gap).await;
        }
        let text = format!("changed {} {}", connection, n);
        if socket.send(Message::Text(text)).await.is_err() {
            return;
        }
    }

    if connection <= state.script.close_first {
        let _ = socket.send(Message::Close(None)).await;
        return;
    }

    // Stay open until the client leaves
    while let Some(Ok(message)) = socket.recv().await {
        if matches!(message, Message::Close(_)) {
            break;
        }
    }
}

/// Start a notification server; returns its URL and the connection counter.
pub async fn spawn_notify_server(script: WsScript) -> (String, Arc<AtomicUsize>) {
    let connections = Arc::new(AtomicUsize::new(0));
    let state = WsState {
        connections: Arc::clone(&connections),
        script,
    };
    let app = Router::new()
        .route("/ws/notify", get(ws_handler))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("ws://{}/ws/notify", addr), connections)
}
