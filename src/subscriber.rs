//! Push-notification subscriber with automatic reconnection.
//!
//! Keeps one WebSocket open to the notification endpoint and hands every
//! inbound text frame to a single callback. Whenever the channel closes,
//! cleanly or not, a new attempt is made after a fixed delay, forever,
//! until [`NotificationSubscriber::stop`] is called or the subscriber is
//! dropped.
//!
//! # Testing Strategy
//!
//! Tests live in `tests/subscriber_integration_test.rs` and run against a
//! local axum WebSocket server bound to an ephemeral port.

use anyhow::Context;
use chrono::{DateTime, Utc};
use futures_util::StreamExt;
use serde::Serialize;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};

use crate::error::{Result, TaskError};

/// Default notification endpoint
pub const DEFAULT_NOTIFY_URL: &str = "ws://localhost:9000/ws/notify";

/// Fixed delay between a close and the next connection attempt
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(3);

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Callback receiving each raw notification
pub type MessageCallback = Arc<dyn Fn(String) + Send + Sync>;

/// Connection lifecycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

/// Diagnostics snapshot of a subscriber
#[derive(Debug, Clone, Default, Serialize)]
pub struct SubscriberStatus {
    pub state: ConnectionState,
    /// Successful opens, reconnections included
    pub connections: usize,
    /// Failed connection attempts
    pub failed_attempts: usize,
    pub messages_received: usize,
    pub last_connected_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Default)]
struct Shared {
    status: Mutex<SubscriberStatus>,
}

impl Shared {
    fn update(&self, f: impl FnOnce(&mut SubscriberStatus)) {
        let mut status = self.status.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut status);
    }

    fn snapshot(&self) -> SubscriberStatus {
        self.status
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

/// Owned push-notification subscriber
pub struct NotificationSubscriber {
    reconnect_delay: Duration,
    shared: Arc<Shared>,
    shutdown: Option<watch::Sender<bool>>,
    handle: Option<JoinHandle<()>>,
}

impl Default for NotificationSubscriber {
    fn default() -> Self {
        Self::new()
    }
}

impl NotificationSubscriber {
    pub fn new() -> Self {
        Self::with_reconnect_delay(DEFAULT_RECONNECT_DELAY)
    }

    pub fn with_reconnect_delay(reconnect_delay: Duration) -> Self {
        Self {
            reconnect_delay,
            shared: Arc::new(Shared::default()),
            shutdown: None,
            handle: None,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.shared.snapshot().state
    }

    pub fn status(&self) -> SubscriberStatus {
        self.shared.snapshot()
    }

    /// Whether the reconnect loop is running
    pub fn is_active(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Open the channel and start delivering messages to `on_message`.
    ///
    /// Resolves once the first connection attempt settles. If that attempt
    /// fails the error is returned, and the loop keeps retrying in the
    /// background. Calling this on an active subscriber does nothing: the
    /// existing connection and callback are kept.
    pub async fn subscribe<F>(&mut self, endpoint: impl Into<String>, on_message: F) -> Result<()>
    where
        F: Fn(String) + Send + Sync + 'static,
    {
        if self.is_active() {
            tracing::debug!("Subscriber already active, ignoring subscribe");
            return Ok(());
        }

        let endpoint = endpoint.into();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (ack_tx, ack_rx) = oneshot::channel();

        let handle = tokio::spawn(run_loop(
            endpoint.clone(),
            Arc::new(on_message),
            self.reconnect_delay,
            Arc::clone(&self.shared),
            shutdown_rx,
            ack_tx,
        ));
        self.shutdown = Some(shutdown_tx);
        self.handle = Some(handle);

        match ack_rx.await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(message)) => Err(TaskError::Transport(message)),
            Err(_) => Err(TaskError::Transport(format!(
                "subscriber for {} stopped before connecting",
                endpoint
            ))),
        }
    }

    /// Close the channel and cancel any pending reconnect.
    pub async fn stop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(true);
        }
        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.await {
                tracing::warn!(error = %e, "Notification loop ended abnormally");
            }
        }
        self.shared
            .update(|s| s.state = ConnectionState::Disconnected);
    }
}

impl Drop for NotificationSubscriber {
    fn drop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(true);
        }
    }
}

/// Connect, pump, wait, repeat. Exits only on shutdown.
async fn run_loop(
    endpoint: String,
    on_message: MessageCallback,
    reconnect_delay: Duration,
    shared: Arc<Shared>,
    mut shutdown: watch::Receiver<bool>,
    ack: oneshot::Sender<std::result::Result<(), String>>,
) {
    let mut ack = Some(ack);
    let mut attempt: u64 = 0;

    loop {
        attempt += 1;
        shared.update(|s| s.state = ConnectionState::Connecting);
        tracing::info!(endpoint = %endpoint, attempt, "Connecting to notification channel");

        let opened = tokio::select! {
            _ = shutdown.changed() => break,
            result = open_channel(&endpoint) => result,
        };

        match opened {
            Ok(ws) => {
                shared.update(|s| {
                    s.state = ConnectionState::Connected;
                    s.connections += 1;
                    s.last_connected_at = Some(Utc::now());
                });
                tracing::info!(endpoint = %endpoint, "Notification channel connected");
                if let Some(ack) = ack.take() {
                    let _ = ack.send(Ok(()));
                }

                let stopped = pump(ws, &on_message, &shared, &mut shutdown).await;
                shared.update(|s| s.state = ConnectionState::Disconnected);
                if stopped {
                    break;
                }
                tracing::info!(
                    "Notification channel closed, reconnecting in {:.1}s",
                    reconnect_delay.as_secs_f64()
                );
            },
            Err(e) => {
                shared.update(|s| {
                    s.state = ConnectionState::Disconnected;
                    s.failed_attempts += 1;
                });
                tracing::warn!(
                    "Notification channel failed: {:#}. Retrying in {:.1}s",
                    e,
                    reconnect_delay.as_secs_f64()
                );
                if let Some(ack) = ack.take() {
                    let _ = ack.send(Err(format!("{:#}", e)));
                }
            },
        }

        tokio::select! {
            _ = shutdown.changed() => break,
            _ = tokio::time::sleep(reconnect_delay) => {},
        }
    }

    shared.update(|s| s.state = ConnectionState::Disconnected);
    tracing::debug!(endpoint = %endpoint, "Notification loop stopped");
}

async fn open_channel(endpoint: &str) -> anyhow::Result<WsStream> {
    let (ws_stream, _) = connect_async(endpoint)
        .await
        .with_context(|| format!("Failed to connect to {}", endpoint))?;
    Ok(ws_stream)
}

/// Deliver messages until the channel ends. Returns true on shutdown.
async fn pump(
    mut ws: WsStream,
    on_message: &MessageCallback,
    shared: &Shared,
    shutdown: &mut watch::Receiver<bool>,
) -> bool {
    loop {
        tokio::select! {
            _ = shutdown.changed() => {
                if let Err(e) = ws.close(None).await {
                    tracing::debug!("Failed to close notification channel: {}", e);
                }
                return true;
            },
            frame = ws.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    tracing::debug!("Notification received: {}", text);
                    shared.update(|s| s.messages_received += 1);
                    on_message(text);
                },
                Some(Ok(Message::Close(_))) => {
                    tracing::info!("Notification service closed the channel");
                    return false;
                },
                Some(Ok(_)) => {},
                Some(Err(e)) => {
                    tracing::warn!("Notification channel error: {}", e);
                    return false;
                },
                None => {
                    tracing::info!("Notification stream ended");
                    return false;
                },
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_subscriber_is_disconnected() {
        let subscriber = NotificationSubscriber::new();
        assert_eq!(subscriber.state(), ConnectionState::Disconnected);
        assert!(!subscriber.is_active());
        assert_eq!(subscriber.status().connections, 0);
    }

    #[tokio::test]
    async fn test_initial_failure_rejects_once_and_stop_cancels_retry() {
        let mut subscriber = NotificationSubscriber::with_reconnect_delay(Duration::from_secs(60));
        // Port 9 (discard) is not expected to host a WebSocket server
        let result = subscriber
            .subscribe("ws://127.0.0.1:9/ws/notify", |_| {})
            .await;
        assert!(matches!(result, Err(TaskError::Transport(_))));
        assert!(subscriber.is_active(), "retry loop keeps running");

        subscriber.stop().await;
        assert!(!subscriber.is_active());
        assert_eq!(subscriber.state(), ConnectionState::Disconnected);
        assert_eq!(subscriber.status().failed_attempts, 1);
    }
}
