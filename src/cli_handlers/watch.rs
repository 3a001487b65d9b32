//! `te watch`: follow change notifications and print a summary after
//! every refresh until Ctrl-C.

use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;

use crate::cli_handlers::task_commands::build_controller;
use crate::cli_handlers::utils::format_analytics;
use crate::config::EngineConfig;
use crate::error::{Result, TaskError};
use crate::subscriber::NotificationSubscriber;

pub async fn handle_watch(config: &EngineConfig, notify_url: Option<String>) -> Result<()> {
    let endpoint = notify_url.unwrap_or_else(|| config.notify_url.clone());
    let controller = Arc::new(build_controller(config));

    controller.refresh().await?;
    println!("{}", format_analytics(&controller.analytics().await));

    let mut refreshes = controller.subscribe_refreshes();
    let mut subscriber = NotificationSubscriber::with_reconnect_delay(config.reconnect_delay);
    if let Err(e) = controller.listen(&endpoint, &mut subscriber).await {
        // The subscriber keeps retrying in the background
        tracing::warn!(error = %e, "Initial notification connection failed");
    }
    eprintln!("Watching {} (Ctrl-C to stop)", endpoint);

    loop {
        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                result.map_err(TaskError::IoError)?;
                break;
            },
            received = refreshes.recv() => match received {
                Ok(analytics) => println!("---\n{}", format_analytics(&analytics)),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Watch output fell behind refreshes");
                },
                Err(RecvError::Closed) => break,
            },
        }
    }

    subscriber.stop().await;
    tracing::info!("Watch stopped");
    Ok(())
}
