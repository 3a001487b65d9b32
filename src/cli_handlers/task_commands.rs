use crate::annotation::AnnotatedTask;
use crate::cli_handlers::utils::{
    format_analytics, format_task_detail, is_json, parse_status, print_json, print_tasks,
};
use crate::config::EngineConfig;
use crate::controller::{CollectionController, ControllerOptions};
use crate::error::{Result, TaskError};
use crate::models::{NewTask, TaskPatch, TaskRecord};
use crate::service::HttpTaskService;
use crate::sort::SortStrategy;

/// Build a controller talking to the configured service
pub fn build_controller(config: &EngineConfig) -> CollectionController<HttpTaskService> {
    let service = HttpTaskService::with_timeout(&config.api_url, config.request_timeout);
    CollectionController::with_options(service, ControllerOptions::from(config))
}

pub async fn handle_list(config: &EngineConfig, sort: Option<&str>, format: &str) -> Result<()> {
    let controller = build_controller(config);
    if let Some(sort) = sort {
        let strategy: SortStrategy = sort.parse()?;
        controller.set_sort_strategy(strategy).await;
    }
    controller.refresh().await?;
    print_tasks(&controller.view().await, format)
}

pub async fn handle_show(config: &EngineConfig, id: &str, format: &str) -> Result<()> {
    let controller = build_controller(config);
    let record = controller.service().get_task(id).await?;
    print_record(record, format)
}

pub async fn handle_add(
    config: &EngineConfig,
    title: String,
    description: String,
    assignee: Option<String>,
    status: Option<&str>,
    format: &str,
) -> Result<()> {
    let mut task = NewTask::new(title, description);
    if let Some(assignee) = assignee {
        task = task.with_assignee(assignee);
    }
    if let Some(status) = parse_status(status)? {
        task = task.with_status(status);
    }

    let controller = build_controller(config);
    let record = controller.create_task(task).await?;
    print_record(record, format)
}

pub async fn handle_update(
    config: &EngineConfig,
    id: &str,
    patch: TaskPatch,
    format: &str,
) -> Result<()> {
    if patch.is_empty() {
        return Err(TaskError::Validation(
            "Nothing to update: pass at least one of --title, --description, --assignee, --status"
                .into(),
        ));
    }

    let controller = build_controller(config);
    let record = controller.update_task(id, patch).await?;
    print_record(record, format)
}

/// Assemble a patch from `update` flags
pub fn build_patch(
    title: Option<String>,
    description: Option<String>,
    assignee: Option<String>,
    status: Option<&str>,
) -> Result<TaskPatch> {
    Ok(TaskPatch {
        title,
        description,
        assigned_user_id: assignee,
        status: parse_status(status)?,
    })
}

pub async fn handle_delete(config: &EngineConfig, id: &str) -> Result<()> {
    let controller = build_controller(config);
    controller.delete_task(id).await?;
    println!("Deleted task {}", id);
    Ok(())
}

pub async fn handle_stats(config: &EngineConfig, format: &str) -> Result<()> {
    let controller = build_controller(config);
    controller.refresh().await?;
    let analytics = controller.analytics().await;

    if is_json(format) {
        print_json(&analytics)
    } else {
        println!("{}", format_analytics(&analytics));
        Ok(())
    }
}

fn print_record(record: TaskRecord, format: &str) -> Result<()> {
    let task = AnnotatedTask::new(record);
    if is_json(format) {
        print_json(&task.to_view())
    } else {
        print!("{}", format_task_detail(&task));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TaskStatus;

    #[test]
    fn test_build_patch_parses_status() {
        let patch = build_patch(None, None, Some("bob".into()), Some("in_progress")).unwrap();
        assert_eq!(patch.status, Some(TaskStatus::InProgress));
        assert_eq!(patch.assigned_user_id.as_deref(), Some("bob"));
        assert!(patch.title.is_none());
    }

    #[test]
    fn test_build_patch_rejects_unknown_status() {
        let err = build_patch(None, None, None, Some("blocked")).unwrap_err();
        assert!(matches!(err, TaskError::Validation(_)));
    }

    #[tokio::test]
    async fn test_update_without_fields_is_rejected_locally() {
        let config = EngineConfig {
            api_url: "http://127.0.0.1:9/api".into(),
            ..EngineConfig::default()
        };
        let err = handle_update(&config, "t1", TaskPatch::default(), "text")
            .await
            .unwrap_err();
        assert!(matches!(err, TaskError::Validation(_)));
    }
}
