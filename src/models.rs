use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Result, TaskError};

/// Lifecycle status of a task as stored by the task service.
///
/// Statuses the service may add later deserialize as `Unrecognized` instead
/// of failing the whole listing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    ToDo,
    InProgress,
    Done,
    #[serde(other)]
    Unrecognized,
}

impl TaskStatus {
    pub const KNOWN: [TaskStatus; 3] = [TaskStatus::ToDo, TaskStatus::InProgress, TaskStatus::Done];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::ToDo => "to_do",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Done => "done",
            TaskStatus::Unrecognized => "unrecognized",
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, TaskStatus::Unrecognized)
    }

    /// Position in the domain order `to_do < in_progress < done`.
    /// Unrecognized statuses sort last.
    pub fn rank(&self) -> u8 {
        match self {
            TaskStatus::ToDo => 1,
            TaskStatus::InProgress => 2,
            TaskStatus::Done => 3,
            TaskStatus::Unrecognized => u8::MAX,
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = TaskError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "to_do" | "todo" => Ok(TaskStatus::ToDo),
            "in_progress" | "doing" => Ok(TaskStatus::InProgress),
            "done" => Ok(TaskStatus::Done),
            _ => Err(TaskError::Validation(format!(
                "Invalid status '{}'. Valid values: to_do, in_progress, done",
                s
            ))),
        }
    }
}

/// The four service-owned fields of a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskFields {
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub assigned_user_id: String,
    #[serde(default)]
    pub status: TaskStatus,
}

/// A task as returned by the service: `{id, task: {...}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRecord {
    pub id: String,
    pub task: TaskFields,
}

impl TaskRecord {
    pub fn new(id: impl Into<String>, task: TaskFields) -> Self {
        Self {
            id: id.into(),
            task,
        }
    }
}

/// Body of a create call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTask {
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub assigned_user_id: String,
    /// Omitted on the wire when unset so the service assigns its default.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskStatus>,
}

impl NewTask {
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            ..Self::default()
        }
    }

    pub fn with_assignee(mut self, assigned_user_id: impl Into<String>) -> Self {
        self.assigned_user_id = assigned_user_id.into();
        self
    }

    pub fn with_status(mut self, status: TaskStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Reject drafts whose title or description is blank.
    pub fn validate(&self) -> Result<()> {
        require_non_blank("title", &self.title)?;
        require_non_blank("description", &self.description)
    }

    pub fn into_fields(self) -> TaskFields {
        TaskFields {
            title: self.title,
            description: self.description,
            assigned_user_id: self.assigned_user_id,
            status: self.status.unwrap_or_default(),
        }
    }
}

/// Partial field set for an update call. Unset fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskStatus>,
}

impl TaskPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.assigned_user_id.is_none()
            && self.status.is_none()
    }

    /// A patch may omit title and description, but may not blank them.
    pub fn validate(&self) -> Result<()> {
        if let Some(title) = &self.title {
            require_non_blank("title", title)?;
        }
        if let Some(description) = &self.description {
            require_non_blank("description", description)?;
        }
        Ok(())
    }

    pub fn apply_to(&self, fields: &mut TaskFields) {
        if let Some(title) = &self.title {
            fields.title = title.clone();
        }
        if let Some(description) = &self.description {
            fields.description = description.clone();
        }
        if let Some(assigned_user_id) = &self.assigned_user_id {
            fields.assigned_user_id = assigned_user_id.clone();
        }
        if let Some(status) = self.status {
            fields.status = status;
        }
    }

    /// Patch that restores every field of `fields`.
    pub fn from_fields(fields: &TaskFields) -> Self {
        Self {
            title: Some(fields.title.clone()),
            description: Some(fields.description.clone()),
            assigned_user_id: Some(fields.assigned_user_id.clone()),
            status: Some(fields.status),
        }
    }
}

fn require_non_blank(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(TaskError::Validation(format!("{} is required", field)));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_wire_shape() {
        let json = r#"{"id":"abc","task":{"title":"A","description":"d","assigned_user_id":"u1","status":"in_progress"}}"#;
        let record: TaskRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.id, "abc");
        assert_eq!(record.task.status, TaskStatus::InProgress);
        assert_eq!(record.task.assigned_user_id, "u1");
    }

    #[test]
    fn test_unknown_status_is_tolerated() {
        let json = r#"{"id":"x","task":{"title":"A","description":"d","status":"blocked"}}"#;
        let record: TaskRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.task.status, TaskStatus::Unrecognized);
        assert!(!record.task.status.is_known());
        assert_eq!(record.task.assigned_user_id, "");
    }

    #[test]
    fn test_status_defaults_to_to_do() {
        let json = r#"{"title":"A","description":"d","assigned_user_id":""}"#;
        let fields: TaskFields = serde_json::from_str(json).unwrap();
        assert_eq!(fields.status, TaskStatus::ToDo);
    }

    #[test]
    fn test_status_from_str() {
        assert_eq!("to_do".parse::<TaskStatus>().unwrap(), TaskStatus::ToDo);
        assert_eq!(
            "IN_PROGRESS".parse::<TaskStatus>().unwrap(),
            TaskStatus::InProgress
        );
        assert_eq!("done".parse::<TaskStatus>().unwrap(), TaskStatus::Done);
        assert!("unrecognized".parse::<TaskStatus>().is_err());
        assert!("".parse::<TaskStatus>().is_err());
    }

    #[test]
    fn test_new_task_validation() {
        assert!(NewTask::new("A", "d").validate().is_ok());
        assert!(matches!(
            NewTask::new("  ", "d").validate(),
            Err(TaskError::Validation(msg)) if msg.contains("title")
        ));
        assert!(matches!(
            NewTask::new("A", "").validate(),
            Err(TaskError::Validation(msg)) if msg.contains("description")
        ));
    }

    #[test]
    fn test_new_task_omits_unset_status() {
        let body = serde_json::to_value(NewTask::new("A", "d")).unwrap();
        assert!(body.get("status").is_none());
        let body = serde_json::to_value(NewTask::new("A", "d").with_status(TaskStatus::Done)).unwrap();
        assert_eq!(body["status"], "done");
    }

    #[test]
    fn test_patch_apply_and_validate() {
        let mut fields = NewTask::new("A", "d").into_fields();
        let patch = TaskPatch {
            status: Some(TaskStatus::Done),
            ..TaskPatch::default()
        };
        assert!(patch.validate().is_ok());
        patch.apply_to(&mut fields);
        assert_eq!(fields.status, TaskStatus::Done);
        assert_eq!(fields.title, "A");

        let blank = TaskPatch {
            title: Some(String::new()),
            ..TaskPatch::default()
        };
        assert!(blank.validate().is_err());
        assert!(TaskPatch::default().is_empty());
        assert_eq!(serde_json::to_string(&TaskPatch::default()).unwrap(), "{}");
    }
}
