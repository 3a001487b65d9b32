use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TaskError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Remote call failed ({status}): {message}")]
    RemoteCall { status: u16, message: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Notification transport error: {0}")]
    Transport(String),

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("Task not found: {0}")]
    TaskNotFound(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    JsonError(#[from] serde_json::Error),
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

impl TaskError {
    /// True for failures of the remote task service, whether the service
    /// answered with a non-success status or could not be reached at all.
    pub fn is_remote_failure(&self) -> bool {
        matches!(self, TaskError::RemoteCall { .. } | TaskError::Http(_))
    }

    pub fn to_error_code(&self) -> &'static str {
        match self {
            TaskError::Validation(_) => "VALIDATION_ERROR",
            TaskError::RemoteCall { .. } | TaskError::Http(_) => "REMOTE_CALL_FAILED",
            TaskError::Transport(_) => "TRANSPORT_ERROR",
            TaskError::InvalidOperation(_) => "INVALID_OPERATION",
            TaskError::TaskNotFound(_) => "TASK_NOT_FOUND",
            TaskError::Config(_) => "INVALID_CONFIG",
            _ => "INTERNAL_ERROR",
        }
    }

    pub fn to_error_response(&self) -> ErrorResponse {
        ErrorResponse {
            error: self.to_string(),
            code: self.to_error_code().to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, TaskError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(
            TaskError::Validation("title".into()).to_error_code(),
            "VALIDATION_ERROR"
        );
        assert_eq!(
            TaskError::RemoteCall {
                status: 500,
                message: "DB exception".into()
            }
            .to_error_code(),
            "REMOTE_CALL_FAILED"
        );
        assert_eq!(
            TaskError::InvalidOperation("undecorate".into()).to_error_code(),
            "INVALID_OPERATION"
        );
        assert_eq!(
            TaskError::IoError(std::io::Error::other("boom")).to_error_code(),
            "INTERNAL_ERROR"
        );
    }

    #[test]
    fn test_error_response_carries_message() {
        let err = TaskError::RemoteCall {
            status: 404,
            message: "Task not found".into(),
        };
        let response = err.to_error_response();
        assert_eq!(response.code, "REMOTE_CALL_FAILED");
        assert!(response.error.contains("404"));
        assert!(response.error.contains("Task not found"));
        assert!(err.is_remote_failure());
        assert!(!TaskError::Transport("closed".into()).is_remote_failure());
    }
}
