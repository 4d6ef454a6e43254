use thiserror::Error;

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("task not found: {id}")]
    TaskNotFound { id: String },
    #[error("task is already active: {id}")]
    TaskAlreadyActive { id: String },
    #[error("no executors available")]
    NoExecutorsAvailable,
    #[error("all executors are at capacity ({limit} tasks per slave)")]
    SlavesAtCapacity { limit: usize },
    #[error("missing task configuration")]
    MissingConfiguration,
    #[error("invalid task configuration: {0}")]
    InvalidTaskConfig(String),
    #[error("invalid status value: {0}")]
    InvalidStatus(i64),
    #[error("sandbox error: {0}")]
    Sandbox(String),
    #[error("job timed out after {timeout_ms} ms")]
    ExecutionTimeout { timeout_ms: u64 },
    #[error("service discovery error: {0}")]
    Discovery(String),
    #[error("artifact not found: {path}")]
    ArtifactNotFound { path: String },
    #[error("invalid path segment: {0}")]
    InvalidPath(String),
    #[error("storage error: {0}")]
    Storage(String),
    #[error("serialization error: {0}")]
    Serialization(String),
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("internal error: {0}")]
    Internal(String),
}

pub type SchedulerResult<T> = Result<T, SchedulerError>;

impl SchedulerError {
    pub fn task_not_found<S: Into<String>>(id: S) -> Self {
        Self::TaskNotFound { id: id.into() }
    }
    pub fn invalid_config<S: Into<String>>(msg: S) -> Self {
        Self::InvalidTaskConfig(msg.into())
    }
    pub fn config_error<S: Into<String>>(msg: S) -> Self {
        Self::Configuration(msg.into())
    }
    pub fn sandbox_error<S: Into<String>>(msg: S) -> Self {
        Self::Sandbox(msg.into())
    }
    pub fn discovery_error<S: Into<String>>(msg: S) -> Self {
        Self::Discovery(msg.into())
    }
    pub fn storage_error<S: Into<String>>(msg: S) -> Self {
        Self::Storage(msg.into())
    }

    /// Errors the caller caused by sending a bad request.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            SchedulerError::MissingConfiguration
                | SchedulerError::InvalidTaskConfig(_)
                | SchedulerError::InvalidStatus(_)
                | SchedulerError::TaskAlreadyActive { .. }
                | SchedulerError::InvalidPath(_)
                | SchedulerError::Serialization(_)
        )
    }

    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SchedulerError::Network(_) | SchedulerError::Discovery(_)
        )
    }
}

impl From<serde_json::Error> for SchedulerError {
    fn from(err: serde_json::Error) -> Self {
        SchedulerError::Serialization(err.to_string())
    }
}

impl From<std::io::Error> for SchedulerError {
    fn from(err: std::io::Error) -> Self {
        SchedulerError::Storage(err.to_string())
    }
}

impl From<anyhow::Error> for SchedulerError {
    fn from(err: anyhow::Error) -> Self {
        SchedulerError::Internal(err.to_string())
    }
}
