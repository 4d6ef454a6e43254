use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use conveyor_errors::SchedulerError;
use serde_json::json;
use tracing::{error, warn};

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("调度器错误: {0}")]
    Scheduler(#[from] SchedulerError),

    #[error("请求参数错误: {0}")]
    BadRequest(String),

    #[error("未找到资源")]
    NotFound,
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Scheduler(SchedulerError::ArtifactNotFound { .. }) => StatusCode::NOT_FOUND,
            ApiError::Scheduler(e) if e.is_client_error() => StatusCode::BAD_REQUEST,
            ApiError::Scheduler(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound => StatusCode::NOT_FOUND,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            ApiError::Scheduler(e) => match e {
                SchedulerError::TaskNotFound { .. } => "TASK_NOT_FOUND",
                SchedulerError::TaskAlreadyActive { .. } => "TASK_ALREADY_ACTIVE",
                SchedulerError::NoExecutorsAvailable => "NO_EXECUTORS_AVAILABLE",
                SchedulerError::SlavesAtCapacity { .. } => "SLAVES_AT_CAPACITY",
                SchedulerError::MissingConfiguration => "MISSING_CONFIGURATION",
                SchedulerError::InvalidTaskConfig(_) => "INVALID_TASK_CONFIG",
                SchedulerError::InvalidStatus(_) => "INVALID_STATUS",
                SchedulerError::ArtifactNotFound { .. } => "ARTIFACT_NOT_FOUND",
                SchedulerError::InvalidPath(_) => "INVALID_PATH",
                SchedulerError::Serialization(_) => "SERIALIZATION_ERROR",
                SchedulerError::Discovery(_) => "DISCOVERY_ERROR",
                SchedulerError::Storage(_) => "STORAGE_ERROR",
                SchedulerError::Network(_) => "NETWORK_ERROR",
                _ => "INTERNAL_ERROR",
            },
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::NotFound => "NOT_FOUND",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match &self {
            ApiError::Scheduler(e) => e.to_string(),
            other => other.to_string(),
        };

        if status.is_server_error() {
            error!(code = self.code(), "{}", message);
        } else {
            warn!(code = self.code(), status = status.as_u16(), "{}", message);
        }

        let body = Json(json!({
            "success": false,
            "error": {
                "code": self.code(),
                "message": message,
            },
            "timestamp": chrono::Utc::now().to_rfc3339(),
        }));

        (status, body).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
