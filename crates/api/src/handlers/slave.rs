use axum::{extract::State, response::IntoResponse};
use tracing::info;

use conveyor_domain::TaskConfig;
use conveyor_errors::SchedulerError;

use crate::{error::ApiResult, extract::JsonBody, response::acknowledged, routes::SlaveState};

/// 接收Master转发的任务，等待执行池空位后入队
pub async fn accept_task(
    State(state): State<SlaveState>,
    JsonBody(config): JsonBody<Option<TaskConfig>>,
) -> ApiResult<impl IntoResponse> {
    let config = config.ok_or(SchedulerError::MissingConfiguration)?;
    let task_id = config.task_id.clone();
    state.pool.submit(config).await?;
    info!(task_id = %task_id, "Task accepted for execution");
    Ok(acknowledged("task queued"))
}
