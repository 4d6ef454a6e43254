use axum::{
    extract::{Path, State},
    response::IntoResponse,
};
use serde::Serialize;
use tracing::{info, warn};

use conveyor_dispatcher::{Assignment, UpdateOutcome};
use conveyor_domain::{ChangeStatusJob, ChangeStatusTask, JobStatus, PortalTask, TaskConfig};

use crate::{
    error::ApiResult,
    extract::JsonBody,
    response::{success, success_with_message},
    routes::MasterState,
};

/// 任务受理结果
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskAccepted {
    #[serde(rename = "taskID")]
    pub task_id: String,
    pub slave_id: String,
    pub slave_address: String,
}

impl From<Assignment> for TaskAccepted {
    fn from(assignment: Assignment) -> Self {
        Self {
            task_id: assignment.task_id,
            slave_id: assignment.slave_id,
            slave_address: assignment.endpoint,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct StatusUpdateResult {
    pub outcome: &'static str,
}

impl From<UpdateOutcome> for StatusUpdateResult {
    fn from(outcome: UpdateOutcome) -> Self {
        let outcome = match outcome {
            UpdateOutcome::Applied => "applied",
            UpdateOutcome::Completed => "completed",
            UpdateOutcome::Ignored => "ignored",
        };
        Self { outcome }
    }
}

/// 提交任务
pub async fn submit_task(
    State(state): State<MasterState>,
    JsonBody(config): JsonBody<TaskConfig>,
) -> ApiResult<impl IntoResponse> {
    let assignment = state.controller.submit(config).await?;
    Ok(success_with_message(
        TaskAccepted::from(assignment),
        "task accepted",
    ))
}

/// 提交门户格式任务
pub async fn submit_portal_task(
    State(state): State<MasterState>,
    JsonBody(portal): JsonBody<PortalTask>,
) -> ApiResult<impl IntoResponse> {
    let config = portal.into_task_config();
    info!(task_id = %config.task_id, stages = ?config.stages, "Portal task converted");
    let assignment = state.controller.submit(config).await?;
    Ok(success_with_message(
        TaskAccepted::from(assignment),
        "task accepted",
    ))
}

/// 更新任务状态
pub async fn update_task_status(
    State(state): State<MasterState>,
    Path(task_id): Path<String>,
    JsonBody(change): JsonBody<ChangeStatusTask>,
) -> ApiResult<impl IntoResponse> {
    if change.task_id != task_id {
        warn!(path_id = %task_id, body_id = %change.task_id, "Task ID in body differs from path");
    }
    let outcome = state
        .controller
        .monitor()
        .apply_task_status(&task_id, change.new_status, &change.stage)
        .await?;
    Ok(success(StatusUpdateResult::from(outcome)))
}

/// 获取任务状态
pub async fn get_task_status(
    State(state): State<MasterState>,
    Path(task_id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let task = state.controller.monitor().lookup(&task_id).await?;
    Ok(success(task))
}

/// 更新作业状态
pub async fn update_job_status(
    State(state): State<MasterState>,
    Path((task_id, job_name)): Path<(String, String)>,
    JsonBody(change): JsonBody<ChangeStatusJob>,
) -> ApiResult<impl IntoResponse> {
    let outcome = state
        .controller
        .monitor()
        .apply_job_status(&task_id, JobStatus::new(job_name, change.new_status))
        .await?;
    Ok(success(StatusUpdateResult::from(outcome)))
}
