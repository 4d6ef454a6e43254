use axum::{
    extract::{Path, State},
    http::header,
    response::IntoResponse,
};

use conveyor_domain::{JobLogs, Reports};

use crate::{
    error::ApiResult,
    extract::JsonBody,
    response::{acknowledged, success},
    routes::MasterState,
};

pub async fn save_job_logs(
    State(state): State<MasterState>,
    Path((task_id, stage, job)): Path<(String, String, String)>,
    JsonBody(logs): JsonBody<JobLogs>,
) -> ApiResult<impl IntoResponse> {
    state.store.save_logs(&task_id, &stage, &job, &logs).await?;
    Ok(acknowledged("logs saved"))
}

pub async fn task_logs(
    State(state): State<MasterState>,
    Path(task_id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let text = state.store.merged_logs(&task_id, None, None).await?;
    Ok(plain_text(text))
}

pub async fn stage_logs(
    State(state): State<MasterState>,
    Path((task_id, stage)): Path<(String, String)>,
) -> ApiResult<impl IntoResponse> {
    let text = state.store.merged_logs(&task_id, Some(&stage), None).await?;
    Ok(plain_text(text))
}

pub async fn job_logs(
    State(state): State<MasterState>,
    Path((task_id, stage, job)): Path<(String, String, String)>,
) -> ApiResult<impl IntoResponse> {
    let text = state
        .store
        .merged_logs(&task_id, Some(&stage), Some(&job))
        .await?;
    Ok(plain_text(text))
}

pub async fn save_job_reports(
    State(state): State<MasterState>,
    Path((task_id, job)): Path<(String, String)>,
    JsonBody(reports): JsonBody<Reports>,
) -> ApiResult<impl IntoResponse> {
    state.store.save_reports(&task_id, &job, &reports).await?;
    Ok(acknowledged("reports saved"))
}

pub async fn job_reports(
    State(state): State<MasterState>,
    Path((task_id, job)): Path<(String, String)>,
) -> ApiResult<impl IntoResponse> {
    let reports = state.store.load_reports(&task_id, &job).await?;
    Ok(success(reports))
}

pub async fn task_reports(
    State(state): State<MasterState>,
    Path(task_id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let reports = state.store.merged_reports(&task_id).await?;
    Ok(success(reports))
}

fn plain_text(text: String) -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "text/plain; charset=utf-8")], text)
}
