use axum::{extract::State, response::IntoResponse};

use crate::{error::ApiResult, response::success, routes::MasterState};

/// 获取所有Slave及其任务
pub async fn get_workers_status(State(state): State<MasterState>) -> ApiResult<impl IntoResponse> {
    let slaves = state.controller.monitor().slaves_overview().await;
    Ok(success(slaves))
}
