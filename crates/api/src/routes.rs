use axum::{
    routing::{get, post},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use conveyor_dispatcher::TaskController;
use conveyor_infrastructure::ArtifactStore;
use conveyor_worker::IntakePool;

use crate::handlers::{
    artifacts::{
        job_logs, job_reports, save_job_logs, save_job_reports, stage_logs, task_logs,
        task_reports,
    },
    health::health_check,
    metrics::render_metrics,
    slave::accept_task,
    tasks::{
        get_task_status, submit_portal_task, submit_task, update_job_status, update_task_status,
    },
    workers::get_workers_status,
};

/// Master应用状态
#[derive(Clone)]
pub struct MasterState {
    pub controller: Arc<TaskController>,
    pub store: Arc<dyn ArtifactStore>,
    pub metrics_handle: Option<PrometheusHandle>,
}

/// Slave应用状态
#[derive(Clone)]
pub struct SlaveState {
    pub pool: Arc<IntakePool>,
}

/// 创建Master路由
pub fn create_master_routes(state: MasterState, metrics_endpoint: &str) -> Router {
    let mut router = Router::new()
        .route("/health", get(health_check))
        // 任务受理
        .route("/task", post(submit_task))
        .route("/portal/task", post(submit_portal_task))
        // 状态上报与查询
        .route(
            "/task/{task_id}/status",
            get(get_task_status).post(update_task_status),
        )
        .route("/task/{task_id}/status/{job_name}", post(update_job_status))
        // 日志
        .route("/task/{task_id}/log", get(task_logs))
        .route("/task/{task_id}/log/{stage}", get(stage_logs))
        .route(
            "/task/{task_id}/log/{stage}/{job}",
            get(job_logs).post(save_job_logs),
        )
        // 报告
        .route("/task/{task_id}/reports", get(task_reports))
        .route(
            "/task/{task_id}/reports/{job}",
            get(job_reports).post(save_job_reports),
        )
        .route("/workers/status", get(get_workers_status));

    if state.metrics_handle.is_some() {
        router = router.route(metrics_endpoint, get(render_metrics));
    }

    router.layer(TraceLayer::new_for_http()).with_state(state)
}

/// 创建Slave路由
pub fn create_slave_routes(state: SlaveState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/task", post(accept_task))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
