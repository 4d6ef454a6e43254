//! Metrics shared by the master and slave services.

use metrics::{counter, gauge, histogram, Counter, Gauge, Histogram};
use tracing::debug;

/// Handles to the process-wide metrics. Without an installed recorder every
/// call is a no-op.
#[derive(Clone)]
pub struct RunnerMetrics {
    tasks_assigned_total: Counter,
    assignments_rejected_total: Counter,
    tasks_finished_total: Counter,
    status_updates_total: Counter,
    active_slaves: Gauge,
    jobs_executed_total: Counter,
    jobs_failed_total: Counter,
    job_duration: Histogram,
    report_failures_total: Counter,
}

impl RunnerMetrics {
    pub fn new() -> Self {
        Self {
            tasks_assigned_total: counter!("conveyor_tasks_assigned_total"),
            assignments_rejected_total: counter!("conveyor_assignments_rejected_total"),
            tasks_finished_total: counter!("conveyor_tasks_finished_total"),
            status_updates_total: counter!("conveyor_status_updates_total"),
            active_slaves: gauge!("conveyor_active_slaves"),
            jobs_executed_total: counter!("conveyor_jobs_executed_total"),
            jobs_failed_total: counter!("conveyor_jobs_failed_total"),
            job_duration: histogram!("conveyor_job_duration_seconds"),
            report_failures_total: counter!("conveyor_report_failures_total"),
        }
    }

    pub fn record_task_assigned(&self, slave_id: &str) {
        self.tasks_assigned_total.increment(1);
        debug!(slave_id = slave_id, "Task assignment recorded");
    }

    pub fn record_assignment_rejected(&self) {
        self.assignments_rejected_total.increment(1);
    }

    pub fn record_task_finished(&self) {
        self.tasks_finished_total.increment(1);
    }

    pub fn record_status_update(&self) {
        self.status_updates_total.increment(1);
    }

    pub fn set_active_slaves(&self, count: usize) {
        self.active_slaves.set(count as f64);
    }

    pub fn record_job_executed(&self, succeeded: bool, duration_seconds: f64) {
        self.jobs_executed_total.increment(1);
        if !succeeded {
            self.jobs_failed_total.increment(1);
        }
        self.job_duration.record(duration_seconds);
    }

    pub fn record_report_failure(&self) {
        self.report_failures_total.increment(1);
    }
}

impl Default for RunnerMetrics {
    fn default() -> Self {
        Self::new()
    }
}
