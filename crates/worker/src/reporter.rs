//! Slave to master status reporting.
//!
//! The pipeline hands events to a [`StatusSink`] and never waits for the
//! network. [`StatusReporter`] queues them and a background dispatcher
//! delivers them in emission order through a [`MasterTransport`], retrying
//! a bounded number of times before dropping an event.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use conveyor_config::ReportingConfig;
use conveyor_domain::{ChangeStatusJob, ChangeStatusTask, JobLogs, Reports, TaskStatus};
use conveyor_errors::{SchedulerError, SchedulerResult};
use conveyor_infrastructure::{RunnerMetrics, ServiceRegistry};

#[derive(Debug, Clone, PartialEq)]
pub enum StatusEvent {
    TaskStatus(ChangeStatusTask),
    JobStatus(ChangeStatusJob),
    Logs {
        task_id: String,
        stage: String,
        job: String,
        logs: JobLogs,
    },
    Reports {
        task_id: String,
        job: String,
        reports: Reports,
    },
}

impl StatusEvent {
    pub fn task_status(task_id: &str, status: TaskStatus, stage: &str) -> Self {
        StatusEvent::TaskStatus(ChangeStatusTask {
            task_id: task_id.to_string(),
            new_status: status,
            stage: stage.to_string(),
        })
    }

    pub fn job_status(task_id: &str, job: &str, status: TaskStatus) -> Self {
        StatusEvent::JobStatus(ChangeStatusJob {
            task_id: task_id.to_string(),
            new_status: status,
            job: job.to_string(),
        })
    }

    pub fn task_id(&self) -> &str {
        match self {
            StatusEvent::TaskStatus(change) => &change.task_id,
            StatusEvent::JobStatus(change) => &change.task_id,
            StatusEvent::Logs { task_id, .. } | StatusEvent::Reports { task_id, .. } => task_id,
        }
    }

    /// Master route the event is posted to.
    pub fn path(&self) -> String {
        match self {
            StatusEvent::TaskStatus(change) => format!("/task/{}/status", change.task_id),
            StatusEvent::JobStatus(change) => {
                format!("/task/{}/status/{}", change.task_id, change.job)
            }
            StatusEvent::Logs {
                task_id,
                stage,
                job,
                ..
            } => format!("/task/{task_id}/log/{stage}/{job}"),
            StatusEvent::Reports { task_id, job, .. } => format!("/task/{task_id}/reports/{job}"),
        }
    }

    pub fn body(&self) -> SchedulerResult<serde_json::Value> {
        let value = match self {
            StatusEvent::TaskStatus(change) => serde_json::to_value(change)?,
            StatusEvent::JobStatus(change) => serde_json::to_value(change)?,
            StatusEvent::Logs { logs, .. } => serde_json::to_value(logs)?,
            StatusEvent::Reports { reports, .. } => serde_json::to_value(reports)?,
        };
        Ok(value)
    }
}

/// One-way outlet for status events.
pub trait StatusSink: Send + Sync {
    fn send(&self, event: StatusEvent);
}

/// Delivers a single event to the master.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MasterTransport: Send + Sync {
    async fn deliver(&self, event: &StatusEvent) -> SchedulerResult<()>;
}

/// HTTP transport that looks the master up in the registry on every push.
pub struct MasterClient {
    registry: Arc<dyn ServiceRegistry>,
    http_client: reqwest::Client,
}

impl MasterClient {
    pub fn new(registry: Arc<dyn ServiceRegistry>, timeout: Duration) -> SchedulerResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SchedulerError::Network(format!("failed to build http client: {e}")))?;
        Ok(Self {
            registry,
            http_client,
        })
    }
}

#[async_trait]
impl MasterTransport for MasterClient {
    async fn deliver(&self, event: &StatusEvent) -> SchedulerResult<()> {
        let master = self.registry.master_address().await?;
        let url = format!("http://{master}{}", event.path());

        let response = self
            .http_client
            .post(&url)
            .json(&event.body()?)
            .send()
            .await
            .map_err(|e| SchedulerError::Network(format!("failed to reach master {master}: {e}")))?;

        let status = response.status();
        if status.is_success() {
            debug!(url = %url, "Status event delivered");
            Ok(())
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(SchedulerError::Network(format!(
                "master rejected {url}: HTTP {status} - {body}"
            )))
        }
    }
}

/// Queue in front of the background dispatcher. Cloning shares the queue.
#[derive(Clone)]
pub struct StatusReporter {
    tx: mpsc::UnboundedSender<StatusEvent>,
}

impl StatusReporter {
    /// Starts the dispatcher. It exits after every reporter clone is dropped
    /// and the queue is drained.
    pub fn spawn(
        transport: Arc<dyn MasterTransport>,
        config: &ReportingConfig,
        metrics: RunnerMetrics,
    ) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let dispatcher = Dispatcher {
            transport,
            max_attempts: config.max_attempts.max(1),
            backoff: Duration::from_millis(config.retry_backoff_ms),
            metrics,
        };
        let handle = tokio::spawn(dispatcher.run(rx));
        (Self { tx }, handle)
    }
}

impl StatusSink for StatusReporter {
    fn send(&self, event: StatusEvent) {
        if let Err(e) = self.tx.send(event) {
            warn!(task_id = %e.0.task_id(), "Status dispatcher stopped, event dropped");
        }
    }
}

struct Dispatcher {
    transport: Arc<dyn MasterTransport>,
    max_attempts: usize,
    backoff: Duration,
    metrics: RunnerMetrics,
}

impl Dispatcher {
    async fn run(self, mut rx: mpsc::UnboundedReceiver<StatusEvent>) {
        while let Some(event) = rx.recv().await {
            self.deliver_with_retry(&event).await;
        }
        debug!("Status dispatcher finished");
    }

    async fn deliver_with_retry(&self, event: &StatusEvent) {
        for attempt in 1..=self.max_attempts {
            match self.transport.deliver(event).await {
                Ok(()) => return,
                Err(e) if attempt < self.max_attempts => {
                    let delay = self.delay_for(attempt);
                    warn!(
                        task_id = %event.task_id(),
                        path = %event.path(),
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Status push failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    self.metrics.record_report_failure();
                    error!(
                        task_id = %event.task_id(),
                        path = %event.path(),
                        attempts = self.max_attempts,
                        error = %e,
                        "Status push failed, event dropped"
                    );
                }
            }
        }
    }

    /// Exponential backoff with up to 50% random jitter.
    fn delay_for(&self, attempt: usize) -> Duration {
        let base = self.backoff.as_millis() as u64;
        let exp = base.saturating_mul(1u64 << (attempt - 1).min(16));
        let jitter = if base > 0 {
            rand::rng().random_range(0..=base / 2)
        } else {
            0
        };
        Duration::from_millis(exp.saturating_add(jitter))
    }
}
