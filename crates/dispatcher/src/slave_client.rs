use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, error};

use conveyor_domain::TaskConfig;
use conveyor_errors::{SchedulerError, SchedulerResult};

/// Delivers an accepted task to the slave chosen for it.
#[async_trait]
pub trait TaskForwarder: Send + Sync {
    async fn forward(&self, endpoint: &str, config: &TaskConfig) -> SchedulerResult<()>;
}

/// Posts tasks to `http://<endpoint>/task`.
pub struct HttpSlaveClient {
    http_client: reqwest::Client,
}

impl HttpSlaveClient {
    pub fn new(timeout: Duration) -> SchedulerResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SchedulerError::Network(format!("failed to build http client: {e}")))?;
        Ok(Self { http_client })
    }
}

#[async_trait]
impl TaskForwarder for HttpSlaveClient {
    async fn forward(&self, endpoint: &str, config: &TaskConfig) -> SchedulerResult<()> {
        let url = format!("http://{endpoint}/task");

        match self.http_client.post(&url).json(config).send().await {
            Ok(response) => {
                if response.status().is_success() {
                    debug!(task_id = %config.task_id, url = %url, "Task forwarded to slave");
                    Ok(())
                } else {
                    let status = response.status();
                    error!(
                        task_id = %config.task_id,
                        url = %url,
                        status = %status,
                        "Slave rejected task"
                    );
                    Err(SchedulerError::Network(format!(
                        "slave {endpoint} rejected task with status {status}"
                    )))
                }
            }
            Err(e) => {
                error!(task_id = %config.task_id, url = %url, error = %e, "Failed to reach slave");
                Err(SchedulerError::Network(format!(
                    "failed to reach slave {endpoint}: {e}"
                )))
            }
        }
    }
}
