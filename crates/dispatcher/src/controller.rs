use std::sync::Arc;

use tracing::{info, warn};

use conveyor_domain::TaskConfig;
use conveyor_errors::SchedulerResult;

use crate::monitor::{Assignment, Monitor};
use crate::slave_client::TaskForwarder;

/// Accepts tasks on the master: validates, assigns, then forwards without
/// waiting for the slave.
pub struct TaskController {
    monitor: Arc<Monitor>,
    forwarder: Arc<dyn TaskForwarder>,
}

impl TaskController {
    pub fn new(monitor: Arc<Monitor>, forwarder: Arc<dyn TaskForwarder>) -> Self {
        Self { monitor, forwarder }
    }

    pub fn monitor(&self) -> &Arc<Monitor> {
        &self.monitor
    }

    pub async fn submit(&self, config: TaskConfig) -> SchedulerResult<Assignment> {
        config.validate()?;
        let assignment = self.monitor.assign(&config).await?;

        let forwarder = Arc::clone(&self.forwarder);
        let endpoint = assignment.endpoint.clone();
        tokio::spawn(async move {
            if let Err(e) = forwarder.forward(&endpoint, &config).await {
                // the task stays QUEUED; the submitter learns only by polling
                warn!(task_id = %config.task_id, endpoint = %endpoint, error = %e, "Forwarding task failed");
            }
        });

        info!(
            task_id = %assignment.task_id,
            slave_id = %assignment.slave_id,
            "Task accepted"
        );
        Ok(assignment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategies::RoundRobinStrategy;
    use crate::test_utils::{create_test_config, create_test_slave};
    use async_trait::async_trait;
    use conveyor_errors::SchedulerError;
    use conveyor_infrastructure::RunnerMetrics;
    use tokio::sync::mpsc;

    struct ChannelForwarder(mpsc::UnboundedSender<(String, TaskConfig)>);

    #[async_trait]
    impl TaskForwarder for ChannelForwarder {
        async fn forward(&self, endpoint: &str, config: &TaskConfig) -> SchedulerResult<()> {
            let _ = self.0.send((endpoint.to_string(), config.clone()));
            Ok(())
        }
    }

    fn controller() -> (TaskController, mpsc::UnboundedReceiver<(String, TaskConfig)>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let monitor = Arc::new(Monitor::new(
            Box::new(RoundRobinStrategy::new()),
            RunnerMetrics::new(),
        ));
        (TaskController::new(monitor, Arc::new(ChannelForwarder(tx))), rx)
    }

    #[tokio::test]
    async fn test_submit_forwards_to_assigned_slave() {
        let (controller, mut rx) = controller();
        controller
            .monitor()
            .register_or_ignore(create_test_slave(0))
            .await;

        let assignment = controller.submit(create_test_config("t1")).await.unwrap();
        let (endpoint, config) = rx.recv().await.unwrap();

        assert_eq!(endpoint, assignment.endpoint);
        assert_eq!(config.task_id, "t1");
    }

    #[tokio::test]
    async fn test_submit_invalid_config_creates_nothing() {
        let (controller, mut rx) = controller();
        controller
            .monitor()
            .register_or_ignore(create_test_slave(0))
            .await;

        let mut config = create_test_config("");
        config.task_id.clear();
        assert!(matches!(
            controller.submit(config).await,
            Err(SchedulerError::InvalidTaskConfig(_))
        ));
        assert!(controller.monitor().active_task_ids().await.is_empty());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_submit_without_slaves() {
        let (controller, mut rx) = controller();
        assert!(matches!(
            controller.submit(create_test_config("t1")).await,
            Err(SchedulerError::NoExecutorsAvailable)
        ));
        assert!(rx.try_recv().is_err());
    }
}
