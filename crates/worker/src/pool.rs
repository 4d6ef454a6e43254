use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use conveyor_domain::TaskConfig;
use conveyor_errors::{SchedulerError, SchedulerResult};

use crate::pipeline::PipelineExecutor;

/// Fixed-size intake for tasks accepted by a slave.
///
/// A bounded queue of `size` slots feeds `size` worker loops. Submitting
/// while every slot is taken waits until one frees up.
pub struct IntakePool {
    tx: mpsc::Sender<TaskConfig>,
    workers: Vec<JoinHandle<()>>,
    size: usize,
}

impl IntakePool {
    pub fn start(executor: Arc<PipelineExecutor>, size: usize) -> Self {
        let size = size.max(1);
        let (tx, rx) = mpsc::channel(size);
        let rx = Arc::new(Mutex::new(rx));

        let workers = (0..size)
            .map(|worker_index| {
                let rx = Arc::clone(&rx);
                let executor = Arc::clone(&executor);
                tokio::spawn(worker_loop(worker_index, rx, executor))
            })
            .collect();

        info!("任务执行池已启动，工作线程数: {}", size);
        Self { tx, workers, size }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub async fn submit(&self, config: TaskConfig) -> SchedulerResult<()> {
        let task_id = config.task_id.clone();
        self.tx
            .send(config)
            .await
            .map_err(|_| SchedulerError::Internal("intake pool is shut down".to_string()))?;
        debug!(task_id = %task_id, "Task queued for execution");
        Ok(())
    }

    /// Stops accepting tasks and waits for queued and running ones.
    pub async fn shutdown(self) {
        drop(self.tx);
        for worker in self.workers {
            if let Err(e) = worker.await {
                error!("执行池工作线程异常退出: {e}");
            }
        }
        info!("任务执行池已停止");
    }
}

async fn worker_loop(
    worker_index: usize,
    rx: Arc<Mutex<mpsc::Receiver<TaskConfig>>>,
    executor: Arc<PipelineExecutor>,
) {
    loop {
        let next = rx.lock().await.recv().await;
        let Some(config) = next else {
            break;
        };

        debug!(worker_index, task_id = %config.task_id, "Worker picked up task");
        match executor.run_pipeline(Some(&config)).await {
            Ok(status) => info!(task_id = %config.task_id, status = %status, "Task pipeline finished"),
            Err(e) => error!(task_id = %config.task_id, error = %e, "Task pipeline aborted"),
        }
    }
    debug!(worker_index, "Worker loop exited");
}
