use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tracing::{debug, error, info};

use conveyor_domain::Slave;
use conveyor_errors::SchedulerResult;
use conveyor_infrastructure::{ServiceKind, ServiceRegistry};

use crate::monitor::Monitor;

/// Slave liveness sweep configuration
#[derive(Debug, Clone)]
pub struct SlaveWatcherConfig {
    /// 轮询间隔
    pub poll_interval: Duration,
}

impl Default for SlaveWatcherConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(15),
        }
    }
}

/// Keeps the monitor's slave list in line with the registry's healthy set.
pub struct SlaveWatcher {
    registry: Arc<dyn ServiceRegistry>,
    monitor: Arc<Monitor>,
    config: SlaveWatcherConfig,
}

/// Result of one sweep.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub registered: usize,
    pub removed: Vec<String>,
}

impl SlaveWatcher {
    pub fn new(
        registry: Arc<dyn ServiceRegistry>,
        monitor: Arc<Monitor>,
        config: SlaveWatcherConfig,
    ) -> Self {
        Self {
            registry,
            monitor,
            config,
        }
    }

    /// Registers newly seen healthy slaves and drops the vanished ones.
    /// On registry failure nothing is changed.
    pub async fn sync_once(&self) -> SchedulerResult<SyncReport> {
        let entries = self.registry.healthy_instances(ServiceKind::Slave).await?;

        let mut report = SyncReport::default();
        let mut healthy = HashSet::with_capacity(entries.len());
        for entry in entries {
            healthy.insert(entry.id.clone());
            let slave = Slave::new(entry.id, entry.address, entry.port);
            if self.monitor.register_or_ignore(slave).await {
                report.registered += 1;
            }
        }
        report.removed = self.monitor.reconcile(&healthy).await;

        debug!(
            healthy = healthy.len(),
            registered = report.registered,
            removed = report.removed.len(),
            "Slave registry synchronized"
        );
        Ok(report)
    }

    pub async fn run(&self, mut shutdown_rx: broadcast::Receiver<()>) {
        info!("启动Slave存活检测循环，间隔 {:?}", self.config.poll_interval);
        let mut interval = tokio::time::interval(self.config.poll_interval);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if let Err(e) = self.sync_once().await {
                        error!("同步Slave列表失败: {e}");
                    }
                }
                _ = shutdown_rx.recv() => {
                    info!("收到停止信号，退出Slave存活检测循环");
                    break;
                }
            }
        }
    }
}
