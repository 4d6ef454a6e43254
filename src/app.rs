use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tracing::{error, info, warn};

use conveyor_api::{create_master_routes, create_slave_routes, MasterState, SlaveState};
use conveyor_config::AppConfig;
use conveyor_dispatcher::{
    HttpSlaveClient, Monitor, RoundRobinStrategy, SlaveWatcher, SlaveWatcherConfig,
    TaskController, TaskForwarder,
};
use conveyor_infrastructure::{
    create_registry, ArtifactStore, FileArtifactStore, RunnerMetrics, ServiceKind,
    ServiceRegistration, ServiceRegistry,
};
use conveyor_worker::{
    create_sandbox, IntakePool, MasterClient, MasterTransport, PipelineExecutor, Sandbox,
    StatusReporter, StatusSink,
};

const REPORTER_DRAIN_TIMEOUT: Duration = Duration::from_secs(20);

/// 应用运行模式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppMode {
    /// 受理任务、选择Slave并追踪状态
    Master,
    /// 在沙箱中执行流水线并回报状态
    Slave,
}

/// 主应用程序
pub struct Application {
    config: AppConfig,
    mode: AppMode,
}

impl Application {
    pub fn new(config: AppConfig, mode: AppMode) -> Self {
        Self { config, mode }
    }

    /// 运行应用程序，直到收到关闭信号
    pub async fn run(&self, shutdown_rx: broadcast::Receiver<()>) -> Result<()> {
        info!("启动应用程序，模式: {:?}", self.mode);

        match self.mode {
            AppMode::Master => self.run_master(shutdown_rx).await,
            AppMode::Slave => self.run_slave(shutdown_rx).await,
        }
    }

    /// 运行Master模式
    async fn run_master(&self, shutdown_rx: broadcast::Receiver<()>) -> Result<()> {
        let master = &self.config.master;
        let metrics_handle = self.install_metrics_recorder();
        let metrics = RunnerMetrics::new();

        let strategy = RoundRobinStrategy::with_capacity(master.capacity_limit());
        let monitor = Arc::new(Monitor::new(Box::new(strategy), metrics));
        let forwarder: Arc<dyn TaskForwarder> = Arc::new(
            HttpSlaveClient::new(Duration::from_secs(master.forward_timeout_seconds))
                .context("创建Slave转发客户端失败")?,
        );
        let controller = Arc::new(TaskController::new(Arc::clone(&monitor), forwarder));
        let store: Arc<dyn ArtifactStore> = Arc::new(FileArtifactStore::new(
            &master.logs_dir,
            &master.reports_dir,
        ));

        let registry = create_registry(&self.config.discovery).context("创建服务发现客户端失败")?;
        let registration = ServiceRegistration::new(
            ServiceKind::Master,
            advertise_host(&master.advertise_address),
            master.advertise_port,
        );
        registry
            .register(&registration)
            .await
            .context("注册Master服务失败")?;
        info!("Master已注册: {}", registration.id);

        // Slave存活轮询
        let watcher = SlaveWatcher::new(
            Arc::clone(&registry),
            Arc::clone(&monitor),
            SlaveWatcherConfig {
                poll_interval: Duration::from_secs(master.slave_poll_interval_seconds),
            },
        );
        let watcher_shutdown = shutdown_rx.resubscribe();
        let watcher_handle = tokio::spawn(async move { watcher.run(watcher_shutdown).await });

        let app = create_master_routes(
            MasterState {
                controller,
                store,
                metrics_handle,
            },
            &self.config.observability.metrics_endpoint,
        );

        let served = serve(&master.bind_address, app, shutdown_rx).await;

        if let Err(e) = watcher_handle.await {
            error!("Slave轮询任务异常退出: {e}");
        }
        deregister(registry.as_ref(), &registration).await;

        served?;
        info!("Master已停止");
        Ok(())
    }

    /// 运行Slave模式
    async fn run_slave(&self, shutdown_rx: broadcast::Receiver<()>) -> Result<()> {
        let slave = &self.config.slave;
        let metrics = RunnerMetrics::new();

        let registry = create_registry(&self.config.discovery).context("创建服务发现客户端失败")?;

        let transport: Arc<dyn MasterTransport> = Arc::new(
            MasterClient::new(
                Arc::clone(&registry),
                Duration::from_secs(self.config.reporting.request_timeout_seconds),
            )
            .context("创建Master上报客户端失败")?,
        );
        let (reporter, reporter_handle) =
            StatusReporter::spawn(transport, &self.config.reporting, metrics.clone());

        let sandbox = create_sandbox(&self.config.sandbox);
        info!("沙箱执行器: {}", sandbox.name());
        let sink: Arc<dyn StatusSink> = Arc::new(reporter);
        let executor = Arc::new(PipelineExecutor::new(
            sandbox,
            sink,
            Duration::from_millis(self.config.sandbox.default_timeout_ms),
            metrics,
        ));
        let pool = Arc::new(IntakePool::start(executor, slave.pool_size));

        let registration = ServiceRegistration::new(
            ServiceKind::Slave,
            advertise_host(&slave.advertise_address),
            slave.advertise_port,
        );
        registry
            .register(&registration)
            .await
            .context("注册Slave服务失败")?;
        info!("Slave已注册: {}", registration.id);

        let app = create_slave_routes(SlaveState {
            pool: Arc::clone(&pool),
        });
        let served = serve(&slave.bind_address, app, shutdown_rx).await;

        // 先下线，避免Master继续转发任务
        deregister(registry.as_ref(), &registration).await;

        match Arc::try_unwrap(pool) {
            Ok(pool) => pool.shutdown().await,
            Err(_) => warn!("执行池仍被引用，跳过等待在途任务"),
        }

        // 执行器持有的上报队列随执行池一起释放，等待剩余状态发送完毕
        match tokio::time::timeout(REPORTER_DRAIN_TIMEOUT, reporter_handle).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => error!("状态上报任务异常退出: {e}"),
            Err(_) => warn!("等待状态上报完成超时"),
        }

        served?;
        info!("Slave已停止");
        Ok(())
    }

    fn install_metrics_recorder(&self) -> Option<PrometheusHandle> {
        if !self.config.observability.metrics_enabled {
            return None;
        }
        match PrometheusBuilder::new().install_recorder() {
            Ok(handle) => Some(handle),
            Err(e) => {
                warn!("安装Prometheus指标记录器失败: {e}");
                None
            }
        }
    }
}

/// 绑定地址并提供HTTP服务，收到关闭信号后停止接收新连接
async fn serve(
    bind_address: &str,
    app: axum::Router,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> Result<()> {
    let listener = TcpListener::bind(bind_address)
        .await
        .with_context(|| format!("绑定地址失败: {bind_address}"))?;
    info!("HTTP服务启动在 http://{bind_address}");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown_rx.recv().await;
            info!("HTTP服务收到关闭信号");
        })
        .await
        .context("HTTP服务运行失败")
}

async fn deregister(registry: &dyn ServiceRegistry, registration: &ServiceRegistration) {
    match registry.deregister(&registration.id).await {
        Ok(()) => info!("已从服务发现注销: {}", registration.id),
        Err(e) => warn!("从服务发现注销失败: {e}"),
    }
}

/// 未配置对外地址时使用本机主机名
fn advertise_host(configured: &str) -> String {
    if !configured.is_empty() {
        return configured.to_string();
    }
    match hostname::get() {
        Ok(name) => name.to_string_lossy().into_owned(),
        Err(e) => {
            warn!("获取主机名失败，使用 127.0.0.1: {e}");
            "127.0.0.1".to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_advertise_host_prefers_configured_address() {
        assert_eq!(advertise_host("10.0.0.5"), "10.0.0.5");
        assert!(!advertise_host("").is_empty());
    }
}
