pub mod discovery;
pub mod observability;
pub mod storage;

pub use discovery::{
    ConsulRegistry, ServiceEntry, ServiceKind, ServiceRegistration, ServiceRegistry,
    StaticRegistry,
};
pub use observability::RunnerMetrics;
pub use storage::{ArtifactStore, FileArtifactStore};

use std::sync::Arc;

use conveyor_config::{DiscoveryBackend, DiscoveryConfig};
use conveyor_errors::SchedulerResult;

/// Builds the registry selected by `discovery.backend`.
pub fn create_registry(config: &DiscoveryConfig) -> SchedulerResult<Arc<dyn ServiceRegistry>> {
    Ok(match config.backend {
        DiscoveryBackend::Consul => Arc::new(ConsulRegistry::new(config)?),
        DiscoveryBackend::Static => Arc::new(StaticRegistry::from_config(config)?),
    })
}
