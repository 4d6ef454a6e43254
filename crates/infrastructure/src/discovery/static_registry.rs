use async_trait::async_trait;
use conveyor_config::DiscoveryConfig;
use conveyor_errors::{SchedulerError, SchedulerResult};
use tracing::debug;

use super::{ServiceEntry, ServiceKind, ServiceRegistration, ServiceRegistry};

/// Fixed membership taken from configuration. Registration is accepted and
/// ignored.
#[derive(Debug, Clone, Default)]
pub struct StaticRegistry {
    masters: Vec<ServiceEntry>,
    slaves: Vec<ServiceEntry>,
}

impl StaticRegistry {
    pub fn new(masters: Vec<ServiceEntry>, slaves: Vec<ServiceEntry>) -> Self {
        Self { masters, slaves }
    }

    pub fn from_config(config: &DiscoveryConfig) -> SchedulerResult<Self> {
        let masters = config
            .static_master
            .iter()
            .map(|endpoint| parse_entry(ServiceKind::Master, endpoint))
            .collect::<SchedulerResult<Vec<_>>>()?;
        let slaves = config
            .static_slaves
            .iter()
            .map(|endpoint| parse_entry(ServiceKind::Slave, endpoint))
            .collect::<SchedulerResult<Vec<_>>>()?;
        Ok(Self::new(masters, slaves))
    }
}

fn parse_entry(kind: ServiceKind, endpoint: &str) -> SchedulerResult<ServiceEntry> {
    let (address, port) = endpoint
        .rsplit_once(':')
        .and_then(|(address, port)| port.parse::<u16>().ok().map(|port| (address, port)))
        .ok_or_else(|| {
            SchedulerError::config_error(format!("invalid static endpoint: {endpoint}"))
        })?;

    Ok(ServiceEntry {
        id: format!("{}#{}", kind.service_name(), endpoint),
        address: address.to_string(),
        port,
    })
}

#[async_trait]
impl ServiceRegistry for StaticRegistry {
    async fn register(&self, registration: &ServiceRegistration) -> SchedulerResult<()> {
        debug!(service_id = %registration.id, "Static registry ignores registration");
        Ok(())
    }

    async fn deregister(&self, _service_id: &str) -> SchedulerResult<()> {
        Ok(())
    }

    async fn healthy_instances(&self, kind: ServiceKind) -> SchedulerResult<Vec<ServiceEntry>> {
        Ok(match kind {
            ServiceKind::Master => self.masters.clone(),
            ServiceKind::Slave => self.slaves.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use conveyor_config::DiscoveryBackend;

    #[tokio::test]
    async fn test_from_config() {
        let config = DiscoveryConfig {
            backend: DiscoveryBackend::Static,
            static_master: Some("10.0.0.1:8080".to_string()),
            static_slaves: vec!["10.0.0.2:8081".to_string(), "10.0.0.3:8081".to_string()],
            ..DiscoveryConfig::default()
        };
        let registry = StaticRegistry::from_config(&config).unwrap();

        assert_eq!(registry.master_address().await.unwrap(), "10.0.0.1:8080");
        let slaves = registry.healthy_instances(ServiceKind::Slave).await.unwrap();
        assert_eq!(slaves.len(), 2);
        assert_eq!(slaves[0].id, "slave-executor#10.0.0.2:8081");
        assert_eq!(slaves[1].address, "10.0.0.3");
    }

    #[test]
    fn test_invalid_endpoint() {
        let config = DiscoveryConfig {
            static_slaves: vec!["10.0.0.2".to_string()],
            ..DiscoveryConfig::default()
        };
        assert!(StaticRegistry::from_config(&config).is_err());
    }

    #[tokio::test]
    async fn test_no_master_configured() {
        let registry = StaticRegistry::default();
        assert!(registry.master_address().await.is_err());
    }
}
