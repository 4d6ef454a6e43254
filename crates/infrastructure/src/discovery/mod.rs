//! Service discovery for masters and slaves.
//!
//! Every process registers itself under a service name derived from its
//! role, and the master polls the registry for the set of healthy slaves.

mod consul;
mod static_registry;

pub use consul::ConsulRegistry;
pub use static_registry::StaticRegistry;

use async_trait::async_trait;
use conveyor_errors::{SchedulerError, SchedulerResult};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ServiceKind {
    Master,
    Slave,
}

impl ServiceKind {
    pub fn service_name(self) -> &'static str {
        match self {
            ServiceKind::Master => "master-executor",
            ServiceKind::Slave => "slave-executor",
        }
    }

    pub fn tag(self) -> &'static str {
        match self {
            ServiceKind::Master => "master",
            ServiceKind::Slave => "slave",
        }
    }

    /// A fresh instance ID such as `slave-executor#<uuid>`.
    pub fn new_instance_id(self) -> String {
        format!("{}#{}", self.service_name(), uuid::Uuid::new_v4())
    }
}

/// One healthy instance reported by the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceEntry {
    pub id: String,
    pub address: String,
    pub port: u16,
}

impl ServiceEntry {
    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.address, self.port)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceRegistration {
    pub id: String,
    pub kind: ServiceKind,
    pub address: String,
    pub port: u16,
}

impl ServiceRegistration {
    pub fn new(kind: ServiceKind, address: impl Into<String>, port: u16) -> Self {
        Self {
            id: kind.new_instance_id(),
            kind,
            address: address.into(),
            port,
        }
    }

    pub fn health_url(&self) -> String {
        format!("http://{}:{}/health", self.address, self.port)
    }
}

#[async_trait]
pub trait ServiceRegistry: Send + Sync {
    async fn register(&self, registration: &ServiceRegistration) -> SchedulerResult<()>;

    async fn deregister(&self, service_id: &str) -> SchedulerResult<()>;

    async fn healthy_instances(&self, kind: ServiceKind) -> SchedulerResult<Vec<ServiceEntry>>;

    /// `host:port` of the first healthy master.
    async fn master_address(&self) -> SchedulerResult<String> {
        self.healthy_instances(ServiceKind::Master)
            .await?
            .first()
            .map(ServiceEntry::endpoint)
            .ok_or_else(|| SchedulerError::discovery_error("no healthy master registered"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instance_ids_are_prefixed_and_unique() {
        let a = ServiceKind::Slave.new_instance_id();
        let b = ServiceKind::Slave.new_instance_id();
        assert!(a.starts_with("slave-executor#"));
        assert_ne!(a, b);
        assert!(ServiceKind::Master
            .new_instance_id()
            .starts_with("master-executor#"));
    }

    #[test]
    fn test_registration_health_url() {
        let registration = ServiceRegistration::new(ServiceKind::Slave, "10.0.0.2", 8081);
        assert_eq!(registration.health_url(), "http://10.0.0.2:8081/health");
        assert_eq!(registration.kind.tag(), "slave");
    }
}
