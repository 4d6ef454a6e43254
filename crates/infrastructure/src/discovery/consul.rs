use std::time::Duration;

use async_trait::async_trait;
use conveyor_config::DiscoveryConfig;
use conveyor_errors::{SchedulerError, SchedulerResult};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::{ServiceEntry, ServiceKind, ServiceRegistration, ServiceRegistry};

/// Registry backed by the Consul agent HTTP API.
pub struct ConsulRegistry {
    base_url: String,
    credentials: Option<(String, String)>,
    check_interval: Duration,
    check_timeout: Duration,
    http_client: reqwest::Client,
}

#[derive(Serialize)]
struct AgentServiceRegistration<'a> {
    #[serde(rename = "ID")]
    id: &'a str,
    #[serde(rename = "Name")]
    name: &'a str,
    #[serde(rename = "Tags")]
    tags: Vec<&'a str>,
    #[serde(rename = "Address")]
    address: &'a str,
    #[serde(rename = "Port")]
    port: u16,
    #[serde(rename = "Check")]
    check: AgentServiceCheck,
}

#[derive(Serialize)]
struct AgentServiceCheck {
    #[serde(rename = "HTTP")]
    http: String,
    #[serde(rename = "Interval")]
    interval: String,
    #[serde(rename = "Timeout")]
    timeout: String,
    #[serde(rename = "DeregisterCriticalServiceAfter")]
    deregister_critical_service_after: String,
}

#[derive(Deserialize)]
struct HealthServiceEntry {
    #[serde(rename = "Node")]
    node: HealthNode,
    #[serde(rename = "Service")]
    service: HealthService,
}

#[derive(Deserialize)]
struct HealthNode {
    #[serde(rename = "Address", default)]
    address: String,
}

#[derive(Deserialize)]
struct HealthService {
    #[serde(rename = "ID")]
    id: String,
    #[serde(rename = "Address", default)]
    address: String,
    #[serde(rename = "Port")]
    port: u16,
}

impl From<HealthServiceEntry> for ServiceEntry {
    fn from(entry: HealthServiceEntry) -> Self {
        // Consul leaves the service address empty when it equals the node's
        let address = if entry.service.address.is_empty() {
            entry.node.address
        } else {
            entry.service.address
        };
        ServiceEntry {
            id: entry.service.id,
            address,
            port: entry.service.port,
        }
    }
}

impl ConsulRegistry {
    pub fn new(config: &DiscoveryConfig) -> SchedulerResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| SchedulerError::discovery_error(format!("consul client: {e}")))?;

        let credentials = match (&config.username, &config.password) {
            (Some(user), Some(password)) => Some((user.clone(), password.clone())),
            _ => None,
        };

        Ok(Self {
            base_url: config.consul_address.trim_end_matches('/').to_string(),
            credentials,
            check_interval: Duration::from_secs(config.health_check_interval_seconds),
            check_timeout: Duration::from_secs(config.health_check_timeout_seconds),
            http_client,
        })
    }

    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let builder = self
            .http_client
            .request(method, format!("{}{}", self.base_url, path));
        match &self.credentials {
            Some((user, password)) => builder.basic_auth(user, Some(password)),
            None => builder,
        }
    }

    async fn send(&self, builder: reqwest::RequestBuilder) -> SchedulerResult<reqwest::Response> {
        let response = builder
            .send()
            .await
            .map_err(|e| SchedulerError::discovery_error(format!("consul request failed: {e}")))?;

        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(SchedulerError::discovery_error(format!(
                "consul responded with {status}: {body}"
            )))
        }
    }
}

#[async_trait]
impl ServiceRegistry for ConsulRegistry {
    async fn register(&self, registration: &ServiceRegistration) -> SchedulerResult<()> {
        let body = AgentServiceRegistration {
            id: &registration.id,
            name: registration.kind.service_name(),
            tags: vec![registration.kind.tag()],
            address: &registration.address,
            port: registration.port,
            check: AgentServiceCheck {
                http: registration.health_url(),
                interval: format!("{}s", self.check_interval.as_secs()),
                timeout: format!("{}s", self.check_timeout.as_secs()),
                deregister_critical_service_after: "1m".to_string(),
            },
        };

        self.send(self.request(Method::PUT, "/v1/agent/service/register").json(&body))
            .await?;

        info!(
            service_id = %registration.id,
            address = %registration.address,
            port = registration.port,
            "Registered service in consul"
        );
        Ok(())
    }

    async fn deregister(&self, service_id: &str) -> SchedulerResult<()> {
        let path = format!("/v1/agent/service/deregister/{service_id}");
        match self.send(self.request(Method::PUT, &path)).await {
            Ok(_) => {
                info!(service_id = %service_id, "Deregistered service from consul");
                Ok(())
            }
            Err(e) => {
                warn!(service_id = %service_id, error = %e, "Failed to deregister service");
                Err(e)
            }
        }
    }

    async fn healthy_instances(&self, kind: ServiceKind) -> SchedulerResult<Vec<ServiceEntry>> {
        let path = format!("/v1/health/service/{}", kind.service_name());
        let response = self
            .send(
                self.request(Method::GET, &path)
                    .query(&[("passing", "true"), ("tag", kind.tag())]),
            )
            .await?;

        let entries: Vec<HealthServiceEntry> = response
            .json()
            .await
            .map_err(|e| SchedulerError::discovery_error(format!("invalid consul response: {e}")))?;

        debug!(service = kind.service_name(), count = entries.len(), "Fetched healthy instances");
        Ok(entries.into_iter().map(ServiceEntry::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        extract::{Path, Query},
        routing::{get, put},
        Json, Router,
    };
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    async fn spawn_fake_consul(registered: Arc<Mutex<Vec<serde_json::Value>>>) -> String {
        let app = Router::new()
            .route(
                "/v1/agent/service/register",
                put(move |Json(body): Json<serde_json::Value>| {
                    let registered = registered.clone();
                    async move {
                        registered.lock().unwrap().push(body);
                    }
                }),
            )
            .route(
                "/v1/health/service/{name}",
                get(
                    |Path(name): Path<String>, Query(query): Query<HashMap<String, String>>| async move {
                        assert_eq!(query.get("passing").map(String::as_str), Some("true"));
                        if name == "slave-executor" {
                            Json(serde_json::json!([
                                {"Node": {"Address": "10.0.0.9"},
                                 "Service": {"ID": "slave-executor#a", "Address": "10.0.0.2", "Port": 8081}},
                                {"Node": {"Address": "10.0.0.3"},
                                 "Service": {"ID": "slave-executor#b", "Address": "", "Port": 8082}}
                            ]))
                        } else {
                            Json(serde_json::json!([]))
                        }
                    },
                ),
            );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn registry(base_url: String) -> ConsulRegistry {
        ConsulRegistry::new(&DiscoveryConfig {
            consul_address: base_url,
            ..DiscoveryConfig::default()
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_register_sends_health_check() {
        let registered = Arc::new(Mutex::new(Vec::new()));
        let registry = registry(spawn_fake_consul(registered.clone()).await);

        let registration = ServiceRegistration::new(ServiceKind::Slave, "10.0.0.2", 8081);
        registry.register(&registration).await.unwrap();

        let bodies = registered.lock().unwrap();
        assert_eq!(bodies.len(), 1);
        assert_eq!(bodies[0]["Name"], "slave-executor");
        assert_eq!(bodies[0]["Tags"][0], "slave");
        assert_eq!(bodies[0]["Check"]["HTTP"], "http://10.0.0.2:8081/health");
        assert_eq!(bodies[0]["Check"]["Interval"], "5s");
        assert_eq!(bodies[0]["Check"]["Timeout"], "3s");
    }

    #[tokio::test]
    async fn test_healthy_instances_fall_back_to_node_address() {
        let registry = registry(spawn_fake_consul(Arc::new(Mutex::new(Vec::new()))).await);

        let slaves = registry.healthy_instances(ServiceKind::Slave).await.unwrap();
        assert_eq!(slaves.len(), 2);
        assert_eq!(slaves[0].endpoint(), "10.0.0.2:8081");
        assert_eq!(slaves[1].endpoint(), "10.0.0.3:8082");
    }

    #[tokio::test]
    async fn test_master_address_without_master_is_error() {
        let registry = registry(spawn_fake_consul(Arc::new(Mutex::new(Vec::new()))).await);
        assert!(matches!(
            registry.master_address().await,
            Err(SchedulerError::Discovery(_))
        ));
    }

    #[tokio::test]
    async fn test_unreachable_consul_is_discovery_error() {
        let registry = registry("http://127.0.0.1:1".to_string());
        let result = registry.healthy_instances(ServiceKind::Slave).await;
        assert!(matches!(result, Err(SchedulerError::Discovery(_))));
        assert!(result.unwrap_err().is_retryable());
    }
}
