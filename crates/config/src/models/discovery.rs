use crate::validation::{ConfigValidator, ValidationUtils};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum DiscoveryBackend {
    #[default]
    Consul,
    /// Fixed addresses from configuration, no external registry.
    Static,
}

impl std::str::FromStr for DiscoveryBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "consul" => Ok(DiscoveryBackend::Consul),
            "static" => Ok(DiscoveryBackend::Static),
            _ => Err(format!(
                "Invalid discovery backend: {s}. Valid backends: consul, static"
            )),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DiscoveryConfig {
    pub backend: DiscoveryBackend,
    pub consul_address: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub health_check_interval_seconds: u64,
    pub health_check_timeout_seconds: u64,
    /// `host:port` of the master when `backend = "static"`.
    pub static_master: Option<String>,
    /// `host:port` entries of slaves when `backend = "static"`.
    pub static_slaves: Vec<String>,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            backend: DiscoveryBackend::Consul,
            consul_address: "http://127.0.0.1:8500".to_string(),
            username: None,
            password: None,
            health_check_interval_seconds: 5,
            health_check_timeout_seconds: 3,
            static_master: None,
            static_slaves: Vec::new(),
        }
    }
}

impl ConfigValidator for DiscoveryConfig {
    fn validate(&self) -> crate::ConfigResult<()> {
        match self.backend {
            DiscoveryBackend::Consul => {
                ValidationUtils::validate_url(&self.consul_address, "discovery.consul_address")?;
                ValidationUtils::validate_interval_seconds(
                    self.health_check_interval_seconds,
                    "discovery.health_check_interval_seconds",
                )?;
                ValidationUtils::validate_interval_seconds(
                    self.health_check_timeout_seconds,
                    "discovery.health_check_timeout_seconds",
                )?;
                if self.username.is_some() != self.password.is_some() {
                    return Err(crate::ConfigError::Validation(
                        "discovery.username and discovery.password must be set together"
                            .to_string(),
                    ));
                }
            }
            DiscoveryBackend::Static => {
                if let Some(master) = &self.static_master {
                    ValidationUtils::validate_bind_address(master, "discovery.static_master")?;
                }
                for slave in &self.static_slaves {
                    ValidationUtils::validate_bind_address(slave, "discovery.static_slaves")?;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_discovery_backend_from_str() {
        assert_eq!("consul".parse::<DiscoveryBackend>(), Ok(DiscoveryBackend::Consul));
        assert_eq!("STATIC".parse::<DiscoveryBackend>(), Ok(DiscoveryBackend::Static));
        assert!("etcd".parse::<DiscoveryBackend>().is_err());
    }

    #[test]
    fn test_consul_discovery_validation() {
        let config = DiscoveryConfig::default();
        assert!(config.validate().is_ok());

        let mut invalid_config = config.clone();
        invalid_config.consul_address = "127.0.0.1:8500".to_string();
        assert!(invalid_config.validate().is_err());

        let mut invalid_config = config;
        invalid_config.username = Some("admin".to_string());
        assert!(invalid_config.validate().is_err());
    }

    #[test]
    fn test_static_discovery_validation() {
        let config = DiscoveryConfig {
            backend: DiscoveryBackend::Static,
            consul_address: String::new(),
            static_master: Some("127.0.0.1:8080".to_string()),
            static_slaves: vec!["10.0.0.2:8081".to_string()],
            ..DiscoveryConfig::default()
        };
        assert!(config.validate().is_ok());

        let mut invalid_config = config;
        invalid_config.static_slaves.push("10.0.0.3".to_string());
        assert!(invalid_config.validate().is_err());
    }
}
