use anyhow::{Context, Result};
use config::{Config as ConfigBuilder, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::Path;

use super::{
    discovery::DiscoveryConfig,
    execution::{ReportingConfig, SandboxConfig},
    master_slave::{MasterConfig, SlaveConfig},
    observability::ObservabilityConfig,
};
use crate::validation::ConfigValidator;

pub const DEFAULT_CONFIG_PATHS: [&str; 3] = [
    "config/conveyor.toml",
    "conveyor.toml",
    "/etc/conveyor/config.toml",
];

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub master: MasterConfig,
    pub slave: SlaveConfig,
    pub discovery: DiscoveryConfig,
    pub sandbox: SandboxConfig,
    pub reporting: ReportingConfig,
    pub observability: ObservabilityConfig,
}

impl AppConfig {
    /// 加载配置：TOML文件 + `CONVEYOR_` 前缀的环境变量，缺省字段使用默认值
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let mut builder = ConfigBuilder::builder();

        if let Some(path) = config_path {
            if Path::new(path).exists() {
                builder = builder.add_source(File::new(path, FileFormat::Toml));
            } else {
                return Err(anyhow::anyhow!("配置文件不存在: {}", path));
            }
        } else if let Some(path) = DEFAULT_CONFIG_PATHS
            .iter()
            .find(|path| Path::new(path).exists())
        {
            builder = builder.add_source(File::new(path, FileFormat::Toml));
        }

        builder = builder.add_source(
            Environment::with_prefix("CONVEYOR")
                .prefix_separator("_")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("discovery.static_slaves")
                .try_parsing(true),
        );

        let config: AppConfig = builder
            .build()
            .context("构建配置失败")?
            .try_deserialize()
            .context("反序列化配置失败")?;

        config.validate()?;

        Ok(config)
    }

    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(toml_str).context("解析TOML配置失败")?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("序列化配置为TOML失败")
    }
}

impl ConfigValidator for AppConfig {
    fn validate(&self) -> crate::ConfigResult<()> {
        self.master.validate()?;
        self.slave.validate()?;
        self.discovery.validate()?;
        self.sandbox.validate()?;
        self.reporting.validate()?;
        self.observability.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DiscoveryBackend, SandboxEngine};
    use std::io::Write;

    #[test]
    fn test_default_config_is_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.master.slave_poll_interval_seconds, 15);
        assert_eq!(config.sandbox.default_timeout_ms, 50_000);
    }

    #[test]
    fn test_from_toml_partial_sections() {
        let toml_str = r#"
            [master]
            bind_address = "0.0.0.0:9000"
            max_tasks_per_slave = 2

            [sandbox]
            engine = "shell"

            [discovery]
            backend = "static"
            static_master = "10.0.0.1:9000"
            static_slaves = ["10.0.0.2:8081", "10.0.0.3:8081"]
        "#;

        let config = AppConfig::from_toml(toml_str).unwrap();
        assert_eq!(config.master.bind_address, "0.0.0.0:9000");
        assert_eq!(config.master.capacity_limit(), Some(2));
        assert_eq!(config.sandbox.engine, SandboxEngine::Shell);
        assert_eq!(config.discovery.backend, DiscoveryBackend::Static);
        assert_eq!(config.discovery.static_slaves.len(), 2);
        // untouched sections keep their defaults
        assert_eq!(config.slave, SlaveConfig::default());
    }

    #[test]
    fn test_from_toml_rejects_invalid_values() {
        let toml_str = r#"
            [slave]
            pool_size = 0
        "#;
        assert!(AppConfig::from_toml(toml_str).is_err());
    }

    #[test]
    fn test_toml_roundtrip() {
        let mut config = AppConfig::default();
        config.discovery.username = Some("ci".to_string());
        config.discovery.password = Some("secret".to_string());

        let toml_str = config.to_toml().unwrap();
        let parsed = AppConfig::from_toml(&toml_str).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[slave]\npool_size = 8\nadvertise_port = 9100").unwrap();

        let config = AppConfig::load(file.path().to_str()).unwrap();
        assert_eq!(config.slave.pool_size, 8);
        assert_eq!(config.slave.advertise_port, 9100);
    }

    #[test]
    fn test_load_missing_file_fails() {
        assert!(AppConfig::load(Some("/nonexistent/conveyor.toml")).is_err());
    }

    #[test]
    fn test_load_environment_override() {
        let file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        std::env::set_var("CONVEYOR_MASTER__REPORTS_DIR", "/var/lib/conveyor/reports");

        let config = AppConfig::load(file.path().to_str()).unwrap();
        std::env::remove_var("CONVEYOR_MASTER__REPORTS_DIR");

        assert_eq!(config.master.reports_dir, "/var/lib/conveyor/reports");
    }
}
