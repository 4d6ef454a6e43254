//! Layered configuration for the master and slave services: a TOML file,
//! then `CONVEYOR_`-prefixed environment variables, then built-in defaults.

pub mod models;
pub mod validation;

pub use models::{
    AppConfig, DiscoveryBackend, DiscoveryConfig, MasterConfig, ObservabilityConfig,
    ReportingConfig, SandboxConfig, SandboxEngine, SlaveConfig,
};
pub use validation::{ConfigValidator, ValidationUtils};

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Validation error: {0}")]
    Validation(String),
}
