use crate::validation::{ConfigValidator, ValidationUtils};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SandboxEngine {
    #[default]
    Docker,
    /// Runs the entry script directly on the host. Meant for development.
    Shell,
}

impl std::str::FromStr for SandboxEngine {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "docker" => Ok(SandboxEngine::Docker),
            "shell" => Ok(SandboxEngine::Shell),
            _ => Err(format!(
                "Invalid sandbox engine: {s}. Valid engines: docker, shell"
            )),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SandboxConfig {
    pub engine: SandboxEngine,
    pub docker_binary: String,
    pub shell: String,
    pub default_timeout_ms: u64,
    pub remove_images: bool,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            engine: SandboxEngine::Docker,
            docker_binary: "docker".to_string(),
            shell: "sh".to_string(),
            default_timeout_ms: 50_000,
            remove_images: true,
        }
    }
}

impl ConfigValidator for SandboxConfig {
    fn validate(&self) -> crate::ConfigResult<()> {
        match self.engine {
            SandboxEngine::Docker => {
                ValidationUtils::validate_not_empty(&self.docker_binary, "sandbox.docker_binary")?
            }
            SandboxEngine::Shell => {
                ValidationUtils::validate_not_empty(&self.shell, "sandbox.shell")?
            }
        }
        if self.default_timeout_ms == 0 {
            return Err(crate::ConfigError::Validation(
                "sandbox.default_timeout_ms must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Delivery policy for status pushes from a slave to the master.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ReportingConfig {
    pub max_attempts: usize,
    pub retry_backoff_ms: u64,
    pub request_timeout_seconds: u64,
}

impl Default for ReportingConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            retry_backoff_ms: 500,
            request_timeout_seconds: 10,
        }
    }
}

impl ConfigValidator for ReportingConfig {
    fn validate(&self) -> crate::ConfigResult<()> {
        ValidationUtils::validate_count(self.max_attempts, "reporting.max_attempts", 20)?;
        ValidationUtils::validate_interval_seconds(
            self.request_timeout_seconds,
            "reporting.request_timeout_seconds",
        )?;
        Ok(())
    }
}
