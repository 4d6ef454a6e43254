use crate::validation::{ConfigValidator, ValidationUtils};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MasterConfig {
    pub bind_address: String,
    /// Address other nodes use to reach this master. Empty means the
    /// machine hostname.
    pub advertise_address: String,
    pub advertise_port: u16,
    /// Upper bound of active tasks per slave; 0 disables the check.
    pub max_tasks_per_slave: usize,
    pub slave_poll_interval_seconds: u64,
    pub forward_timeout_seconds: u64,
    pub logs_dir: String,
    pub reports_dir: String,
}

impl Default for MasterConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            advertise_address: String::new(),
            advertise_port: 8080,
            max_tasks_per_slave: 0,
            slave_poll_interval_seconds: 15,
            forward_timeout_seconds: 10,
            logs_dir: "data/logs".to_string(),
            reports_dir: "data/reports".to_string(),
        }
    }
}

impl MasterConfig {
    pub fn capacity_limit(&self) -> Option<usize> {
        (self.max_tasks_per_slave > 0).then_some(self.max_tasks_per_slave)
    }
}

impl ConfigValidator for MasterConfig {
    fn validate(&self) -> crate::ConfigResult<()> {
        ValidationUtils::validate_bind_address(&self.bind_address, "master.bind_address")?;
        ValidationUtils::validate_port(self.advertise_port)?;
        ValidationUtils::validate_interval_seconds(
            self.slave_poll_interval_seconds,
            "master.slave_poll_interval_seconds",
        )?;
        ValidationUtils::validate_interval_seconds(
            self.forward_timeout_seconds,
            "master.forward_timeout_seconds",
        )?;
        ValidationUtils::validate_not_empty(&self.logs_dir, "master.logs_dir")?;
        ValidationUtils::validate_not_empty(&self.reports_dir, "master.reports_dir")?;
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SlaveConfig {
    pub bind_address: String,
    /// Empty means the machine hostname.
    pub advertise_address: String,
    pub advertise_port: u16,
    /// Number of intake workers and size of the intake queue.
    pub pool_size: usize,
}

impl Default for SlaveConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8081".to_string(),
            advertise_address: String::new(),
            advertise_port: 8081,
            pool_size: 4,
        }
    }
}

impl ConfigValidator for SlaveConfig {
    fn validate(&self) -> crate::ConfigResult<()> {
        ValidationUtils::validate_bind_address(&self.bind_address, "slave.bind_address")?;
        ValidationUtils::validate_port(self.advertise_port)?;
        ValidationUtils::validate_count(self.pool_size, "slave.pool_size", 256)?;
        Ok(())
    }
}
