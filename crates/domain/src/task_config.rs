use conveyor_errors::{SchedulerError, SchedulerResult};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::time::Duration;

/// A multi-stage job specification submitted by a client.
///
/// `stages` is the authoritative execution order; `jobs` is keyed by job
/// name and carries no ordering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskConfig {
    #[serde(rename = "taskID", alias = "task_id")]
    pub task_id: String,
    #[serde(default)]
    pub stages: Vec<String>,
    #[serde(default)]
    pub jobs: BTreeMap<String, Job>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub stage: String,
    /// Base environment instructions, one Dockerfile line each.
    #[serde(default)]
    pub image: Vec<String>,
    #[serde(rename = "run", alias = "shellCommands", default)]
    pub shell_commands: Vec<String>,
    /// Metric name to regular expression.
    #[serde(default)]
    pub reports: BTreeMap<String, String>,
    /// Milliseconds; zero or negative selects the system default.
    #[serde(default)]
    pub timeout: i64,
}

impl Job {
    pub fn effective_timeout(&self, default: Duration) -> Duration {
        if self.timeout > 0 {
            Duration::from_millis(self.timeout as u64)
        } else {
            default
        }
    }
}

impl TaskConfig {
    /// Checks the structural rules that must hold before a task is scheduled.
    pub fn validate(&self) -> SchedulerResult<()> {
        if self.task_id.trim().is_empty() {
            return Err(SchedulerError::invalid_config("taskID cannot be empty"));
        }
        if self.stages.is_empty() {
            return Err(SchedulerError::invalid_config("task has no stages"));
        }
        if self.jobs.is_empty() {
            return Err(SchedulerError::invalid_config("task has no jobs"));
        }

        let mut seen = HashSet::new();
        for stage in &self.stages {
            if stage.trim().is_empty() {
                return Err(SchedulerError::invalid_config("stage name cannot be empty"));
            }
            if !seen.insert(stage.as_str()) {
                return Err(SchedulerError::invalid_config(format!(
                    "stage '{stage}' is declared more than once"
                )));
            }
        }

        for (name, job) in &self.jobs {
            if name.trim().is_empty() {
                return Err(SchedulerError::invalid_config("job name cannot be empty"));
            }
            if !seen.contains(job.stage.as_str()) {
                return Err(SchedulerError::invalid_config(format!(
                    "job '{name}' references undeclared stage '{}'",
                    job.stage
                )));
            }
        }

        Ok(())
    }

    /// Jobs whose declared stage equals `stage`, in job-name order.
    pub fn jobs_for_stage<'a>(&'a self, stage: &str) -> Vec<(&'a str, &'a Job)> {
        self.jobs
            .iter()
            .filter(|(_, job)| job.stage == stage)
            .map(|(name, job)| (name.as_str(), job))
            .collect()
    }
}
