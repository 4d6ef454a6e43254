use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::task_config::{Job, TaskConfig};

/// Task shape produced by the web portal: ordered groups of jobs, each job
/// carrying a whole Dockerfile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortalTask {
    pub id: String,
    #[serde(default)]
    pub job_groups: Vec<PortalJobGroup>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortalJobGroup {
    pub name: String,
    #[serde(default)]
    pub order: i64,
    #[serde(default)]
    pub jobs: Vec<PortalJob>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortalJob {
    pub name: String,
    #[serde(default)]
    pub docker_file: String,
    #[serde(default)]
    pub timeout: i64,
    #[serde(default)]
    pub metrics: Vec<PortalMetric>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortalMetric {
    pub key: String,
    pub regex: String,
}

impl PortalTask {
    /// Groups become stages in ascending `order`; a job name seen in an
    /// earlier group keeps its first definition.
    pub fn into_task_config(self) -> TaskConfig {
        let mut groups = self.job_groups;
        groups.sort_by_key(|group| group.order);

        let mut stages = Vec::with_capacity(groups.len());
        let mut jobs = BTreeMap::new();
        for group in groups {
            for job in group.jobs {
                jobs.entry(job.name.clone())
                    .or_insert_with(|| job.into_job(&group.name));
            }
            stages.push(group.name);
        }

        TaskConfig {
            task_id: self.id,
            stages,
            jobs,
        }
    }
}

impl PortalJob {
    fn into_job(self, stage: &str) -> Job {
        Job {
            stage: stage.to_string(),
            image: self
                .docker_file
                .lines()
                .filter(|line| !line.trim().is_empty())
                .map(str::to_string)
                .collect(),
            shell_commands: Vec::new(),
            reports: self
                .metrics
                .into_iter()
                .map(|metric| (metric.key, metric.regex))
                .collect(),
            timeout: self.timeout,
        }
    }
}
