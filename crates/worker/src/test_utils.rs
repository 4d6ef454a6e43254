use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Semaphore;

use conveyor_domain::{Job, JobLogs, Reports, TaskConfig, TaskStatus};
use conveyor_errors::{SchedulerError, SchedulerResult};

use crate::reporter::{StatusEvent, StatusSink};
use crate::sandbox::{Sandbox, SandboxOutput, SandboxRequest};

pub fn job(stage: &str, commands: &[&str]) -> Job {
    Job {
        stage: stage.to_string(),
        image: vec!["FROM alpine:3.19".to_string()],
        shell_commands: commands.iter().map(|c| c.to_string()).collect(),
        reports: BTreeMap::new(),
        timeout: 0,
    }
}

pub fn task_config(task_id: &str, stages: &[&str], jobs: Vec<(&str, Job)>) -> TaskConfig {
    TaskConfig {
        task_id: task_id.to_string(),
        stages: stages.iter().map(|s| s.to_string()).collect(),
        jobs: jobs
            .into_iter()
            .map(|(name, job)| (name.to_string(), job))
            .collect(),
    }
}

/// Collects every event in emission order.
#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<StatusEvent>>,
}

impl RecordingSink {
    pub fn events(&self) -> Vec<StatusEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn task_statuses(&self) -> Vec<(TaskStatus, String)> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                StatusEvent::TaskStatus(change) => Some((change.new_status, change.stage)),
                _ => None,
            })
            .collect()
    }

    pub fn job_statuses(&self) -> Vec<(String, TaskStatus)> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                StatusEvent::JobStatus(change) => Some((change.job, change.new_status)),
                _ => None,
            })
            .collect()
    }

    pub fn logs(&self, job_name: &str) -> Option<JobLogs> {
        self.events().into_iter().find_map(|event| match event {
            StatusEvent::Logs { job, logs, .. } if job == job_name => Some(logs),
            _ => None,
        })
    }

    pub fn reports(&self, job_name: &str) -> Option<Reports> {
        self.events().into_iter().find_map(|event| match event {
            StatusEvent::Reports { job, reports, .. } if job == job_name => Some(reports),
            _ => None,
        })
    }
}

impl StatusSink for RecordingSink {
    fn send(&self, event: StatusEvent) {
        self.events.lock().unwrap().push(event);
    }
}

/// Prints `ran <first command>` and exits 0 unless the job is listed as
/// failing (exit 1) or erroring (sandbox error). A gated sandbox holds every
/// run until the gate hands out a permit.
#[derive(Default)]
pub struct ScriptedSandbox {
    failing: HashSet<String>,
    erroring: HashSet<String>,
    gate: Option<Arc<Semaphore>>,
}

impl ScriptedSandbox {
    pub fn failing(mut self, job_name: &str) -> Self {
        self.failing.insert(job_name.to_string());
        self
    }

    pub fn erroring(mut self, job_name: &str) -> Self {
        self.erroring.insert(job_name.to_string());
        self
    }

    pub fn gated(mut self, gate: Arc<Semaphore>) -> Self {
        self.gate = Some(gate);
        self
    }
}

#[async_trait]
impl Sandbox for ScriptedSandbox {
    async fn run(&self, request: &SandboxRequest) -> SchedulerResult<SandboxOutput> {
        if let Some(gate) = &self.gate {
            gate.acquire().await.unwrap().forget();
        }
        if self.erroring.contains(&request.job_name) {
            return Err(SchedulerError::sandbox_error(format!(
                "image build failed for {}",
                request.job_name
            )));
        }

        let first = request.commands.first().cloned().unwrap_or_default();
        Ok(SandboxOutput {
            stdout: vec![format!("ran {first}")],
            stderr: Vec::new(),
            exit_code: Some(if self.failing.contains(&request.job_name) {
                1
            } else {
                0
            }),
        })
    }

    fn name(&self) -> &str {
        "scripted"
    }
}
