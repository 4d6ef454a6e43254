use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::status::TaskStatus;

/// Stable handle of a task record inside the master's task arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TaskKey(pub usize);

/// Runtime record the master keeps for every scheduled task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    /// Position of the slave in the registry at assignment time.
    pub assigned_slave_index: usize,
    pub assigned_slave_id: String,
    pub status: TaskStatus,
    pub current_stage: String,
    pub job_statuses: Vec<JobStatus>,
    pub created_at: DateTime<Utc>,
    /// `None` until the task reaches a terminal status.
    pub finished_at: Option<DateTime<Utc>>,
}

impl Task {
    pub fn queued(id: impl Into<String>, slave_index: usize, slave_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            assigned_slave_index: slave_index,
            assigned_slave_id: slave_id.into(),
            status: TaskStatus::Queued,
            current_stage: String::new(),
            job_statuses: Vec::new(),
            created_at: Utc::now(),
            finished_at: None,
        }
    }

    pub fn apply_status(&mut self, status: TaskStatus, stage: impl Into<String>) {
        self.status = status;
        self.current_stage = stage.into();
        if status.is_terminal() {
            self.finished_at = Some(Utc::now());
        }
    }

    /// Updates the entry with the same job name in place, or appends it.
    pub fn upsert_job_status(&mut self, job_status: JobStatus) {
        match self
            .job_statuses
            .iter_mut()
            .find(|existing| existing.job_name == job_status.job_name)
        {
            Some(existing) => *existing = job_status,
            None => self.job_statuses.push(job_status),
        }
    }

    pub fn is_finished(&self) -> bool {
        self.status.is_terminal()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobStatus {
    pub job_name: String,
    pub status: TaskStatus,
    pub finished_at: Option<DateTime<Utc>>,
}

impl JobStatus {
    pub fn new(job_name: impl Into<String>, status: TaskStatus) -> Self {
        Self {
            job_name: job_name.into(),
            status,
            finished_at: status.is_terminal().then(Utc::now),
        }
    }
}
