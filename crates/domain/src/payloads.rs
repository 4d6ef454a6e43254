use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::status::TaskStatus;
use crate::task::JobStatus;

/// Metric name to the values extracted for it.
pub type Reports = BTreeMap<String, Vec<String>>;

/// Body of `POST /task/{taskID}/status`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeStatusTask {
    #[serde(rename = "taskID", alias = "task_id")]
    pub task_id: String,
    #[serde(rename = "newStatus", alias = "new_status")]
    pub new_status: TaskStatus,
    #[serde(default)]
    pub stage: String,
}

/// Body of `POST /task/{taskID}/status/{jobName}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeStatusJob {
    #[serde(rename = "taskID", alias = "task_id")]
    pub task_id: String,
    #[serde(rename = "newStatus", alias = "new_status")]
    pub new_status: TaskStatus,
    pub job: String,
}

impl ChangeStatusJob {
    pub fn to_job_status(&self) -> JobStatus {
        JobStatus::new(self.job.clone(), self.new_status)
    }
}

/// Captured output of one job.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobLogs {
    #[serde(default)]
    pub stdout: Vec<String>,
    #[serde(default)]
    pub stderr: Vec<String>,
}

impl JobLogs {
    /// Plain text rendering with `Stdout:` and `Stderr:` sections. Empty
    /// streams are left out.
    pub fn to_text(&self) -> String {
        let mut text = String::new();
        if !self.stdout.is_empty() {
            text.push_str("Stdout:\n");
            for line in &self.stdout {
                text.push_str(line);
                text.push('\n');
            }
        }
        if !self.stderr.is_empty() {
            text.push_str("Stderr:\n");
            for line in &self.stderr {
                text.push_str(line);
                text.push('\n');
            }
        }
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_change_status_task_wire_names() {
        let body: ChangeStatusTask =
            serde_json::from_str(r#"{"taskID":"t1","newStatus":2,"stage":"build"}"#).unwrap();
        assert_eq!(body.new_status, TaskStatus::Running);
        assert_eq!(body.stage, "build");

        let out = serde_json::to_value(&body).unwrap();
        assert_eq!(out["taskID"], "t1");
        assert_eq!(out["newStatus"], 2);
    }

    #[test]
    fn test_change_status_rejects_unknown_status() {
        let result =
            serde_json::from_str::<ChangeStatusTask>(r#"{"taskID":"t1","newStatus":7,"stage":""}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_change_status_job_to_job_status() {
        let body: ChangeStatusJob =
            serde_json::from_str(r#"{"taskID":"t1","newStatus":5,"job":"compile"}"#).unwrap();
        let status = body.to_job_status();
        assert_eq!(status.job_name, "compile");
        assert_eq!(status.status, TaskStatus::Success);
        assert!(status.finished_at.is_some());
    }

    #[test]
    fn test_job_logs_text_notation() {
        let logs = JobLogs {
            stdout: vec!["building".to_string(), "done".to_string()],
            stderr: vec!["warning: unused".to_string()],
        };
        assert_eq!(
            logs.to_text(),
            "Stdout:\nbuilding\ndone\nStderr:\nwarning: unused\n"
        );
        assert_eq!(JobLogs::default().to_text(), "");
    }

    #[test]
    fn test_job_logs_missing_fields_default() {
        let logs: JobLogs = serde_json::from_str(r#"{"stdout":["ok"]}"#).unwrap();
        assert_eq!(logs.stdout, vec!["ok"]);
        assert!(logs.stderr.is_empty());
    }
}
