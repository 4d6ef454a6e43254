use conveyor_errors::SchedulerError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle status shared by tasks and jobs.
///
/// The numeric values are part of the wire contract between master and
/// slaves and are serialized as plain integers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum TaskStatus {
    Queued = 1,
    Running = 2,
    Canceled = 3,
    Failed = 4,
    Success = 5,
}

impl TaskStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TaskStatus::Canceled | TaskStatus::Failed | TaskStatus::Success
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Queued => "QUEUED",
            TaskStatus::Running => "RUNNING",
            TaskStatus::Canceled => "CANCELED",
            TaskStatus::Failed => "FAILED",
            TaskStatus::Success => "SUCCESS",
        }
    }
}

impl TryFrom<i64> for TaskStatus {
    type Error = SchedulerError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(TaskStatus::Queued),
            2 => Ok(TaskStatus::Running),
            3 => Ok(TaskStatus::Canceled),
            4 => Ok(TaskStatus::Failed),
            5 => Ok(TaskStatus::Success),
            other => Err(SchedulerError::InvalidStatus(other)),
        }
    }
}

impl From<TaskStatus> for i64 {
    fn from(status: TaskStatus) -> Self {
        status as i64
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
