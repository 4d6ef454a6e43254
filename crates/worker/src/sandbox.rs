use std::time::Duration;

use async_trait::async_trait;

use conveyor_errors::SchedulerResult;

/// Everything a sandbox needs to run one job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SandboxRequest {
    pub task_id: String,
    pub job_name: String,
    /// Base-environment instructions, one Dockerfile line each.
    pub image: Vec<String>,
    pub commands: Vec<String>,
    pub timeout: Duration,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SandboxOutput {
    pub stdout: Vec<String>,
    pub stderr: Vec<String>,
    /// `None` when the process was terminated by a signal.
    pub exit_code: Option<i32>,
}

impl SandboxOutput {
    pub fn succeeded(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// An isolated environment that runs a job's entry script.
///
/// `Err` means the sandbox itself failed (build, start, timeout). A script
/// that ran and exited non-zero is an `Ok` output with that exit code.
#[async_trait]
pub trait Sandbox: Send + Sync {
    async fn run(&self, request: &SandboxRequest) -> SchedulerResult<SandboxOutput>;

    fn name(&self) -> &str;
}
