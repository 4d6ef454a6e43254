//! Stage-by-stage execution of a task on a slave.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::task::JoinSet;
use tracing::{error, info, warn};

use conveyor_domain::{Job, JobLogs, TaskConfig, TaskStatus};
use conveyor_errors::{SchedulerError, SchedulerResult};
use conveyor_infrastructure::RunnerMetrics;

use crate::metrics_extract::extract_metrics;
use crate::reporter::{StatusEvent, StatusSink};
use crate::sandbox::{Sandbox, SandboxOutput, SandboxRequest};

pub struct PipelineExecutor {
    sandbox: Arc<dyn Sandbox>,
    sink: Arc<dyn StatusSink>,
    default_timeout: Duration,
    metrics: RunnerMetrics,
}

impl PipelineExecutor {
    pub fn new(
        sandbox: Arc<dyn Sandbox>,
        sink: Arc<dyn StatusSink>,
        default_timeout: Duration,
        metrics: RunnerMetrics,
    ) -> Self {
        Self {
            sandbox,
            sink,
            default_timeout,
            metrics,
        }
    }

    /// Runs every stage in order and reports progress to the sink.
    ///
    /// Jobs of one stage run concurrently; the next stage starts only after
    /// all of them finished and none failed. Returns the final task status.
    pub async fn run_pipeline(&self, config: Option<&TaskConfig>) -> SchedulerResult<TaskStatus> {
        let config = config.ok_or(SchedulerError::MissingConfiguration)?;
        let task_id = config.task_id.as_str();
        info!(task_id = %task_id, stages = config.stages.len(), "开始执行任务流水线");

        let mut last_stage = "";
        for stage in &config.stages {
            last_stage = stage.as_str();
            let jobs = config.jobs_for_stage(stage);
            if jobs.is_empty() {
                error!(task_id = %task_id, stage = %stage, "Stage has no jobs");
                self.sink
                    .send(StatusEvent::task_status(task_id, TaskStatus::Failed, stage));
                return Ok(TaskStatus::Failed);
            }

            self.sink
                .send(StatusEvent::task_status(task_id, TaskStatus::Running, stage));

            if !self.run_stage(task_id, stage, jobs).await {
                warn!(task_id = %task_id, stage = %stage, "Stage failed, skipping remaining stages");
                self.sink
                    .send(StatusEvent::task_status(task_id, TaskStatus::Failed, stage));
                return Ok(TaskStatus::Failed);
            }
        }

        info!(task_id = %task_id, "任务流水线执行成功");
        self.sink
            .send(StatusEvent::task_status(task_id, TaskStatus::Success, last_stage));
        Ok(TaskStatus::Success)
    }

    /// Returns whether every job of the stage succeeded.
    async fn run_stage(&self, task_id: &str, stage: &str, jobs: Vec<(&str, &Job)>) -> bool {
        let mut join_set = JoinSet::new();
        for (job_name, job) in jobs {
            let run = JobRun {
                task_id: task_id.to_string(),
                stage: stage.to_string(),
                job_name: job_name.to_string(),
                image: job.image.clone(),
                commands: job.shell_commands.clone(),
                reports: job.reports.clone(),
                timeout: job.effective_timeout(self.default_timeout),
            };
            let sandbox = Arc::clone(&self.sandbox);
            let sink = Arc::clone(&self.sink);
            let metrics = self.metrics.clone();
            join_set.spawn(async move { run.execute(sandbox.as_ref(), sink.as_ref(), &metrics).await });
        }

        let mut all_succeeded = true;
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok(succeeded) => all_succeeded &= succeeded,
                Err(e) => {
                    error!(task_id = %task_id, stage = %stage, error = %e, "Job task aborted");
                    all_succeeded = false;
                }
            }
        }
        all_succeeded
    }
}

struct JobRun {
    task_id: String,
    stage: String,
    job_name: String,
    image: Vec<String>,
    commands: Vec<String>,
    reports: BTreeMap<String, String>,
    timeout: Duration,
}

impl JobRun {
    /// Runs the job and reports its status, logs and metrics, in that order.
    async fn execute(self, sandbox: &dyn Sandbox, sink: &dyn StatusSink, metrics: &RunnerMetrics) -> bool {
        let request = SandboxRequest {
            task_id: self.task_id.clone(),
            job_name: self.job_name.clone(),
            image: self.image,
            commands: self.commands,
            timeout: self.timeout,
        };

        let start_time = Instant::now();
        let (succeeded, output) = match sandbox.run(&request).await {
            Ok(output) => (output.succeeded(), output),
            Err(e) => {
                warn!(
                    task_id = %self.task_id,
                    job = %self.job_name,
                    error = %e,
                    "Sandbox failed"
                );
                let output = SandboxOutput {
                    stderr: vec![e.to_string()],
                    ..SandboxOutput::default()
                };
                (false, output)
            }
        };
        metrics.record_job_executed(succeeded, start_time.elapsed().as_secs_f64());

        info!(
            task_id = %self.task_id,
            job = %self.job_name,
            exit_code = ?output.exit_code,
            succeeded,
            "Job finished"
        );

        let status = if succeeded {
            TaskStatus::Success
        } else {
            TaskStatus::Failed
        };
        let reports = extract_metrics(&self.reports, &output.stdout, &output.stderr);

        sink.send(StatusEvent::job_status(&self.task_id, &self.job_name, status));
        sink.send(StatusEvent::Logs {
            task_id: self.task_id.clone(),
            stage: self.stage,
            job: self.job_name.clone(),
            logs: JobLogs {
                stdout: output.stdout,
                stderr: output.stderr,
            },
        });
        sink.send(StatusEvent::Reports {
            task_id: self.task_id,
            job: self.job_name,
            reports,
        });
        succeeded
    }
}
