//! File-backed storage for job logs and extracted reports.
//!
//! Layout:
//! - logs: `<logs_dir>/<taskID>/<stage>/<job>.log`
//! - reports: `<reports_dir>/<taskID>/<job>.json`

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use conveyor_domain::{JobLogs, Reports};
use conveyor_errors::{SchedulerError, SchedulerResult};
use tokio::fs;
use tracing::debug;

#[async_trait]
pub trait ArtifactStore: Send + Sync {
    async fn save_logs(
        &self,
        task_id: &str,
        stage: &str,
        job: &str,
        logs: &JobLogs,
    ) -> SchedulerResult<()>;

    /// Logs of a whole task, one stage, or one job, concatenated with a
    /// `=== stage/job ===` header per job. `job` is only honored together
    /// with `stage`.
    async fn merged_logs(
        &self,
        task_id: &str,
        stage: Option<&str>,
        job: Option<&str>,
    ) -> SchedulerResult<String>;

    async fn save_reports(&self, task_id: &str, job: &str, reports: &Reports)
        -> SchedulerResult<()>;

    async fn load_reports(&self, task_id: &str, job: &str) -> SchedulerResult<Reports>;

    /// All jobs' reports of a task. Values of equal metric names are
    /// concatenated in job-name order.
    async fn merged_reports(&self, task_id: &str) -> SchedulerResult<Reports>;
}

pub struct FileArtifactStore {
    logs_dir: PathBuf,
    reports_dir: PathBuf,
}

impl FileArtifactStore {
    pub fn new(logs_dir: impl Into<PathBuf>, reports_dir: impl Into<PathBuf>) -> Self {
        Self {
            logs_dir: logs_dir.into(),
            reports_dir: reports_dir.into(),
        }
    }
}

/// Rejects anything that could escape the storage root.
fn segment(value: &str) -> SchedulerResult<&str> {
    if value.is_empty()
        || value == "."
        || value == ".."
        || value.contains(['/', '\\', '\0'])
    {
        return Err(SchedulerError::InvalidPath(value.to_string()));
    }
    Ok(value)
}

async fn sorted_entries(dir: &Path) -> SchedulerResult<Vec<PathBuf>> {
    let mut reader = match fs::read_dir(dir).await {
        Ok(reader) => reader,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(SchedulerError::ArtifactNotFound {
                path: dir.display().to_string(),
            })
        }
        Err(e) => return Err(e.into()),
    };

    let mut entries = Vec::new();
    while let Some(entry) = reader.next_entry().await? {
        entries.push(entry.path());
    }
    entries.sort();
    Ok(entries)
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn dir_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

async fn read_to_string(path: &Path) -> SchedulerResult<String> {
    match fs::read_to_string(path).await {
        Ok(content) => Ok(content),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(SchedulerError::ArtifactNotFound {
            path: path.display().to_string(),
        }),
        Err(e) => Err(e.into()),
    }
}

impl FileArtifactStore {
    async fn stage_logs(&self, out: &mut String, stage_dir: &Path) -> SchedulerResult<()> {
        let stage = dir_name(stage_dir);
        for log_file in sorted_entries(stage_dir).await? {
            if log_file.extension().and_then(|ext| ext.to_str()) != Some("log") {
                continue;
            }
            out.push_str(&format!("=== {}/{} ===\n", stage, file_stem(&log_file)));
            out.push_str(&read_to_string(&log_file).await?);
        }
        Ok(())
    }
}

#[async_trait]
impl ArtifactStore for FileArtifactStore {
    async fn save_logs(
        &self,
        task_id: &str,
        stage: &str,
        job: &str,
        logs: &JobLogs,
    ) -> SchedulerResult<()> {
        let dir = self.logs_dir.join(segment(task_id)?).join(segment(stage)?);
        fs::create_dir_all(&dir).await?;
        let path = dir.join(format!("{}.log", segment(job)?));
        fs::write(&path, logs.to_text()).await?;
        debug!(path = %path.display(), "Stored job logs");
        Ok(())
    }

    async fn merged_logs(
        &self,
        task_id: &str,
        stage: Option<&str>,
        job: Option<&str>,
    ) -> SchedulerResult<String> {
        let task_dir = self.logs_dir.join(segment(task_id)?);
        let mut out = String::new();

        match (stage, job) {
            (Some(stage), Some(job)) => {
                let path = task_dir
                    .join(segment(stage)?)
                    .join(format!("{}.log", segment(job)?));
                out.push_str(&read_to_string(&path).await?);
            }
            (Some(stage), None) => {
                self.stage_logs(&mut out, &task_dir.join(segment(stage)?))
                    .await?;
            }
            (None, _) => {
                for stage_dir in sorted_entries(&task_dir).await? {
                    if stage_dir.is_dir() {
                        self.stage_logs(&mut out, &stage_dir).await?;
                    }
                }
            }
        }

        Ok(out)
    }

    async fn save_reports(
        &self,
        task_id: &str,
        job: &str,
        reports: &Reports,
    ) -> SchedulerResult<()> {
        let dir = self.reports_dir.join(segment(task_id)?);
        fs::create_dir_all(&dir).await?;
        let path = dir.join(format!("{}.json", segment(job)?));
        fs::write(&path, serde_json::to_vec(reports)?).await?;
        debug!(path = %path.display(), "Stored job reports");
        Ok(())
    }

    async fn load_reports(&self, task_id: &str, job: &str) -> SchedulerResult<Reports> {
        let path = self
            .reports_dir
            .join(segment(task_id)?)
            .join(format!("{}.json", segment(job)?));
        let content = read_to_string(&path).await?;
        Ok(serde_json::from_str(&content)?)
    }

    async fn merged_reports(&self, task_id: &str) -> SchedulerResult<Reports> {
        let mut merged = Reports::new();
        for report_file in sorted_entries(&self.reports_dir.join(segment(task_id)?)).await? {
            if report_file.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            let reports: Reports = serde_json::from_str(&read_to_string(&report_file).await?)?;
            for (metric, values) in reports {
                merged.entry(metric).or_default().extend(values);
            }
        }
        Ok(merged)
    }
}
