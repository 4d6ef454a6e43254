use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tracing::{debug, info, warn};

use conveyor_config::{SandboxConfig, SandboxEngine};
use conveyor_errors::{SchedulerError, SchedulerResult};

use crate::sandbox::{Sandbox, SandboxOutput, SandboxRequest};
use crate::script::{render_entry_script, ENTRY_SCRIPT_NAME};

/// 根据配置创建沙箱
pub fn create_sandbox(config: &SandboxConfig) -> Arc<dyn Sandbox> {
    match config.engine {
        SandboxEngine::Docker => Arc::new(DockerSandbox::new(
            config.docker_binary.clone(),
            config.remove_images,
        )),
        SandboxEngine::Shell => Arc::new(ShellSandbox::new(config.shell.clone())),
    }
}

/// Builds an image from the job's instructions plus its entry script and
/// runs it once.
pub struct DockerSandbox {
    docker_binary: String,
    remove_images: bool,
}

impl DockerSandbox {
    pub fn new(docker_binary: impl Into<String>, remove_images: bool) -> Self {
        Self {
            docker_binary: docker_binary.into(),
            remove_images,
        }
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.docker_binary);
        cmd.kill_on_drop(true);
        cmd
    }

    async fn build_image(&self, context_dir: &Path, tag: &str) -> SchedulerResult<()> {
        let output = self
            .command()
            .arg("build")
            .arg("-q")
            .arg("-t")
            .arg(tag)
            .arg(context_dir)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| SchedulerError::sandbox_error(format!("启动docker build失败: {e}")))?;

        if output.status.success() {
            debug!(tag = %tag, "Image built");
            Ok(())
        } else {
            Err(SchedulerError::sandbox_error(format!(
                "image build failed for {tag}: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            )))
        }
    }

    /// Best effort; a leftover container or image is only logged.
    async fn remove(&self, args: &[&str]) {
        match self.command().args(args).output().await {
            Ok(output) if output.status.success() => {}
            Ok(output) => debug!(
                args = ?args,
                stderr = %String::from_utf8_lossy(&output.stderr).trim(),
                "Docker cleanup reported an error"
            ),
            Err(e) => warn!(args = ?args, error = %e, "Docker cleanup failed"),
        }
    }
}

#[async_trait]
impl Sandbox for DockerSandbox {
    async fn run(&self, request: &SandboxRequest) -> SchedulerResult<SandboxOutput> {
        let tag = image_tag(&request.task_id, &request.job_name);
        let container = format!("execute_{tag}");

        let context_dir = tempfile::tempdir()?;
        tokio::fs::write(
            context_dir.path().join("Dockerfile"),
            render_dockerfile(&request.image),
        )
        .await?;
        tokio::fs::write(
            context_dir.path().join(ENTRY_SCRIPT_NAME),
            render_entry_script(&request.commands),
        )
        .await?;

        self.build_image(context_dir.path(), &tag).await?;

        info!(
            task_id = %request.task_id,
            job = %request.job_name,
            container = %container,
            timeout_ms = request.timeout.as_millis() as u64,
            "启动容器"
        );
        let mut cmd = self.command();
        cmd.arg("run").arg("--name").arg(&container).arg(&tag);
        let result = run_captured(cmd, request.timeout).await;

        self.remove(&["rm", "-f", &container]).await;
        if self.remove_images {
            self.remove(&["rmi", "-f", &tag]).await;
        }
        result
    }

    fn name(&self) -> &str {
        "docker"
    }
}

/// Runs the entry script directly on the host. The image instructions are
/// ignored.
pub struct ShellSandbox {
    shell: String,
}

impl ShellSandbox {
    pub fn new(shell: impl Into<String>) -> Self {
        Self {
            shell: shell.into(),
        }
    }
}

impl Default for ShellSandbox {
    fn default() -> Self {
        Self::new("sh")
    }
}

#[async_trait]
impl Sandbox for ShellSandbox {
    async fn run(&self, request: &SandboxRequest) -> SchedulerResult<SandboxOutput> {
        let work_dir = tempfile::tempdir()?;
        let script_path = work_dir.path().join(ENTRY_SCRIPT_NAME);
        tokio::fs::write(&script_path, render_entry_script(&request.commands)).await?;

        debug!(
            task_id = %request.task_id,
            job = %request.job_name,
            shell = %self.shell,
            "执行Shell沙箱任务"
        );
        let mut cmd = Command::new(&self.shell);
        cmd.arg(&script_path)
            .current_dir(work_dir.path())
            .kill_on_drop(true);
        run_captured(cmd, request.timeout).await
    }

    fn name(&self) -> &str {
        "shell"
    }
}

/// Lowercase `taskID_job` with characters docker rejects replaced by `-`.
pub fn image_tag(task_id: &str, job_name: &str) -> String {
    format!("{task_id}_{job_name}")
        .to_lowercase()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-') {
                c
            } else {
                '-'
            }
        })
        .collect()
}

pub fn render_dockerfile<S: AsRef<str>>(image: &[S]) -> String {
    let mut dockerfile = String::new();
    for line in image {
        dockerfile.push_str(line.as_ref());
        dockerfile.push('\n');
    }
    dockerfile.push_str(&format!("COPY {ENTRY_SCRIPT_NAME} /{ENTRY_SCRIPT_NAME}\n"));
    dockerfile.push_str(&format!(
        "ENTRYPOINT [\"/bin/sh\", \"/{ENTRY_SCRIPT_NAME}\"]\n"
    ));
    dockerfile
}

/// Spawns `cmd`, collects stdout and stderr line by line and waits for it.
/// Past `timeout` the child is killed and `ExecutionTimeout` returned.
async fn run_captured(mut cmd: Command, timeout: Duration) -> SchedulerResult<SandboxOutput> {
    let start_time = Instant::now();
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    let mut child = cmd
        .spawn()
        .map_err(|e| SchedulerError::sandbox_error(format!("启动进程失败: {e}")))?;

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| SchedulerError::sandbox_error("无法获取stdout"))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| SchedulerError::sandbox_error("无法获取stderr"))?;

    let execution = async {
        let (stdout_lines, stderr_lines) = tokio::join!(read_lines(stdout), read_lines(stderr));
        let status = child
            .wait()
            .await
            .map_err(|e| SchedulerError::sandbox_error(format!("等待进程结束失败: {e}")))?;
        Ok::<_, SchedulerError>(SandboxOutput {
            stdout: stdout_lines,
            stderr: stderr_lines,
            exit_code: status.code(),
        })
    };

    match tokio::time::timeout(timeout, execution).await {
        Ok(result) => {
            let output = result?;
            debug!(
                exit_code = ?output.exit_code,
                duration_ms = start_time.elapsed().as_millis() as u64,
                "Process finished"
            );
            Ok(output)
        }
        Err(_) => {
            // the child is killed once dropped
            warn!(timeout_ms = timeout.as_millis() as u64, "Process timed out");
            Err(SchedulerError::ExecutionTimeout {
                timeout_ms: timeout.as_millis() as u64,
            })
        }
    }
}

/// Reads the stream to the end. Bytes that are not UTF-8 are replaced so a
/// single bad line neither stops the capture nor closes the pipe early.
async fn read_lines<R: AsyncRead + Unpin>(reader: R) -> Vec<String> {
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    let mut collected = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                if buf.ends_with(b"\n") {
                    buf.pop();
                    if buf.ends_with(b"\r") {
                        buf.pop();
                    }
                }
                collected.push(String::from_utf8_lossy(&buf).into_owned());
            }
            Err(e) => {
                warn!(error = %e, "Reading process output failed");
                break;
            }
        }
    }
    collected
}
