#[cfg(test)]
mod tests {
    use std::time::Duration;

    use conveyor_config::{SandboxConfig, SandboxEngine};
    use conveyor_errors::SchedulerError;

    use crate::executors::{create_sandbox, image_tag, render_dockerfile, ShellSandbox};
    use crate::sandbox::{Sandbox, SandboxRequest};

    fn request(commands: &[&str], timeout: Duration) -> SandboxRequest {
        SandboxRequest {
            task_id: "t1".to_string(),
            job_name: "compile".to_string(),
            image: vec!["FROM alpine:3.19".to_string()],
            commands: commands.iter().map(|c| c.to_string()).collect(),
            timeout,
        }
    }

    #[tokio::test]
    async fn test_shell_sandbox_captures_both_streams() {
        let sandbox = ShellSandbox::default();
        let output = sandbox
            .run(&request(
                &["echo hello", "echo oops >&2", "echo world"],
                Duration::from_secs(10),
            ))
            .await
            .unwrap();

        assert!(output.succeeded());
        assert_eq!(output.stdout, vec!["hello", "world"]);
        assert_eq!(output.stderr, vec!["oops"]);
    }

    #[tokio::test]
    async fn test_shell_sandbox_keeps_reading_past_invalid_utf8() {
        let sandbox = ShellSandbox::default();
        let output = sandbox
            .run(&request(
                &["printf 'bad \\377 byte\\n'", "echo after"],
                Duration::from_secs(10),
            ))
            .await
            .unwrap();

        assert!(output.succeeded());
        assert_eq!(output.stdout, vec!["bad \u{FFFD} byte", "after"]);
    }

    #[tokio::test]
    async fn test_shell_sandbox_drains_large_output_after_invalid_utf8() {
        let sandbox = ShellSandbox::default();
        let output = sandbox
            .run(&request(
                &[
                    "printf '\\377\\n'",
                    "head -c 300000 /dev/zero | tr '\\0' a",
                    "echo",
                    "echo done",
                ],
                Duration::from_secs(10),
            ))
            .await
            .unwrap();

        assert_eq!(output.exit_code, Some(0));
        assert_eq!(output.stdout.len(), 3);
        assert_eq!(output.stdout[0], "\u{FFFD}");
        assert_eq!(output.stdout[1].len(), 300_000);
        assert_eq!(output.stdout[2], "done");
    }

    #[tokio::test]
    async fn test_shell_sandbox_stops_at_first_failure() {
        let sandbox = ShellSandbox::default();
        let output = sandbox
            .run(&request(
                &["echo before", "exit 3", "echo after"],
                Duration::from_secs(10),
            ))
            .await
            .unwrap();

        assert!(!output.succeeded());
        assert_eq!(output.exit_code, Some(3));
        assert_eq!(output.stdout, vec!["before"]);
    }

    #[tokio::test]
    async fn test_shell_sandbox_times_out() {
        let sandbox = ShellSandbox::default();
        let result = sandbox
            .run(&request(&["sleep 5"], Duration::from_millis(200)))
            .await;

        assert!(matches!(
            result,
            Err(SchedulerError::ExecutionTimeout { timeout_ms: 200 })
        ));
    }

    #[tokio::test]
    async fn test_missing_shell_is_sandbox_error() {
        let sandbox = ShellSandbox::new("/nonexistent/shell");
        let result = sandbox
            .run(&request(&["true"], Duration::from_secs(1)))
            .await;
        assert!(matches!(result, Err(SchedulerError::Sandbox(_))));
    }

    #[test]
    fn test_image_tag_is_lowercase_and_safe() {
        assert_eq!(image_tag("Build-42", "Unit Tests"), "build-42_unit-tests");
    }

    #[test]
    fn test_dockerfile_appends_entrypoint() {
        let dockerfile = render_dockerfile(&["FROM alpine:3.19", "RUN apk add make"]);
        assert_eq!(
            dockerfile,
            "FROM alpine:3.19\nRUN apk add make\nCOPY entry.sh /entry.sh\nENTRYPOINT [\"/bin/sh\", \"/entry.sh\"]\n"
        );
    }

    #[test]
    fn test_create_sandbox_follows_engine() {
        let docker = create_sandbox(&SandboxConfig::default());
        assert_eq!(docker.name(), "docker");

        let shell = create_sandbox(&SandboxConfig {
            engine: SandboxEngine::Shell,
            ..SandboxConfig::default()
        });
        assert_eq!(shell.name(), "shell");
    }
}
