use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;

use crate::errors::RunnerError;

/// Default upper bound for a single `gh` invocation.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Abstraction over the external action tool for testability.
/// Real implementation: `GhCli`. Test double: `testing::MockRunner`.
///
/// `args` never includes the program name. On success the tool's stdout is
/// returned.
#[async_trait]
pub trait ActionRunner: Send + Sync {
    async fn run(&self, args: &[String]) -> Result<String, RunnerError>;
}

/// Runs the GitHub CLI as a subprocess with a hard timeout.
pub struct GhCli {
    program: String,
    timeout: Duration,
}

impl GhCli {
    pub fn new(program: impl Into<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }
}

impl Default for GhCli {
    fn default() -> Self {
        Self::new("gh", DEFAULT_TIMEOUT)
    }
}

#[async_trait]
impl ActionRunner for GhCli {
    async fn run(&self, args: &[String]) -> Result<String, RunnerError> {
        tracing::debug!(program = %self.program, ?args, "running external command");

        let child = Command::new(&self.program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output();

        let output = match tokio::time::timeout(self.timeout, child).await {
            Ok(result) => result.map_err(|source| RunnerError::Spawn {
                program: self.program.clone(),
                source,
            })?,
            Err(_) => {
                tracing::warn!(program = %self.program, "command timed out");
                return Err(RunnerError::TimedOut);
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            let message = if stderr.is_empty() {
                format!("{} exited with {}", self.program, output.status)
            } else {
                stderr
            };
            tracing::warn!(program = %self.program, "command failed: {}", message);
            return Err(RunnerError::Failed(message));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_gh_cli_returns_stdout_on_success() {
        let runner = GhCli::new("echo", DEFAULT_TIMEOUT);
        let out = runner.run(&args(&["hello", "world"])).await.unwrap();
        assert_eq!(out.trim(), "hello world");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_gh_cli_non_zero_exit_carries_stderr() {
        let runner = GhCli::new("sh", DEFAULT_TIMEOUT);
        let err = runner
            .run(&args(&["-c", "echo 'not found' >&2; exit 1"]))
            .await
            .unwrap_err();
        match err {
            RunnerError::Failed(msg) => assert_eq!(msg, "not found"),
            other => panic!("Expected Failed, got {:?}", other),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_gh_cli_non_zero_exit_without_stderr() {
        let runner = GhCli::new("false", DEFAULT_TIMEOUT);
        let err = runner.run(&[]).await.unwrap_err();
        match err {
            RunnerError::Failed(msg) => assert!(msg.contains("false exited with")),
            other => panic!("Expected Failed, got {:?}", other),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_gh_cli_times_out() {
        let runner = GhCli::new("sleep", Duration::from_millis(100));
        let err = runner.run(&args(&["5"])).await.unwrap_err();
        assert!(matches!(err, RunnerError::TimedOut));
    }

    #[tokio::test]
    async fn test_gh_cli_missing_program_is_spawn_error() {
        let runner = GhCli::new("definitely-not-a-real-gh-binary", DEFAULT_TIMEOUT);
        let err = runner.run(&args(&["issue", "list"])).await.unwrap_err();
        assert!(matches!(err, RunnerError::Spawn { .. }));
    }

    #[tokio::test]
    async fn test_mock_runner_records_and_replays() {
        let mock = testing::MockRunner::new();
        mock.push_response(Err(RunnerError::TimedOut));
        assert!(mock.run(&args(&["a"])).await.is_err());
        assert_eq!(mock.run(&args(&["b"])).await.unwrap(), "");
        assert_eq!(mock.call_count(), 2);
        assert_eq!(mock.calls()[1].args, vec!["b"]);
    }
}
