//! Runner trait and the tokio-backed implementation

use async_trait::async_trait;
use lempman_core::{Error, Result};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::command::{CommandOutput, CommandSpec};

/// Executes commands. A non-zero exit is reported in the output, not as an error.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, spec: &CommandSpec) -> Result<CommandOutput>;

    /// Whether `program` is on `PATH` or names an existing file
    fn available(&self, program: &str) -> bool;
}

/// Runs real processes with tokio
#[derive(Debug, Clone)]
pub struct SystemRunner {
    default_timeout: Duration,
}

impl SystemRunner {
    pub fn new(default_timeout: Duration) -> Self {
        Self { default_timeout }
    }
}

impl Default for SystemRunner {
    fn default() -> Self {
        Self::new(Duration::from_secs(
            lempman_core::DEFAULT_COMMAND_TIMEOUT_SECS,
        ))
    }
}

#[async_trait]
impl CommandRunner for SystemRunner {
    async fn run(&self, spec: &CommandSpec) -> Result<CommandOutput> {
        let timeout = spec.timeout.unwrap_or(self.default_timeout);
        debug!("Running: {} (timeout {:?})", spec.display(), timeout);

        let mut cmd = Command::new(&spec.program);
        cmd.args(&spec.args)
            .envs(&spec.env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        if let Some(cwd) = &spec.cwd {
            cmd.current_dir(cwd);
        }

        let child = cmd.spawn().map_err(|e| {
            Error::CommandFailed(format!("Failed to start '{}': {}", spec.program, e))
        })?;

        // Dropping the wait future on timeout kills the child
        let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
            Ok(result) => result.map_err(|e| {
                Error::CommandFailed(format!("Failed to wait for '{}': {}", spec.program, e))
            })?,
            Err(_) => {
                warn!("Command timed out after {:?}: {}", timeout, spec.program);
                return Err(Error::CommandTimeout(spec.program.clone()));
            }
        };

        let result = CommandOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };

        if !result.success() {
            debug!("{} exited with {:?}", spec.program, result.code);
        }
        Ok(result)
    }

    fn available(&self, program: &str) -> bool {
        which::which(program).is_ok() || std::path::Path::new(program).is_file()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_run_captures_stdout() {
        let runner = SystemRunner::default();
        let output = runner
            .run(&CommandSpec::new("echo").arg("hello; rm -rf /"))
            .await
            .unwrap();

        assert!(output.success());
        // Arguments are never interpreted by a shell
        assert_eq!(output.stdout.trim(), "hello; rm -rf /");
    }

    #[tokio::test]
    async fn test_nonzero_exit_is_not_error() {
        let runner = SystemRunner::default();
        let output = runner.run(&CommandSpec::new("false")).await.unwrap();
        assert!(!output.success());
        assert_eq!(output.code, Some(1));
    }

    #[tokio::test]
    async fn test_missing_program() {
        let runner = SystemRunner::default();
        let result = runner
            .run(&CommandSpec::new("nonexistent_command_12345"))
            .await;
        assert!(matches!(result, Err(Error::CommandFailed(_))));
        assert!(!runner.available("nonexistent_command_12345"));
    }

    #[test]
    fn test_available_by_name_or_path() {
        let dir = tempdir().unwrap();
        let script = dir.path().join("pre-check.sh");
        std::fs::write(&script, "#!/bin/sh\n").unwrap();

        let runner = SystemRunner::default();
        assert!(runner.available("sh"));
        assert!(runner.available(&script.to_string_lossy()));
        assert!(!runner.available(&dir.path().join("install.sh").to_string_lossy()));
    }

    #[tokio::test]
    async fn test_timeout() {
        let runner = SystemRunner::default();
        let result = runner
            .run(&CommandSpec::new("sleep").arg("5").timeout(Duration::from_millis(100)))
            .await;
        assert!(matches!(result, Err(Error::CommandTimeout(_))));
    }

    #[tokio::test]
    async fn test_cwd_and_env() {
        let dir = tempdir().unwrap();
        let runner = SystemRunner::default();

        let output = runner
            .run(&CommandSpec::new("pwd").cwd(dir.path()))
            .await
            .unwrap();
        let expected = dir.path().canonicalize().unwrap();
        assert_eq!(
            std::path::Path::new(output.stdout.trim()).canonicalize().unwrap(),
            expected
        );

        let output = runner
            .run(&CommandSpec::new("printenv").arg("LEMPMAN_TEST").env("LEMPMAN_TEST", "42"))
            .await
            .unwrap();
        assert_eq!(output.stdout.trim(), "42");
    }
}
