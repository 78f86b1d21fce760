/*
Copyright 2024 San Francisco Compute Company

Licensed under the Apache License, Version 2.0 (the "License");
you may not use this file except in compliance with the License.
You may obtain a copy of the License at

    http://www.apache.org/licenses/LICENSE-2.0

Unless required by applicable law or agreed to in writing, software
distributed under the License is distributed on an "AS IS" BASIS,
WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
See the License for the specific language governing permissions and
limitations under the License.
*/

//! Unix command execution adapter

use crate::domain::{CommandError, SystemError};
use crate::ports::{CommandExecutor, CommandOutput, SystemCommand, SHELL};
use async_trait::async_trait;
use std::io::ErrorKind;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;

/// Points stderr at the stdout pipe, then replaces the shell with the real command
const MERGE_STDERR_SCRIPT: &str = r#"exec 2>&1; exec "$0" "$@""#;

fn build_command(command: &SystemCommand) -> Command {
    if command.merge_stderr {
        let mut cmd = Command::new(SHELL);
        cmd.arg("-c")
            .arg(MERGE_STDERR_SCRIPT)
            .arg(&command.program)
            .args(&command.args);
        cmd
    } else {
        let mut cmd = Command::new(&command.program);
        cmd.args(&command.args);
        cmd
    }
}

/// Unix-based command executor with per-command timeouts
///
/// Each command runs exactly once; a non-zero exit is returned to the caller
/// as a normal [`CommandOutput`].
pub struct UnixCommandExecutor {
    /// Default timeout for commands
    default_timeout: Duration,
}

impl UnixCommandExecutor {
    /// Create a new Unix command executor
    ///
    /// # Arguments
    /// * `default_timeout` - Timeout for commands that do not set their own
    pub fn new(default_timeout: Duration) -> Self {
        Self { default_timeout }
    }

    /// Create a Unix command executor with default settings
    pub fn with_defaults() -> Self {
        Self::new(Duration::from_secs(30))
    }
}

#[async_trait]
impl CommandExecutor for UnixCommandExecutor {
    async fn execute(&self, command: &SystemCommand) -> Result<CommandOutput, CommandError> {
        let command_timeout = command.timeout.unwrap_or(self.default_timeout);

        let mut cmd = build_command(command);
        cmd.stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .stdin(Stdio::null())
            .kill_on_drop(true);

        log::trace!("Spawning: {} {}", command.program, command.args.join(" "));

        match timeout(command_timeout, cmd.output()).await {
            Ok(Ok(output)) => {
                let result = CommandOutput {
                    stdout: String::from_utf8_lossy(&output.stdout).to_string(),
                    stderr: String::from_utf8_lossy(&output.stderr).to_string(),
                    exit_code: output.status.code(),
                    success: output.status.success(),
                };

                if !result.success {
                    log::debug!(
                        "Command '{}' failed with exit code: {:?}",
                        command.program,
                        result.exit_code
                    );
                }

                Ok(result)
            }
            Ok(Err(e)) if e.kind() == ErrorKind::NotFound => {
                Err(SystemError::CommandNotFound(command.program.clone()).into())
            }
            Ok(Err(e)) => Err(CommandError::ExecutionFailed(format!(
                "Failed to execute command '{}': {}",
                command.program, e
            ))),
            Err(_) => Err(SystemError::Timeout(format!(
                "Command '{}' timed out after {:?}",
                command.script().unwrap_or(&command.program),
                command_timeout
            ))
            .into()),
        }
    }

    async fn is_command_available(&self, command_name: &str) -> Result<bool, CommandError> {
        let lookup = SystemCommand::shell(&format!("command -v {command_name}"))
            .timeout(Duration::from_secs(5));

        match self.execute(&lookup).await {
            Ok(output) => Ok(output.success && !output.stdout.trim().is_empty()),
            Err(_) => Ok(false), // If the lookup itself fails, assume command is not available
        }
    }

    async fn has_elevated_privileges(&self) -> Result<bool, CommandError> {
        // SAFETY: geteuid has no preconditions and cannot fail
        let euid = unsafe { libc::geteuid() };
        Ok(euid == 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_unix_command_executor_basic() {
        let executor = UnixCommandExecutor::with_defaults();

        let cmd = SystemCommand::new("echo").args(&["hello", "world"]);

        let result = executor.execute(&cmd).await.unwrap();
        assert!(result.success);
        assert_eq!(result.stdout.trim(), "hello world");
    }

    #[tokio::test]
    async fn test_non_zero_exit_is_not_an_error() {
        let executor = UnixCommandExecutor::with_defaults();

        let cmd = SystemCommand::shell("echo out; echo err >&2; exit 3");

        let result = executor.execute(&cmd).await.unwrap();
        assert!(!result.success);
        assert_eq!(result.exit_code, Some(3));
        assert_eq!(result.combined(), "out\nerr\n");
    }

    #[tokio::test]
    async fn test_merged_output_keeps_write_order() {
        let executor = UnixCommandExecutor::with_defaults();

        let cmd = SystemCommand::shell("echo first; echo second >&2; echo third; exit 2")
            .merge_stderr();

        let result = executor.execute(&cmd).await.unwrap();
        assert!(!result.success);
        assert_eq!(result.exit_code, Some(2));
        assert_eq!(result.stdout, "first\nsecond\nthird\n");
        assert!(result.stderr.is_empty());
    }

    #[tokio::test]
    async fn test_merged_plain_command_keeps_arguments() {
        let executor = UnixCommandExecutor::with_defaults();

        let cmd = SystemCommand::new("printf")
            .args(&["%s|%s\n", "two words", "$HOME"])
            .merge_stderr();

        let result = executor.execute(&cmd).await.unwrap();
        assert!(result.success);
        assert_eq!(result.stdout, "two words|$HOME\n");
    }

    #[tokio::test]
    async fn test_missing_program() {
        let executor = UnixCommandExecutor::with_defaults();

        let cmd = SystemCommand::new("definitely_not_a_real_command_12345");

        let err = executor.execute(&cmd).await.unwrap_err();
        assert!(matches!(
            err,
            CommandError::System(SystemError::CommandNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_command_availability_check() {
        let executor = UnixCommandExecutor::with_defaults();

        assert!(!executor
            .is_command_available("definitely_not_a_real_command_12345")
            .await
            .unwrap());
        assert!(executor.is_command_available("bash").await.unwrap());
    }

    #[tokio::test]
    async fn test_command_timeout() {
        let executor = UnixCommandExecutor::with_defaults();

        let cmd = SystemCommand::new("sleep")
            .args(&["10"])
            .timeout(Duration::from_millis(100));

        let result = executor.execute(&cmd).await;
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("timed out"));
    }

    #[tokio::test]
    async fn test_has_elevated_privileges() {
        let executor = UnixCommandExecutor::with_defaults();

        let is_root = executor.has_elevated_privileges().await.unwrap();
        // SAFETY: geteuid has no preconditions and cannot fail
        assert_eq!(is_root, unsafe { libc::geteuid() } == 0);
    }
}
