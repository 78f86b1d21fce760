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

use crate::domain::CommandError;
use async_trait::async_trait;
use std::time::Duration;

/// Shell interpreter used for procedure commands
pub const SHELL: &str = "bash";

/// Represents a system command to be executed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemCommand {
    /// Command program name
    pub program: String,
    /// Command arguments
    pub args: Vec<String>,
    /// Execution timeout
    pub timeout: Option<Duration>,
    /// Send stderr into the stdout pipe so both streams keep their relative order
    pub merge_stderr: bool,
}

impl SystemCommand {
    /// Create a new system command
    pub fn new(program: &str) -> Self {
        Self {
            program: program.to_string(),
            args: Vec::new(),
            timeout: None,
            merge_stderr: false,
        }
    }

    /// Create a command that runs `script` through the shell interpreter
    pub fn shell(script: &str) -> Self {
        Self::new(SHELL).args(&["-c", script])
    }

    /// Add arguments to the command
    pub fn args(mut self, args: &[&str]) -> Self {
        self.args = args.iter().map(|s| s.to_string()).collect();
        self
    }

    /// Set execution timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Capture stderr interleaved with stdout, leaving `CommandOutput::stderr` empty
    pub fn merge_stderr(mut self) -> Self {
        self.merge_stderr = true;
        self
    }

    /// The script passed to the shell, if this is a shell command
    pub fn script(&self) -> Option<&str> {
        match self.args.as_slice() {
            [flag, script] if self.program == SHELL && flag == "-c" => Some(script.as_str()),
            _ => None,
        }
    }
}

/// Command execution result
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Standard output
    pub stdout: String,
    /// Standard error
    pub stderr: String,
    /// Exit status code
    pub exit_code: Option<i32>,
    /// Whether command was successful
    pub success: bool,
}

impl CommandOutput {
    /// Standard output followed by standard error
    ///
    /// For commands run with [`SystemCommand::merge_stderr`] this is the
    /// interleaved output exactly as the command wrote it.
    pub fn combined(&self) -> String {
        let mut combined = String::with_capacity(self.stdout.len() + self.stderr.len());
        combined.push_str(&self.stdout);
        combined.push_str(&self.stderr);
        combined
    }
}

/// Secondary port - Command execution abstraction
///
/// This interface abstracts system command execution, allowing for different
/// implementations (direct execution, mocked for testing, etc.)
#[async_trait]
pub trait CommandExecutor: Send + Sync {
    /// Execute a system command
    ///
    /// A non-zero exit is reported through `CommandOutput::success`, not as an
    /// error. Errors mean the command could not be run or did not finish.
    ///
    /// # Arguments
    /// * `command` - The command to execute
    ///
    /// # Returns
    /// * `Ok(CommandOutput)` - Command output and status
    /// * `Err(CommandError)` - Error executing command
    async fn execute(&self, command: &SystemCommand) -> Result<CommandOutput, CommandError>;

    /// Check if a command is available on the system
    ///
    /// # Arguments
    /// * `command_name` - Name of the command to check
    ///
    /// # Returns
    /// * `Ok(bool)` - true if command is available
    /// * `Err(CommandError)` - Error checking command availability
    async fn is_command_available(&self, command_name: &str) -> Result<bool, CommandError>;

    /// Check if running with elevated privileges
    ///
    /// # Returns
    /// * `Ok(bool)` - true if running as root
    /// * `Err(CommandError)` - Error checking privileges
    async fn has_elevated_privileges(&self) -> Result<bool, CommandError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shell_command() {
        let cmd = SystemCommand::shell("sudo losetup -f").timeout(Duration::from_secs(5));
        assert_eq!(cmd.program, "bash");
        assert_eq!(cmd.args, vec!["-c".to_string(), "sudo losetup -f".to_string()]);
        assert_eq!(cmd.script(), Some("sudo losetup -f"));
        assert_eq!(cmd.timeout, Some(Duration::from_secs(5)));
        assert!(!cmd.merge_stderr);
        assert!(SystemCommand::shell("true").merge_stderr().merge_stderr);
    }

    #[test]
    fn test_plain_command_has_no_script() {
        assert_eq!(SystemCommand::new("nproc").script(), None);
    }

    #[test]
    fn test_combined_output() {
        let output = CommandOutput {
            stdout: "mke2fs 1.47.0\n".to_string(),
            stderr: "mount: /mnt/disk1: permission denied\n".to_string(),
            exit_code: Some(32),
            success: false,
        };
        assert_eq!(
            output.combined(),
            "mke2fs 1.47.0\nmount: /mnt/disk1: permission denied\n"
        );

        let merged = CommandOutput {
            stdout: "mke2fs 1.47.0\nmkfs.ext4: Device size reported to be zero\nDiscarding device blocks: done\n".to_string(),
            stderr: String::new(),
            exit_code: Some(1),
            success: false,
        };
        assert_eq!(merged.combined(), merged.stdout);
    }
}
