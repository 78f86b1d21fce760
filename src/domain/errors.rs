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

use thiserror::Error;

/// Domain-level errors that don't expose infrastructure details
#[derive(Debug, Clone, Error)]
pub enum DomainError {
    /// System information unavailable
    #[error("System information unavailable: {0}")]
    SystemInfoUnavailable(String),
    /// Invalid configuration provided
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
    /// Data parsing failed
    #[error("Data parsing failed: {0}")]
    ParsingFailed(String),
}

/// System-level errors for adapters (not exposed to domain)
#[derive(Debug, Clone, Error)]
pub enum SystemError {
    /// Command execution failed
    #[error("Command '{command}' failed{}{}", exit_code_suffix(.exit_code), stderr_suffix(.stderr))]
    CommandFailed {
        command: String,
        exit_code: Option<i32>,
        stderr: String,
    },
    /// Command not found
    #[error("Command not found: {0}")]
    CommandNotFound(String),
    /// I/O operation failed
    #[error("I/O error: {0}")]
    IoError(String),
    /// Parsing error
    #[error("Parse error: {0}")]
    ParseError(String),
    /// Timeout
    #[error("Timeout: {0}")]
    Timeout(String),
}

fn exit_code_suffix(exit_code: &Option<i32>) -> String {
    exit_code
        .map(|code| format!(" with exit code {code}"))
        .unwrap_or_default()
}

fn stderr_suffix(stderr: &str) -> String {
    if stderr.is_empty() {
        String::new()
    } else {
        format!(": {stderr}")
    }
}

/// Convert system errors to domain errors (with context loss for abstraction)
impl From<SystemError> for DomainError {
    fn from(err: SystemError) -> Self {
        match err {
            SystemError::CommandFailed { command, .. } => {
                DomainError::SystemInfoUnavailable(format!("System command failed: {command}"))
            }
            SystemError::CommandNotFound(cmd) => {
                DomainError::SystemInfoUnavailable(format!("Missing dependency: {cmd}"))
            }
            SystemError::IoError(msg) => {
                DomainError::SystemInfoUnavailable(format!("I/O error: {msg}"))
            }
            SystemError::ParseError(msg) => DomainError::ParsingFailed(msg),
            SystemError::Timeout(msg) => {
                DomainError::SystemInfoUnavailable(format!("Timed out: {msg}"))
            }
        }
    }
}

/// Command execution errors
#[derive(Debug, Clone, Error)]
pub enum CommandError {
    /// System error occurred
    #[error(transparent)]
    System(#[from] SystemError),
    /// Command could not be spawned or did not finish
    #[error("Command execution failed: {0}")]
    ExecutionFailed(String),
}

/// Errors that abort a disk or LVM procedure for the current iteration
#[derive(Debug, Clone, Error)]
pub enum ProcedureError {
    /// A command in the sequence exited non-zero
    #[error("command failed: {command}\nOutput:\n{output}")]
    CommandFailed { command: String, output: String },
    /// A command in the sequence could not be run at all
    #[error("command failed: {command}\n{source}")]
    Execution {
        command: String,
        #[source]
        source: CommandError,
    },
    /// Home directory, loop device or similar could not be discovered
    #[error("{0}")]
    Environment(String),
}

impl ProcedureError {
    /// The command text that caused the failure, if any
    pub fn command(&self) -> Option<&str> {
        match self {
            ProcedureError::CommandFailed { command, .. }
            | ProcedureError::Execution { command, .. } => Some(command),
            ProcedureError::Environment(_) => None,
        }
    }
}
