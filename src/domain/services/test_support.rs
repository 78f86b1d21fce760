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

//! In-memory port implementations shared by unit tests

use crate::domain::{CommandError, MemoryInfo, ProcedureKind, SystemError};
use crate::ports::{
    CommandExecutor, CommandOutput, FileReader, MachineInfoProvider, SystemCommand,
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Records every command and answers from a script table
#[derive(Default)]
pub struct RecordingExecutor {
    invoked: Mutex<Vec<String>>,
    responses: HashMap<String, CommandOutput>,
    unrunnable: Vec<String>,
    missing_tools: Vec<String>,
    root: bool,
}

impl RecordingExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Exit non-zero with `output` on stderr when `command` runs
    pub fn fail_on(mut self, command: &str, output: &str) -> Self {
        self.responses.insert(
            command.to_string(),
            CommandOutput {
                stdout: String::new(),
                stderr: output.to_string(),
                exit_code: Some(1),
                success: false,
            },
        );
        self
    }

    /// Return an execution error (spawn failure) when `command` runs
    pub fn unrunnable(mut self, command: &str) -> Self {
        self.unrunnable.push(command.to_string());
        self
    }

    /// Succeed with `stdout` when `command` runs
    pub fn respond(mut self, command: &str, stdout: &str) -> Self {
        self.responses.insert(
            command.to_string(),
            CommandOutput {
                stdout: stdout.to_string(),
                stderr: String::new(),
                exit_code: Some(0),
                success: true,
            },
        );
        self
    }

    pub fn missing_tool(mut self, tool: &str) -> Self {
        self.missing_tools.push(tool.to_string());
        self
    }

    pub fn as_root(mut self) -> Self {
        self.root = true;
        self
    }

    /// Commands seen so far, shell scripts unwrapped
    pub fn invoked(&self) -> Vec<String> {
        self.invoked.lock().unwrap().clone()
    }
}

fn command_key(command: &SystemCommand) -> String {
    match command.script() {
        Some(script) => script.to_string(),
        None if command.args.is_empty() => command.program.clone(),
        None => format!("{} {}", command.program, command.args.join(" ")),
    }
}

#[async_trait]
impl CommandExecutor for RecordingExecutor {
    async fn execute(&self, command: &SystemCommand) -> Result<CommandOutput, CommandError> {
        let key = command_key(command);
        self.invoked.lock().unwrap().push(key.clone());

        if self.unrunnable.contains(&key) {
            return Err(CommandError::ExecutionFailed(format!(
                "Failed to execute command '{key}': No such file or directory"
            )));
        }

        Ok(self.responses.get(&key).cloned().unwrap_or(CommandOutput {
            stdout: String::new(),
            stderr: String::new(),
            exit_code: Some(0),
            success: true,
        }))
    }

    async fn is_command_available(&self, command_name: &str) -> Result<bool, CommandError> {
        Ok(!self.missing_tools.iter().any(|t| t == command_name))
    }

    async fn has_elevated_privileges(&self) -> Result<bool, CommandError> {
        Ok(self.root)
    }
}

/// Serves file contents from memory
#[derive(Default)]
pub struct InMemoryFileReader {
    files: HashMap<PathBuf, Vec<u8>>,
}

impl InMemoryFileReader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, path: &str, contents: &str) -> Self {
        self.files
            .insert(PathBuf::from(path), contents.as_bytes().to_vec());
        self
    }
}

#[async_trait]
impl FileReader for InMemoryFileReader {
    async fn read(&self, path: &Path) -> Result<Vec<u8>, SystemError> {
        self.files.get(path).cloned().ok_or_else(|| {
            SystemError::IoError(format!("{}: No such file or directory", path.display()))
        })
    }
}

/// Machine information provider answering from fixed values
pub struct StubMachineInfoProvider {
    healthy: bool,
    loop_device: Option<String>,
}

impl StubMachineInfoProvider {
    /// Four cores, 8 GB total with 2 GB available, `/home/tester`, `/dev/loop2`
    pub fn healthy() -> Self {
        Self {
            healthy: true,
            loop_device: Some("/dev/loop2".to_string()),
        }
    }

    /// Every query fails
    pub fn broken() -> Self {
        Self {
            healthy: false,
            loop_device: None,
        }
    }

    pub fn without_loop_device(mut self) -> Self {
        self.loop_device = None;
        self
    }

    fn check(&self, what: &str) -> Result<(), SystemError> {
        if self.healthy {
            Ok(())
        } else {
            Err(SystemError::IoError(format!("{what} unavailable")))
        }
    }
}

#[async_trait]
impl MachineInfoProvider for StubMachineInfoProvider {
    async fn get_cpu_cores(&self) -> Result<u32, SystemError> {
        self.check("nproc").map(|_| 4)
    }

    async fn get_memory_info(&self) -> Result<MemoryInfo, SystemError> {
        self.check("/proc/meminfo")
            .map(|_| MemoryInfo::from_total_and_available(8192000, 2048000))
    }

    async fn get_distribution(&self) -> Result<String, SystemError> {
        self.check("/etc/os-release")
            .map(|_| "Ubuntu 22.04.3 LTS".to_string())
    }

    async fn get_pci_devices(&self) -> Result<String, SystemError> {
        self.check("lspci")
            .map(|_| "00:02.0 VGA compatible controller: Intel Corporation UHD Graphics 620\n".to_string())
    }

    async fn get_home_dir(&self) -> Result<PathBuf, SystemError> {
        self.check("home directory")
            .map(|_| PathBuf::from("/home/tester"))
    }

    async fn find_free_loop_device(&self) -> Result<String, SystemError> {
        self.loop_device
            .clone()
            .ok_or_else(|| SystemError::ParseError("unexpected losetup output ''".to_string()))
    }

    async fn has_required_privileges(&self) -> Result<bool, SystemError> {
        self.check("id").map(|_| true)
    }

    async fn get_missing_dependencies(
        &self,
        _procedure: ProcedureKind,
    ) -> Result<Vec<String>, SystemError> {
        self.check("which").map(|_| vec!["lspci".to_string()])
    }
}
