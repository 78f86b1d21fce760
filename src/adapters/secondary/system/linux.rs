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

//! Linux machine information provider

use crate::domain::{
    distribution_from_os_release, memory_info_from_meminfo, parse_losetup_output,
    parse_nproc_output, MemoryInfo, ProcedureKind, SystemError,
};
use crate::ports::{
    CommandExecutor, CommandOutput, FileReader, MachineInfoProvider, SystemCommand,
};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

pub const MEMINFO_PATH: &str = "/proc/meminfo";
pub const OS_RELEASE_PATH: &str = "/etc/os-release";

/// Tools every iteration needs
const COMMON_COMMANDS: &[&str] = &[
    "nproc",
    "lspci",
    "bash",
    "sudo",
    "fallocate",
    "mkfs.ext4",
    "losetup",
];
const DISK_COMMANDS: &[&str] = &["mount", "umount", "wipefs"];
const LVM_COMMANDS: &[&str] = &["pvcreate", "vgcreate", "lvcreate", "vgchange", "vgscan"];

/// Linux machine information provider using procfs and standard utilities
pub struct LinuxMachineInfoProvider {
    command_executor: Arc<dyn CommandExecutor>,
    file_reader: Arc<dyn FileReader>,
}

impl LinuxMachineInfoProvider {
    /// Create a new Linux machine information provider
    pub fn new(command_executor: Arc<dyn CommandExecutor>, file_reader: Arc<dyn FileReader>) -> Self {
        Self {
            command_executor,
            file_reader,
        }
    }

    async fn run(&self, command: SystemCommand, name: &str) -> Result<CommandOutput, SystemError> {
        let output = self
            .command_executor
            .execute(&command)
            .await
            .map_err(|e| SystemError::CommandFailed {
                command: name.to_string(),
                exit_code: None,
                stderr: e.to_string(),
            })?;

        if output.success {
            Ok(output)
        } else {
            Err(SystemError::CommandFailed {
                command: name.to_string(),
                exit_code: output.exit_code,
                stderr: output.stderr.trim().to_string(),
            })
        }
    }

    async fn read_text(&self, path: &str) -> Result<String, SystemError> {
        let bytes = self.file_reader.read(Path::new(path)).await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

#[async_trait]
impl MachineInfoProvider for LinuxMachineInfoProvider {
    async fn get_cpu_cores(&self) -> Result<u32, SystemError> {
        let nproc_cmd = SystemCommand::new("nproc").timeout(Duration::from_secs(5));
        let output = self.run(nproc_cmd, "nproc").await?;

        parse_nproc_output(&output.stdout).map_err(SystemError::ParseError)
    }

    async fn get_memory_info(&self) -> Result<MemoryInfo, SystemError> {
        let meminfo = self.read_text(MEMINFO_PATH).await?;
        Ok(memory_info_from_meminfo(&meminfo))
    }

    async fn get_distribution(&self) -> Result<String, SystemError> {
        let os_release = self.read_text(OS_RELEASE_PATH).await?;
        Ok(distribution_from_os_release(&os_release))
    }

    async fn get_pci_devices(&self) -> Result<String, SystemError> {
        let lspci_cmd = SystemCommand::new("lspci").timeout(Duration::from_secs(10));
        let output = self.run(lspci_cmd, "lspci").await?;
        Ok(output.stdout)
    }

    async fn get_home_dir(&self) -> Result<PathBuf, SystemError> {
        dirs::home_dir()
            .ok_or_else(|| SystemError::IoError("home directory could not be determined".to_string()))
    }

    async fn find_free_loop_device(&self) -> Result<String, SystemError> {
        let losetup_cmd = SystemCommand::shell("sudo losetup -f").timeout(Duration::from_secs(30));
        let output = self.run(losetup_cmd, "sudo losetup -f").await?;

        parse_losetup_output(&output.stdout).map_err(SystemError::ParseError)
    }

    async fn has_required_privileges(&self) -> Result<bool, SystemError> {
        self.command_executor
            .has_elevated_privileges()
            .await
            .map_err(|e| SystemError::CommandFailed {
                command: "privilege_check".to_string(),
                exit_code: None,
                stderr: e.to_string(),
            })
    }

    async fn get_missing_dependencies(
        &self,
        procedure: ProcedureKind,
    ) -> Result<Vec<String>, SystemError> {
        let specific = match procedure {
            ProcedureKind::Disk => DISK_COMMANDS,
            ProcedureKind::Lvm => LVM_COMMANDS,
        };

        let mut missing = Vec::new();
        for cmd in COMMON_COMMANDS.iter().chain(specific) {
            if let Ok(false) = self.command_executor.is_command_available(cmd).await {
                missing.push(cmd.to_string());
            }
        }
        Ok(missing)
    }
}
