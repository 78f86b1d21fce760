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

use super::command_sequence::{run_best_effort, run_command_sequence};
use crate::domain::procedures::{
    disk_cleanup_commands, disk_procedure_commands, lvm_cleanup_commands, lvm_procedure_commands,
};
use crate::domain::{
    MachineInfo, MemoryInfo, ProcedureError, ProcedureKind, ProcedureSettings, DISTRO_INVALID,
};
use crate::ports::{CommandExecutor, MachineInfoProvider, MachineProbeService};
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Domain service that implements the machine report and storage procedures
///
/// Every call re-derives its inputs from the providers; nothing is cached
/// between iterations. The procedures mutate loop devices, mounts and volume
/// groups, so only one instance may run against a host at a time.
pub struct ProbeCollectionService {
    /// Machine information provider (platform-specific)
    system_provider: Arc<dyn MachineInfoProvider>,
    /// Executor for procedure commands
    command_executor: Arc<dyn CommandExecutor>,
    /// Builder tunables
    settings: ProcedureSettings,
    /// Per-command timeout
    command_timeout: Duration,
}

impl ProbeCollectionService {
    /// Create a new probe service
    ///
    /// # Arguments
    /// * `system_provider` - Platform-specific machine information provider
    /// * `command_executor` - Executor for procedure commands
    /// * `settings` - Builder tunables
    /// * `command_timeout` - Per-command timeout
    pub fn new(
        system_provider: Arc<dyn MachineInfoProvider>,
        command_executor: Arc<dyn CommandExecutor>,
        settings: ProcedureSettings,
        command_timeout: Duration,
    ) -> Self {
        Self {
            system_provider,
            command_executor,
            settings,
            command_timeout,
        }
    }

    async fn home_dir(&self) -> Result<PathBuf, ProcedureError> {
        self.system_provider
            .get_home_dir()
            .await
            .map_err(|e| ProcedureError::Environment(format!("failed to get home directory: {e}")))
    }

    async fn run_disk_procedure(&self) -> Result<(), ProcedureError> {
        let layout = self.settings.disk_layout(&self.home_dir().await?);

        run_best_effort(
            self.command_executor.as_ref(),
            &disk_cleanup_commands(&layout),
            self.command_timeout,
        )
        .await;

        run_command_sequence(
            self.command_executor.as_ref(),
            &disk_procedure_commands(&layout),
            self.command_timeout,
        )
        .await
    }

    async fn run_lvm_procedure(&self) -> Result<(), ProcedureError> {
        let home_dir = self.home_dir().await?;

        let loop_device = self
            .system_provider
            .find_free_loop_device()
            .await
            .map_err(|e| {
                ProcedureError::Environment(format!("failed to find free loop device: {e}"))
            })?;
        log::info!("Using loop device: {loop_device}");

        let layout = self.settings.lvm_layout(&home_dir, &loop_device);

        // Leftovers from a previous failed run
        run_best_effort(
            self.command_executor.as_ref(),
            &lvm_cleanup_commands(&layout),
            self.command_timeout,
        )
        .await;

        run_command_sequence(
            self.command_executor.as_ref(),
            &lvm_procedure_commands(&layout),
            self.command_timeout,
        )
        .await
    }
}

#[async_trait]
impl MachineProbeService for ProbeCollectionService {
    async fn collect_machine_info(&self) -> MachineInfo {
        let cpu_cores = self.system_provider.get_cpu_cores().await.unwrap_or_else(|e| {
            log::warn!("Reading CPU cores failed: {e}");
            0
        });

        let memory = self
            .system_provider
            .get_memory_info()
            .await
            .unwrap_or_else(|e| {
                log::warn!("Reading memory information failed: {e}");
                MemoryInfo::default()
            });

        let distribution = self
            .system_provider
            .get_distribution()
            .await
            .unwrap_or_else(|e| {
                log::warn!("Reading distribution failed: {e}");
                DISTRO_INVALID.to_string()
            });

        let devices = self
            .system_provider
            .get_pci_devices()
            .await
            .unwrap_or_else(|e| format!("Executing lspci failed: {e}\n"));

        MachineInfo {
            cpu_cores,
            memory,
            distribution,
            devices,
        }
    }

    async fn run_procedure(&self, procedure: ProcedureKind) -> Result<(), ProcedureError> {
        match procedure {
            ProcedureKind::Disk => self.run_disk_procedure().await,
            ProcedureKind::Lvm => self.run_lvm_procedure().await,
        }
    }

    async fn validate_dependencies(&self, procedure: ProcedureKind) -> Vec<String> {
        self.system_provider
            .get_missing_dependencies(procedure)
            .await
            .unwrap_or_else(|e| {
                log::warn!("Dependency validation failed: {e}");
                Vec::new()
            })
    }

    async fn check_privileges(&self) -> bool {
        self.system_provider
            .has_required_privileges()
            .await
            .unwrap_or_else(|e| {
                log::warn!("Privilege check failed: {e}");
                false
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::services::test_support::{RecordingExecutor, StubMachineInfoProvider};

    fn service(
        provider: StubMachineInfoProvider,
        executor: Arc<RecordingExecutor>,
    ) -> ProbeCollectionService {
        ProbeCollectionService::new(
            Arc::new(provider),
            executor,
            ProcedureSettings::default(),
            Duration::from_secs(5),
        )
    }

    #[tokio::test]
    async fn test_collect_machine_info() {
        let executor = Arc::new(RecordingExecutor::new());
        let info = service(StubMachineInfoProvider::healthy(), executor)
            .collect_machine_info()
            .await;

        assert_eq!(info.cpu_cores, 4);
        assert_eq!(info.memory.used_kb, 6144000);
        assert_eq!(info.memory.free_kb, 2048000);
        assert_eq!(info.distribution, "Ubuntu 22.04.3 LTS");
        assert!(info.devices.contains("VGA compatible controller"));
    }

    #[tokio::test]
    async fn test_collect_machine_info_degrades() {
        let executor = Arc::new(RecordingExecutor::new());
        let info = service(StubMachineInfoProvider::broken(), executor)
            .collect_machine_info()
            .await;

        assert_eq!(info.cpu_cores, 0);
        assert_eq!(info.memory, MemoryInfo::default());
        assert_eq!(info.distribution, DISTRO_INVALID);
        assert!(info.devices.starts_with("Executing lspci failed:"));
    }

    #[tokio::test]
    async fn test_disk_procedure_runs_cleanup_then_sequence() {
        let executor = Arc::new(RecordingExecutor::new());
        service(StubMachineInfoProvider::healthy(), executor.clone())
            .run_procedure(ProcedureKind::Disk)
            .await
            .unwrap();

        let layout = ProcedureSettings::default().disk_layout(&PathBuf::from("/home/tester"));
        let mut expected: Vec<String> = disk_cleanup_commands(&layout).as_slice().to_vec();
        expected.extend(disk_procedure_commands(&layout).iter().cloned());
        assert_eq!(executor.invoked(), expected);
    }

    #[tokio::test]
    async fn test_lvm_procedure_uses_discovered_loop_device() {
        let executor = Arc::new(RecordingExecutor::new());
        service(StubMachineInfoProvider::healthy(), executor.clone())
            .run_procedure(ProcedureKind::Lvm)
            .await
            .unwrap();

        let invoked = executor.invoked();
        assert!(invoked.contains(&"sudo pvcreate -y /dev/loop2".to_string()));
        assert_eq!(invoked.last().unwrap(), "sudo rm -rf /mnt/lvm1 /mnt/lvm2 /home/tester/file_systems_test");
    }

    #[tokio::test]
    async fn test_lvm_failure_stops_teardown() {
        let executor = Arc::new(
            RecordingExecutor::new().fail_on("sudo vgcreate testvg /dev/loop2", "vgcreate: denied"),
        );
        let err = service(StubMachineInfoProvider::healthy(), executor.clone())
            .run_procedure(ProcedureKind::Lvm)
            .await
            .unwrap_err();

        assert_eq!(err.command(), Some("sudo vgcreate testvg /dev/loop2"));
        assert_eq!(executor.invoked().last().unwrap(), "sudo vgcreate testvg /dev/loop2");
    }

    #[tokio::test]
    async fn test_environment_errors_abort_before_any_command() {
        let executor = Arc::new(RecordingExecutor::new());
        let svc = service(StubMachineInfoProvider::broken(), executor.clone());

        let disk = svc.run_procedure(ProcedureKind::Disk).await.unwrap_err();
        assert!(matches!(disk, ProcedureError::Environment(_)));
        assert!(disk.to_string().starts_with("failed to get home directory"));

        let lvm = svc.run_procedure(ProcedureKind::Lvm).await.unwrap_err();
        assert!(matches!(lvm, ProcedureError::Environment(_)));

        assert!(executor.invoked().is_empty());
    }

    #[tokio::test]
    async fn test_missing_loop_device_aborts_lvm() {
        let executor = Arc::new(RecordingExecutor::new());
        let provider = StubMachineInfoProvider::healthy().without_loop_device();

        let err = service(provider, executor.clone())
            .run_procedure(ProcedureKind::Lvm)
            .await
            .unwrap_err();

        assert!(err.to_string().starts_with("failed to find free loop device"));
        assert!(executor.invoked().is_empty());
    }

    #[tokio::test]
    async fn test_dependency_and_privilege_checks() {
        let executor = Arc::new(RecordingExecutor::new());
        let svc = service(StubMachineInfoProvider::healthy(), executor);
        assert_eq!(svc.validate_dependencies(ProcedureKind::Lvm).await, vec!["lspci"]);
        assert!(svc.check_privileges().await);

        let executor = Arc::new(RecordingExecutor::new());
        let svc = service(StubMachineInfoProvider::broken(), executor);
        assert!(svc.validate_dependencies(ProcedureKind::Disk).await.is_empty());
        assert!(!svc.check_privileges().await);
    }
}
