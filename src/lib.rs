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

//! Storage Probe Library
//!
//! Reports host information (CPU count, memory usage, distribution, PCI devices)
//! and exercises a loop-mounted ext4 lifecycle or an LVM lifecycle through an
//! ordered list of shell commands, using a Ports and Adapters (Hexagonal)
//! architecture for testability.
//!
//! # Architecture
//!
//! - **Domain**: Entities, parsers, command-list builders and the probe service
//! - **Ports**: Interfaces for command execution, file access and configuration
//! - **Adapters**: Linux and tokio-backed implementations
//!
//! # Usage
//!
//! ```rust,no_run
//! use storage_probe::{MachineProbeService, ProbeConfig, ProcedureKind};
//!
//! async fn example() -> Result<(), Box<dyn std::error::Error>> {
//!     let service = storage_probe::create_service(ProbeConfig::default())?;
//!
//!     println!("{}", service.collect_machine_info().await);
//!     service.run_procedure(ProcedureKind::Disk).await?;
//!     Ok(())
//! }
//! ```
//!
//! The procedures create loop devices, mounts and volume groups with fixed
//! names; run a single instance per host.

pub mod adapters;
pub mod container;
pub mod domain;
pub mod ports;

pub use adapters::{
    LinuxMachineInfoProvider, LocalFileReader, TomlFileConfigurationProvider, UnixCommandExecutor,
};
pub use container::{create_configuration_provider, ServiceContainer, SimpleConfigurationProvider};
pub use domain::{
    CommandList, DomainError, MachineInfo, MemoryInfo, ProbeConfig, ProcedureError,
    ProcedureKind, ProcedureSettings,
};
pub use ports::{
    CommandExecutor, ConfigurationProvider, FileReader, MachineInfoProvider, MachineProbeService,
};

use std::error::Error;
use std::path::Path;
use std::sync::Arc;

/// Create a probe service wired with the platform adapters
pub fn create_service(config: ProbeConfig) -> Result<Arc<dyn MachineProbeService>, Box<dyn Error>> {
    config.validate()?;
    ServiceContainer::new(config).create_probe_service()
}

/// Load configuration from an optional TOML file, falling back to defaults
pub async fn load_config(path: Option<&Path>) -> Result<ProbeConfig, DomainError> {
    create_configuration_provider(path).get_probe_config().await
}
