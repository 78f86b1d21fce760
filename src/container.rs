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

//! Dependency injection container for the probe services

use crate::adapters::{
    LinuxMachineInfoProvider, LocalFileReader, TomlFileConfigurationProvider, UnixCommandExecutor,
};
use crate::domain::{DomainError, ProbeCollectionService, ProbeConfig};
use crate::ports::{
    CommandExecutor, ConfigurationProvider, FileReader, MachineInfoProvider, MachineProbeService,
};
use std::error::Error;
use std::path::Path;
use std::sync::Arc;

/// Configuration provider that hands out a fixed configuration
pub struct SimpleConfigurationProvider {
    config: ProbeConfig,
}

impl SimpleConfigurationProvider {
    pub fn new(config: ProbeConfig) -> Self {
        Self { config }
    }
}

#[async_trait::async_trait]
impl ConfigurationProvider for SimpleConfigurationProvider {
    async fn get_probe_config(&self) -> Result<ProbeConfig, DomainError> {
        self.config.validate()?;
        Ok(self.config.clone())
    }
}

/// Dependency injection container
pub struct ServiceContainer {
    config: ProbeConfig,
}

impl ServiceContainer {
    /// Create a new service container with configuration
    pub fn new(config: ProbeConfig) -> Self {
        Self { config }
    }

    /// Create the command executor
    pub fn create_command_executor(&self) -> Arc<dyn CommandExecutor> {
        Arc::new(UnixCommandExecutor::new(self.config.command_timeout))
    }

    /// Create the file reader
    pub fn create_file_reader(&self) -> Arc<dyn FileReader> {
        Arc::new(LocalFileReader::new())
    }

    /// Create the platform-specific machine info provider
    pub fn create_machine_info_provider(
        &self,
        command_executor: Arc<dyn CommandExecutor>,
    ) -> Result<Arc<dyn MachineInfoProvider>, Box<dyn Error>> {
        if !cfg!(target_os = "linux") {
            return Err("Unsupported operating system".into());
        }

        Ok(Arc::new(LinuxMachineInfoProvider::new(
            command_executor,
            self.create_file_reader(),
        )))
    }

    /// Create the probe service
    pub fn create_probe_service(&self) -> Result<Arc<dyn MachineProbeService>, Box<dyn Error>> {
        let command_executor = self.create_command_executor();
        let system_provider = self.create_machine_info_provider(command_executor.clone())?;

        let service = ProbeCollectionService::new(
            system_provider,
            command_executor,
            self.config.settings.clone(),
            self.config.command_timeout,
        );

        Ok(Arc::new(service))
    }
}

/// Configuration provider for an optional TOML file; defaults when `None`
pub fn create_configuration_provider(path: Option<&Path>) -> Arc<dyn ConfigurationProvider> {
    match path {
        Some(path) => Arc::new(TomlFileConfigurationProvider::new(
            Arc::new(LocalFileReader::new()),
            path,
        )),
        None => Arc::new(SimpleConfigurationProvider::new(ProbeConfig::default())),
    }
}
