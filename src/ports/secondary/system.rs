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

use crate::domain::{MemoryInfo, ProcedureKind, SystemError};
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Secondary port - Raw file access
///
/// Lets parsers be fed from the real filesystem or from in-memory fixtures.
#[async_trait]
pub trait FileReader: Send + Sync {
    /// Read the whole file at `path`
    async fn read(&self, path: &Path) -> Result<Vec<u8>, SystemError>;
}

/// Secondary port - Machine information provider
///
/// This interface abstracts platform-specific collection of the values shown in
/// the machine report and of the environment the procedures depend on.
#[async_trait]
pub trait MachineInfoProvider: Send + Sync {
    /// Number of online processing units
    ///
    /// # Returns
    /// * `Ok(u32)` - Core count
    /// * `Err(SystemError)` - Error running or parsing the core-count utility
    async fn get_cpu_cores(&self) -> Result<u32, SystemError>;

    /// Used and available memory
    ///
    /// Malformed content degrades to zero; only unreadable sources are errors.
    async fn get_memory_info(&self) -> Result<MemoryInfo, SystemError>;

    /// Distribution pretty name, `"Invalid"` when the source is malformed
    async fn get_distribution(&self) -> Result<String, SystemError>;

    /// PCI device listing
    async fn get_pci_devices(&self) -> Result<String, SystemError>;

    /// Home directory of the invoking user
    async fn get_home_dir(&self) -> Result<PathBuf, SystemError>;

    /// First unused loop device (e.g. `/dev/loop0`)
    async fn find_free_loop_device(&self) -> Result<String, SystemError>;

    /// Check if running with root privileges
    async fn has_required_privileges(&self) -> Result<bool, SystemError>;

    /// Get list of tools required by `procedure` that are not on the PATH
    async fn get_missing_dependencies(
        &self,
        procedure: ProcedureKind,
    ) -> Result<Vec<String>, SystemError>;
}
