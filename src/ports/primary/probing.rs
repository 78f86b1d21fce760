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

use crate::domain::{MachineInfo, ProcedureError, ProcedureKind};
use async_trait::async_trait;

/// Primary port - Main interface offered by the probing domain
///
/// This is what external systems (CLI, library consumers) use to interact
/// with the machine report and storage procedures.
#[async_trait]
pub trait MachineProbeService: Send + Sync {
    /// Gather the machine report
    ///
    /// Never fails: every unavailable value degrades to zero, the `"Invalid"`
    /// sentinel or an explanatory message.
    async fn collect_machine_info(&self) -> MachineInfo;

    /// Run one disk or LVM lifecycle
    ///
    /// # Arguments
    /// * `procedure` - Which lifecycle to run
    ///
    /// # Returns
    /// * `Ok(())` - Every command succeeded
    /// * `Err(ProcedureError)` - The first failing command, or an environment
    ///   discovery failure
    async fn run_procedure(&self, procedure: ProcedureKind) -> Result<(), ProcedureError>;

    /// Tools required by `procedure` that are missing from the PATH
    async fn validate_dependencies(&self, procedure: ProcedureKind) -> Vec<String>;

    /// Check if the process runs with root privileges
    async fn check_privileges(&self) -> bool;
}
