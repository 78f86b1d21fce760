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

//! Sequential execution of shell command lists

use crate::domain::{CommandList, ProcedureError};
use crate::ports::{CommandExecutor, SystemCommand};
use std::time::Duration;

/// Run every command in order through the shell, stopping at the first failure
///
/// Commands after a failing one are never started. The captured output keeps
/// stdout and stderr interleaved as the command wrote them. There is no retry
/// and no rollback; cleanup belongs in the list itself or in [`run_best_effort`].
///
/// # Arguments
/// * `executor` - Command execution port
/// * `commands` - Ordered shell commands
/// * `timeout` - Per-command timeout
///
/// # Returns
/// * `Ok(())` - Every command exited zero
/// * `Err(ProcedureError)` - The failing command and its captured output
pub async fn run_command_sequence(
    executor: &dyn CommandExecutor,
    commands: &CommandList,
    timeout: Duration,
) -> Result<(), ProcedureError> {
    for command in commands {
        log::info!("Executing: {command}");

        let output = executor
            .execute(&SystemCommand::shell(command).merge_stderr().timeout(timeout))
            .await
            .map_err(|source| ProcedureError::Execution {
                command: command.clone(),
                source,
            })?;

        if !output.success {
            return Err(ProcedureError::CommandFailed {
                command: command.clone(),
                output: output.combined(),
            });
        }

        let combined = output.combined();
        if !combined.is_empty() {
            log::debug!("{command}:\n{}", combined.trim_end());
        }
    }

    Ok(())
}

/// Run every command in order, logging and ignoring individual failures
pub async fn run_best_effort(
    executor: &dyn CommandExecutor,
    commands: &CommandList,
    timeout: Duration,
) {
    for command in commands {
        log::debug!("Cleanup: {command}");

        match executor
            .execute(&SystemCommand::shell(command).timeout(timeout))
            .await
        {
            Ok(output) if !output.success => {
                log::debug!("Cleanup command '{command}' exited with {:?}", output.exit_code)
            }
            Err(e) => log::debug!("Cleanup command '{command}' could not run: {e}"),
            Ok(_) => {}
        }
    }
}
