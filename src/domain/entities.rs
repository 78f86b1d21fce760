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

use super::errors::DomainError;
use super::parsers::{IMAGE_SIZE_RE, VOLUME_GROUP_RE};
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Sentinel reported when the distribution name cannot be determined
pub const DISTRO_INVALID: &str = "Invalid";

/// Memory usage derived from `/proc/meminfo`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemoryInfo {
    /// MemTotal minus MemAvailable, in KB
    pub used_kb: u64,
    /// MemAvailable, in KB
    pub free_kb: u64,
}

impl MemoryInfo {
    /// Build from the raw MemTotal and MemAvailable counts
    pub fn from_total_and_available(total_kb: u64, available_kb: u64) -> Self {
        Self {
            used_kb: total_kb.saturating_sub(available_kb),
            free_kb: available_kb,
        }
    }
}

/// Host information gathered at the start of every iteration
#[derive(Debug, Clone, PartialEq)]
pub struct MachineInfo {
    /// Number of online processing units (0 when unknown)
    pub cpu_cores: u32,
    /// Memory usage
    pub memory: MemoryInfo,
    /// PRETTY_NAME from os-release, or [`DISTRO_INVALID`]
    pub distribution: String,
    /// Raw PCI device listing
    pub devices: String,
}

fn kb_to_gb(kb: u64) -> f64 {
    kb as f64 / 1024.0 / 1024.0
}

fn kb_to_mb(kb: u64) -> f64 {
    kb as f64 / 1024.0
}

impl fmt::Display for MachineInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Machine Info ===")?;
        writeln!(f, "CPU cores: {}", self.cpu_cores)?;
        writeln!(
            f,
            "Used memory: {:.2} GB or {:.2} MB",
            kb_to_gb(self.memory.used_kb),
            kb_to_mb(self.memory.used_kb)
        )?;
        writeln!(
            f,
            "Free memory: {:.2} GB or {:.2} MB",
            kb_to_gb(self.memory.free_kb),
            kb_to_mb(self.memory.free_kb)
        )?;
        writeln!(f, "Distribution: {}", self.distribution)?;
        write!(f, "Devices:\n{}", self.devices)
    }
}

/// Which storage lifecycle an iteration exercises
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcedureKind {
    /// Loop-mounted ext4 image
    #[default]
    Disk,
    /// Physical volume, volume group and two logical volumes on a loop device
    Lvm,
}

impl fmt::Display for ProcedureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProcedureKind::Disk => write!(f, "Disk"),
            ProcedureKind::Lvm => write!(f, "LVM"),
        }
    }
}

/// Ordered list of shell commands
///
/// Later commands depend on the state left by earlier ones, so the order is
/// kept exactly as built.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandList(Vec<String>);

impl CommandList {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Append a command to the end of the list
    pub fn push(&mut self, command: impl Into<String>) {
        self.0.push(command.into());
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, String> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    /// Position of the first command equal to `command`
    pub fn position(&self, command: &str) -> Option<usize> {
        self.0.iter().position(|c| c == command)
    }
}

impl<S: Into<String>> FromIterator<S> for CommandList {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

impl<'a> IntoIterator for &'a CommandList {
    type Item = &'a String;
    type IntoIter = std::slice::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Tunables shared by the disk and LVM command-list builders
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcedureSettings {
    /// Directory created under the home directory for the backing image
    pub work_dir_name: String,
    /// Size passed to `fallocate -l`
    pub image_size: String,
    /// Parent directory of all mount points
    pub mount_root: PathBuf,
    /// Volume group name used by the LVM procedure
    pub volume_group: String,
}

impl Default for ProcedureSettings {
    fn default() -> Self {
        Self {
            work_dir_name: "file_systems_test".to_string(),
            image_size: "100M".to_string(),
            mount_root: PathBuf::from("/mnt"),
            volume_group: "testvg".to_string(),
        }
    }
}

impl ProcedureSettings {
    /// Resolve the disk procedure layout for the given home directory
    pub fn disk_layout(&self, home_dir: &Path) -> DiskLayout {
        let work_dir = home_dir.join(&self.work_dir_name);
        DiskLayout {
            image: work_dir.join("disk1"),
            work_dir,
            image_size: self.image_size.clone(),
            mount_point: self.mount_root.join("disk1"),
        }
    }

    /// Resolve the LVM procedure layout for the given home directory and loop device
    pub fn lvm_layout(&self, home_dir: &Path, loop_device: &str) -> LvmLayout {
        let work_dir = home_dir.join(&self.work_dir_name);
        LvmLayout {
            image: work_dir.join("disk1"),
            work_dir,
            image_size: self.image_size.clone(),
            loop_device: loop_device.to_string(),
            volume_group: self.volume_group.clone(),
            mount_points: [self.mount_root.join("lvm1"), self.mount_root.join("lvm2")],
        }
    }
}

/// Fully resolved parameters of the disk procedure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiskLayout {
    pub work_dir: PathBuf,
    pub image: PathBuf,
    pub image_size: String,
    pub mount_point: PathBuf,
}

/// Fully resolved parameters of the LVM procedure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LvmLayout {
    pub work_dir: PathBuf,
    pub image: PathBuf,
    pub image_size: String,
    pub loop_device: String,
    pub volume_group: String,
    /// Mount points of the first and second logical volume
    pub mount_points: [PathBuf; 2],
}

/// Runtime configuration of the probe loop
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeConfig {
    /// Procedure run after the machine report
    pub procedure: ProcedureKind,
    /// Delay between iterations
    pub interval: Duration,
    /// Stop after this many iterations, loop forever when `None`
    pub iterations: Option<u64>,
    /// Per-command timeout
    pub command_timeout: Duration,
    /// Builder tunables
    pub settings: ProcedureSettings,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            procedure: ProcedureKind::Disk,
            interval: Duration::from_secs(15),
            iterations: None,
            command_timeout: Duration::from_secs(300),
            settings: ProcedureSettings::default(),
        }
    }
}

impl ProbeConfig {
    /// Reject values that would produce unsafe or unusable commands
    pub fn validate(&self) -> Result<(), DomainError> {
        let invalid = |msg: String| Err(DomainError::InvalidConfiguration(msg));
        let settings = &self.settings;

        if self.iterations == Some(0) {
            return invalid("iteration count must be at least 1".to_string());
        }
        if self.command_timeout.is_zero() {
            return invalid("command timeout must be greater than zero".to_string());
        }
        if !IMAGE_SIZE_RE.is_match(&settings.image_size) {
            return invalid(format!("invalid image size '{}'", settings.image_size));
        }
        if settings.work_dir_name.is_empty()
            || settings.work_dir_name.contains('/')
            || settings.work_dir_name == "."
            || settings.work_dir_name == ".."
        {
            return invalid(format!(
                "work directory name '{}' must be a single path component",
                settings.work_dir_name
            ));
        }
        if !settings.mount_root.is_absolute() {
            return invalid(format!(
                "mount root '{}' must be absolute",
                settings.mount_root.display()
            ));
        }
        if !VOLUME_GROUP_RE.is_match(&settings.volume_group) {
            return invalid(format!("invalid volume group name '{}'", settings.volume_group));
        }
        Ok(())
    }
}
