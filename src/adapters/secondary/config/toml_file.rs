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

//! TOML file configuration provider

use crate::domain::{DomainError, ProbeConfig, ProcedureKind, ProcedureSettings};
use crate::ports::{ConfigurationProvider, FileReader};
use async_trait::async_trait;
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// On-disk layout of the configuration file; absent keys keep their defaults
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ConfigFile {
    procedure: Option<ProcedureKind>,
    interval_secs: Option<u64>,
    iterations: Option<u64>,
    command_timeout_secs: Option<u64>,
    settings: ProcedureSettings,
}

/// Parse TOML configuration text on top of the built-in defaults
pub fn parse_config(contents: &str) -> Result<ProbeConfig, DomainError> {
    let file: ConfigFile = toml::from_str(contents)
        .map_err(|e| DomainError::InvalidConfiguration(format!("invalid TOML: {e}")))?;

    let defaults = ProbeConfig::default();
    let config = ProbeConfig {
        procedure: file.procedure.unwrap_or(defaults.procedure),
        interval: file
            .interval_secs
            .map(Duration::from_secs)
            .unwrap_or(defaults.interval),
        iterations: file.iterations.or(defaults.iterations),
        command_timeout: file
            .command_timeout_secs
            .map(Duration::from_secs)
            .unwrap_or(defaults.command_timeout),
        settings: file.settings,
    };

    config.validate()?;
    Ok(config)
}

/// Loads configuration from a TOML file
pub struct TomlFileConfigurationProvider {
    file_reader: Arc<dyn FileReader>,
    path: PathBuf,
}

impl TomlFileConfigurationProvider {
    /// Create a provider for the file at `path`
    pub fn new(file_reader: Arc<dyn FileReader>, path: impl Into<PathBuf>) -> Self {
        Self {
            file_reader,
            path: path.into(),
        }
    }
}

#[async_trait]
impl ConfigurationProvider for TomlFileConfigurationProvider {
    async fn get_probe_config(&self) -> Result<ProbeConfig, DomainError> {
        let bytes = self.file_reader.read(&self.path).await?;
        let contents = String::from_utf8(bytes).map_err(|e| {
            DomainError::InvalidConfiguration(format!("{} is not UTF-8: {e}", self.path.display()))
        })?;

        log::debug!("Loaded configuration from {}", self.path.display());
        parse_config(&contents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_empty_file_gives_defaults() {
        assert_eq!(parse_config("").unwrap(), ProbeConfig::default());
    }

    #[test]
    fn test_full_file() {
        let config = parse_config(
            r#"
procedure = "lvm"
interval_secs = 60
iterations = 3
command_timeout_secs = 120

[settings]
work_dir_name = "probe_scratch"
image_size = "256M"
mount_root = "/srv/probe"
volume_group = "probevg"
"#,
        )
        .unwrap();

        assert_eq!(config.procedure, ProcedureKind::Lvm);
        assert_eq!(config.interval, Duration::from_secs(60));
        assert_eq!(config.iterations, Some(3));
        assert_eq!(config.command_timeout, Duration::from_secs(120));
        assert_eq!(config.settings.work_dir_name, "probe_scratch");
        assert_eq!(config.settings.image_size, "256M");
        assert_eq!(config.settings.mount_root, Path::new("/srv/probe"));
        assert_eq!(config.settings.volume_group, "probevg");
    }

    #[test]
    fn test_partial_settings_keep_defaults() {
        let config = parse_config("[settings]\nimage_size = \"64M\"\n").unwrap();
        assert_eq!(config.settings.image_size, "64M");
        assert_eq!(config.settings.volume_group, "testvg");
        assert_eq!(config.procedure, ProcedureKind::Disk);
    }

    #[test]
    fn test_rejects_unknown_keys() {
        assert!(matches!(
            parse_config("interval = 5\n"),
            Err(DomainError::InvalidConfiguration(_))
        ));
        assert!(parse_config("[settings]\nvolume = \"x\"\n").is_err());
    }

    #[test]
    fn test_rejects_unknown_procedure() {
        assert!(parse_config("procedure = \"zfs\"\n").is_err());
    }

    #[test]
    fn test_rejects_unsafe_work_dir() {
        assert!(parse_config("[settings]\nwork_dir_name = \"../etc\"\n").is_err());
    }
}
