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

//! System information parsing functions

use super::common::LOOP_DEVICE_RE;
use crate::domain::DISTRO_INVALID;

const PRETTY_NAME_PREFIX: &str = "PRETTY_NAME=";

/// Parse the distribution name from `/etc/os-release` content
///
/// Only the first line is inspected and it must start with `PRETTY_NAME=`.
pub fn parse_os_release_pretty_name(os_release: &str) -> Result<String, String> {
    let first_line = os_release.split('\n').next().unwrap_or_default();

    first_line
        .strip_prefix(PRETTY_NAME_PREFIX)
        .map(|value| value.trim_matches('"').to_string())
        .ok_or_else(|| format!("first line does not start with '{PRETTY_NAME_PREFIX}'"))
}

/// Distribution name from `/etc/os-release` content, `"Invalid"` when absent
pub fn distribution_from_os_release(os_release: &str) -> String {
    parse_os_release_pretty_name(os_release).unwrap_or_else(|e| {
        log::warn!("/etc/os-release is not in the expected format: {e}");
        DISTRO_INVALID.to_string()
    })
}

/// Parse the processing unit count printed by `nproc`
pub fn parse_nproc_output(nproc_output: &str) -> Result<u32, String> {
    let trimmed = nproc_output.trim();
    trimmed
        .parse::<u32>()
        .map_err(|e| format!("invalid nproc output '{trimmed}': {e}"))
}

/// Parse the device path printed by `losetup -f`
pub fn parse_losetup_output(losetup_output: &str) -> Result<String, String> {
    let device = losetup_output.trim();
    if LOOP_DEVICE_RE.is_match(device) {
        Ok(device.to_string())
    } else {
        Err(format!("unexpected losetup output '{device}'"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_pretty_name() {
        let os_release = "PRETTY_NAME=\"Ubuntu 22.04.3 LTS\"\nNAME=\"Ubuntu\"\nVERSION_ID=\"22.04\"\n";
        assert_eq!(
            parse_os_release_pretty_name(os_release).unwrap(),
            "Ubuntu 22.04.3 LTS"
        );
    }

    #[test]
    fn test_unquoted_pretty_name() {
        assert_eq!(
            distribution_from_os_release("PRETTY_NAME=Alpine Linux v3.19\n"),
            "Alpine Linux v3.19"
        );
    }

    #[test]
    fn test_invalid_os_release() {
        assert_eq!(distribution_from_os_release(""), DISTRO_INVALID);
        assert_eq!(
            distribution_from_os_release("\nPRETTY_NAME=\"Ubuntu 22.04.3 LTS\"\n"),
            DISTRO_INVALID
        );
        assert_eq!(
            distribution_from_os_release("NAME=\"Fedora Linux\"\nPRETTY_NAME=\"Fedora Linux 39\"\n"),
            DISTRO_INVALID
        );
        assert_eq!(
            distribution_from_os_release("pretty_name=\"Debian GNU/Linux 12\"\n"),
            DISTRO_INVALID
        );
    }

    #[test]
    fn test_parse_nproc_output() {
        assert_eq!(parse_nproc_output("16\n").unwrap(), 16);
        assert!(parse_nproc_output("NaN\n").is_err());
        assert!(parse_nproc_output("").is_err());
    }

    #[test]
    fn test_parse_losetup_output() {
        assert_eq!(parse_losetup_output("/dev/loop7\n").unwrap(), "/dev/loop7");
        assert!(parse_losetup_output("").is_err());
        assert!(parse_losetup_output("losetup: cannot find an unused loop device\n").is_err());
    }
}
