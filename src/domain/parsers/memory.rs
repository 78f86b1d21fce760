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

//! Memory information parsing functions

use super::common::parse_labeled_count;
use crate::domain::MemoryInfo;

/// Parse memory usage from `/proc/meminfo` content
///
/// MemTotal must be on the first line and MemAvailable on the third; no other
/// line is consulted.
///
/// # Arguments
/// * `meminfo` - Raw content of /proc/meminfo
///
/// # Returns
/// * `Ok(MemoryInfo)` - Used and available memory in KB
/// * `Err(String)` - Parse error description
pub fn parse_meminfo(meminfo: &str) -> Result<MemoryInfo, String> {
    let lines: Vec<&str> = meminfo.lines().collect();
    if lines.len() < 3 {
        return Err(format!(
            "expected at least 3 lines in meminfo, found {}",
            lines.len()
        ));
    }

    let total_kb = parse_labeled_count(lines[0], "MemTotal:")?;
    let available_kb = parse_labeled_count(lines[2], "MemAvailable:")?;

    Ok(MemoryInfo::from_total_and_available(total_kb, available_kb))
}

/// Memory usage from `/proc/meminfo` content, zero on any parse failure
pub fn memory_info_from_meminfo(meminfo: &str) -> MemoryInfo {
    parse_meminfo(meminfo).unwrap_or_else(|e| {
        log::warn!("/proc/meminfo is not in the expected format: {e}");
        MemoryInfo::default()
    })
}
