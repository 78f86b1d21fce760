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

//! Common parsing utilities and helper functions

use lazy_static::lazy_static;
use regex::Regex;
use std::borrow::Cow;

lazy_static! {
    pub static ref LOOP_DEVICE_RE: Regex = Regex::new(r"^/dev/loop\d+$").unwrap();
    pub static ref IMAGE_SIZE_RE: Regex = Regex::new(r"^\d+(?:[KMGTP](?:i?B)?)?$").unwrap();
    pub static ref VOLUME_GROUP_RE: Regex = Regex::new(r"^[A-Za-z0-9+_.][A-Za-z0-9+_.-]*$").unwrap();
    static ref SHELL_SAFE_RE: Regex = Regex::new(r"^[A-Za-z0-9_./%+:=@,-]+$").unwrap();
}

/// Parse a `Label:   <integer> [unit]` line and return the integer
///
/// # Arguments
/// * `line` - Line to parse (e.g., "MemTotal:       8192000 kB")
/// * `label` - Expected label including the colon (e.g., "MemTotal:")
///
/// # Returns
/// * `Ok(u64)` - The integer following the label
/// * `Err(String)` - Label mismatch or non-numeric value
pub fn parse_labeled_count(line: &str, label: &str) -> Result<u64, String> {
    let mut fields = line.split_whitespace();

    match fields.next() {
        Some(first) if first.starts_with(label) => {}
        Some(first) => return Err(format!("expected '{label}' but found '{first}'")),
        None => return Err(format!("expected '{label}' but found an empty line")),
    }

    let value = fields
        .next()
        .ok_or_else(|| format!("no value after '{label}'"))?;

    value
        .parse::<u64>()
        .map_err(|e| format!("invalid value '{value}' for '{label}': {e}"))
}

/// Quote a string for safe interpolation into a `bash -c` command
///
/// Strings made only of shell-safe characters are returned unchanged so that
/// ordinary paths read naturally in logs.
pub fn shell_quote(value: &str) -> Cow<'_, str> {
    if SHELL_SAFE_RE.is_match(value) {
        Cow::Borrowed(value)
    } else {
        Cow::Owned(format!("'{}'", value.replace('\'', r"'\''")))
    }
}
