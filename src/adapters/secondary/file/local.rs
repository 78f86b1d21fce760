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

//! Local filesystem reader for system text files

use crate::domain::SystemError;
use crate::ports::FileReader;
use async_trait::async_trait;
use std::path::Path;
use tokio::fs;

/// Reads files from the local filesystem
pub struct LocalFileReader;

impl LocalFileReader {
    /// Create a new local file reader
    pub fn new() -> Self {
        Self
    }
}

impl Default for LocalFileReader {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FileReader for LocalFileReader {
    async fn read(&self, path: &Path) -> Result<Vec<u8>, SystemError> {
        fs::read(path)
            .await
            .map_err(|e| SystemError::IoError(format!("Failed to read {}: {}", path.display(), e)))
    }
}
