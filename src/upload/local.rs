//! Local artifact inspection

use crate::config::DesiredFile;
use crate::digest;
use serde::Serialize;
use std::io;

/// A desired file verified to exist locally
#[derive(Debug, Clone, Serialize)]
pub struct LocalArtifact {
    pub file: DesiredFile,
    pub size: u64,
    /// Hex SHA256 of the contents
    pub sha256: String,
}

impl LocalArtifact {
    /// Stat and hash a desired file; `Ok(None)` when it is absent or not a regular file
    pub async fn inspect(file: &DesiredFile) -> io::Result<Option<Self>> {
        let metadata = match tokio::fs::metadata(&file.path).await {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e),
        };
        if !metadata.is_file() {
            return Ok(None);
        }

        let sha256 = digest::sha256_file(&file.path).await?;
        Ok(Some(Self {
            file: file.clone(),
            size: metadata.len(),
            sha256,
        }))
    }

    pub fn name(&self) -> &str {
        &self.file.name
    }
}
