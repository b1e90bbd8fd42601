// Version guard adapters
use async_trait::async_trait;
use std::path::PathBuf;
use tracing::debug;

use keygate_core::domain::EngineVersion;
use keygate_core::error::{ProvisionError, Result};
use keygate_core::port::VersionGuard;

/// Reads the installed engine version from a file published by the engine
///
/// The file holds a single integer, e.g. `17000000`.
pub struct FileVersionGuard {
    path: PathBuf,
}

impl FileVersionGuard {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl VersionGuard for FileVersionGuard {
    async fn current_version(&self) -> Result<EngineVersion> {
        let raw = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            ProvisionError::VersionUnavailable(format!(
                "cannot read {}: {}",
                self.path.display(),
                e
            ))
        })?;

        let version = raw.parse::<EngineVersion>().map_err(|e| {
            ProvisionError::VersionUnavailable(format!(
                "malformed version in {}: {}",
                self.path.display(),
                e
            ))
        })?;

        debug!(version = %version, path = %self.path.display(), "Engine version read");
        Ok(version)
    }
}

/// Guard reporting a fixed installed version
pub struct StaticVersionGuard {
    version: EngineVersion,
}

impl StaticVersionGuard {
    pub fn new(version: EngineVersion) -> Self {
        Self { version }
    }
}

#[async_trait]
impl VersionGuard for StaticVersionGuard {
    async fn current_version(&self) -> Result<EngineVersion> {
        Ok(self.version)
    }
}
