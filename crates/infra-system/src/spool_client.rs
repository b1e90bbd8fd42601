// Spool directory matching client
// reason: tokio::fs for non-blocking hand-off to the engine's spool
use async_trait::async_trait;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

use keygate_core::domain::KeyFileBatch;
use keygate_core::port::{ExposureMatchingClient, IdProvider, MatchingError, TimeProvider};

/// Name of the per-batch manifest the engine reads first
pub const MANIFEST_FILE_NAME: &str = "manifest.json";

const STAGING_PREFIX: &str = ".staging-";
const BATCH_PREFIX: &str = "batch-";

/// Batch description written next to the copied key files
#[derive(Debug, Serialize)]
struct BatchManifest<'a> {
    batch_id: &'a str,
    created_at: String,
    files: Vec<String>,
}

/// Hands batches to the engine through its spool directory
///
/// Each batch becomes one `batch-{id}` directory holding copies of the key
/// files plus a manifest. The directory is staged under a hidden name and
/// renamed into place, so the engine never sees a partial batch.
pub struct SpoolMatchingClient {
    spool_dir: PathBuf,
    id_provider: Arc<dyn IdProvider>,
    time_provider: Arc<dyn TimeProvider>,
}

impl SpoolMatchingClient {
    /// Create a new spool client
    ///
    /// # Arguments
    /// * `spool_dir` - Directory the engine watches (must exist)
    /// * `id_provider` - Batch id generator
    /// * `time_provider` - Clock for manifest timestamps
    pub fn new(
        spool_dir: impl Into<PathBuf>,
        id_provider: Arc<dyn IdProvider>,
        time_provider: Arc<dyn TimeProvider>,
    ) -> Self {
        Self {
            spool_dir: spool_dir.into(),
            id_provider,
            time_provider,
        }
    }

    pub fn spool_dir(&self) -> &Path {
        &self.spool_dir
    }

    /// Remove staging directories left behind by an interrupted hand-off
    ///
    /// Call before the first batch is provided. Completed `batch-*`
    /// directories are left alone.
    ///
    /// # Returns
    /// Number of staging directories removed
    pub async fn remove_stale_staging(&self) -> Result<usize, MatchingError> {
        let mut entries = match tokio::fs::read_dir(&self.spool_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(io_error(e)),
        };

        let mut removed = 0;
        while let Some(entry) = entries.next_entry().await.map_err(io_error)? {
            let is_staging = entry
                .file_name()
                .to_str()
                .is_some_and(|n| n.starts_with(STAGING_PREFIX));
            if is_staging {
                tokio::fs::remove_dir_all(entry.path())
                    .await
                    .map_err(io_error)?;
                removed += 1;
            }
        }

        if removed > 0 {
            warn!(
                removed = removed,
                spool = %self.spool_dir.display(),
                "Removed stale staging directories"
            );
        }
        Ok(removed)
    }

    /// Copy files and write manifest into the staging directory
    async fn stage(
        &self,
        staging: &Path,
        batch_id: &str,
        batch: &KeyFileBatch,
    ) -> Result<(), MatchingError> {
        tokio::fs::create_dir(staging).await.map_err(io_error)?;

        let mut files = Vec::with_capacity(batch.len());
        for (index, key_file) in batch.iter().enumerate() {
            // Index prefix keeps batch order and tolerates duplicate names
            let name = format!(
                "{:04}-{}",
                index,
                key_file.file_name().unwrap_or("keyfile")
            );
            tokio::fs::copy(key_file.path(), staging.join(&name))
                .await
                .map_err(|e| {
                    MatchingError::Io(format!("cannot copy {}: {}", key_file, e))
                })?;
            files.push(name);
        }

        let manifest = BatchManifest {
            batch_id,
            created_at: self.time_provider.now_utc().to_rfc3339(),
            files,
        };
        let json = serde_json::to_vec_pretty(&manifest)
            .map_err(|e| MatchingError::Io(format!("cannot encode manifest: {}", e)))?;
        tokio::fs::write(staging.join(MANIFEST_FILE_NAME), json)
            .await
            .map_err(io_error)?;

        Ok(())
    }
}

fn io_error(e: std::io::Error) -> MatchingError {
    MatchingError::Io(e.to_string())
}

#[async_trait]
impl ExposureMatchingClient for SpoolMatchingClient {
    async fn provide_diagnosis_keys(&self, batch: &KeyFileBatch) -> Result<(), MatchingError> {
        if !tokio::fs::metadata(&self.spool_dir)
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false)
        {
            return Err(MatchingError::Unavailable(format!(
                "spool directory {} does not exist",
                self.spool_dir.display()
            )));
        }

        let batch_id = self.id_provider.generate_id();
        let staging = self
            .spool_dir
            .join(format!("{}{}", STAGING_PREFIX, batch_id));
        let target = self.spool_dir.join(format!("{}{}", BATCH_PREFIX, batch_id));

        if let Err(e) = self.stage(&staging, &batch_id, batch).await {
            warn!(batch_id = %batch_id, error = %e, "Staging batch failed, discarding");
            let _ = tokio::fs::remove_dir_all(&staging).await;
            return Err(e);
        }

        if let Err(e) = tokio::fs::rename(&staging, &target).await {
            let _ = tokio::fs::remove_dir_all(&staging).await;
            return Err(io_error(e));
        }

        info!(
            batch_id = %batch_id,
            files = batch.len(),
            target = %target.display(),
            "Batch spooled to matching engine"
        );
        Ok(())
    }
}
