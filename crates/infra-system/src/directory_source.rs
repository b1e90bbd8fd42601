// Inbox directory key file source
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use keygate_core::domain::{KeyFile, KeyFileBatch};
use keygate_core::error::{ProvisionError, Result};
use keygate_core::port::KeyFileSource;

/// Subdirectory of the inbox receiving provided files
pub const PROVIDED_DIR_NAME: &str = "provided";

/// Key files downloaded into an inbox directory
///
/// Pending files are regular files with the configured extension, in file
/// name order. Provided files are moved into `provided/`.
pub struct DirectoryKeySource {
    inbox: PathBuf,
    extension: String,
}

impl DirectoryKeySource {
    pub fn new(inbox: impl Into<PathBuf>, extension: impl Into<String>) -> Self {
        Self {
            inbox: inbox.into(),
            extension: extension.into(),
        }
    }

    fn provided_dir(&self) -> PathBuf {
        self.inbox.join(PROVIDED_DIR_NAME)
    }
}

fn source_error(action: &str, path: &Path, e: std::io::Error) -> ProvisionError {
    ProvisionError::Source(format!("cannot {} {}: {}", action, path.display(), e))
}

#[async_trait]
impl KeyFileSource for DirectoryKeySource {
    async fn pending(&self) -> Result<KeyFileBatch> {
        let mut entries = match tokio::fs::read_dir(&self.inbox).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(inbox = %self.inbox.display(), "Inbox does not exist yet");
                return Ok(KeyFileBatch::empty());
            }
            Err(e) => return Err(source_error("read", &self.inbox, e)),
        };

        // Acknowledgement target must exist before anything is offered,
        // otherwise a forwarded batch could never be marked provided
        let provided_dir = self.provided_dir();
        tokio::fs::create_dir_all(&provided_dir)
            .await
            .map_err(|e| source_error("prepare", &provided_dir, e))?;

        let mut paths = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| source_error("read", &self.inbox, e))?
        {
            let path = entry.path();
            let is_file = entry
                .file_type()
                .await
                .map(|t| t.is_file())
                .unwrap_or(false);
            let matches_ext = path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e == self.extension);
            if is_file && matches_ext {
                paths.push(path);
            }
        }
        paths.sort();

        debug!(files = paths.len(), "Pending key files listed");
        Ok(paths.into_iter().collect())
    }

    async fn mark_provided(&self, batch: &KeyFileBatch) -> Result<()> {
        let provided_dir = self.provided_dir();
        tokio::fs::create_dir_all(&provided_dir)
            .await
            .map_err(|e| source_error("prepare", &provided_dir, e))?;

        for key_file in batch {
            let Some(name) = key_file.file_name() else {
                continue;
            };
            match tokio::fs::rename(key_file.path(), provided_dir.join(name)).await {
                Ok(()) => {}
                // Duplicate entries in one batch: first rename already moved it
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(source_error("move", key_file.path(), e)),
            }
        }

        info!(files = batch.len(), "Key files marked as provided");
        Ok(())
    }
}
