//! Local filesystem checkpoint store.
//!
//! The checkpoint is a one-line text file. Writes go to a sibling temp file
//! that is renamed over the target, so a concurrent reader sees either the
//! old or the new value.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;

use crate::error::{AppError, Result};
use crate::models::Checkpoint;
use crate::storage::CheckpointStore;

/// File-backed checkpoint store.
#[derive(Debug, Clone)]
pub struct LocalCheckpointStore {
    path: PathBuf,
}

impl LocalCheckpointStore {
    /// Create a store backed by the given file. The file need not exist.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Ensure parent directory exists.
    async fn ensure_dir(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        Ok(())
    }

    /// Write bytes atomically (write to temp, then rename).
    async fn write_bytes(&self, bytes: &[u8]) -> Result<()> {
        self.ensure_dir().await?;

        let mut tmp_name = self.path.as_os_str().to_owned();
        tmp_name.push(".tmp");
        let tmp = PathBuf::from(tmp_name);

        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        file.sync_all().await?;
        drop(file);

        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }

    /// Read the file as text, returning None if it doesn't exist.
    async fn read_text(&self) -> Result<Option<String>> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::Io(e)),
        }
    }
}

#[async_trait]
impl CheckpointStore for LocalCheckpointStore {
    async fn read(&self) -> Result<Option<Checkpoint>> {
        match self.read_text().await? {
            Some(text) => Checkpoint::parse(&text).map(Some).map_err(|e| {
                log::error!("Unreadable checkpoint in {}", self.path.display());
                e
            }),
            None => Ok(None),
        }
    }

    async fn save(&self, checkpoint: &Checkpoint) -> Result<()> {
        self.write_bytes(checkpoint.format().as_bytes()).await?;
        log::debug!("Checkpoint {} written to {}", checkpoint, self.path.display());
        Ok(())
    }
}
