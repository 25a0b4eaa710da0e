// src/staging.rs

//! Archive staging during mirroring
//!
//! A downloaded archive must be fully buffered before indexing because the
//! indexer reads it more than once (validation, then storage). The staging
//! file is per-operation, exclusively owned by the mirror call that created
//! it, and deleted when the [`StagedArchive`] is dropped — on every exit
//! path, success or not.

use crate::error::{Error, Result};
use crate::upstream::ArchiveStream;
use futures::StreamExt;
use std::path::Path;
use tempfile::NamedTempFile;
use tokio::io::AsyncWriteExt;
use tracing::debug;

/// A fully-buffered package archive on disk
///
/// Dropping the value removes the backing file.
pub struct StagedArchive {
    file: NamedTempFile,
    size: u64,
}

impl StagedArchive {
    /// Drain an upstream byte stream into a staging file
    ///
    /// `staging_dir` of `None` uses the system temp directory.
    pub async fn buffer(mut stream: ArchiveStream, staging_dir: Option<&Path>) -> Result<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("wharf-stage-").suffix(".nupkg");
        let file = match staging_dir {
            Some(dir) => builder.tempfile_in(dir),
            None => builder.tempfile(),
        }
        .map_err(|e| Error::IoError(format!("failed to create staging file: {e}")))?;

        // Separate async handle; NamedTempFile keeps ownership of the path
        let reopened = file
            .reopen()
            .map_err(|e| Error::IoError(format!("failed to open staging file: {e}")))?;
        let mut writer = tokio::fs::File::from_std(reopened);

        let mut size: u64 = 0;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            writer
                .write_all(&chunk)
                .await
                .map_err(|e| Error::IoError(format!("failed to write staging file: {e}")))?;
            size += chunk.len() as u64;
        }
        writer
            .flush()
            .await
            .map_err(|e| Error::IoError(format!("failed to flush staging file: {e}")))?;

        debug!("Staged {} bytes at {}", size, file.path().display());
        Ok(Self { file, size })
    }

    /// Path of the staged archive, valid until drop
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Total bytes buffered
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Open a fresh read handle; the archive can be read multiple times
    pub async fn reopen(&self) -> Result<tokio::fs::File> {
        let file = self
            .file
            .reopen()
            .map_err(|e| Error::IoError(format!("failed to reopen staged archive: {e}")))?;
        Ok(tokio::fs::File::from_std(file))
    }
}

impl std::fmt::Debug for StagedArchive {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StagedArchive")
            .field("path", &self.path().to_path_buf())
            .field("size", &self.size)
            .finish()
    }
}

/// Path captured before drop, for tests asserting release
#[cfg(test)]
pub(crate) fn staged_path(archive: &StagedArchive) -> std::path::PathBuf {
    archive.path().to_path_buf()
}
