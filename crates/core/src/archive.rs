//! Local archive packaging for folder downloads
//!
//! Each download gets its own scratch directory. The directory (the archive
//! included) is removed when the owning value is closed or dropped.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use bytes::Bytes;
use flate2::Compression;
use flate2::write::GzEncoder;
use futures::StreamExt;
use futures::stream::BoxStream;
use tempfile::TempDir;
use tokio_util::io::ReaderStream;

use crate::error::{Error, Result};

/// Name prefix of per-download scratch directories
pub const SCRATCH_PREFIX: &str = "tmp-folder-s3-files-";

/// Byte stream of an archive body
pub type ArchiveStream = BoxStream<'static, io::Result<Bytes>>;

/// Uniquely named temporary directory, removed children-first on close or drop
#[derive(Debug)]
pub struct ScratchDir {
    dir: Option<TempDir>,
    path: PathBuf,
}

impl ScratchDir {
    /// Create a fresh directory under `parent` (the OS temp dir when `None`)
    pub fn create(parent: Option<&Path>) -> Result<Self> {
        let parent = parent
            .map(Path::to_path_buf)
            .unwrap_or_else(std::env::temp_dir);

        let dir = tempfile::Builder::new()
            .prefix(SCRATCH_PREFIX)
            .tempdir_in(&parent)
            .map_err(|e| {
                Error::Io(io::Error::new(
                    e.kind(),
                    format!(
                        "Error creating temporary folder on server: '{}': {e}",
                        parent.display()
                    ),
                ))
            })?;

        let path = dir.path().to_path_buf();
        tracing::debug!(path = %path.display(), "Created scratch directory");
        Ok(Self {
            dir: Some(dir),
            path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Remove the directory and report failure
    pub fn close(mut self) -> Result<()> {
        match self.dir.take() {
            Some(dir) => dir.close().map_err(|e| self.removal_error(e)),
            None => Ok(()),
        }
    }

    fn removal_error(&self, e: io::Error) -> Error {
        Error::Io(io::Error::new(
            e.kind(),
            format!(
                "Error removing temporary folder on server: '{}': {e}",
                self.path.display()
            ),
        ))
    }
}

impl Drop for ScratchDir {
    fn drop(&mut self) {
        if let Some(dir) = self.dir.take() {
            if let Err(e) = dir.close() {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Error removing temporary folder on server"
                );
            } else {
                tracing::debug!(path = %self.path.display(), "Removed scratch directory");
            }
        }
    }
}

/// Write `tree` as a gzip-compressed tar to `dest`, returning the archive size.
///
/// Entry names are relative to `tree`. This is blocking work.
pub fn build_tar_gz(tree: &Path, dest: &Path) -> Result<u64> {
    let file = File::create(dest)?;
    let encoder = GzEncoder::new(BufWriter::new(file), Compression::default());
    let mut builder = tar::Builder::new(encoder);
    builder.follow_symlinks(false);

    builder
        .append_dir_all(".", tree)
        .map_err(|e| Error::Archive(format!("packing '{}': {e}", tree.display())))?;

    let encoder = builder
        .into_inner()
        .map_err(|e| Error::Archive(format!("finishing tar stream: {e}")))?;
    let mut writer = encoder
        .finish()
        .map_err(|e| Error::Archive(format!("finishing gzip stream: {e}")))?;
    writer.flush()?;
    drop(writer);

    Ok(std::fs::metadata(dest)?.len())
}

/// A packaged folder waiting to be sent, owning its scratch directory
#[derive(Debug)]
pub struct FolderArchive {
    scratch: ScratchDir,
    path: PathBuf,
    file_name: String,
    size: u64,
}

impl FolderArchive {
    pub(crate) fn new(scratch: ScratchDir, path: PathBuf, file_name: String, size: u64) -> Self {
        Self {
            scratch,
            path,
            file_name,
            size,
        }
    }

    /// `<stem>.tar.gz`
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Body stream; the scratch directory lives until the stream is dropped
    pub async fn into_stream(self) -> Result<ArchiveStream> {
        let file = tokio::fs::File::open(&self.path).await?;
        let scratch = self.scratch;
        let stream = ReaderStream::new(file).map(move |chunk| {
            let _scratch = &scratch;
            chunk
        });
        Ok(stream.boxed())
    }

    /// Copy the archive into `dest_dir` and remove the scratch directory
    pub async fn persist_in(self, dest_dir: &Path) -> Result<PathBuf> {
        let target = dest_dir.join(&self.file_name);
        tokio::fs::copy(&self.path, &target).await?;
        self.scratch.close()?;
        Ok(target)
    }

    pub fn close(self) -> Result<()> {
        self.scratch.close()
    }
}
