//! Blob storage collaborator.
//!
//! The pipeline consumes blob storage through the [`BlobStore`] trait; keys
//! are `/`-separated owner/folder/file segments. [`FsBlobStore`] maps keys
//! under a root directory for local and test use; a hosted object store
//! would implement the same trait.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use crate::error::PipelineError;

/// One entry from a prefix listing, content-light.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobInfo {
    pub key: String,
    pub size: u64,
    pub modified_at: i64,
}

pub trait BlobStore: Send + Sync {
    /// Reads the blob at `key`.
    ///
    /// # Errors
    ///
    /// `PipelineError::Blob` when the key does not exist or I/O fails.
    fn read(&self, key: &str) -> Result<Vec<u8>, PipelineError>;

    /// Writes `bytes` at `key`, replacing any existing blob.
    fn write(&self, key: &str, bytes: &[u8]) -> Result<(), PipelineError>;

    /// Lists all blobs whose key starts with `prefix`, sorted by key.
    fn list(&self, prefix: &str) -> Result<Vec<BlobInfo>, PipelineError>;
}

/// Filesystem-backed blob store rooted at one directory.
#[derive(Debug, Clone)]
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Maps a key to a path under the root, enforcing segment hygiene.
    ///
    /// # Errors
    ///
    /// `PipelineError::InvalidInput` on empty keys, empty segments, or `..`
    /// traversal attempts.
    fn resolve(&self, key: &str) -> Result<PathBuf, PipelineError> {
        if key.is_empty() {
            return Err(PipelineError::InvalidInput("empty blob key".into()));
        }
        let mut path = self.root.clone();
        for segment in key.split('/') {
            if segment.is_empty() || segment == "." || segment == ".." {
                return Err(PipelineError::InvalidInput(format!(
                    "blob key {key:?} has an invalid segment"
                )));
            }
            path.push(segment);
        }
        Ok(path)
    }
}

fn modified_secs(meta: &fs::Metadata) -> i64 {
    meta.modified()
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

fn walk(dir: &Path, root: &Path, out: &mut Vec<BlobInfo>) -> std::io::Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        let meta = entry.metadata()?;
        if meta.is_dir() {
            walk(&path, root, out)?;
        } else {
            let key = path
                .strip_prefix(root)
                .unwrap_or(&path)
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            out.push(BlobInfo { key, size: meta.len(), modified_at: modified_secs(&meta) });
        }
    }
    Ok(())
}

impl BlobStore for FsBlobStore {
    fn read(&self, key: &str) -> Result<Vec<u8>, PipelineError> {
        let path = self.resolve(key)?;
        Ok(fs::read(path)?)
    }

    fn write(&self, key: &str, bytes: &[u8]) -> Result<(), PipelineError> {
        let path = self.resolve(key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, bytes)?;
        Ok(())
    }

    fn list(&self, prefix: &str) -> Result<Vec<BlobInfo>, PipelineError> {
        if prefix.contains("..") {
            return Err(PipelineError::InvalidInput(format!(
                "blob prefix {prefix:?} has an invalid segment"
            )));
        }
        let mut out = Vec::new();
        if self.root.exists() {
            walk(&self.root, &self.root, &mut out)?;
        }
        out.retain(|b| b.key.starts_with(prefix));
        out.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(out)
    }
}
