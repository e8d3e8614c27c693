//! Backing directory of persisted blobs.
//!
//! Blobs are stored as flat files named after their key, with the codec's
//! extension appended.
//!
//! # Directory Structure
//! ```text
//! backing_dir/
//! ├── 3f9a1c0e77b2d4e5.gz     # key "3f9a1c0e77b2d4e5"
//! ├── 8d04aa61c3b9f210.gz
//! └── ...
//! ```

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::codec::BlobCodec;
use crate::error::{CacheError, Result};

/// A directory of codec-encoded blobs, one file per key.
#[derive(Clone)]
pub struct BlobDirectory {
    root: PathBuf,
    codec: Arc<dyn BlobCodec>,
}

impl fmt::Debug for BlobDirectory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlobDirectory")
            .field("root", &self.root)
            .field("extension", &self.codec.extension())
            .finish()
    }
}

impl BlobDirectory {
    /// Wraps `root`. The directory is not required to exist.
    pub fn new(root: impl Into<PathBuf>, codec: Arc<dyn BlobCodec>) -> Self {
        Self {
            root: root.into(),
            codec,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Whether the root exists and is a directory.
    pub fn exists(&self) -> bool {
        self.root.is_dir()
    }

    /// Lists persisted blob files, sorted by file name.
    ///
    /// Entries that are not regular files or do not carry the codec's
    /// extension are ignored.
    pub fn list(&self) -> Result<Vec<PathBuf>> {
        let read_dir = std::fs::read_dir(&self.root).map_err(|e| CacheError::io(&self.root, e))?;

        let mut files: Vec<PathBuf> = read_dir
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().map(|t| t.is_file()).unwrap_or(false))
            .map(|entry| entry.path())
            .filter(|path| self.key_for(path).is_some())
            .collect();

        files.sort();
        Ok(files)
    }

    /// Decodes a blob file name back into its key.
    pub fn key_for(&self, path: &Path) -> Option<String> {
        if path.extension()?.to_str()? != self.codec.extension() {
            return None;
        }
        let stem = path.file_stem()?.to_str()?;
        (!stem.is_empty()).then(|| stem.to_string())
    }

    /// File path a key is persisted under.
    pub fn path_for(&self, key: &str) -> Result<PathBuf> {
        validate_key(key)?;
        Ok(self
            .root
            .join(format!("{}.{}", key, self.codec.extension())))
    }

    /// Reads and decodes one blob file.
    ///
    /// # Returns
    /// The key encoded in the file name together with the decoded payload.
    pub fn load(&self, path: &Path) -> Result<(String, Vec<u8>)> {
        let key = self
            .key_for(path)
            .ok_or_else(|| CacheError::InvalidKey(path.display().to_string()))?;

        let stored = std::fs::read(path).map_err(|e| CacheError::io(path, e))?;
        let payload = self
            .codec
            .decompress(&stored)
            .map_err(|e| CacheError::Decode {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;

        Ok((key, payload))
    }

    /// Encodes and persists a blob (atomic write via temp file + rename).
    pub fn store(&self, key: &str, payload: &[u8]) -> Result<PathBuf> {
        let path = self.path_for(key)?;
        let encoded = self
            .codec
            .compress(payload)
            .map_err(|e| CacheError::io(&path, e))?;

        std::fs::create_dir_all(&self.root).map_err(|e| CacheError::io(&self.root, e))?;

        let temp_path = self.root.join(format!(".{}.tmp", key));
        std::fs::write(&temp_path, &encoded).map_err(|e| CacheError::io(&temp_path, e))?;
        std::fs::rename(&temp_path, &path).map_err(|e| CacheError::io(&path, e))?;

        Ok(path)
    }
}

/// Keys must map to a single plain file name.
fn validate_key(key: &str) -> Result<()> {
    let bad = key.is_empty()
        || key == "."
        || key == ".."
        || key.contains(['/', '\\', '\0']);
    if bad {
        return Err(CacheError::InvalidKey(key.to_string()));
    }
    Ok(())
}
