//! Filesystem-backed key-value storage.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::{BookshelfError, Result};
use crate::traits::KeyValueStorage;

/// Stores each key as a file in a single directory.
///
/// Directory structure:
/// ```text
/// storage_root/
/// +-- stories.json
/// +-- bookmark.json
/// +-- settings.json
/// ```
///
/// Writes go to a temporary file first and are renamed into place, so a
/// crash never leaves a half-written value behind.
#[derive(Debug, Clone)]
pub struct FileKeyValueStorage {
    root_path: PathBuf,
}

impl FileKeyValueStorage {
    /// Create the storage, creating `root_path` if needed.
    pub fn new<P: AsRef<Path>>(root_path: P) -> Result<Self> {
        let root_path = root_path.as_ref().to_path_buf();
        fs::create_dir_all(&root_path).map_err(|e| BookshelfError::BackendError {
            source: Some(eyre::eyre!(
                "Failed to create key-value directory {}: {}",
                root_path.display(),
                e
            )),
        })?;
        Ok(Self { root_path })
    }

    pub fn root_path(&self) -> &Path {
        &self.root_path
    }

    fn key_path(&self, key: &str) -> Result<PathBuf> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(BookshelfError::backend(format!(
                "Invalid storage key: {:?}",
                key
            )));
        }
        Ok(self.root_path.join(format!("{}.json", key)))
    }
}

impl KeyValueStorage for FileKeyValueStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        let path = self.key_path(key)?;
        match fs::read_to_string(&path) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(BookshelfError::backend(format!(
                "Failed to read {}: {}",
                path.display(),
                e
            ))),
        }
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        let path = self.key_path(key)?;
        let tmp_path = path.with_extension("json.tmp");

        fs::write(&tmp_path, value).map_err(|e| {
            BookshelfError::backend(format!("Failed to write {}: {}", tmp_path.display(), e))
        })?;
        fs::rename(&tmp_path, &path).map_err(|e| {
            BookshelfError::backend(format!("Failed to replace {}: {}", path.display(), e))
        })?;

        tracing::trace!(key, bytes = value.len(), "Stored key");
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        let path = self.key_path(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(BookshelfError::backend(format!(
                "Failed to remove {}: {}",
                path.display(),
                e
            ))),
        }
    }
}
